use crate::model::{CommentId, Story};
use crate::session::RenderedComment;
use crate::thread::ItemError;
use crate::ui::markdown::{render_markdown, Line, Span, SpanStyle};
use crate::util::{display_width, strip_control_chars, truncate_to_width, wrap_to_width};
use crossterm::style::Stylize;

const BODY_INDENT: &str = "  ";

/// Plain or ANSI-styled text output at a fixed width.
#[derive(Debug, Clone, Copy)]
pub struct View {
    pub width: usize,
    pub color: bool,
}

impl View {
    pub fn new(width: usize, color: bool) -> Self {
        Self {
            width: width.max(20),
            color,
        }
    }

    fn paint(&self, span: &Span) -> String {
        let text = strip_control_chars(&span.text).into_owned();
        if !self.color {
            return text;
        }
        let SpanStyle {
            bold,
            italic,
            code,
            link,
            quote,
        } = span.style;

        let mut styled = text.stylize();
        if bold {
            styled = styled.bold();
        }
        if italic {
            styled = styled.italic();
        }
        if code {
            styled = styled.yellow();
        } else if link {
            styled = styled.blue().underlined();
        } else if quote {
            styled = styled.dark_grey();
        }
        styled.to_string()
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dark_grey().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_line(&self, line: &Line) -> String {
        line.spans.iter().map(|s| self.paint(s)).collect()
    }

    /// Numbered story list, one title per line with its link underneath.
    pub fn story_list(&self, stories: &[Story]) -> String {
        let mut out = String::new();
        for (rank, story) in stories.iter().enumerate() {
            let prefix = format!("{:>3}. ", rank + 1);
            let title = strip_control_chars(&story.title);
            let room = self.width.saturating_sub(prefix.len());
            let title = truncate_to_width(&title, room);
            let title = if self.color {
                (&*title).bold().to_string()
            } else {
                title.into_owned()
            };
            out.push_str(&format!("{prefix}{title}\n"));

            let link = format!("{}[{}] {}", " ".repeat(prefix.len()), story.id, story.link());
            out.push_str(&self.dim(&truncate_to_width(&link, self.width)));
            out.push('\n');
        }
        out
    }

    /// A comment thread: header per comment, then its body unless collapsed.
    pub fn thread(&self, comments: &[RenderedComment]) -> String {
        if comments.is_empty() {
            return self.dim("No comments.") + "\n";
        }

        let body_width = self.width.saturating_sub(BODY_INDENT.len());
        let mut out = String::new();
        for comment in comments {
            let marker = if comment.collapsed { "[+]" } else { "[-]" };
            let header = format!(
                "{marker} {} · {} · #{}",
                strip_control_chars(&comment.author),
                comment.relative_time,
                comment.id
            );
            out.push_str(&self.dim(&header));
            out.push('\n');

            if !comment.collapsed {
                for line in render_markdown(&comment.text) {
                    for wrapped in wrap_line(&line, body_width) {
                        if !wrapped.is_blank() {
                            out.push_str(BODY_INDENT);
                            out.push_str(&self.paint_line(&wrapped));
                        }
                        out.push('\n');
                    }
                }
            }
            out.push('\n');
        }
        out
    }

    /// Summary of comments that could not be shown.
    pub fn dropped(&self, failures: &[(CommentId, ItemError)]) -> String {
        if failures.is_empty() {
            return String::new();
        }
        let mut out = self.dim(&format!("{} comment(s) could not be loaded:", failures.len()));
        out.push('\n');
        for (id, error) in failures {
            let message = format!("#{id}: {error}");
            for line in wrap_to_width(&message, self.width.saturating_sub(BODY_INDENT.len())) {
                out.push_str(BODY_INDENT);
                out.push_str(&self.dim(&line));
                out.push('\n');
            }
        }
        out
    }
}

/// Word-wrap a styled line to `width` columns, keeping each word's style.
pub fn wrap_line(line: &Line, width: usize) -> Vec<Line> {
    if line.preformatted || line.is_blank() {
        return vec![line.clone()];
    }

    let mut out = Vec::new();
    let mut current = Line::default();
    let mut used = 0;
    let mut pending_space: Option<SpanStyle> = None;

    for span in &line.spans {
        let leading_space = span.text.starts_with(char::is_whitespace);
        if leading_space && used > 0 {
            pending_space = Some(span.style);
        }
        let words: Vec<&str> = span.text.split_whitespace().collect();
        for (i, word) in words.iter().enumerate() {
            if i > 0 {
                pending_space = Some(span.style);
            }
            let w = display_width(word);
            let space = usize::from(pending_space.is_some() && used > 0);
            if used > 0 && used + space + w > width {
                out.push(std::mem::take(&mut current));
                used = 0;
            } else if let Some(style) = pending_space.filter(|_| used > 0) {
                current.spans.push(Span {
                    text: " ".to_string(),
                    style,
                });
                used += 1;
            }
            pending_space = None;
            current.spans.push(Span {
                text: (*word).to_string(),
                style: span.style,
            });
            used += w;
        }
        if span.text.ends_with(char::is_whitespace) && !words.is_empty() {
            pending_space = Some(span.style);
        }
    }

    if !current.spans.is_empty() {
        out.push(current);
    }
    if out.is_empty() {
        out.push(Line::default());
    }
    out
}
