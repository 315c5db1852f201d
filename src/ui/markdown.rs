use pulldown_cmark::{Event, Parser, Tag, TagEnd};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanStyle {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    pub link: bool,
    pub quote: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

impl Span {
    fn new(text: impl Into<String>, style: SpanStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// One output line. Preformatted lines come from code blocks and are never
/// re-wrapped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub spans: Vec<Span>,
    pub preformatted: bool,
}

impl Line {
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn is_blank(&self) -> bool {
        self.spans.iter().all(|s| s.text.trim().is_empty())
    }
}

/// Convert a comment's markdown into styled lines.
pub fn render_markdown(md: &str) -> Vec<Line> {
    let mut renderer = Renderer::default();
    for event in Parser::new(md) {
        renderer.event(event);
    }
    renderer.finish()
}

#[derive(Default)]
struct Renderer {
    lines: Vec<Line>,
    current: Vec<Span>,
    in_code_block: bool,
    emphasis: usize,
    strong: usize,
    quote_depth: usize,
    link: Option<(String, String)>,
    lists: Vec<Option<u64>>,
}

impl Renderer {
    fn style(&self) -> SpanStyle {
        SpanStyle {
            bold: self.strong > 0,
            italic: self.emphasis > 0,
            code: false,
            link: self.link.is_some(),
            quote: self.quote_depth > 0,
        }
    }

    fn push_text(&mut self, text: String, style: SpanStyle) {
        if self.current.is_empty() && self.quote_depth > 0 {
            let marker = SpanStyle {
                quote: true,
                ..SpanStyle::default()
            };
            self.current.push(Span::new("> ".repeat(self.quote_depth), marker));
        }
        if let Some((_, label)) = self.link.as_mut() {
            label.push_str(&text);
        }
        self.current.push(Span::new(text, style));
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(Line {
                spans: std::mem::take(&mut self.current),
                preformatted: false,
            });
        }
    }

    fn blank(&mut self) {
        self.flush();
        if self.lines.last().is_some_and(|l| !l.is_blank()) {
            self.lines.push(Line::default());
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                // List items are kept tight
                if self.lists.is_empty() {
                    self.blank();
                } else {
                    self.flush();
                }
            }
            Event::Start(Tag::Heading { .. }) => self.strong += 1,
            Event::End(TagEnd::Heading(_)) => {
                self.strong = self.strong.saturating_sub(1);
                self.blank();
            }
            Event::Start(Tag::BlockQuote { .. }) => {
                self.flush();
                self.quote_depth += 1;
            }
            Event::End(TagEnd::BlockQuote { .. }) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            Event::Start(Tag::CodeBlock(_)) => {
                self.flush();
                self.in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                self.in_code_block = false;
                self.blank();
            }
            Event::Start(Tag::List(start)) => {
                self.flush();
                self.lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            Event::Start(Tag::Item) => {
                self.flush();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let bullet = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let b = format!("{indent}{n}. ");
                        *n += 1;
                        b
                    }
                    _ => format!("{indent}- "),
                };
                self.push_text(bullet, SpanStyle::default());
            }
            Event::End(TagEnd::Item) => self.flush(),
            Event::Start(Tag::Emphasis) => self.emphasis += 1,
            Event::End(TagEnd::Emphasis) => self.emphasis = self.emphasis.saturating_sub(1),
            Event::Start(Tag::Strong) => self.strong += 1,
            Event::End(TagEnd::Strong) => self.strong = self.strong.saturating_sub(1),
            Event::Start(Tag::Link { dest_url, .. }) => {
                self.link = Some((dest_url.into_string(), String::new()));
            }
            Event::End(TagEnd::Link) => {
                // Show the destination unless the label already is it
                if let Some((dest, label)) = self.link.take() {
                    if label != dest {
                        let style = SpanStyle {
                            link: true,
                            ..self.style()
                        };
                        self.push_text(format!(" ({dest})"), style);
                    }
                }
            }
            Event::Text(text) if self.in_code_block => {
                let code = SpanStyle {
                    code: true,
                    ..SpanStyle::default()
                };
                for line in text.lines() {
                    self.lines.push(Line {
                        spans: vec![Span::new(line, code)],
                        preformatted: true,
                    });
                }
            }
            Event::Text(text) => {
                let style = self.style();
                self.push_text(text.into_string(), style);
            }
            Event::Code(code) => {
                let style = SpanStyle {
                    code: true,
                    ..self.style()
                };
                self.push_text(code.into_string(), style);
            }
            Event::SoftBreak => {
                let style = self.style();
                self.push_text(" ".to_string(), style);
            }
            Event::HardBreak => self.flush(),
            Event::Html(html) | Event::InlineHtml(html) => {
                let style = self.style();
                self.push_text(html.into_string(), style);
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line> {
        self.flush();
        while self.lines.last().is_some_and(Line::is_blank) {
            self.lines.pop();
        }
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(lines: &[Line]) -> Vec<String> {
        lines.iter().map(Line::plain_text).collect()
    }

    #[test]
    fn test_paragraphs_separated_by_one_blank() {
        let lines = render_markdown("para one\n\n\n\npara two");
        assert_eq!(texts(&lines), vec!["para one", "", "para two"]);
    }

    #[test]
    fn test_bold_and_italic_styles() {
        let lines = render_markdown("a **b** *c*");
        let spans = &lines[0].spans;
        assert!(spans.iter().any(|s| s.text == "b" && s.style.bold));
        assert!(spans.iter().any(|s| s.text == "c" && s.style.italic));
        assert!(spans.iter().any(|s| s.text == "a " && s.style == SpanStyle::default()));
    }

    #[test]
    fn test_link_shows_destination() {
        let lines = render_markdown("see [the docs](https://example.com/d)");
        assert_eq!(texts(&lines), vec!["see the docs (https://example.com/d)"]);
    }

    #[test]
    fn test_bare_link_not_repeated() {
        let lines = render_markdown("[https://example.com](https://example.com)");
        assert_eq!(texts(&lines), vec!["https://example.com"]);
    }

    #[test]
    fn test_code_block_is_preformatted() {
        let lines = render_markdown("intro\n\n```\nfn main() {\n    let x = 1;\n}\n```\n");
        assert_eq!(
            texts(&lines),
            vec!["intro", "", "fn main() {", "    let x = 1;", "}"]
        );
        assert!(lines[2].preformatted);
        assert!(lines[3].spans[0].style.code);
    }

    #[test]
    fn test_blockquote_prefixed() {
        let lines = render_markdown("> quoted text\n\nreply");
        assert_eq!(texts(&lines), vec!["> quoted text", "", "reply"]);
        assert!(lines[0].spans[0].style.quote);
    }

    #[test]
    fn test_lists() {
        let lines = render_markdown("- one\n- two\n\n1. first\n2. second");
        assert_eq!(
            texts(&lines),
            vec!["- one", "- two", "", "1. first", "2. second"]
        );
    }

    #[test]
    fn test_hard_break_splits_line() {
        let lines = render_markdown("first  \nsecond");
        assert_eq!(texts(&lines), vec!["first", "second"]);
    }

    #[test]
    fn test_empty() {
        assert!(render_markdown("").is_empty());
    }
}
