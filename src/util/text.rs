use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";

/// Terminal columns `s` occupies. Wide CJK and emoji count as two.
///
/// ```
/// use hnplus::util::display_width;
///
/// assert_eq!(display_width("Hello"), 5);
/// assert_eq!(display_width("你好"), 4);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Cut `s` to at most `max_width` columns, ending in `...` when shortened.
///
/// Widths of three or less have no room for the ellipsis, so they get a
/// plain prefix instead.
///
/// ```
/// use hnplus::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Show HN: a thing", 11), "Show HN:...");
/// assert_eq!(truncate_to_width("Ask HN", 20), "Ask HN");
/// assert_eq!(truncate_to_width("Ask HN", 2), "As");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let (budget, suffix) = if max_width > ELLIPSIS.len() {
        (max_width - ELLIPSIS.len(), ELLIPSIS)
    } else {
        (max_width, "")
    };

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = char_width(c);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    Cow::Owned(format!("{}{}", &s[..end], suffix))
}

fn is_stray_control(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r')
}

/// Remove control characters and ANSI escape sequences before text from
/// the API reaches the terminal.
///
/// Tab, newline and carriage return are kept. CSI (`ESC [`) sequences are
/// dropped through their final byte, OSC (`ESC ]`) sequences through BEL or
/// `ESC \`.
///
/// ```
/// use hnplus::util::strip_control_chars;
///
/// assert_eq!(strip_control_chars("\x1b[31mred\x1b[0m"), "red");
/// assert_eq!(strip_control_chars("plain"), "plain");
/// ```
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_stray_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\x1b' => match chars.peek() {
                Some('[') => {
                    chars.next();
                    for c in chars.by_ref() {
                        if ('\x40'..='\x7e').contains(&c) {
                            break;
                        }
                    }
                }
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\x07' {
                            break;
                        }
                        if c == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            c if is_stray_control(c) => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Greedy word wrap to `width` columns. Existing newlines are kept; a blank
/// input line stays a blank output line. Words longer than `width` get a
/// line of their own rather than being split.
pub fn wrap_to_width(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for source_line in text.lines() {
        let mut current = String::new();
        let mut current_width = 0;

        for word in source_line.split_whitespace() {
            let w = display_width(word);
            if current_width > 0 && current_width + 1 + w > width {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            if current_width > 0 {
                current.push(' ');
                current_width += 1;
            }
            current.push_str(word);
            current_width += w;
        }
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_width_mixed() {
        assert_eq!(display_width(""), 0);
        assert_eq!(display_width("ab你"), 4);
        // Combining acute accent is zero width
        assert_eq!(display_width("e\u{301}"), 1);
    }

    #[test]
    fn test_truncate_fits_is_borrowed() {
        assert!(matches!(truncate_to_width("short", 5), Cow::Borrowed(_)));
    }

    #[test]
    fn test_truncate_adds_ellipsis() {
        assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
    }

    #[test]
    fn test_truncate_wide_chars_never_overflow() {
        let out = truncate_to_width("你好世界", 7);
        assert_eq!(out, "你好...");
        assert!(display_width(&out) <= 7);
    }

    #[test]
    fn test_truncate_narrow_widths() {
        assert_eq!(truncate_to_width("Test", 0), "");
        assert_eq!(truncate_to_width("Test", 1), "T");
        assert_eq!(truncate_to_width("Test", 3), "Tes");
        assert_eq!(truncate_to_width("你好", 1), "");
    }

    #[test]
    fn test_strip_keeps_whitespace_controls() {
        assert_eq!(strip_control_chars("a\tb\nc\r"), "a\tb\nc\r");
    }

    #[test]
    fn test_strip_removes_osc_and_bare_escape() {
        assert_eq!(
            strip_control_chars("\x1b]0;title\x07ok\x1b]8;;x\x1b\\!\x1b"),
            "ok!"
        );
        assert_eq!(strip_control_chars("a\x00b\x7fc"), "abc");
    }

    #[test]
    fn test_strip_unterminated_csi() {
        assert_eq!(strip_control_chars("ok\x1b[12"), "ok");
    }

    #[test]
    fn test_wrap_basic() {
        assert_eq!(
            wrap_to_width("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
    }

    #[test]
    fn test_wrap_keeps_blank_lines() {
        assert_eq!(wrap_to_width("one\n\ntwo", 80), vec!["one", "", "two"]);
    }

    #[test]
    fn test_wrap_long_word_own_line() {
        assert_eq!(
            wrap_to_width("a https://example.com/very/long b", 8),
            vec!["a", "https://example.com/very/long", "b"]
        );
    }

    #[test]
    fn test_wrap_empty() {
        assert!(wrap_to_width("", 10).is_empty());
    }
}
