//! Comment body sanitizer: raw API HTML in, markdown-flavored text out.
//!
//! [`render`] applies three stages in a fixed order:
//!
//! 1. **Unescape** - decode HTML character references ([`entities`])
//! 2. **Paragraphs** - every literal `<p>` and `</p>` becomes a double line
//!    break. Opening and closing tags get the *same* marker, so
//!    `<p>a</p><p>b</p>` yields four newlines between `a` and `b`.
//! 3. **Convert** - parse what is left as an HTML fragment ([`html`]) and
//!    write it out as markdown ([`markdown`])
//!
//! The output needs no further escaping before it reaches a markdown
//! renderer: prose comes out as plain paragraphs, and only the markup the
//! comment actually used adds structure. Any stage failing means the
//! comment is unusable; callers drop it rather than show half-converted
//! text.
//!
//! # Re-rendering
//!
//! `render(render(x))` leaves paragraph breaks alone, since no `<p>` survives
//! the first pass. It is *not* a fixpoint in general: markdown punctuation
//! escaped by the first pass (`\*`) is escaped again by the second (`\\\*`).

mod entities;
mod html;
mod markdown;

use thiserror::Error;

/// What a `<p>` or `</p>` is replaced with.
pub const PARAGRAPH_BREAK: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    /// A numeric character reference that names no character.
    #[error("Invalid character reference: {0}")]
    InvalidEntity(String),
    #[error("Markup nested deeper than {0} levels")]
    NestingTooDeep(usize),
}

/// Turn a raw comment body into markdown-flavored text.
///
/// # Errors
///
/// Returns [`SanitizeError`] if a character reference is invalid or the
/// markup nests too deeply.
///
/// # Examples
///
/// ```
/// use hnplus::sanitize::render;
///
/// assert_eq!(render("&amp;lt;b&amp;gt;hi&amp;lt;/b&amp;gt;").unwrap(), "**hi**");
/// assert_eq!(
///     render("First<p>Second").unwrap(),
///     "First\n\nSecond"
/// );
/// ```
pub fn render(raw: &str) -> Result<String, SanitizeError> {
    let unescaped = entities::unescape(raw)?;
    let with_breaks = split_paragraphs(&unescaped);
    let nodes = html::parse_fragment(&with_breaks)?;
    let converted = markdown::to_markdown(&nodes);
    Ok(converted.trim().to_string())
}

fn split_paragraphs(text: &str) -> String {
    text.replace("<p>", PARAGRAPH_BREAK)
        .replace("</p>", PARAGRAPH_BREAK)
}
