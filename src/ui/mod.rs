//! Terminal output for stories and comment threads.
//!
//! - `markdown` - sanitized comment markdown to styled lines
//! - `view` - wrapping, styling and layout of whole listings

mod markdown;
mod view;

pub use markdown::{render_markdown, Line, Span, SpanStyle};
pub use view::{wrap_line, View};
