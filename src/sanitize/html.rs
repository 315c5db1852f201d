//! HTML fragment parsing for comment bodies.
//!
//! The fragment goes through html5ever (via `scraper`), so malformed markup
//! is repaired the way a browser would repair it: stray closing tags are
//! ignored, unclosed elements close at end of input, and a `<` that cannot
//! start a tag (`a < b`, `<3`) is text.
//!
//! Prose can still contain a `<` that looks like the start of a tag or
//! comment but never reaches its end (`a<b and name="x`, `&lt;!-- in HTML`).
//! An HTML5 parser would swallow everything after it, so such a `<` is
//! re-escaped before parsing and comes out as text.

use super::SanitizeError;
use scraper::{ElementRef, Html};
use std::borrow::Cow;

/// Deepest element nesting accepted.
pub(crate) const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Text(String),
    Element {
        name: String,
        attrs: Vec<(String, String)>,
        children: Vec<Node>,
    },
}

impl Node {
    pub(crate) fn attr(&self, key: &str) -> Option<&str> {
        match self {
            Node::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            Node::Text(_) => None,
        }
    }
}

/// Parse a fragment into a forest of owned nodes.
///
/// # Errors
///
/// [`SanitizeError::NestingTooDeep`] when elements nest deeper than
/// [`MAX_DEPTH`].
pub(crate) fn parse_fragment(input: &str) -> Result<Vec<Node>, SanitizeError> {
    let input = protect_runaway_markup(input);
    let document = Html::parse_fragment(&input);
    // The fragment's nodes hang off a synthetic <html> element
    convert_children(document.root_element(), 1)
}

fn convert_children(parent: ElementRef<'_>, depth: usize) -> Result<Vec<Node>, SanitizeError> {
    let mut nodes = Vec::new();

    for child in parent.children() {
        if let Some(element) = ElementRef::wrap(child) {
            if depth > MAX_DEPTH {
                return Err(SanitizeError::NestingTooDeep(MAX_DEPTH));
            }
            let value = element.value();
            nodes.push(Node::Element {
                name: value.name().to_string(),
                attrs: value
                    .attrs()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                children: convert_children(element, depth + 1)?,
            });
        } else if let Some(text) = child.value().as_text() {
            push_text(&mut nodes, text);
        }
        // Comments and doctypes carry nothing to show
    }

    Ok(nodes)
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(last)) = nodes.last_mut() {
        last.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_string()));
    }
}

/// Escape each `<` that would open a tag or comment running to end of input.
///
/// A tag-like `<` needs a `>` somewhere after it and `<!--` needs a later
/// `-->`. One backwards search for each closer keeps this linear.
fn protect_runaway_markup(input: &str) -> Cow<'_, str> {
    let last_gt = input.rfind('>');
    let last_comment_end = input.rfind("-->");
    let mut protected: Option<String> = None;
    let mut copied = 0;

    for (i, _) in input.match_indices('<') {
        let rest = &input[i + 1..];
        let runaway = if rest.starts_with("!--") {
            last_comment_end.map_or(true, |end| end < i + 4)
        } else {
            rest.starts_with(|c: char| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'))
                && last_gt.map_or(true, |gt| gt < i)
        };

        if runaway {
            let buf = protected.get_or_insert_with(|| String::with_capacity(input.len() + 8));
            buf.push_str(&input[copied..i]);
            buf.push_str("&lt;");
            copied = i + 1;
        }
    }

    match protected {
        Some(mut buf) => {
            buf.push_str(&input[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(input),
    }
}
