use super::html::Node;

/// Characters escaped anywhere in prose so a markdown renderer shows them
/// literally.
const INLINE_SPECIAL: &[char] = &['\\', '`', '*', '_', '[', ']', '<'];

/// Characters that open a block (heading, quote, list, setext underline,
/// fence) when they are the first thing on a line.
const LINE_START_SPECIAL: &[char] = &['#', '>', '-', '+', '=', '~'];

/// Elements whose text is kept when they turn up inside code. Anything else
/// there was a `<` in the source (`Vec<u8>`) and is written back as text.
const CODE_MARKUP: &[&str] = &["a", "b", "strong", "i", "em", "code", "pre", "span", "font"];

/// Convert a parsed fragment into markdown-flavored text.
///
/// | HTML                  | Markdown           |
/// |-----------------------|--------------------|
/// | `<b>`, `<strong>`     | `**text**`         |
/// | `<i>`, `<em>`         | `*text*`           |
/// | `<a href=u>`          | `[text](u)`        |
/// | `<code>`              | `` `code` ``       |
/// | `<pre>`               | fenced code block  |
/// | `<br>`                | hard line break    |
/// | `<script>`, `<style>` | dropped            |
/// | anything else         | its text content   |
///
/// Prose is escaped so it never produces markdown structure of its own:
/// no headings, lists, quotes, images or stray emphasis.
pub(crate) fn to_markdown(nodes: &[Node]) -> String {
    let mut out = String::new();
    write_nodes(nodes, None, &mut out);
    out
}

/// `follow` is the first character written after these nodes, if known.
fn write_nodes(nodes: &[Node], follow: Option<char>, out: &mut String) {
    let mut follows = vec![follow; nodes.len()];
    let mut next = follow;
    for (i, node) in nodes.iter().enumerate().rev() {
        follows[i] = next;
        if let Some(c) = leading_char(node) {
            next = Some(c);
        }
    }

    for (node, follow) in nodes.iter().zip(follows) {
        write_node(node, follow, out);
    }
}

fn write_node(node: &Node, follow: Option<char>, out: &mut String) {
    match node {
        Node::Text(text) => escape_into(text, out),
        Node::Element { name, children, .. } => match name.as_str() {
            "b" | "strong" => write_emphasis(children, "**", follow, out),
            "i" | "em" => write_emphasis(children, "*", follow, out),
            "a" => write_link(node, children, follow, out),
            "code" => write_code_span(&code_text(children), out),
            "pre" => write_code_block(&code_text(children), out),
            "br" => out.push_str("  \n"),
            "script" | "style" => {}
            _ => write_nodes(children, follow, out),
        },
    }
}

/// Surround rendered children with `marker`, keeping edge whitespace outside
/// so `<b> x </b>` becomes ` **x** ` rather than the unparseable `** x **`.
///
/// A delimiter next to punctuation only counts when the character on its
/// other side is whitespace or punctuation too (`*foo.*bar` is literal
/// asterisks). When that fails the text is written without emphasis.
fn write_emphasis(children: &[Node], marker: &str, follow: Option<char>, out: &mut String) {
    let start = out.len();
    write_nodes(children, follow, out);
    let inner = out.split_off(start);

    let core = inner.trim();
    if core.is_empty() {
        out.push_str(&inner);
        return;
    }

    let lead = &inner[..inner.len() - inner.trim_start().len()];
    let trail = &inner[inner.trim_end().len()..];
    out.push_str(lead);

    let before = out.chars().next_back();
    let after = trail.chars().next().or(follow);
    if can_open(before, core) && can_close(core, after) {
        out.push_str(marker);
        out.push_str(core);
        out.push_str(marker);
    } else {
        out.push_str(core);
    }
    out.push_str(trail);
}

fn can_open(before: Option<char>, core: &str) -> bool {
    !core.starts_with(is_punctuation) || before.map_or(true, |c| !c.is_alphanumeric())
}

fn can_close(core: &str, after: Option<char>) -> bool {
    !core.ends_with(is_punctuation) || after.map_or(true, |c| !c.is_alphanumeric())
}

fn is_punctuation(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace()
}

fn write_link(node: &Node, children: &[Node], follow: Option<char>, out: &mut String) {
    let href = node
        .attr("href")
        .map(str::trim)
        .filter(|h| !h.is_empty() && !is_script_url(h));

    let Some(href) = href else {
        write_nodes(children, follow, out);
        return;
    };

    // `![` would start an image
    if out.ends_with('!') {
        out.pop();
        out.push_str("\\!");
    }
    out.push('[');
    let start = out.len();
    write_nodes(children, Some(']'), out);
    let label = out.split_off(start);
    let label = label.trim();
    if label.is_empty() {
        escape_into(href, out);
    } else {
        out.push_str(label);
    }
    out.push_str("](");
    push_destination(href, out);
    out.push(')');
}

fn write_code_span(code: &str, out: &mut String) {
    if code.is_empty() {
        return;
    }
    let fence = "`".repeat(longest_run(code, '`') + 1);
    let pad = if code.starts_with('`') || code.ends_with('`') {
        " "
    } else {
        ""
    };
    out.push_str(&fence);
    out.push_str(pad);
    out.push_str(code);
    out.push_str(pad);
    out.push_str(&fence);
}

fn write_code_block(code: &str, out: &mut String) {
    let body = code.trim_matches('\n');
    let fence = "`".repeat(longest_run(body, '`').max(2) + 1);

    if !out.is_empty() && !out.ends_with("\n\n") {
        out.push_str(if out.ends_with('\n') { "\n" } else { "\n\n" });
    }
    out.push_str(&fence);
    out.push('\n');
    out.push_str(body);
    out.push('\n');
    out.push_str(&fence);
    out.push_str("\n\n");
}

/// First character a node will contribute to the output, roughly.
///
/// Emphasis reports its content rather than its marker, which errs toward
/// dropping emphasis next to it.
fn leading_char(node: &Node) -> Option<char> {
    match node {
        Node::Text(text) => text.chars().next(),
        Node::Element { name, children, .. } => match name.as_str() {
            "br" | "pre" => Some('\n'),
            "script" | "style" => None,
            "code" => (!children.is_empty()).then_some('`'),
            "a" if node.attr("href").is_some() => Some('['),
            _ => children.iter().find_map(leading_char),
        },
    }
}

/// Text of a code element, unescaped. Elements the HTML parser made out of
/// literal `<...>` in the code are written back as they were typed.
fn code_text(nodes: &[Node]) -> String {
    let mut text = String::new();
    collect_code(nodes, &mut text);
    text
}

fn collect_code(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element {
                name,
                attrs,
                children,
            } => match name.as_str() {
                "br" => out.push('\n'),
                "script" | "style" => {}
                known if CODE_MARKUP.contains(&known) => collect_code(children, out),
                _ => {
                    out.push('<');
                    out.push_str(name);
                    for (key, value) in attrs {
                        out.push(' ');
                        out.push_str(key);
                        if !value.is_empty() {
                            out.push_str("=\"");
                            out.push_str(value);
                            out.push('"');
                        }
                    }
                    out.push('>');
                    collect_code(children, out);
                }
            },
        }
    }
}

fn escape_into(text: &str, out: &mut String) {
    let mut line_start = at_line_start(out);
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '\n' {
            out.push(c);
            line_start = true;
            continue;
        }

        if line_start {
            // Leading indentation could turn the line into a code block
            if c == ' ' || c == '\t' {
                continue;
            }
            line_start = false;

            if LINE_START_SPECIAL.contains(&c) {
                out.push('\\');
                out.push(c);
                continue;
            }
            if c.is_ascii_digit() {
                // `1.` and `1)` start ordered lists
                let digits_end = text[i..]
                    .find(|d: char| !d.is_ascii_digit())
                    .map_or(text.len(), |n| i + n);
                out.push_str(&text[i..digits_end]);
                while chars.next_if(|&(j, _)| j < digits_end).is_some() {}
                if let Some((_, marker)) = chars.next_if(|&(_, m)| m == '.' || m == ')') {
                    out.push('\\');
                    out.push(marker);
                }
                continue;
            }
        }

        if INLINE_SPECIAL.contains(&c) || (c == '&' && starts_reference(&text[i + 1..])) {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Whether only indentation follows the last line break in `out`.
fn at_line_start(out: &str) -> bool {
    let trimmed = out.trim_end_matches([' ', '\t']);
    trimmed.is_empty() || trimmed.ends_with('\n')
}

/// Whether `&` followed by `rest` would be read as a character reference.
fn starts_reference(rest: &str) -> bool {
    let name_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '#'))
        .unwrap_or(rest.len());
    name_len > 0 && rest[name_len..].starts_with(';')
}

/// Percent-encode the few characters that would end or break an inline
/// link destination.
fn push_destination(href: &str, out: &mut String) {
    for c in href.chars() {
        match c {
            ' ' => out.push_str("%20"),
            '(' => out.push_str("%28"),
            ')' => out.push_str("%29"),
            '<' => out.push_str("%3C"),
            '>' => out.push_str("%3E"),
            '\\' => out.push_str("%5C"),
            _ => out.push(c),
        }
    }
}

fn is_script_url(href: &str) -> bool {
    href.get(..11)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("javascript:"))
}

fn longest_run(text: &str, target: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == target {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}
