//! Comment-tag parser: splits a documentation comment into description and tags.

use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{CommentBlock, Tag};

/// Comment-tag parsing collaborator.
pub trait CommentTagParser {
    /// Parses comment text (without the `/*` and `*/` delimiters).
    fn parse_comment(&self, text: &str) -> CommentBlock;
}

/// [`CommentTagParser`] for JSDoc-style `@tag {type} name description` blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsDocTagParser;

impl CommentTagParser for JsDocTagParser {
    fn parse_comment(&self, text: &str) -> CommentBlock {
        let mut description: Vec<&str> = Vec::new();
        let mut tags: Vec<Tag> = Vec::new();

        for raw_line in text.lines() {
            let line = strip_decoration(raw_line);

            if let Some(tag) = parse_tag_line(line) {
                tags.push(tag);
                continue;
            }
            if line.is_empty() {
                continue;
            }
            match tags.last_mut() {
                Some(tag) => {
                    append_text(&mut tag.description, line);
                    append_text(&mut tag.source, line);
                }
                None => description.push(line),
            }
        }

        CommentBlock {
            description: description.join(" "),
            tags,
        }
    }
}

fn tag_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@([A-Za-z][\w-]*)\s*(.*)$").expect("valid regex"))
}

/// Removes leading whitespace and one `*` gutter character.
fn strip_decoration(line: &str) -> &str {
    let line = line.trim_start();
    line.strip_prefix('*').unwrap_or(line).trim()
}

fn append_text(target: &mut String, line: &str) {
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(line);
}

fn parse_tag_line(line: &str) -> Option<Tag> {
    let caps = tag_line_re().captures(line)?;
    let keyword = caps[1].to_string();
    let source = caps[2].trim().to_string();

    let mut rest = source.as_str();
    let mut type_expr = String::new();
    if rest.starts_with('{') {
        if let Some(close) = matching_close(rest, '{', '}') {
            type_expr = rest[1..close].trim().to_string();
            rest = rest[close + 1..].trim_start();
        }
    }

    let mut name = String::new();
    let mut default = None;
    let mut optional = false;
    if rest.starts_with('[') {
        if let Some(close) = matching_close(rest, '[', ']') {
            let inner = rest[1..close].trim();
            optional = true;
            match inner.split_once('=') {
                Some((n, d)) => {
                    name = n.trim().to_string();
                    default = Some(d.trim().to_string());
                }
                None => name = inner.to_string(),
            }
            rest = rest[close + 1..].trim_start();
        }
    } else if !rest.is_empty() {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        name = rest[..end].to_string();
        rest = rest[end..].trim_start();
    }

    let description = rest.strip_prefix("- ").unwrap_or(rest).trim().to_string();

    Some(Tag {
        tag: keyword,
        name,
        type_expr,
        description,
        default,
        optional,
        source,
    })
}

/// Byte index of the bracket closing the one at index 0, skipping quoted text.
fn matching_close(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for (idx, c) in text.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' if idx > 0 => quote = Some(c),
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}
