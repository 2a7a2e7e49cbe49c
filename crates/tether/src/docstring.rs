//! Parser for `@tag`-annotated documentation strings.
//!
//! Free text comes first; each line starting with `@` opens a tag, and the
//! indented lines below it belong to that tag. Builtin docs and `##` comments on
//! user functions share this format.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Tags whose first word after the types is a name.
const NAMED_TAGS: &[&str] = &["param", "yieldparam", "attr"];
/// Tags carrying types and text but no name.
const TYPED_TAGS: &[&str] = &["return", "raise", "yieldreturn"];

static TAG_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@([A-Za-z_]\w*)(?:\s+(.*))?$").expect("valid pattern"));
static TYPES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\]]*)\]\s*(.*)$").expect("valid pattern"));
static DEFAULTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(([^)]*)\)\s*(.*)$").expect("valid pattern"));

/// A parsed documentation string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Docstring {
    pub text: String,
    pub tags: Vec<Tag>,
}

/// One `@tag` entry.
///
/// `tag_name`, `name`, `types` and `text` are always serialized; the remaining
/// fields only appear on the tags that use them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Tag {
    pub tag_name: String,
    pub name: Option<String>,
    pub types: Option<Vec<String>>,
    pub text: Option<String>,
    /// `@overload` parameters as `[name, default]` pairs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<(String, Option<String>)>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Body of an `@overload`, parsed recursively.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<Box<Docstring>>,
    /// The key described by an `@option`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair: Option<Box<Tag>>,
    /// Parenthesised defaults of an `@option` key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<Vec<String>>,
}

impl Tag {
    fn new(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_owned(),
            ..Self::default()
        }
    }
}

impl Docstring {
    /// Parses `source`. Never fails: anything that is not a recognisable tag is text.
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let mut text = Vec::new();
        let mut blocks: Vec<(String, Vec<String>)> = Vec::new();
        for line in source.lines() {
            if let Some(captures) = TAG_LINE.captures(line) {
                let head = format!(
                    "{} {}",
                    &captures[1],
                    captures.get(2).map_or("", |rest| rest.as_str())
                );
                blocks.push((head, Vec::new()));
            } else if let Some((_, body)) = blocks.last_mut()
                && (line.starts_with([' ', '\t']) || line.trim().is_empty())
            {
                body.push(line.to_owned());
            } else {
                // an unindented line after a tag ends that tag's body
                text.push(line);
            }
        }
        Self {
            text: text.join("\n").trim().to_owned(),
            tags: blocks.iter().map(|(head, body)| parse_tag(head, body)).collect(),
        }
    }

    /// Tags with the given name, in order.
    pub fn tags_named<'a>(&'a self, tag_name: &'a str) -> impl Iterator<Item = &'a Tag> + 'a {
        self.tags.iter().filter(move |tag| tag.tag_name == tag_name)
    }
}

fn parse_tag(head: &str, body: &[String]) -> Tag {
    let (tag_name, rest) = head.split_once(' ').unwrap_or((head, ""));
    let rest = rest.trim();
    let mut tag = Tag::new(tag_name);
    match tag_name {
        "overload" => {
            let signature = rest.to_owned();
            tag.name = Some(signature.split('(').next().unwrap_or_default().trim().to_owned());
            tag.parameters = Some(overload_parameters(&signature));
            tag.docstring = Some(Box::new(Docstring::parse(&dedent(body))));
            tag.signature = Some(signature);
        }
        "example" => {
            tag.name = Some(rest.to_owned());
            tag.text = Some(dedent(body));
        }
        "option" => {
            let (name, remainder) = first_word(rest);
            tag.name = name;
            let (types, remainder) = split_types(remainder);
            let (key, remainder) = first_word(remainder);
            let mut pair = Tag::new("option");
            pair.name = key;
            pair.types = types;
            let (defaults, description) = match DEFAULTS.captures(remainder) {
                Some(captures) => (
                    Some(
                        captures[1]
                            .split(',')
                            .map(|default| default.trim().to_owned())
                            .filter(|default| !default.is_empty())
                            .collect(),
                    ),
                    captures[2].to_owned(),
                ),
                None => (None, remainder.to_owned()),
            };
            pair.defaults = defaults;
            pair.text = Some(with_body(&description, body));
            tag.pair = Some(Box::new(pair));
        }
        name if NAMED_TAGS.contains(&name) => {
            let (types, remainder) = split_types(rest);
            let (param, remainder) = first_word(remainder);
            tag.types = types;
            tag.name = param;
            tag.text = Some(with_body(remainder, body));
        }
        name if TYPED_TAGS.contains(&name) => {
            let (types, remainder) = split_types(rest);
            tag.types = types;
            tag.text = Some(with_body(remainder, body));
        }
        _ => tag.text = Some(with_body(rest, body)),
    }
    tag
}

/// Splits a leading `[A, B]` type list off `text`.
fn split_types(text: &str) -> (Option<Vec<String>>, &str) {
    match TYPES.captures(text) {
        Some(captures) => {
            let types = captures[1]
                .split(',')
                .map(|ty| ty.trim().to_owned())
                .filter(|ty| !ty.is_empty())
                .collect();
            let rest = captures.get(2).map_or("", |rest| rest.as_str());
            (Some(types), rest)
        }
        None => (None, text),
    }
}

fn first_word(text: &str) -> (Option<String>, &str) {
    let text = text.trim_start();
    if text.is_empty() {
        return (None, text);
    }
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (Some(word.to_owned()), rest.trim_start()),
        None => (Some(text.to_owned()), ""),
    }
}

/// `(a, b = 1, *rest)` to `[("a", None), ("b", Some("1")), ("*rest", None)]`.
fn overload_parameters(signature: &str) -> Vec<(String, Option<String>)> {
    let Some(open) = signature.find('(') else {
        return Vec::new();
    };
    let close = signature.rfind(')').unwrap_or(signature.len());
    let inner = signature.get(open + 1..close).unwrap_or_default();
    split_top_level(inner)
        .into_iter()
        .filter(|param| !param.is_empty())
        .map(|param| match param.split_once('=') {
            Some((name, default)) => (name.trim().to_owned(), Some(default.trim().to_owned())),
            None => (param, None),
        })
        .collect()
}

/// Splits on commas that are not nested inside brackets or quotes.
fn split_top_level(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote = None;
    for ch in text.chars() {
        match (quote, ch) {
            (Some(open), _) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(current.trim().to_owned());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    parts.push(current.trim().to_owned());
    parts
}

/// Removes the common leading indentation of `lines` and trims blank edges.
fn dedent(lines: &[String]) -> String {
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    let body: Vec<&str> = lines
        .iter()
        .map(|line| line.get(indent..).unwrap_or_default().trim_end())
        .collect();
    body.join("\n").trim_matches('\n').to_owned()
}

fn with_body(first: &str, body: &[String]) -> String {
    let continuation = body
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    match (first.trim(), continuation.as_str()) {
        (first, "") => first.to_owned(),
        ("", rest) => rest.to_owned(),
        (first, rest) => format!("{first} {rest}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_tags() {
        let doc = Docstring::parse("Adds two numbers.\n\nReturns their sum.");
        assert_eq!(doc.text, "Adds two numbers.\n\nReturns their sum.");
        assert!(doc.tags.is_empty());
    }

    #[test]
    fn indented_lines_continue_a_tag() {
        let doc = Docstring::parse("@param [Integer] n the count\n  of things");
        assert_eq!(doc.tags[0].text.as_deref(), Some("the count of things"));
    }

    #[test]
    fn nested_commas_stay_in_one_parameter() {
        assert_eq!(
            overload_parameters("f(a, b = [1, 2])"),
            vec![("a".to_owned(), None), ("b".to_owned(), Some("[1, 2]".to_owned()))]
        );
    }
}
