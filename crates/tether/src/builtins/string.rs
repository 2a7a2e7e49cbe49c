use regex::Regex;

use super::{Arity, TypeDef, TypeKind, int_arg, len_value, normalize_index, str_arg};
use crate::{
    exception::{Exception, RunResult},
    interp::Interp,
    value::Value,
};

pub(super) fn string() -> TypeDef {
    TypeDef {
        includes: &["Comparable"],
        doc: "Immutable UTF-8 text.\n\n\
              Indexes count characters, not bytes. Methods that transform a string\n\
              return a new one.\n\
              @example\n  \"hello\".upcase.reverse # => \"OLLEH\"",
        instance_methods: vec![
            native!("length", "()", Arity::exact(0), string_length, "Number of characters.\n@return [Integer]"),
            native!("size", "()", Arity::exact(0), string_length, "Alias of #length.\n@return [Integer]"),
            native!("empty?", "()", Arity::exact(0), string_is_empty, "@return [Boolean]"),
            native!("upcase", "()", Arity::exact(0), string_upcase, "@return [String]"),
            native!("downcase", "()", Arity::exact(0), string_downcase, "@return [String]"),
            native!(
                "capitalize",
                "()",
                Arity::exact(0),
                string_capitalize,
                "First character upcased, the rest downcased.\n@return [String]",
            ),
            native!("swapcase", "()", Arity::exact(0), string_swapcase, "@return [String]"),
            native!("reverse", "()", Arity::exact(0), string_reverse, "@return [String]"),
            native!("strip", "()", Arity::exact(0), string_strip, "Removes surrounding whitespace.\n@return [String]"),
            native!("lstrip", "()", Arity::exact(0), string_lstrip, "@return [String]"),
            native!("rstrip", "()", Arity::exact(0), string_rstrip, "@return [String]"),
            native!("chomp", "()", Arity::exact(0), string_chomp, "Removes one trailing line terminator.\n@return [String]"),
            native!("chars", "()", Arity::exact(0), string_chars, "@return [List<String>]"),
            native!(
                "lines",
                "()",
                Arity::exact(0),
                string_lines,
                "Splits after each newline, keeping the terminators.\n@return [List<String>]",
            ),
            native!("bytes", "()", Arity::exact(0), string_bytes, "UTF-8 bytes.\n@return [List<Integer>]"),
            native!(
                "split",
                "(separator = nil)",
                Arity::range(0, 1),
                string_split,
                "Splits on +separator+, or on runs of whitespace when it is nil.\n\
                 @param [String, nil] separator\n\
                 @return [List<String>]\n\
                 @example\n  \"a,b,,c\".split(\",\") # => [\"a\", \"b\", \"\", \"c\"]",
            ),
            native!("include?", "(other)", Arity::exact(1), string_include, "@param [String] other\n@return [Boolean]"),
            native!("start_with?", "(prefix)", Arity::exact(1), string_starts_with, "@return [Boolean]"),
            native!("end_with?", "(suffix)", Arity::exact(1), string_ends_with, "@return [Boolean]"),
            native!(
                "index",
                "(needle)",
                Arity::exact(1),
                string_index,
                "Character index of the first occurrence of +needle+.\n@return [Integer, nil]",
            ),
            native!(
                "count",
                "(needle)",
                Arity::exact(1),
                string_count,
                "Number of non-overlapping occurrences of +needle+.\n@return [Integer]",
            ),
            native!(
                "sub",
                "(pattern, replacement)",
                Arity::exact(2),
                string_sub,
                "Replaces the first occurrence of the literal +pattern+.\n@return [String]",
            ),
            native!(
                "gsub",
                "(pattern, replacement)",
                Arity::exact(2),
                string_gsub,
                "Replaces every occurrence of the literal +pattern+.\n@return [String]",
            ),
            native!(
                "match?",
                "(regex)",
                Arity::exact(1),
                string_matches,
                "Tests the receiver against a regular expression.\n\
                 @param [String] regex pattern in `regex` crate syntax\n\
                 @raise [ArgumentError] if the pattern is invalid\n\
                 @return [Boolean]",
            ),
            native!(
                "scan",
                "(regex)",
                Arity::exact(1),
                string_scan,
                "All matches of a regular expression.\n\
                 @param [String] regex\n\
                 @return [List<String>]\n\
                 @example\n  \"a1b22\".scan(\"[0-9]+\") # => [\"1\", \"22\"]",
            ),
            native!(
                "slice",
                "(start, length = 1)",
                Arity::range(1, 2),
                string_slice,
                "Substring of +length+ characters from +start+.\n\
                 @param [Integer] start negative values count from the end\n\
                 @param [Integer] length\n\
                 @return [String, nil] nil when +start+ is out of range",
            ),
            native!("center", "(width, pad = \" \")", Arity::range(1, 2), string_center, "@return [String]"),
            native!("ljust", "(width, pad = \" \")", Arity::range(1, 2), string_ljust, "@return [String]"),
            native!("rjust", "(width, pad = \" \")", Arity::range(1, 2), string_rjust, "@return [String]"),
            native!(
                "to_i",
                "()",
                Arity::exact(0),
                string_to_i,
                "Parses a leading integer, ignoring whitespace; 0 if there is none.\n@return [Integer]",
            ),
            native!(
                "to_f",
                "()",
                Arity::exact(0),
                string_to_f,
                "Parses a leading float; 0.0 if there is none.\n@return [Float]",
            ),
            native!("ord", "()", Arity::exact(0), string_ord, "Code point of the first character.\n@return [Integer]"),
            native!("concat", "(*others)", Arity::at_least(0), string_concat, "@return [String]"),
        ],
        ..TypeDef::new("String", TypeKind::Class, here!())
    }
}

fn this(receiver: &Value) -> RunResult<&str> {
    str_arg(receiver)
}

fn string_length(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(len_value(this(receiver)?.chars().count()))
}

fn string_is_empty(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(this(receiver)?.is_empty()))
}

fn string_upcase(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Str(this(receiver)?.to_uppercase()))
}

fn string_downcase(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Str(this(receiver)?.to_lowercase()))
}

fn string_capitalize(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    let mut chars = this(receiver)?.chars();
    Ok(Value::Str(match chars.next() {
        Some(first) => {
            let mut out: String = first.to_uppercase().collect();
            out.push_str(&chars.as_str().to_lowercase());
            out
        }
        None => String::new(),
    }))
}

fn string_swapcase(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Str(
        this(receiver)?
            .chars()
            .flat_map(|ch| -> Box<dyn Iterator<Item = char>> {
                if ch.is_uppercase() {
                    Box::new(ch.to_lowercase())
                } else {
                    Box::new(ch.to_uppercase())
                }
            })
            .collect(),
    ))
}

fn string_reverse(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Str(this(receiver)?.chars().rev().collect()))
}

fn string_strip(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::from(this(receiver)?.trim()))
}

fn string_lstrip(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::from(this(receiver)?.trim_start()))
}

fn string_rstrip(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::from(this(receiver)?.trim_end()))
}

fn string_chomp(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    let text = this(receiver)?;
    let text = text
        .strip_suffix("\r\n")
        .or_else(|| text.strip_suffix('\n'))
        .or_else(|| text.strip_suffix('\r'))
        .unwrap_or(text);
    Ok(Value::from(text))
}

fn string_chars(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::List(
        this(receiver)?.chars().map(|ch| Value::Str(ch.to_string())).collect(),
    ))
}

fn string_lines(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::List(this(receiver)?.split_inclusive('\n').map(Value::from).collect()))
}

fn string_bytes(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    Ok(Value::List(
        this(receiver)?.bytes().map(|byte| Value::Int(i64::from(byte))).collect(),
    ))
}

fn string_split(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let text = this(receiver)?;
    let parts: Vec<Value> = match args.first() {
        None | Some(Value::Nil) => text.split_whitespace().map(Value::from).collect(),
        Some(separator) => {
            let separator = str_arg(separator)?;
            if separator.is_empty() {
                text.chars().map(|ch| Value::Str(ch.to_string())).collect()
            } else {
                text.split(separator).map(Value::from).collect()
            }
        }
    };
    Ok(Value::List(parts))
}

fn string_include(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(this(receiver)?.contains(str_arg(&args[0])?)))
}

fn string_starts_with(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(this(receiver)?.starts_with(str_arg(&args[0])?)))
}

fn string_ends_with(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    Ok(Value::Bool(this(receiver)?.ends_with(str_arg(&args[0])?)))
}

fn string_index(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let text = this(receiver)?;
    Ok(text
        .find(str_arg(&args[0])?)
        .map_or(Value::Nil, |byte| len_value(text[..byte].chars().count())))
}

fn string_count(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let needle = str_arg(&args[0])?;
    if needle.is_empty() {
        return Ok(Value::Int(0));
    }
    Ok(len_value(this(receiver)?.matches(needle).count()))
}

fn string_sub(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let (pattern, replacement) = (str_arg(&args[0])?, str_arg(&args[1])?);
    Ok(Value::Str(this(receiver)?.replacen(pattern, replacement, 1)))
}

fn string_gsub(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let (pattern, replacement) = (str_arg(&args[0])?, str_arg(&args[1])?);
    if pattern.is_empty() {
        return Ok(receiver.clone());
    }
    Ok(Value::Str(this(receiver)?.replace(pattern, replacement)))
}

fn compile(pattern: &str) -> RunResult<Regex> {
    Regex::new(pattern).map_err(|err| Exception::argument_error(format!("invalid regex {pattern:?}: {err}")))
}

fn string_matches(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let regex = compile(str_arg(&args[0])?)?;
    Ok(Value::Bool(regex.is_match(this(receiver)?)))
}

fn string_scan(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let regex = compile(str_arg(&args[0])?)?;
    Ok(Value::List(
        regex
            .find_iter(this(receiver)?)
            .map(|found| Value::from(found.as_str()))
            .collect(),
    ))
}

fn string_slice(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let chars: Vec<char> = this(receiver)?.chars().collect();
    let start = int_arg(&args[0])?;
    let length = match args.get(1) {
        Some(length) => int_arg(length)?,
        None => 1,
    };
    let Ok(length) = usize::try_from(length) else {
        return Ok(Value::Nil);
    };
    // slicing at the very end yields an empty string
    let start = if start == chars.len() as i64 {
        Some(chars.len())
    } else {
        normalize_index(start, chars.len())
    };
    Ok(start.map_or(Value::Nil, |start| {
        Value::Str(chars[start..].iter().take(length).collect())
    }))
}

enum Justify {
    Left,
    Right,
    Center,
}

fn justify(receiver: &Value, args: &[Value], how: Justify) -> RunResult<Value> {
    let text = this(receiver)?;
    let width = usize::try_from(int_arg(&args[0])?).unwrap_or(0);
    let pad: Vec<char> = match args.get(1) {
        Some(pad) => str_arg(pad)?.chars().collect(),
        None => vec![' '],
    };
    if pad.is_empty() {
        return Err(Exception::argument_error("zero width padding"));
    }
    let len = text.chars().count();
    if width <= len {
        return Ok(receiver.clone());
    }
    let total = width - len;
    let (left, right) = match how {
        Justify::Left => (0, total),
        Justify::Right => (total, 0),
        Justify::Center => (total / 2, total - total / 2),
    };
    let padding = |count: usize| -> String { pad.iter().cycle().take(count).collect() };
    Ok(Value::Str(format!("{}{text}{}", padding(left), padding(right))))
}

fn string_center(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    justify(receiver, &args, Justify::Center)
}

fn string_ljust(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    justify(receiver, &args, Justify::Left)
}

fn string_rjust(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    justify(receiver, &args, Justify::Right)
}

/// Longest prefix of `text` (after leading whitespace) accepted by `accept`.
fn numeric_prefix(text: &str, accept: impl Fn(usize, char, &str) -> bool) -> &str {
    let text = text.trim_start();
    let end = text
        .char_indices()
        .find(|(index, ch)| !accept(*index, *ch, &text[..*index]))
        .map_or(text.len(), |(index, _)| index);
    &text[..end]
}

fn string_to_i(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    let digits = numeric_prefix(this(receiver)?, |index, ch, _| {
        ch.is_ascii_digit() || (index == 0 && (ch == '-' || ch == '+'))
    });
    Ok(Value::Int(digits.parse().unwrap_or(0)))
}

fn string_to_f(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    let digits = numeric_prefix(this(receiver)?, |index, ch, seen| {
        ch.is_ascii_digit() || (index == 0 && (ch == '-' || ch == '+')) || (ch == '.' && !seen.contains('.'))
    });
    Ok(Value::Float(digits.trim_end_matches('.').parse().unwrap_or(0.0)))
}

fn string_ord(_: &mut Interp<'_>, receiver: &Value, _: Vec<Value>) -> RunResult<Value> {
    this(receiver)?
        .chars()
        .next()
        .map(|ch| Value::Int(i64::from(u32::from(ch))))
        .ok_or_else(|| Exception::argument_error("empty string"))
}

fn string_concat(_: &mut Interp<'_>, receiver: &Value, args: Vec<Value>) -> RunResult<Value> {
    let mut text = this(receiver)?.to_owned();
    for arg in &args {
        text.push_str(str_arg(arg)?);
    }
    Ok(Value::Str(text))
}
