//! Argument Preloader (C8, `spec.md` §4.8).
//!
//! Parses the scanner's `--script-args` string into a key-to-value
//! mapping. The grammar is a flat, comma-separated `key=value` list;
//! values are either a double-quoted string or a bare identifier
//! matching `[A-Za-z0-9_]+`, which is auto-quoted before being stored —
//! mirroring the source's trick of wrapping bare identifiers in quotes
//! before handing the whole thing to its expression evaluator, so that
//! `a=foo,b=bar` is interpreted as `{a:"foo", b:"bar"}` (`spec.md` §4.8).

use std::collections::BTreeMap;

use orion_error::prelude::*;

use crate::error::{ConfigReason, ConfigResult};

/// The parsed `--script-args` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptArgs(BTreeMap<String, String>);

impl ScriptArgs {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Parse a `--script-args` string (`spec.md` §4.8). Empty input yields an
/// empty mapping without error.
pub fn parse_script_args(input: &str) -> ConfigResult<ScriptArgs> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(ScriptArgs::default());
    }

    let mut map = BTreeMap::new();
    let mut chars = input.char_indices().peekable();

    loop {
        skip_ws(&mut chars, input);
        let key = take_ident(&mut chars, input).ok_or_else(|| bad(input, "expected a key"))?;
        skip_ws(&mut chars, input);
        expect_char(&mut chars, input, '=')?;
        skip_ws(&mut chars, input);
        let value = take_value(&mut chars, input)?;
        if map.insert(key.to_string(), value).is_some() {
            return Err(bad(input, &format!("duplicate key '{key}'")));
        }
        skip_ws(&mut chars, input);
        match chars.peek() {
            None => break,
            Some(&(_, ',')) => {
                chars.next();
            }
            Some(&(i, c)) => return Err(bad(input, &format!("unexpected '{c}' at byte {i}"))),
        }
    }

    Ok(ScriptArgs(map))
}

fn bad(input: &str, detail: &str) -> crate::error::ConfigError {
    orion_error::StructError::from(ConfigReason::ScriptArgs)
        .with_detail(format!("malformed --script-args {input:?}: {detail}"))
}

type Chars<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

fn skip_ws(chars: &mut Chars<'_>, _input: &str) {
    while matches!(chars.peek(), Some(&(_, c)) if c.is_whitespace()) {
        chars.next();
    }
}

fn take_ident<'a>(chars: &mut Chars<'_>, input: &'a str) -> Option<&'a str> {
    let start = chars.peek()?.0;
    if !matches!(chars.peek(), Some(&(_, c)) if c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let mut end = start;
    while let Some(&(i, c)) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            end = i + c.len_utf8();
            chars.next();
        } else {
            break;
        }
    }
    Some(&input[start..end])
}

fn expect_char(chars: &mut Chars<'_>, input: &str, expected: char) -> ConfigResult<()> {
    match chars.next() {
        Some((_, c)) if c == expected => Ok(()),
        Some((i, c)) => Err(bad(input, &format!("expected '{expected}' at byte {i}, found '{c}'"))),
        None => Err(bad(input, &format!("expected '{expected}', found end of input"))),
    }
}

/// A value is either a quoted string (`"..."`, with `\"` and `\\`
/// escapes) or a bare identifier, auto-quoted per `spec.md` §4.8.
fn take_value(chars: &mut Chars<'_>, input: &str) -> ConfigResult<String> {
    match chars.peek().copied() {
        Some((_, '"')) => {
            chars.next();
            let mut out = String::new();
            loop {
                match chars.next() {
                    Some((_, '"')) => return Ok(out),
                    Some((_, '\\')) => match chars.next() {
                        Some((_, '"')) => out.push('"'),
                        Some((_, '\\')) => out.push('\\'),
                        Some((_, other)) => out.push(other),
                        None => return Err(bad(input, "unterminated escape in quoted value")),
                    },
                    Some((_, c)) => out.push(c),
                    None => return Err(bad(input, "unterminated quoted value")),
                }
            }
        }
        Some((_, c)) if c.is_ascii_alphanumeric() || c == '_' => take_ident(chars, input)
            .map(str::to_string)
            .ok_or_else(|| bad(input, "expected a value")),
        Some((i, c)) => Err(bad(input, &format!("unexpected '{c}' at byte {i}"))),
        None => Err(bad(input, "expected a value, found end of input")),
    }
}
