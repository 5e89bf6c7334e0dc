//! Top-level expression splitting shared by matcher and template
//! compilation: separating path from
//! query on an unescaped top-level `?`, then the query string into
//! `&`-separated, `=`-split pairs — all honoring `\{`/`\}`/`\\` escapes and
//! never splitting inside a `{…}` group.

use super::error::{RoutingError, RoutingParseResult};

/// Splits `body` into `(path_part, query_part)` on the first unescaped
/// `?` that appears outside any `{…}` group. Returns `query_part = None`
/// if no such `?` exists.
pub fn split_path_query(body: &str) -> (String, Option<String>) {
    let mut depth = 0i32;
    let mut chars = body.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '{' => depth += 1,
            '}' => depth -= 1,
            '?' if depth == 0 => {
                return (body[..idx].to_string(), Some(body[idx + c.len_utf8()..].to_string()));
            }
            _ => {}
        }
    }
    (body.to_string(), None)
}

/// Splits a query string into ordered raw `(key, value)` chunks on
/// unescaped top-level `&`, then each chunk on the first unescaped
/// top-level `=`. A chunk with no `=` yields an empty value part.
pub fn split_query_pairs(query: &str) -> Vec<(String, String)> {
    split_top_level(query, '&')
        .into_iter()
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| split_first_top_level(&chunk, '='))
        .collect()
}

/// Rejects a query key chunk that contains an unescaped `{` — matcher
/// query keys must be literal text.
pub fn require_literal_key(key: &str) -> RoutingParseResult<()> {
    let mut chars = key.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '{' => return Err(RoutingError::NonLiteralQueryKey),
            _ => {}
        }
    }
    Ok(())
}

fn split_top_level(body: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            current.push(c);
            if let Some(&next) = chars.peek() {
                current.push(next);
                chars.next();
            }
            continue;
        }
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth -= 1;
                current.push(c);
            }
            c if c == separator && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn split_first_top_level(body: &str, separator: char) -> (String, String) {
    let mut depth = 0i32;
    let mut chars = body.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '{' => depth += 1,
            '}' => depth -= 1,
            c if c == separator && depth == 0 => {
                return (body[..idx].to_string(), body[idx + c.len_utf8()..].to_string());
            }
            _ => {}
        }
    }
    (body.to_string(), String::new())
}
