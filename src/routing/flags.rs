//! Trailing flag-block lexing shared by matcher and template expressions
//!: a `[a,b,c]` block glued to the end of
//! an expression, possibly repeated, peeled off before the remaining body
//! is split into literal/group chunks.

use super::error::{RoutingError, RoutingParseResult};

/// Splits unescaped top-level `[...]` flag blocks off the end of `expr`,
/// recursing while another trailing block remains. Returns the body with
/// all trailing blocks removed and the flags in the order they appeared,
/// left to right.
pub fn peel_trailing_flags(expr: &str) -> RoutingParseResult<(String, Vec<String>)> {
    let mut body = expr.to_string();
    let mut collected: Vec<Vec<String>> = Vec::new();

    loop {
        let Some((rest, block)) = peel_one(&body) else {
            break;
        };
        collected.push(block);
        body = rest;
    }

    collected.reverse();
    let flags = collected.into_iter().flatten().collect();
    Ok((body, flags))
}

/// Peels exactly one trailing `[...]` block, honoring `\[`/`\]`/`\\`
/// escapes inside it. Returns `None` if `expr` does not end with an
/// unescaped `]` whose matching unescaped `[` can be found.
fn peel_one(expr: &str) -> Option<(String, Vec<String>)> {
    let trimmed = expr.trim_end();
    if !trimmed.ends_with(']') {
        return None;
    }
    let chars: Vec<char> = trimmed.chars().collect();
    let mut i = chars.len() - 1;
    let mut depth = 1i32;
    let close = i;
    loop {
        if i == 0 {
            return None;
        }
        i -= 1;
        let escaped = i > 0 && chars[i - 1] == '\\';
        if escaped {
            continue;
        }
        match chars[i] {
            ']' => depth += 1,
            '[' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }
    let open = i;
    let inside: String = chars[open + 1..close].iter().collect();
    let rest: String = chars[..open].iter().collect();
    let flags = split_flags(&inside);
    Some((rest, flags))
}

fn split_flags(inside: &str) -> Vec<String> {
    let mut flags = Vec::new();
    let mut current = String::new();
    let mut chars = inside.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                current.push(next);
                chars.next();
                continue;
            }
        }
        if c == ',' {
            flags.push(std::mem::take(&mut current));
            continue;
        }
        current.push(c);
    }
    if !current.is_empty() || !flags.is_empty() {
        flags.push(current);
    }
    flags.into_iter().map(|f| f.trim().to_string()).filter(|f| !f.is_empty()).collect()
}

/// Validates each flag against the canonical charset: ASCII letters,
/// digits, `-`, and `_` only; provider/version flags further constrain
/// the shape at the engine layer.
pub fn validate_flag_charset(flags: &[String]) -> RoutingParseResult<()> {
    for flag in flags {
        if flag.is_empty()
            || !flag.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'=' || b == b':')
        {
            return Err(RoutingError::UnknownFlag(flag.clone()));
        }
    }
    Ok(())
}
