//! Post-capture conditions and the bare boundary keywords they share a
//! lexical space with. Boundary keywords (`equals`/`eq`,
//! `starts-with`/`starts`, `prefix`, `ends-with`/`ends`, `suffix`) decide a
//! segment's [`super::boundary::StartBoundary`]/[`super::boundary::EndBoundary`];
//! everything else in this file is a post-boundary validator evaluated
//! against the already-captured span.

use super::charclass::{CharClass, CharClassCache};
use super::error::{RoutingError, RoutingParseResult};
use std::sync::Arc;
use strum_macros::EnumString;

/// Bare (argument-less) tokens that set a segment's start/end boundary
/// rather than validate its content. Parsed via `strum`'s alias table the
/// way the wider example pack derives enum-from-string parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
pub enum BoundaryKeyword {
    #[strum(serialize = "equals", serialize = "eq")]
    Equals,
    #[strum(serialize = "starts-with", serialize = "starts", serialize = "starts_with")]
    StartsWith,
    #[strum(serialize = "prefix")]
    Prefix,
    #[strum(serialize = "ends-with", serialize = "ends", serialize = "ends_with")]
    EndsWith,
    #[strum(serialize = "suffix")]
    Suffix,
}

/// A post-capture validator. Conditions gate the match even for optional
/// segments: an optional segment that matched its boundary but fails a
/// condition fails the whole expression rather than being skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Alpha,
    AlphaLower,
    AlphaUpper,
    Alphanumeric,
    Hex,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Guid,
    Range { min: Option<i64>, max: Option<i64> },
    Length { min: usize, max: usize },
    Equals { values: Vec<String>, ci: bool },
    StartsWith { values: Vec<String>, ci: bool },
    EndsWith { values: Vec<String>, ci: bool },
    Contains { values: Vec<String>, ci: bool },
    Allow(Arc<CharClass>),
    StartsWithChars(usize, Arc<CharClass>),
}

impl Condition {
    pub fn check(&self, value: &str) -> bool {
        match self {
            Condition::Alpha => value.bytes().all(|b| b.is_ascii_alphabetic()) && !value.is_empty(),
            Condition::AlphaLower => value.bytes().all(|b| b.is_ascii_lowercase()) && !value.is_empty(),
            Condition::AlphaUpper => value.bytes().all(|b| b.is_ascii_uppercase()) && !value.is_empty(),
            Condition::Alphanumeric => value.bytes().all(|b| b.is_ascii_alphanumeric()) && !value.is_empty(),
            Condition::Hex => !value.is_empty() && value.bytes().all(|b| b.is_ascii_hexdigit()),
            Condition::Int32 => value.parse::<i32>().is_ok(),
            Condition::Int64 => value.parse::<i64>().is_ok(),
            Condition::Uint32 => value.parse::<u32>().is_ok(),
            Condition::Uint64 => value.parse::<u64>().is_ok(),
            Condition::Guid => is_guid(value),
            Condition::Range { min, max } => match value.parse::<i64>() {
                Ok(n) => min.map_or(true, |m| n >= m) && max.map_or(true, |m| n <= m),
                Err(_) => false,
            },
            Condition::Length { min, max } => {
                let len = value.chars().count();
                len >= *min && len <= *max
            }
            Condition::Equals { values, ci } => matches_any(value, values, *ci, |v, candidate| v == candidate),
            Condition::StartsWith { values, ci } => {
                matches_any(value, values, *ci, |v, candidate| v.starts_with(candidate))
            }
            Condition::EndsWith { values, ci } => {
                matches_any(value, values, *ci, |v, candidate| v.ends_with(candidate))
            }
            Condition::Contains { values, ci } => {
                matches_any(value, values, *ci, |v, candidate| v.contains(candidate))
            }
            Condition::Allow(class) => !value.is_empty() && value.bytes().all(|b| class.contains(b)),
            Condition::StartsWithChars(n, class) => {
                value.as_bytes().iter().take(*n).all(|&b| class.contains(b))
            }
        }
    }

    /// Parses a post-boundary condition token. `name` is already
    /// lowercased and has any trailing `-i` suffix stripped (reflected in
    /// `ci`); `args` is the token's already-split, unescaped argument list
    /// (empty for argument-less conditions).
    pub fn parse(
        name: &str,
        ci: bool,
        args: &[String],
        charclasses: &CharClassCache,
    ) -> RoutingParseResult<Self> {
        match name {
            "alpha" => Ok(Condition::Alpha),
            "alpha-lower" | "alpha_lower" => Ok(Condition::AlphaLower),
            "alpha-upper" | "alpha_upper" => Ok(Condition::AlphaUpper),
            "alphanumeric" => Ok(Condition::Alphanumeric),
            "hex" => Ok(Condition::Hex),
            "int32" | "int" | "i32" => Ok(Condition::Int32),
            "int64" | "i64" | "long" => Ok(Condition::Int64),
            "uint32" => Ok(Condition::Uint32),
            "uint64" => Ok(Condition::Uint64),
            "guid" => Ok(Condition::Guid),
            "range" => {
                let min = args.first().filter(|s| !s.is_empty()).map(|s| parse_i64(s)).transpose()?;
                let max = args.get(1).filter(|s| !s.is_empty()).map(|s| parse_i64(s)).transpose()?;
                Ok(Condition::Range { min, max })
            }
            "length" | "len" => {
                let min = parse_usize(args.first().ok_or_else(|| {
                    RoutingError::InvalidIntegerArgument("length requires at least one argument".to_string())
                })?)?;
                let max = match args.get(1) {
                    Some(s) => parse_usize(s)?,
                    None => min,
                };
                Ok(Condition::Length { min, max })
            }
            "equals" => Ok(Condition::Equals { values: args.to_vec(), ci }),
            "starts-with" | "starts_with" => Ok(Condition::StartsWith { values: args.to_vec(), ci }),
            "ends-with" | "ends_with" => Ok(Condition::EndsWith { values: args.to_vec(), ci }),
            "contains" => Ok(Condition::Contains { values: args.to_vec(), ci }),
            "allow" => {
                let pattern = args.first().ok_or_else(|| {
                    RoutingError::InvalidCharClass("allow() requires a character class argument".to_string())
                })?;
                Ok(Condition::Allow(charclasses.intern(strip_brackets(pattern))?))
            }
            "starts-with-chars" | "starts_with_chars" => {
                let n = parse_usize(args.first().ok_or_else(|| {
                    RoutingError::InvalidIntegerArgument("starts-with-chars requires a count argument".to_string())
                })?)?;
                let pattern = args.get(1).ok_or_else(|| {
                    RoutingError::InvalidCharClass(
                        "starts-with-chars() requires a character class argument".to_string(),
                    )
                })?;
                Ok(Condition::StartsWithChars(n, charclasses.intern(strip_brackets(pattern))?))
            }
            other => Err(RoutingError::UnknownCondition(other.to_string())),
        }
    }
}

fn strip_brackets(pattern: &str) -> &str {
    pattern.strip_prefix('[').and_then(|p| p.strip_suffix(']')).unwrap_or(pattern)
}

fn parse_i64(s: &str) -> RoutingParseResult<i64> {
    s.parse::<i64>().map_err(|_| RoutingError::InvalidIntegerArgument(s.to_string()))
}

fn parse_usize(s: &str) -> RoutingParseResult<usize> {
    s.parse::<usize>().map_err(|_| RoutingError::InvalidIntegerArgument(s.to_string()))
}

fn matches_any(value: &str, candidates: &[String], ci: bool, f: impl Fn(&str, &str) -> bool) -> bool {
    if ci {
        let lowered = value.to_ascii_lowercase();
        candidates.iter().any(|c| f(&lowered, &c.to_ascii_lowercase()))
    } else {
        candidates.iter().any(|c| f(value, c))
    }
}

fn is_guid(value: &str) -> bool {
    let parts: Vec<&str> = value.split('-').collect();
    let expected_lengths = [8, 4, 4, 4, 12];
    if parts.len() != 5 {
        return false;
    }
    parts
        .iter()
        .zip(expected_lengths)
        .all(|(part, len)| part.len() == len && part.bytes().all(|b| b.is_ascii_hexdigit()))
}
