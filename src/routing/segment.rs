//! [`MatchSegment`]: a compiled unit of a matcher expression — a start
//! boundary, an end boundary, an optional capture name, and post-capture
//! conditions.

use super::boundary::{BoundaryFlags, EndBoundary, StartBoundary};
use super::charclass::{CharClass, CharClassCache};
use super::condition::{BoundaryKeyword, Condition};
use super::error::{RoutingError, RoutingParseResult};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct MatchSegment {
    pub capture_name: Option<String>,
    pub start: StartBoundary,
    pub end: EndBoundary,
    pub flags: BoundaryFlags,
    pub conditions: Vec<Condition>,
}

impl MatchSegment {
    /// A non-capturing segment that must exactly match `text` at the
    /// cursor — used for the literal runs between `{…}` groups.
    pub fn literal(text: &str) -> Self {
        Self {
            capture_name: None,
            start: StartBoundary::EqualsOrdinal(text.to_string()),
            end: EndBoundary::SegmentFullyMatchedByStartBoundary,
            flags: BoundaryFlags::empty(),
            conditions: Vec::new(),
        }
    }

    pub fn is_optional(&self) -> bool {
        self.flags.contains(BoundaryFlags::IS_OPTIONAL)
    }

    pub fn include_matching_text(&self) -> bool {
        self.flags.contains(BoundaryFlags::INCLUDE_MATCHING_TEXT_IN_VARIABLE)
    }
}

/// Splits `body` on unescaped top-level `:` into fields, honoring `\:`
/// and `\\` escapes.
fn split_fields(body: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if next == ':' || next == '\\' {
                    current.push(next);
                    chars.next();
                    continue;
                }
            }
            current.push(c);
            continue;
        }
        if c == ':' {
            fields.push(std::mem::take(&mut current));
            continue;
        }
        current.push(c);
    }
    fields.push(current);
    fields
}

/// Splits a condition token like `range(1,10)` or `allow([a-z])` into its
/// name and argument list. Arguments are split on `,` by default, or on
/// `|` when `use_pipe` is set (the `equals`/`starts-with`/etc. list
/// conditions), honoring `\,`/`\|`/`\(`/`\)`/`\\` escapes.
fn split_name_and_args(token: &str) -> (String, Vec<String>) {
    let Some(open) = token.find('(') else {
        return (token.to_string(), Vec::new());
    };
    if !token.ends_with(')') {
        return (token.to_string(), Vec::new());
    }
    let name = token[..open].to_string();
    let inner = &token[open + 1..token.len() - 1];
    let use_pipe = inner.contains('|') && !inner.contains(',');
    let separator = if use_pipe { '|' } else { ',' };
    let mut args = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                current.push(next);
                chars.next();
                continue;
            }
        }
        if c == separator {
            args.push(std::mem::take(&mut current));
            continue;
        }
        current.push(c);
    }
    args.push(current);
    (name, args)
}

/// Compiles the contents of a `{…}` group (without the braces) into a
/// [`MatchSegment`]. `has_next` tells the compiler whether a following
/// segment exists, which decides the default end boundary.
pub fn compile_group(
    body: &str,
    charclasses: &CharClassCache,
    existing_names: &[String],
) -> RoutingParseResult<MatchSegment> {
    let fields = split_fields(body);
    let mut idx = 0;
    let mut capture_name = None;
    let mut glob_all = false;
    let mut glob_single = false;

    if let Some(first) = fields.first() {
        if first == "*" {
            glob_single = true;
            idx = 1;
        } else if first == "**" {
            glob_all = true;
            idx = 1;
        } else if first.is_empty() {
            idx = 1;
        } else if BoundaryKeyword::from_str(first.as_str()).is_ok()
            || first.starts_with('?')
            || first == "optional"
        {
            // Unnamed: the first field is itself a boundary keyword or
            // optionality marker, not a capture name.
        } else {
            capture_name = Some(first.clone());
            idx = 1;
        }
    }

    if let Some(name) = &capture_name {
        if existing_names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            return Err(RoutingError::DuplicateCapture(name.clone()));
        }
    }

    let mut flags = BoundaryFlags::empty();
    let mut start: Option<StartBoundary> = None;
    let mut end: Option<EndBoundary> = None;
    let mut conditions = Vec::new();
    let mut saw_equals = false;

    for field in &fields[idx..] {
        if field.is_empty() {
            continue;
        }
        if field == "?" || field == "optional" {
            flags.insert(BoundaryFlags::IS_OPTIONAL);
            continue;
        }
        if field == "*" {
            // Non-slash-capturing glob modifier on a named capture, e.g.
            // `{name:*}` — restrict the span to exclude `/`.
            conditions.push(Condition::Allow(Arc::new(CharClass::parse("^/")?)));
            continue;
        }
        if field == "**" {
            // Slash-capturing glob modifier, e.g. `{name:**}` — no
            // restriction; the span may include `/`.
            continue;
        }

        let (raw_name, args) = split_name_and_args(field);
        let (base_name, ci) = if let Some(stripped) = raw_name.strip_suffix("-i") {
            (stripped.to_string(), true)
        } else {
            (raw_name.clone(), false)
        };
        let lname = base_name.to_ascii_lowercase();

        if args.is_empty() {
            if let Ok(keyword) = BoundaryKeyword::from_str(lname.as_str()) {
                if saw_equals {
                    return Err(RoutingError::EqualsCombinedWithOtherBoundary);
                }
                match keyword {
                    BoundaryKeyword::Equals => {
                        return Err(RoutingError::InvalidCharClass(
                            "equals requires an argument list".to_string(),
                        ));
                    }
                    BoundaryKeyword::StartsWith => {
                        start = Some(StartBoundary::AtString(String::new()));
                        flags.insert(BoundaryFlags::INCLUDE_MATCHING_TEXT_IN_VARIABLE);
                    }
                    BoundaryKeyword::Prefix => {
                        start = Some(StartBoundary::AtString(String::new()));
                    }
                    BoundaryKeyword::EndsWith => {
                        end = Some(EndBoundary::AtString(String::new()));
                        flags.insert(BoundaryFlags::INCLUDE_MATCHING_TEXT_IN_VARIABLE | BoundaryFlags::IS_ENDING);
                    }
                    BoundaryKeyword::Suffix => {
                        end = Some(EndBoundary::AtString(String::new()));
                        flags.insert(BoundaryFlags::IS_ENDING);
                    }
                }
                continue;
            }
        } else if (lname == "length" || lname == "len") && args.len() == 1 {
            // A single numeric argument sets a fixed-length end boundary;
            // two arguments (below, via Condition::parse) instead
            // validate a captured span's length range.
            if let Ok(n) = args[0].parse::<usize>() {
                end = Some(EndBoundary::FixedLength(n));
                continue;
            }
        } else if lname == "equals" {
            if start.is_some() || end.is_some() {
                return Err(RoutingError::EqualsCombinedWithOtherBoundary);
            }
            saw_equals = true;
            start = Some(if ci {
                StartBoundary::EqualsAnyIgnoreCase(args.clone())
            } else {
                StartBoundary::EqualsAny(args.clone())
            });
            end = Some(EndBoundary::SegmentFullyMatchedByStartBoundary);
            continue;
        } else if lname == "starts-with" || lname == "starts_with" {
            // With arguments this is a post-boundary condition (spec §4.5),
            // validated once the capture span is known — unlike the bare
            // `starts-with`/`starts`/`prefix` boundary keyword above, it
            // must not also narrow the start boundary to the first
            // alternative, or segments matching a later alternative would
            // never be scanned for. Symmetric with `ends-with` below.
            conditions.push(Condition::parse(&lname, ci, &args, charclasses)?);
            continue;
        }

        conditions.push(Condition::parse(&lname, ci, &args, charclasses)?);
    }

    if glob_single {
        conditions.push(Condition::Allow(Arc::new(CharClass::parse("^/")?)));
    }
    let _ = glob_all;

    let start = start.unwrap_or(StartBoundary::StartsNow);
    let end = end.unwrap_or(EndBoundary::InheritFromNextSegment);

    Ok(MatchSegment {
        capture_name,
        start,
        end,
        flags,
        conditions,
    })
}
