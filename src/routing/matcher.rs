//! The path matcher: a compiled sequence of [`MatchSegment`]s and the
//! single-pass, non-backtracking runtime that matches it against an input
//! string.

use super::boundary::{EndBoundary, StartBoundary};
use super::charclass::CharClassCache;
use super::error::{RoutingError, RoutingParseResult};
use super::segment::{compile_group, MatchSegment};
use indexmap::IndexMap;
use smallvec::SmallVec;

pub type Captures = IndexMap<String, String>;

#[derive(Debug, Clone)]
pub struct MatchExpression {
    segments: Vec<MatchSegment>,
    case_insensitive_literals: bool,
}

impl MatchExpression {
    /// Compiles a matcher body such as `/users/{id:int}/posts/{slug}` into
    /// its segment sequence. Literal runs between `{…}` groups become
    /// non-capturing [`MatchSegment::literal`] entries.
    pub fn compile(
        expr: &str,
        charclasses: &CharClassCache,
        case_insensitive_literals: bool,
    ) -> RoutingParseResult<Self> {
        let mut segments = Vec::new();
        // Most patterns declare only a handful of captures; inline storage
        // avoids a heap allocation for the common case.
        let mut names: SmallVec<[String; 8]> = SmallVec::new();
        let mut literal = String::new();
        let mut chars = expr.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            match c {
                '\\' => {
                    if let Some(&(_, next)) = chars.peek() {
                        if next == '{' || next == '}' || next == '\\' {
                            literal.push(next);
                            chars.next();
                            continue;
                        }
                    }
                    literal.push(c);
                }
                '{' => {
                    if !literal.is_empty() {
                        segments.push(MatchSegment::literal(&std::mem::take(&mut literal)));
                    }
                    let mut body = String::new();
                    let mut depth = 1;
                    let mut closed = false;
                    for (_, gc) in chars.by_ref() {
                        if gc == '{' {
                            depth += 1;
                        } else if gc == '}' {
                            depth -= 1;
                            if depth == 0 {
                                closed = true;
                                break;
                            }
                        }
                        body.push(gc);
                    }
                    if !closed {
                        return Err(RoutingError::UnterminatedGroup(offset));
                    }
                    let segment = compile_group(&body, charclasses, &names)?;
                    if let Some(name) = &segment.capture_name {
                        names.push(name.clone());
                    }
                    segments.push(segment);
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(MatchSegment::literal(&literal));
        }

        validate_chain(&segments)?;

        Ok(Self {
            segments,
            case_insensitive_literals,
        })
    }

    pub fn captures_len(&self) -> usize {
        self.segments.iter().filter(|s| s.capture_name.is_some()).count()
    }

    pub fn capture_names(&self) -> Vec<String> {
        self.segments.iter().filter_map(|s| s.capture_name.clone()).collect()
    }

    /// True iff every segment is explicitly marked optional (`?` /
    /// `optional`) — such a matcher can be satisfied by an absent input
    /// entirely, e.g. a query value matcher for a key that need not be
    /// present at all.
    pub fn is_entirely_optional(&self) -> bool {
        !self.segments.is_empty() && self.segments.iter().all(|s| s.is_optional())
    }

    pub fn optional_capture_names(&self) -> Vec<String> {
        self.segments
            .iter()
            .filter(|s| s.capture_name.is_some() && s.is_optional())
            .filter_map(|s| s.capture_name.clone())
            .collect()
    }

    /// Attempts to match `input` in full. Returns the ordered captures on
    /// success, or `None` on any boundary/condition failure.
    pub fn match_input(&self, input: &str) -> Option<Captures> {
        let bytes = input.as_bytes();
        let mut cursor = 0usize;
        let mut captures = Captures::new();

        let mut idx = 0;
        while idx < self.segments.len() {
            let segment = &self.segments[idx];
            let next = self.segments.get(idx + 1);

            let resolved = resolve_segment(segment, next, bytes, cursor, self.case_insensitive_literals);
            match resolved {
                Some((start, end)) => {
                    let span = std::str::from_utf8(&bytes[start..end]).ok()?;
                    if !segment.conditions.iter().all(|c| c.check(span)) {
                        return None;
                    }
                    if let Some(name) = &segment.capture_name {
                        captures.insert(name.clone(), span.to_string());
                    }
                    cursor = end;
                }
                None => {
                    if segment.is_optional() {
                        idx += 1;
                        continue;
                    }
                    return None;
                }
            }
            idx += 1;
        }

        if cursor != bytes.len() {
            return None;
        }
        Some(captures)
    }
}

/// Ensures no segment with an inherited end boundary is followed by a
/// start boundary that cannot be located by forward scanning — such a
/// chain has no well-defined split point.
fn validate_chain(segments: &[MatchSegment]) -> RoutingParseResult<()> {
    for pair in segments.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        if current.end == EndBoundary::InheritFromNextSegment && !next.start.is_scannable() {
            return Err(RoutingError::NonScannableChain);
        }
    }
    Ok(())
}

/// Resolves the `[start, end)` byte range a single segment occupies at
/// `cursor`, scanning ahead as its boundaries require. Returns `None` if
/// the segment's boundaries cannot be satisfied.
fn resolve_segment(
    segment: &MatchSegment,
    next: Option<&MatchSegment>,
    bytes: &[u8],
    cursor: usize,
    ci: bool,
) -> Option<(usize, usize)> {
    match &segment.start {
        StartBoundary::StartsNow => {
            let start = cursor;
            let end = resolve_end(&segment.end, next, bytes, start)?;
            Some((start, end))
        }
        StartBoundary::FixedLength(n) => {
            let start = cursor;
            let end = start.checked_add(*n)?;
            if end > bytes.len() {
                return None;
            }
            Some((start, end))
        }
        StartBoundary::AtChar(byte) => {
            let found = find_char(bytes, cursor, *byte)?;
            let start = if segment.include_matching_text() { found } else { found + 1 };
            let end = resolve_end(&segment.end, next, bytes, start)?;
            Some((start, end))
        }
        StartBoundary::AtString(needle) if !needle.is_empty() => {
            let found = find_str(bytes, cursor, needle.as_bytes(), false)?;
            let start = if segment.include_matching_text() { found } else { found + needle.len() };
            let end = resolve_end(&segment.end, next, bytes, start)?;
            Some((start, end))
        }
        StartBoundary::AtStringIgnoreCase(needle) if !needle.is_empty() => {
            let found = find_str(bytes, cursor, needle.as_bytes(), true)?;
            let start = if segment.include_matching_text() { found } else { found + needle.len() };
            let end = resolve_end(&segment.end, next, bytes, start)?;
            Some((start, end))
        }
        StartBoundary::AtString(_) | StartBoundary::AtStringIgnoreCase(_) => {
            let start = cursor;
            let end = resolve_end(&segment.end, next, bytes, start)?;
            Some((start, end))
        }
        StartBoundary::EqualsChar(byte) => {
            if bytes.get(cursor) == Some(byte) {
                Some((cursor, cursor + 1))
            } else {
                None
            }
        }
        StartBoundary::EqualsOrdinal(text) => match_one(bytes, cursor, text, ci).map(|end| (cursor, end)),
        StartBoundary::EqualsOrdinalIgnoreCase(text) => {
            match_one(bytes, cursor, text, true).map(|end| (cursor, end))
        }
        StartBoundary::EqualsAny(alternatives) => {
            alternatives.iter().find_map(|alt| match_one(bytes, cursor, alt, ci)).map(|end| (cursor, end))
        }
        StartBoundary::EqualsAnyIgnoreCase(alternatives) => {
            alternatives.iter().find_map(|alt| match_one(bytes, cursor, alt, true)).map(|end| (cursor, end))
        }
    }
}

fn match_one(bytes: &[u8], cursor: usize, text: &str, ci: bool) -> Option<usize> {
    let candidate = text.as_bytes();
    let end = cursor.checked_add(candidate.len())?;
    if end > bytes.len() {
        return None;
    }
    let slice = &bytes[cursor..end];
    let matches = if ci { slice.eq_ignore_ascii_case(candidate) } else { slice == candidate };
    matches.then_some(end)
}

fn resolve_end(end: &EndBoundary, next: Option<&MatchSegment>, bytes: &[u8], start: usize) -> Option<usize> {
    match end {
        EndBoundary::SegmentFullyMatchedByStartBoundary => Some(start),
        EndBoundary::FixedLength(n) => {
            let e = start.checked_add(*n)?;
            if e > bytes.len() {
                None
            } else {
                Some(e)
            }
        }
        EndBoundary::AtChar(byte) => find_char(bytes, start, *byte),
        EndBoundary::AtString(needle) => find_str(bytes, start, needle.as_bytes(), false),
        EndBoundary::InheritFromNextSegment => match next {
            None => Some(bytes.len()),
            Some(next_segment) => match &next_segment.start {
                StartBoundary::AtChar(byte) => find_char(bytes, start, *byte),
                StartBoundary::AtString(needle) => find_str(bytes, start, needle.as_bytes(), false),
                StartBoundary::AtStringIgnoreCase(needle) => find_str(bytes, start, needle.as_bytes(), true),
                StartBoundary::EqualsChar(byte) => find_char(bytes, start, *byte),
                StartBoundary::EqualsOrdinal(needle) => find_str(bytes, start, needle.as_bytes(), false),
                StartBoundary::EqualsOrdinalIgnoreCase(needle) => find_str(bytes, start, needle.as_bytes(), true),
                _ => Some(bytes.len()),
            },
        },
    }
}

fn find_char(bytes: &[u8], from: usize, byte: u8) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == byte).map(|p| from + p)
}

fn find_str(bytes: &[u8], from: usize, needle: &[u8], ci: bool) -> Option<usize> {
    if needle.is_empty() {
        return Some(from);
    }
    if needle.len() > bytes.len().saturating_sub(from) {
        return None;
    }
    (from..=bytes.len() - needle.len()).find(|&i| {
        let window = &bytes[i..i + needle.len()];
        if ci {
            window.eq_ignore_ascii_case(needle)
        } else {
            window == needle
        }
    })
}
