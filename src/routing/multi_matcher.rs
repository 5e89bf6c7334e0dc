//! [`MultiValueMatcher`]: a path [`MatchExpression`] paired with a set of
//! query-string matchers, evaluated together against one request target
//!.

use super::charclass::CharClassCache;
use super::error::{RoutingError, RoutingParseResult};
use super::expr::{require_literal_key, split_path_query, split_query_pairs};
use super::flags::{peel_trailing_flags, validate_flag_charset};
use super::matcher::{Captures, MatchExpression};
use indexmap::IndexMap;

#[derive(Debug, Clone, Default)]
pub struct MatcherOptions {
    /// Folds path literal casing (`case-insensitive` / `ci` flag).
    pub case_insensitive: bool,
    /// Whole `path+query` is canonicalized and matched as one string
    /// against `path` (`raw` flag).
    pub raw: bool,
    /// Query pairs are sorted alphabetically by key before raw
    /// canonicalization (`sort-raw` flag, only meaningful with `raw`).
    pub sort_raw: bool,
    /// The path matcher is skipped entirely; only query matchers run
    /// (`ignore-path` flag).
    pub ignore_path: bool,
    /// Any query key present in the input but not declared fails the
    /// match (`query-prohibit-excess` flag).
    pub prohibit_excess_query_keys: bool,
    /// Query key lookup folds ASCII case (`query-keys-ignore-case` flag,
    /// implied by `case-insensitive`).
    pub query_keys_ignore_case: bool,
    /// The request's `Accept` header must mention `image/webp`
    /// (`accept-webp` flag).
    pub accept_webp: bool,
}

#[derive(Debug, Clone)]
pub struct MultiValueMatcher {
    path: Option<MatchExpression>,
    query: IndexMap<String, MatchExpression>,
    options: MatcherOptions,
}

#[derive(Debug, Clone)]
pub struct MultiMatchResult {
    pub success: bool,
    pub captures: Captures,
    pub excess_keys: Vec<String>,
    pub original_query: Option<String>,
    pub error: Option<String>,
}

impl MultiMatchResult {
    fn failure(reason: &str) -> Self {
        Self {
            success: false,
            captures: Captures::new(),
            excess_keys: Vec::new(),
            original_query: None,
            error: Some(reason.to_string()),
        }
    }
}

impl MultiValueMatcher {
    pub fn new(
        path: Option<MatchExpression>,
        query: IndexMap<String, MatchExpression>,
        options: MatcherOptions,
    ) -> Result<Self, RoutingError> {
        if options.raw && options.prohibit_excess_query_keys {
            return Err(RoutingError::RawForbidsProhibitExcess);
        }
        if options.ignore_path && query.is_empty() && !options.raw {
            return Err(RoutingError::IgnorePathRequiresQueryMatcher);
        }
        Ok(Self { path, query, options })
    }

    /// Compiles a full matcher expression — `path{?query}[flags]` — into a
    /// [`MultiValueMatcher`].
    pub fn compile(expr: &str, charclasses: &CharClassCache) -> RoutingParseResult<Self> {
        let (body, raw_flags) = peel_trailing_flags(expr)?;
        validate_flag_charset(&raw_flags)?;

        let mut options = MatcherOptions::default();
        for flag in &raw_flags {
            match flag.to_ascii_lowercase().as_str() {
                "case-insensitive" | "ci" => {
                    options.case_insensitive = true;
                    options.query_keys_ignore_case = true;
                }
                "raw" => options.raw = true,
                "sort-raw" => options.sort_raw = true,
                "ignore-path" => options.ignore_path = true,
                "query-prohibit-excess" => options.prohibit_excess_query_keys = true,
                "query-keys-ignore-case" => options.query_keys_ignore_case = true,
                "accept-webp" => options.accept_webp = true,
                other => return Err(RoutingError::UnknownFlag(other.to_string())),
            }
        }

        if options.raw {
            // Raw mode matches the whole canonicalized path+query string
            // against a single path matcher; the body is never split.
            let compiled = MatchExpression::compile(&body, charclasses, options.case_insensitive)?;
            return Self::new(Some(compiled), IndexMap::new(), options);
        }

        let (path_part, query_part) = split_path_query(&body);
        let mut all_names: Vec<String> = Vec::new();

        let path = if path_part.trim().is_empty() {
            None
        } else {
            let compiled = MatchExpression::compile(&path_part, charclasses, options.case_insensitive)?;
            all_names.extend(compiled.capture_names());
            Some(compiled)
        };

        let mut query = IndexMap::new();
        if let Some(query_string) = &query_part {
            for (key, value) in split_query_pairs(query_string) {
                require_literal_key(&key)?;
                let compiled = MatchExpression::compile(&value, charclasses, options.case_insensitive)?;
                for name in compiled.capture_names() {
                    if all_names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
                        return Err(RoutingError::DuplicateCapture(name));
                    }
                    all_names.push(name);
                }
                query.insert(key, compiled);
            }
        }

        Self::new(path, query, options)
    }

    /// All capture names across the path matcher and every query-value
    /// matcher, in declaration order.
    pub fn capture_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.path.as_ref().map(|p| p.capture_names()).unwrap_or_default();
        for expr in self.query.values() {
            names.extend(expr.capture_names());
        }
        names
    }

    /// Capture names that are explicitly marked optional (`?` /
    /// `optional`) on their segment, across path and query matchers.
    pub fn optional_capture_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.path.as_ref().map(|p| p.optional_capture_names()).unwrap_or_default();
        for expr in self.query.values() {
            names.extend(expr.optional_capture_names());
        }
        names
    }

    pub fn matches(&self, path_and_query: &str, accept_header: Option<&str>) -> MultiMatchResult {
        if self.options.accept_webp {
            let accepts_webp =
                accept_header.map(|h| h.to_ascii_lowercase().contains("image/webp")).unwrap_or(false);
            if !accepts_webp {
                return MultiMatchResult::failure("Accept header does not include image/webp");
            }
        }

        if self.options.raw {
            let canonical = canonicalize_raw(path_and_query, self.options.sort_raw);
            return match &self.path {
                Some(expr) => match expr.match_input(&canonical) {
                    Some(captures) => MultiMatchResult {
                        success: true,
                        captures,
                        excess_keys: Vec::new(),
                        original_query: None,
                        error: None,
                    },
                    None => MultiMatchResult::failure("raw matcher did not match"),
                },
                None => MultiMatchResult::failure("raw mode requires a path matcher"),
            };
        }

        let (path_part, query_part) = split_once_query(path_and_query);

        let mut captures = Captures::new();

        if !self.options.ignore_path {
            if let Some(expr) = &self.path {
                match expr.match_input(path_part) {
                    Some(path_captures) => captures.extend(path_captures),
                    None => return MultiMatchResult::failure("path did not match"),
                }
            }
        }

        let pairs = parse_query(query_part.unwrap_or(""));
        let mut excess_keys = Vec::new();
        let mut seen_keys = std::collections::HashSet::new();

        for (key, value) in &pairs {
            match self.query.iter().find(|(k, _)| {
                if self.options.query_keys_ignore_case {
                    k.eq_ignore_ascii_case(key)
                } else {
                    *k == key
                }
            }) {
                Some((declared_key, expr)) => {
                    seen_keys.insert(declared_key.clone());
                    match expr.match_input(value) {
                        Some(value_captures) => captures.extend(value_captures),
                        None => return MultiMatchResult::failure("query value did not match"),
                    }
                }
                None => excess_keys.push(key.clone()),
            }
        }

        for (required, expr) in &self.query {
            let present = seen_keys.contains(required);
            // A missing key is allowed only if its value matcher is
            // "entirely optional" — it would itself accept an empty
            // string.
            if !present && !expr.is_entirely_optional() {
                return MultiMatchResult::failure("required query key missing");
            }
        }

        if self.options.prohibit_excess_query_keys && !excess_keys.is_empty() {
            return MultiMatchResult {
                success: false,
                captures,
                excess_keys,
                original_query: query_part.map(str::to_string),
                error: Some("excess query keys present".to_string()),
            };
        }

        MultiMatchResult {
            success: true,
            captures,
            excess_keys,
            original_query: query_part.map(str::to_string),
            error: None,
        }
    }
}

fn split_once_query(path_and_query: &str) -> (&str, Option<&str>) {
    match path_and_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_and_query, None),
    }
}

/// Canonicalizes `path+query` for raw-mode matching: rebuilds `key=value`
/// pairs from the input query string, optionally sorting them
/// alphabetically by key.
fn canonicalize_raw(path_and_query: &str, sort: bool) -> String {
    let (path, query) = split_once_query(path_and_query);
    let Some(query) = query else {
        return path.to_string();
    };
    let mut pairs: Vec<(String, String)> = query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect();
    if sort {
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
    }
    let rebuilt: Vec<String> = pairs
        .iter()
        .map(|(k, v)| if v.is_empty() { k.clone() } else { format!("{}={}", k, v) })
        .collect();
    if rebuilt.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, rebuilt.join("&"))
    }
}

/// Splits a query string into ordered `(key, value)` pairs. Values are
/// percent-decoded; keys are not (the matcher treats query keys as
/// plain literals).
fn parse_query(query: &str) -> Vec<(String, String)> {
    if query.is_empty() {
        return Vec::new();
    }
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), percent_decode(v)),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let hi = (bytes[i + 1] as char).to_digit(16);
                let lo = (bytes[i + 2] as char).to_digit(16);
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    out.push((hi * 16 + lo) as u8);
                    i += 3;
                } else {
                    out.push(bytes[i]);
                    i += 1;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
