//! Template value transformations: the chain of operations
//! applied to a captured matcher variable before it is written into a
//! rendered template segment.

use super::error::{RoutingError, RoutingParseResult};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformation {
    Lower,
    Upper,
    Encode,
    /// `map(a,b,c,d,…)`: consecutive `(from,to)` pairs, first ordinal match
    /// wins. Sets the per-segment `map_matched` flag `map_default` consults.
    Map(Vec<(String, String)>),
    /// `map_default(x)`: if no prior `map` in the same segment's chain
    /// matched, produce `x`; otherwise passthrough the mapped value
    /// unchanged. Looks only at the `map_matched` flag, not the current
    /// value — handled specially in `render_variable`.
    MapDefault(String),
    Default(String),
    OrVar(String),
    /// `equals(a|b|c)`: passes the value through unchanged if it equals
    /// (ordinal) one of the alternatives, else drops it. Note this reuses
    /// the *name* `equals` from the matcher condition alias table, but it
    /// is a distinct, template-side operation with different semantics.
    Equals(Vec<String>),
    /// `allow(a,b,c)` / `only(a,b,c)`: passes the value through if it is
    /// in the list, case-insensitively, else drops it. The two names are
    /// synonyms in the reference behavior.
    Allow(Vec<String>),
    Only(Vec<String>),
    Optional,
}

impl Transformation {
    /// Parses a single `|name(args)` transformation token. `args` is
    /// already split on unescaped top-level commas.
    pub fn parse(name: &str, args: &[String]) -> RoutingParseResult<Self> {
        match name {
            "lower" => Ok(Transformation::Lower),
            "upper" => Ok(Transformation::Upper),
            "encode" => Ok(Transformation::Encode),
            "optional" | "?" => Ok(Transformation::Optional),
            "default" => Ok(Transformation::Default(args.first().cloned().unwrap_or_default())),
            "or_var" | "or" => {
                Ok(Transformation::OrVar(args.first().cloned().ok_or_else(|| {
                    RoutingError::UnknownTransformation("or_var requires a variable name".to_string())
                })?))
            }
            "map" => Ok(Transformation::Map(parse_pairs(args))),
            "map_default" => Ok(Transformation::MapDefault(args.first().cloned().unwrap_or_default())),
            "equals" => {
                if args.is_empty() {
                    return Err(RoutingError::UnknownTransformation(
                        "equals requires at least one alternative".to_string(),
                    ));
                }
                Ok(Transformation::Equals(args.to_vec()))
            }
            "allow" => {
                if args.is_empty() {
                    return Err(RoutingError::UnknownTransformation(
                        "allow requires at least one alternative".to_string(),
                    ));
                }
                Ok(Transformation::Allow(args.to_vec()))
            }
            "only" => Ok(Transformation::Only(args.to_vec())),
            other => Err(RoutingError::UnknownTransformation(other.to_string())),
        }
    }

    /// Applies this transformation to `value`. Returns `None` when the
    /// value should be dropped entirely (an unmatched `map` with no
    /// default, for instance).
    pub fn apply(&self, value: Option<&str>) -> Option<String> {
        match self {
            Transformation::Lower => value.map(|v| v.to_ascii_lowercase()),
            Transformation::Upper => value.map(|v| v.to_ascii_uppercase()),
            Transformation::Encode => value.map(|v| percent_encode(v)),
            Transformation::Optional => value.map(str::to_string),
            Transformation::Default(fallback) => {
                Some(value.filter(|v| !v.is_empty()).map(str::to_string).unwrap_or_else(|| fallback.clone()))
            }
            Transformation::OrVar(_) => value.map(str::to_string),
            Transformation::Map(pairs) => {
                let v = value?;
                pairs.iter().find(|(k, _)| k == v).map(|(_, v)| v.clone())
            }
            // Handled specially in `render_variable`, which needs the
            // chain's `map_matched` state rather than just the current value.
            Transformation::MapDefault(fallback) => Some(fallback.clone()),
            Transformation::Equals(alternatives) => {
                let v = value?;
                alternatives.iter().any(|a| a == v).then(|| v.to_string())
            }
            Transformation::Allow(allowed) => {
                let v = value?;
                allowed.iter().any(|a| a.eq_ignore_ascii_case(v)).then(|| v.to_string())
            }
            Transformation::Only(allowed) => {
                let v = value?;
                allowed.iter().any(|a| a.eq_ignore_ascii_case(v)).then(|| v.to_string())
            }
        }
    }

    /// The variable name an `or_var` transformation falls back to, when
    /// this transformation's own value is empty.
    pub fn fallback_variable(&self) -> Option<&str> {
        match self {
            Transformation::OrVar(name) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn is_optional_marker(&self) -> bool {
        matches!(self, Transformation::Optional)
    }
}

/// Groups `map`'s flat argument list into consecutive `(from, to)` pairs,
/// per spec §4.7: `map(a,b,c,d)` is the pair list `[(a,b), (c,d)]`. A
/// trailing unpaired argument is dropped.
fn parse_pairs(args: &[String]) -> Vec<(String, String)> {
    args.chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect()
}

/// Percent-encoding for template output: preserves unreserved characters,
/// encodes everything else as `%XX`.
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

pub type VariableMap = HashMap<String, String>;
