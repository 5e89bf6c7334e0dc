//! [`MultiTemplate`]: an optional path template paired with ordered query
//! key/value template pairs, rendered together into a request target
//!.

use super::error::RoutingParseResult;
use super::expr::{split_path_query, split_query_pairs};
use super::safety::validate_rendered_path;
use super::template::{StringTemplate, TemplateValidationContext};
use super::transform::{percent_encode, VariableMap};

#[derive(Debug, Clone)]
pub struct QueryPairTemplate {
    pub key: StringTemplate,
    pub value: StringTemplate,
    pub optional: bool,
}

#[derive(Debug, Clone)]
pub struct MultiTemplate {
    path: Option<StringTemplate>,
    query: Vec<QueryPairTemplate>,
}

impl MultiTemplate {
    pub fn new(path: Option<StringTemplate>, query: Vec<QueryPairTemplate>) -> Self {
        Self { path, query }
    }

    /// Compiles a full template expression — `path{?key=value&…}` (flags
    /// already peeled by the caller) — against a matcher-derived
    /// validation context.
    pub fn compile(expr: &str, ctx: &TemplateValidationContext) -> RoutingParseResult<Self> {
        let (path_part, query_part) = split_path_query(expr);

        let path = if path_part.trim().is_empty() { None } else { Some(StringTemplate::compile(&path_part, ctx)?) };

        let mut query = Vec::new();
        if let Some(query_string) = &query_part {
            for chunk in split_query_pairs(query_string) {
                let (key_expr, value_expr) = chunk;
                let key = StringTemplate::compile(&key_expr, ctx)?;
                let value = StringTemplate::compile(&value_expr, ctx)?;
                let optional = value.has_optional_marker();
                query.push(QueryPairTemplate { key, value, optional });
            }
        }

        Ok(Self { path, query })
    }

    /// Renders the full request target. An optional query pair whose
    /// value renders empty is omitted entirely; a non-optional pair that
    /// renders empty is still emitted as a bare `key=`.
    pub fn render(&self, variables: &VariableMap) -> Result<String, super::error::RoutingError> {
        let mut out = String::new();
        if let Some(path_template) = &self.path {
            // `None` means a non-optional, no-default variable came up
            // empty (e.g. a path-embedded `equals`/`allow`/`only`/unmatched
            // `map` with no `map_default`) — per spec §4.8 that must fail
            // evaluation, not silently render as an empty path segment.
            let Some(rendered) = path_template.render(variables) else {
                return Err(super::error::RoutingError::RenderFailed(
                    "path template variable rendered to no value".to_string(),
                ));
            };
            validate_rendered_path(&rendered)?;
            out.push_str(&rendered);
        }

        let mut pairs = Vec::new();
        for pair in &self.query {
            let Some(key) = pair.key.render(variables) else {
                continue;
            };
            match pair.value.render(variables) {
                Some(value) if value.is_empty() && pair.optional => continue,
                Some(value) => pairs.push((key, value)),
                None if pair.optional => continue,
                None => pairs.push((key, String::new())),
            }
        }

        if !pairs.is_empty() {
            out.push('?');
            // Query values are percent-encoded at render time so a raw
            // capture containing `/`, `?`, `=`, or `&` cannot corrupt the
            // rebuilt query string (spec §4.7).
            let rendered: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={}", percent_encode(v))).collect();
            out.push_str(&rendered.join("&"));
        }

        // Spec §4.7/§8: the final path+query string must never contain
        // the substring ".." anywhere, not only within the path. The
        // `validate_rendered_path` call above is the richer, path-scoped
        // check (control characters, drive letters, segment-wise
        // traversal); this is the blanket guard across the whole output,
        // catching a traversal sequence smuggled through a query value.
        if out.contains("..") {
            return Err(super::error::RoutingError::SafetyViolation(
                "rendered path+query contains '..'".to_string(),
            ));
        }

        Ok(out)
    }
}
