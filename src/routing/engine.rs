//! [`RoutingExpressionEngine`]: pairs a compiled [`MultiValueMatcher`]
//! with a compiled [`MultiTemplate`], parsing the combined
//! `matcher_expr => template_expr [flags]` grammar and evaluating it
//! against a request target.

use super::charclass::CharClassCache;
use super::error::{RoutingError, RoutingParseResult};
use super::flags::{peel_trailing_flags, validate_flag_charset};
use super::multi_matcher::MultiValueMatcher;
use super::multi_template::MultiTemplate;
use super::template::TemplateValidationContext;
use crate::config::RoutingConfig;
use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// The only syntax versions this engine accepts in a routing expression's
/// mandatory `vN` flag. Absent or out-of-range versions are rejected with
/// a migration message.
pub const SUPPORTED_SYNTAX_VERSIONS: RangeInclusive<u32> = 1..=1;

/// The `provider=<name>` flag carried by a routing expression's template
/// side, identifying which storage/provider tier this route targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderInfo {
    pub name: Option<String>,
}

/// A compiled `(MultiValueMatcher, MultiTemplate, Option<ProviderInfo>)`
/// triple, ready to evaluate against request targets.
#[derive(Debug, Clone)]
pub struct ParsedRoutingExpression {
    matcher: MultiValueMatcher,
    template: MultiTemplate,
    provider: ProviderInfo,
    syntax_version: u32,
}

impl ParsedRoutingExpression {
    pub fn provider(&self) -> &ProviderInfo {
        &self.provider
    }

    pub fn syntax_version(&self) -> u32 {
        self.syntax_version
    }
}

/// The outcome of evaluating a [`ParsedRoutingExpression`] against a
/// request target. A successfully *compiled* expression that simply fails
/// to match is `NotFound`, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingResult {
    Found { rewritten_path_and_query: String, provider: ProviderInfo },
    NotFound,
}

/// Compiles and evaluates routing expressions. Holds a shared, bounded
/// character-class interning cache so repeated compiles reuse compiled
/// classes.
#[derive(Clone)]
pub struct RoutingExpressionEngine {
    charclasses: Arc<CharClassCache>,
    supported_versions: RangeInclusive<u32>,
}

impl Default for RoutingExpressionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingExpressionEngine {
    pub fn new() -> Self {
        Self {
            charclasses: Arc::new(CharClassCache::default()),
            supported_versions: SUPPORTED_SYNTAX_VERSIONS,
        }
    }

    pub fn with_charclass_cache(cache: Arc<CharClassCache>) -> Self {
        Self { charclasses: cache, supported_versions: SUPPORTED_SYNTAX_VERSIONS }
    }

    /// Builds an engine whose accepted `vN` range comes from `config`
    /// rather than the compiled-in default, so a deployment can widen the
    /// range ahead of a syntax version bump without a code change.
    pub fn with_config(config: &RoutingConfig) -> Self {
        Self {
            charclasses: Arc::new(CharClassCache::default()),
            supported_versions: config.min_syntax_version..=config.max_syntax_version,
        }
    }

    /// Parses `matcher_expr => template_expr [flags]` into a
    /// [`ParsedRoutingExpression`].
    pub fn compile(&self, expression: &str) -> RoutingParseResult<ParsedRoutingExpression> {
        let (matcher_expr, template_expr) =
            expression.split_once(" => ").ok_or(RoutingError::MissingSeparator)?;

        let matcher = MultiValueMatcher::compile(matcher_expr.trim(), &self.charclasses)?;

        let (template_body, raw_flags) = peel_trailing_flags(template_expr.trim())?;
        validate_flag_charset(&raw_flags)?;

        let mut provider = ProviderInfo::default();
        let mut version: Option<u32> = None;
        for flag in &raw_flags {
            if let Some(name) = flag.strip_prefix("provider=") {
                provider.name = Some(name.to_string());
            } else if is_version_flag(flag) {
                version = flag[1..].parse::<u32>().ok();
            } else {
                return Err(RoutingError::UnknownFlag(flag.clone()));
            }
        }

        let syntax_version = match version {
            Some(v) if self.supported_versions.contains(&v) => v,
            _ => {
                return Err(RoutingError::UnsupportedSyntaxVersion(self.supported_versions.clone().collect()))
            }
        };

        let known: HashSet<String> = matcher.capture_names().into_iter().collect();
        let optional: HashSet<String> = matcher.optional_capture_names().into_iter().collect();
        let ctx = TemplateValidationContext::new(known, optional);

        let template = MultiTemplate::compile(&template_body, &ctx)?;

        Ok(ParsedRoutingExpression { matcher, template, provider, syntax_version })
    }

    /// Matches `path_and_query` against `parsed` and, on success, renders
    /// the rewritten target. `accept_header` feeds the `accept-webp` gate
    /// when the matcher declares one.
    pub fn evaluate(
        &self,
        parsed: &ParsedRoutingExpression,
        path_and_query: &str,
        accept_header: Option<&str>,
    ) -> RoutingResult {
        let matched = parsed.matcher.matches(path_and_query, accept_header);
        if !matched.success {
            return RoutingResult::NotFound;
        }

        let variables = matched.captures.into_iter().collect();
        match parsed.template.render(&variables) {
            Ok(rewritten_path_and_query) => {
                RoutingResult::Found { rewritten_path_and_query, provider: parsed.provider.clone() }
            }
            Err(_) => RoutingResult::NotFound,
        }
    }
}

fn is_version_flag(flag: &str) -> bool {
    flag.len() > 1 && flag.starts_with('v') && flag[1..].bytes().all(|b| b.is_ascii_digit())
}
