//! Error taxonomy for the routing expression engine. Parse
//! errors are configuration-time failures; a successfully compiled
//! expression that simply fails to match an input is `NotFound`, never an
//! error — see [`super::engine::RoutingResult`].

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("unterminated group starting at offset {0}")]
    UnterminatedGroup(usize),
    #[error("unterminated character class starting at offset {0}")]
    UnterminatedCharClass(usize),
    #[error("invalid character class: {0}")]
    InvalidCharClass(String),
    #[error("unknown flag '{0}'")]
    UnknownFlag(String),
    #[error("unknown boundary condition '{0}'")]
    UnknownCondition(String),
    #[error("unknown transformation '{0}'")]
    UnknownTransformation(String),
    #[error("duplicate capture name '{0}'")]
    DuplicateCapture(String),
    #[error("segment whose end depends on the next segment is followed by a non-scannable start boundary")]
    NonScannableChain,
    #[error("'equals' boundary cannot be combined with other boundary conditions")]
    EqualsCombinedWithOtherBoundary,
    #[error("raw mode forbids query-prohibit-excess")]
    RawForbidsProhibitExcess,
    #[error("ignore-path requires a query matcher unless raw mode is enabled")]
    IgnorePathRequiresQueryMatcher,
    #[error("template references unknown variable '{0}'")]
    UnknownTemplateVariable(String),
    #[error("template variable '{0}' is bound to an optional matcher variable but has no optional-handling transformation")]
    MissingOptionalHandling(String),
    #[error("missing or unsupported syntax version; expected one of {0:?}")]
    UnsupportedSyntaxVersion(Vec<u32>),
    #[error("routing expression is missing the '=>' separator")]
    MissingSeparator,
    #[error("query key must be a literal")]
    NonLiteralQueryKey,
    #[error("invalid integer literal in condition argument: {0}")]
    InvalidIntegerArgument(String),
    #[error("template safety violation: {0}")]
    SafetyViolation(String),
    #[error("template variable rendered to no value: {0}")]
    RenderFailed(String),
}

pub type RoutingParseResult<T> = Result<T, RoutingError>;
