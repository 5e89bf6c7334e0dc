//! Compiled string templates: literal text interleaved with `{name:xform:xform}`
//! variable segments. Used for both the path template and each query
//! value template of a [`super::multi_template::MultiTemplate`].

use super::error::{RoutingError, RoutingParseResult};
use super::transform::{Transformation, VariableMap};
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum TemplatePart {
    Literal(String),
    Variable(VariableSegment),
}

#[derive(Debug, Clone)]
pub struct VariableSegment {
    pub name: String,
    pub transformations: Vec<Transformation>,
}

#[derive(Debug, Clone)]
pub struct StringTemplate {
    parts: Vec<TemplatePart>,
}

/// Tracks which matcher variables are bound and which are optional, so a
/// template referencing an unknown or unhandled-optional variable is
/// rejected at compile time rather than at render time.
#[derive(Debug, Clone, Default)]
pub struct TemplateValidationContext {
    pub known_variables: HashSet<String>,
    pub optional_variables: HashSet<String>,
}

impl TemplateValidationContext {
    pub fn new(known_variables: HashSet<String>, optional_variables: HashSet<String>) -> Self {
        Self { known_variables, optional_variables }
    }
}

impl StringTemplate {
    pub fn compile(expr: &str, ctx: &TemplateValidationContext) -> RoutingParseResult<Self> {
        let mut parts = Vec::new();
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
                        parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
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
                    let segment = compile_variable(&body, ctx)?;
                    parts.push(TemplatePart::Variable(segment));
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(literal));
        }
        Ok(Self { parts })
    }

    /// Renders the template against a set of matcher-produced variables.
    /// Returns `None` only for a bare (no-default, no-optional-marker)
    /// variable that came up empty — callers treat that as "drop this
    /// template's owner" (e.g. an unfillable query pair).
    pub fn render(&self, variables: &VariableMap) -> Option<String> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => out.push_str(text),
                TemplatePart::Variable(segment) => {
                    let rendered = render_variable(segment, variables)?;
                    out.push_str(&rendered);
                }
            }
        }
        Some(out)
    }

    pub fn is_literal(&self) -> bool {
        self.parts.iter().all(|p| matches!(p, TemplatePart::Literal(_)))
    }

    /// True if any variable segment carries an explicit `optional` / `?`
    /// marker — such a template's enclosing query pair is omitted rather
    /// than emitted as `key=` when it renders empty.
    pub fn has_optional_marker(&self) -> bool {
        self.parts.iter().any(|p| match p {
            TemplatePart::Variable(segment) => segment.transformations.iter().any(|t| t.is_optional_marker()),
            TemplatePart::Literal(_) => false,
        })
    }
}

fn render_variable(segment: &VariableSegment, variables: &VariableMap) -> Option<String> {
    let mut value: Option<String> = variables.get(segment.name.as_str()).cloned();
    let mut optional = false;
    // Set by the most recent `map` in this segment's chain; consulted by a
    // following `map_default`, which ignores the current value entirely.
    let mut map_matched = false;
    for transformation in &segment.transformations {
        if transformation.is_optional_marker() {
            optional = true;
            continue;
        }
        if let Some(fallback_name) = transformation.fallback_variable() {
            if value.as_deref().map(str::is_empty).unwrap_or(true) {
                value = variables.get(fallback_name).cloned();
            }
            continue;
        }
        if let Transformation::Map(pairs) = transformation {
            let matched = value.as_deref().and_then(|v| pairs.iter().find(|(k, _)| k == v));
            map_matched = matched.is_some();
            value = matched.map(|(_, to)| to.clone());
            continue;
        }
        if let Transformation::MapDefault(fallback) = transformation {
            if !map_matched {
                value = Some(fallback.clone());
            }
            continue;
        }
        value = transformation.apply(value.as_deref());
    }

    match value {
        Some(v) => Some(v),
        None if optional => Some(String::new()),
        None => None,
    }
}

fn compile_variable(body: &str, ctx: &TemplateValidationContext) -> RoutingParseResult<VariableSegment> {
    let mut parts = split_unescaped(body, ':');
    if parts.is_empty() {
        return Err(RoutingError::UnknownTemplateVariable(String::new()));
    }
    let name = parts.remove(0);
    if !ctx.known_variables.contains(&name) {
        return Err(RoutingError::UnknownTemplateVariable(name));
    }

    let mut transformations = Vec::new();
    for token in parts {
        let (tname, args) = split_name_args(&token);
        transformations.push(Transformation::parse(&tname, &args)?);
    }

    if ctx.optional_variables.contains(&name)
        && !transformations.iter().any(|t| {
            t.is_optional_marker() || matches!(t, Transformation::Default(_)) || t.fallback_variable().is_some()
        })
    {
        return Err(RoutingError::MissingOptionalHandling(name));
    }

    Ok(VariableSegment { name, transformations })
}

fn split_unescaped(body: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                current.push(next);
                chars.next();
                continue;
            }
        }
        if c == separator {
            parts.push(std::mem::take(&mut current));
            continue;
        }
        current.push(c);
    }
    parts.push(current);
    parts
}

/// Splits a transformation token like `map(a=1,b=2)` into its name and
/// argument list. Arguments are split on `,` by default, or on `|` for
/// `equals` — the only transformation whose semantics are a bag of
/// alternatives.
fn split_name_args(token: &str) -> (String, Vec<String>) {
    let Some(open) = token.find('(') else {
        return (token.to_string(), Vec::new());
    };
    if !token.ends_with(')') {
        return (token.to_string(), Vec::new());
    }
    let name = token[..open].to_string();
    let inner = &token[open + 1..token.len() - 1];
    if inner.is_empty() {
        return (name, Vec::new());
    }
    let separator = if name == "equals" { '|' } else { ',' };
    (name, split_unescaped(inner, separator))
}
