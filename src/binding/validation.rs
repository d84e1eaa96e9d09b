//! Semantic constraints checked after a successful bind

use super::binder::Binder;
use super::schema::Bindable;
use crate::node::{child_path, describe, key_text};
use regex::Regex;
use serde_yaml::Value;
use std::fmt;

/// A constraint violation on a bound value
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ValidationError {
    pub path: String,
    pub field: String,
    pub invalid_value: String,
    pub message: String,
    /// Serious enough that startup should be aborted
    pub fail_fast: bool,
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new<P, F, V, M>(path: P, field: F, invalid_value: V, message: M) -> Self
    where
        P: Into<String>,
        F: Into<String>,
        V: Into<String>,
        M: Into<String>,
    {
        Self {
            path: path.into(),
            field: field.into(),
            invalid_value: invalid_value.into(),
            message: message.into(),
            fail_fast: false,
            suggestion: None,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (suggestion: {suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// All violations found for one value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    #[must_use]
    pub const fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether any violation is marked fail-fast
    #[must_use]
    pub fn has_fail_fast(&self) -> bool {
        self.errors.iter().any(|error| error.fail_fast)
    }

    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    #[must_use]
    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }
}

#[derive(Debug, Clone)]
enum Rule {
    Min(f64),
    Max(f64),
    Range(f64, f64),
    Pattern(String, Result<Regex, String>),
    OneOf(Vec<String>),
    Size(usize, usize),
    NotEmpty,
}

/// Rules attached to one field of a schema
///
/// ```
/// use foldconf::binding::Constraint;
///
/// let port = Constraint::field("port").range(1, 65535).fail_fast();
/// let mode = Constraint::field("mode").one_of(["solo", "team"]).suggestion("use 'solo'");
/// # let _ = (port, mode);
/// ```
#[derive(Debug, Clone)]
pub struct Constraint {
    field: String,
    rules: Vec<Rule>,
    fail_fast: bool,
    message: Option<String>,
    suggestion: Option<String>,
}

impl Constraint {
    /// Constrain the field with this Rust name or explicit key
    #[must_use]
    pub fn field(name: &str) -> Self {
        Self {
            field: name.to_owned(),
            rules: Vec::new(),
            fail_fast: false,
            message: None,
            suggestion: None,
        }
    }

    #[must_use]
    pub fn min(self, min: impl Into<f64>) -> Self {
        self.rule(Rule::Min(min.into()))
    }

    #[must_use]
    pub fn max(self, max: impl Into<f64>) -> Self {
        self.rule(Rule::Max(max.into()))
    }

    /// Inclusive numeric range
    #[must_use]
    pub fn range(self, min: impl Into<f64>, max: impl Into<f64>) -> Self {
        self.rule(Rule::Range(min.into(), max.into()))
    }

    /// Scalar text must match the whole pattern
    #[must_use]
    pub fn pattern(self, pattern: &str) -> Self {
        let anchored = format!("^(?:{pattern})$");
        let compiled = Regex::new(&anchored).map_err(|e| format!("invalid pattern '{pattern}': {e}"));
        self.rule(Rule::Pattern(pattern.to_owned(), compiled))
    }

    /// Scalar text must be one of `allowed`
    #[must_use]
    pub fn one_of<I, S>(self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule(Rule::OneOf(allowed.into_iter().map(Into::into).collect()))
    }

    /// Length bounds for strings, lists and maps (inclusive)
    #[must_use]
    pub fn size(self, min: usize, max: usize) -> Self {
        self.rule(Rule::Size(min, max))
    }

    /// Rejects null, empty strings and empty collections
    #[must_use]
    pub fn not_empty(self) -> Self {
        self.rule(Rule::NotEmpty)
    }

    #[must_use]
    pub const fn fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }

    /// Replace the default message of every rule in this constraint
    #[must_use]
    pub fn message(mut self, message: &str) -> Self {
        self.message = Some(message.to_owned());
        self
    }

    #[must_use]
    pub fn suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_owned());
        self
    }

    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field
    }

    fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    fn check(&self, value: &Value, path: &str, out: &mut Vec<ValidationError>) {
        for rule in &self.rules {
            if value.is_null() && !matches!(rule, Rule::NotEmpty) {
                continue;
            }
            if let Some(problem) = violation(rule, value) {
                out.push(ValidationError {
                    path: path.to_owned(),
                    field: self.field.clone(),
                    invalid_value: value_text(value),
                    message: self.message.clone().unwrap_or(problem),
                    fail_fast: self.fail_fast,
                    suggestion: self.suggestion.clone(),
                });
            }
        }
    }
}

fn violation(rule: &Rule, value: &Value) -> Option<String> {
    match rule {
        Rule::Min(min) => match number(value) {
            Some(n) if n >= *min => None,
            Some(_) => Some(format!("must be at least {min}")),
            None => Some(format!("must be a number, found {}", describe(value))),
        },
        Rule::Max(max) => match number(value) {
            Some(n) if n <= *max => None,
            Some(_) => Some(format!("must be at most {max}")),
            None => Some(format!("must be a number, found {}", describe(value))),
        },
        Rule::Range(min, max) => match number(value) {
            Some(n) if n >= *min && n <= *max => None,
            Some(_) => Some(format!("must be between {min} and {max}")),
            None => Some(format!("must be a number, found {}", describe(value))),
        },
        Rule::Pattern(_, Err(message)) => Some(message.clone()),
        Rule::Pattern(pattern, Ok(regex)) => {
            (!regex.is_match(&value_text(value))).then(|| format!("must match pattern '{pattern}'"))
        }
        Rule::OneOf(allowed) => {
            let text = value_text(value);
            (!allowed.contains(&text)).then(|| format!("must be one of [{}]", allowed.join(", ")))
        }
        Rule::Size(min, max) => match length(value) {
            Some(len) if len >= *min && len <= *max => None,
            Some(len) => Some(format!("size must be between {min} and {max}, was {len}")),
            None => Some(format!("has no size, found {}", describe(value))),
        },
        Rule::NotEmpty => {
            let empty = value.is_null() || length(value) == Some(0);
            empty.then(|| "must not be empty".to_owned())
        }
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Sequence(items) => Some(items.len()),
        Value::Mapping(map) => Some(map.len()),
        _ => None,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => describe(value).to_owned(),
        scalar => key_text(scalar),
    }
}

/// Walks schema constraints and nested values
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Check every constraint of `value` and of its nested objects
    #[must_use]
    pub fn validate<T: Bindable>(&self, value: &T, binder: &Binder) -> ValidationResult {
        let mut errors = Vec::new();
        self.validate_at(value, "", binder, &mut errors);
        ValidationResult::new(errors)
    }

    pub(crate) fn validate_at<T: Bindable>(
        &self,
        value: &T,
        path: &str,
        binder: &Binder,
        out: &mut Vec<ValidationError>,
    ) {
        let schema = binder.schema::<T>();

        for constraint in schema.constraints() {
            let key = schema
                .find_field(constraint.field_name())
                .map_or_else(|| constraint.field_name().to_owned(), |field| binder.key_for(field));
            let current = binder
                .read_property(value, constraint.field_name())
                .unwrap_or(Value::Null);
            constraint.check(&current, &child_path(path, &key), out);
        }

        for field in schema.fields() {
            let key = binder.key_for(&**field);
            field.validate_nested(value, &child_path(path, &key), self, binder, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors(constraint: &Constraint, value: Value) -> Vec<ValidationError> {
        let mut out = Vec::new();
        constraint.check(&value, "field", &mut out);
        out
    }

    #[test]
    fn numeric_bounds() {
        let port = Constraint::field("port").min(1).max(65535);
        assert!(errors(&port, Value::from(25565)).is_empty());
        assert_eq!(errors(&port, Value::from(0))[0].message, "must be at least 1");
        assert_eq!(errors(&port, Value::from(70000))[0].message, "must be at most 65535");
        assert_eq!(errors(&port, Value::from(0))[0].invalid_value, "0");

        let ratio = Constraint::field("ratio").range(0.0, 1.0);
        assert!(errors(&ratio, Value::from(0.5)).is_empty());
        assert_eq!(errors(&ratio, Value::from(1.5))[0].message, "must be between 0 and 1");
    }

    #[test]
    fn null_skips_all_but_not_empty() {
        let constraint = Constraint::field("name").min(3).pattern("[a-z]+");
        assert!(errors(&constraint, Value::Null).is_empty());

        let required = Constraint::field("name").not_empty();
        assert_eq!(errors(&required, Value::Null).len(), 1);
        assert_eq!(errors(&required, Value::from("")).len(), 1);
        assert!(errors(&required, Value::from("x")).is_empty());
    }

    #[test]
    fn pattern_matches_whole_text() {
        let id = Constraint::field("id").pattern("[a-z]+");
        assert!(errors(&id, Value::from("arena")).is_empty());
        let problems = errors(&id, Value::from("arena-1"));
        assert_eq!(problems[0].message, "must match pattern '[a-z]+'");
    }

    #[test]
    fn invalid_pattern_always_reports() {
        let broken = Constraint::field("id").pattern("(");
        let problems = errors(&broken, Value::from("anything"));
        assert_eq!(problems.len(), 1);
        assert!(problems[0].message.starts_with("invalid pattern '('"));
    }

    #[test]
    fn one_of_and_size() {
        let mode = Constraint::field("mode").one_of(["solo", "team"]);
        assert!(errors(&mode, Value::from("team")).is_empty());
        assert_eq!(errors(&mode, Value::from("duo"))[0].message, "must be one of [solo, team]");

        let tags = Constraint::field("tags").size(1, 2);
        let list: Value = serde_yaml::from_str("[a, b, c]").unwrap();
        assert_eq!(errors(&tags, list)[0].message, "size must be between 1 and 2, was 3");
        assert!(errors(&tags, Value::from("ab")).is_empty());
    }

    #[test]
    fn custom_message_flags_and_suggestion() {
        let constraint = Constraint::field("port")
            .min(1)
            .fail_fast()
            .message("port is required")
            .suggestion("use 25565");
        let problems = errors(&constraint, Value::from(0));
        let result = ValidationResult::new(problems.clone());

        assert!(result.has_errors());
        assert!(result.has_fail_fast());
        assert_eq!(problems[0].to_string(), "field: port is required (suggestion: use 25565)");
    }
}
