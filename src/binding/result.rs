//! Outcome of binding a document onto a type

use super::validation::ValidationError;
use crate::error::ConfigError;
use core::fmt;

/// A document could not be mapped onto a type
///
/// Covers missing constructors, type mismatches, missing required values
/// and failures inside nested objects. `path` is the dotted document path.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct BindingError {
    pub path: String,
    pub field: String,
    pub message: String,
    pub cause: Option<String>,
}

impl BindingError {
    #[inline]
    pub fn new<P: Into<String>, F: Into<String>, M: Into<String>>(path: P, field: F, message: M) -> Self {
        Self {
            path: path.into(),
            field: field.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// Attach the underlying failure
    #[must_use]
    #[inline]
    pub fn with_cause<C: ToString>(mut self, cause: C) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = if self.path.is_empty() {
            "<root>"
        } else {
            self.path.as_str()
        };
        match self.cause.as_ref() {
            Some(cause) => write!(f, "{location}: {} ({cause})", self.message),
            None => write!(f, "{location}: {}", self.message),
        }
    }
}

impl std::error::Error for BindingError {}

/// Value produced by a bind, with every problem found along the way
///
/// A result can hold a value together with validation errors: the document
/// was well-formed but broke a declared constraint.
#[derive(Debug)]
pub struct BindingResult<T> {
    value: Option<T>,
    binding_errors: Vec<BindingError>,
    validation_errors: Vec<ValidationError>,
}

impl<T> BindingResult<T> {
    #[must_use]
    pub fn new(
        value: Option<T>,
        binding_errors: Vec<BindingError>,
        validation_errors: Vec<ValidationError>,
    ) -> Self {
        Self {
            value,
            binding_errors,
            validation_errors,
        }
    }

    #[must_use]
    pub fn success(value: T) -> Self {
        Self::new(Some(value), Vec::new(), Vec::new())
    }

    #[must_use]
    pub fn failure(binding_errors: Vec<BindingError>) -> Self {
        Self::new(None, binding_errors, Vec::new())
    }

    /// No binding errors and a value is present; validation errors allowed
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.binding_errors.is_empty() && self.value.is_some()
    }

    #[must_use]
    pub fn has_validation_errors(&self) -> bool {
        !self.validation_errors.is_empty()
    }

    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    #[must_use]
    pub fn binding_errors(&self) -> &[BindingError] {
        &self.binding_errors
    }

    #[must_use]
    pub fn validation_errors(&self) -> &[ValidationError] {
        &self.validation_errors
    }

    /// Take the value regardless of errors
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        self.value
    }

    #[must_use]
    pub fn into_parts(self) -> (Option<T>, Vec<BindingError>, Vec<ValidationError>) {
        (self.value, self.binding_errors, self.validation_errors)
    }

    /// The value, only if there were no binding or validation errors
    ///
    /// # Errors
    ///
    /// Returns a binding error listing every problem when either error list
    /// is non-empty or no value was produced.
    pub fn get(self) -> Result<T, ConfigError> {
        if !self.binding_errors.is_empty() || !self.validation_errors.is_empty() {
            return Err(ConfigError::binding(self.error_summary()));
        }
        self.value
            .ok_or_else(|| ConfigError::binding("binding produced no value"))
    }

    /// One line per problem, binding errors first
    #[must_use]
    pub fn error_summary(&self) -> String {
        self.binding_errors
            .iter()
            .map(ToString::to_string)
            .chain(self.validation_errors.iter().map(ToString::to_string))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
