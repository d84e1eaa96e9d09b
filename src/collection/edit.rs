//! Outcome of an editor operation

use crate::error::ConfigError;

/// Success with an optional value, or a failure message with details
///
/// Edit operations report expected problems (unknown id, unsafe id,
/// unwritable value) through this type instead of `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditResult<T> {
    Success(Option<T>),
    Failure {
        message: String,
        errors: Vec<String>,
    },
}

impl<T> EditResult<T> {
    pub const fn success(value: T) -> Self {
        Self::Success(Some(value))
    }

    pub const fn success_empty() -> Self {
        Self::Success(None)
    }

    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self::Failure {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn failure_with_errors<S: Into<String>>(message: S, errors: Vec<String>) -> Self {
        Self::Failure {
            message: message.into(),
            errors,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Success(value) => value.as_ref(),
            Self::Failure { .. } => None,
        }
    }

    /// Failure message; `None` on success
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure { message, .. } => Some(message),
        }
    }

    #[must_use]
    pub fn errors(&self) -> &[String] {
        match self {
            Self::Success(_) => &[],
            Self::Failure { errors, .. } => errors,
        }
    }

    /// The value of a successful result
    ///
    /// # Errors
    ///
    /// Fails for failures and for successes that carry no value.
    pub fn into_value(self) -> Result<T, ConfigError> {
        match self {
            Self::Success(Some(value)) => Ok(value),
            Self::Success(None) => Err(ConfigError::configuration(
                "Edit succeeded but produced no value",
            )),
            Self::Failure { message, errors } if errors.is_empty() => Err(ConfigError::configuration(message)),
            Self::Failure { message, errors } => Err(ConfigError::configuration(format!(
                "{message}: {}",
                errors.join("; ")
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_value_requires_value() {
        assert_eq!(EditResult::success(3).into_value().unwrap(), 3);
        assert!(EditResult::<i32>::success_empty().into_value().is_err());
        assert!(EditResult::<i32>::success_empty().is_success());
    }

    #[test]
    fn failure_details() {
        let result = EditResult::<i32>::failure_with_errors("Save failed", vec!["port: bad".to_owned()]);
        assert!(!result.is_success());
        assert_eq!(result.message(), Some("Save failed"));
        assert_eq!(result.errors(), ["port: bad".to_owned()]);
        let err = result.into_value().unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: Save failed: port: bad");
    }
}
