//! Custom error types with exit codes

use thiserror::Error;

/// Main error type for foldconf operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// Configuration Error - missing or invalid configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A collection was requested that was never registered
    #[error("No collection registered for type {item_type} with name '{name}'")]
    NotRegistered { item_type: String, name: String },

    /// Binding Error - a document could not be mapped onto a type
    #[error("Binding error: {message}")]
    Binding { message: String },

    /// Parse Error - a document could not be parsed as YAML
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Filesystem Error - file operation failed
    #[error("Filesystem error: {message}")]
    Filesystem { message: String },
}

impl ConfigError {
    /// Get the appropriate exit code for this error type
    #[must_use]
    #[inline]
    pub const fn exit_code(&self) -> i32 {
        match *self {
            Self::Configuration { .. } | Self::NotRegistered { .. } => 1,
            Self::Binding { .. } => 2,
            Self::Parse { .. } => 3,
            Self::Filesystem { .. } => 5,
        }
    }

    /// Create a configuration error
    #[inline]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a not-registered error for an item type and collection name
    #[inline]
    pub fn not_registered<S: Into<String>>(item_type: &str, name: S) -> Self {
        Self::NotRegistered {
            item_type: item_type.to_owned(),
            name: name.into(),
        }
    }

    /// Create a binding error
    #[inline]
    pub fn binding<S: Into<String>>(message: S) -> Self {
        Self::Binding {
            message: message.into(),
        }
    }

    /// Create a parse error
    #[inline]
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a filesystem error
    #[inline]
    pub fn filesystem<S: Into<String>>(message: S) -> Self {
        Self::Filesystem {
            message: message.into(),
        }
    }
}

/// Failure to convert between a document node and a concrete value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
#[non_exhaustive]
pub struct SerializationError {
    pub message: String,
}

impl SerializationError {
    #[inline]
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The node did not hold the kind of value the target type expects
    #[inline]
    pub fn type_mismatch(expected: &str, found: &serde_yaml::Value) -> Self {
        Self::new(format!(
            "expected {expected}, found {}",
            crate::node::describe(found)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_by_kind() {
        assert_eq!(ConfigError::configuration("x").exit_code(), 1);
        assert_eq!(ConfigError::not_registered("T", "items").exit_code(), 1);
        assert_eq!(ConfigError::binding("x").exit_code(), 2);
        assert_eq!(ConfigError::parse("x").exit_code(), 3);
        assert_eq!(ConfigError::filesystem("x").exit_code(), 5);
    }

    #[test]
    fn not_registered_message() {
        let err = ConfigError::not_registered("app::Kit", "kits");
        assert_eq!(
            err.to_string(),
            "No collection registered for type app::Kit with name 'kits'"
        );
    }
}
