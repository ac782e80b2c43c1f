//! # Error Types
//!
//! Error types for isolation segment storage and listing, built with `thiserror`.

/// Custom result type for isoseg operations
pub type Result<T> = std::result::Result<T, IsosegError>;

/// Main error type for the isolation segment service
#[derive(thiserror::Error, Debug)]
pub enum IsosegError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Database and storage errors
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Resource not found errors
    #[error("Resource not found: {resource_type} with ID '{id}'")]
    NotFound { resource_type: String, id: String },

    /// Resource conflict errors (e.g., already exists, still in use)
    #[error("Resource conflict: {message}")]
    Conflict { message: String, resource_type: String },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl IsosegError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a database error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Create a conflict error
    pub fn conflict<M: Into<String>, R: Into<String>>(message: M, resource_type: R) -> Self {
        Self::Conflict { message: message.into(), resource_type: resource_type.into() }
    }

    /// Unique-constraint violations surface as conflicts rather than raw database errors
    pub(crate) fn from_write(source: sqlx::Error, context: String, resource_type: &str) -> Self {
        if let Some(db_err) = source.as_database_error() {
            if db_err.is_unique_violation() {
                return Self::conflict(format!("{}: already exists", context), resource_type);
            }
        }
        Self::Database { source, context }
    }
}

impl From<sqlx::Error> for IsosegError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<std::io::Error> for IsosegError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for IsosegError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

/// Flatten field, nested struct, and list errors into `path: message` entries
fn collect_validation_messages(
    errors: &validator::ValidationErrors,
    prefix: &str,
    out: &mut Vec<String>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path =
            if prefix.is_empty() { field.to_string() } else { format!("{}.{}", prefix, field) };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                out.push(format!("{}: {}", path, messages.join(", ")));
            }
            ValidationErrorsKind::Struct(nested) => {
                collect_validation_messages(nested, &path, out)
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_validation_messages(nested, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

impl From<validator::ValidationErrors> for IsosegError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages = Vec::new();
        collect_validation_messages(&errors, "", &mut messages);
        messages.sort();

        Self::validation(format!("Validation failed: {}", messages.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = IsosegError::config("Test configuration error");
        assert!(matches!(error, IsosegError::Config { .. }));
        assert_eq!(error.to_string(), "Configuration error: Test configuration error");
    }

    #[test]
    fn test_validation_error_keeps_field() {
        let error = IsosegError::validation_field("must be an array", "guids");
        if let IsosegError::Validation { field, .. } = error {
            assert_eq!(field, Some("guids".to_string()));
        } else {
            panic!("expected validation error");
        }
    }

    #[test]
    fn test_not_found_message() {
        let error = IsosegError::not_found("Organization", "abc");
        assert_eq!(error.to_string(), "Resource not found: Organization with ID 'abc'");
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: IsosegError = io_error.into();
        assert!(matches!(error, IsosegError::Io { .. }));

        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: IsosegError = json_error.into();
        assert!(matches!(error, IsosegError::Serialization { .. }));
    }

    #[test]
    fn test_nested_validation_errors_keep_their_path() {
        use validator::Validate;

        #[derive(Validate)]
        struct Inner {
            #[validate(range(min = 1, message = "must be positive"))]
            count: u32,
        }

        #[derive(Validate)]
        struct Outer {
            #[validate(nested)]
            inner: Inner,
            #[validate(length(min = 1, message = "must not be empty"))]
            name: String,
        }

        let errors = Outer { inner: Inner { count: 0 }, name: String::new() }
            .validate()
            .unwrap_err();
        let error = IsosegError::from(errors);
        assert_eq!(
            error.to_string(),
            "Validation error: Validation failed: inner.count: must be positive; name: must not be empty"
        );
    }
}
