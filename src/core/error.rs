use std::fmt;

use thiserror::Error;

/// A single attribute-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Attribute the violation applies to, if it is attributable.
    pub attribute: Option<String>,
    pub message: String,
}

impl Violation {
    pub fn new(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            attribute: Some(attribute.into()),
            message: message.into(),
        }
    }

    pub fn entity(message: impl Into<String>) -> Self {
        Self {
            attribute: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(attr) => write!(f, "[{}] {}", attr, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// All violations found in one validation pass over a record batch.
///
/// Carries every violation, not just the first, so callers can report
/// the complete set of problems at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.violations.extend(other.violations);
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Converts into a `Result`: `Ok(())` when no violation was recorded.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DataError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.violations.iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join("; "))
    }
}

#[derive(Error, Debug)]
pub enum DataError {
    /// Fatal wiring-time failure: bad metadata, a registry builder that
    /// failed, an unresolvable reference. Never retried.
    #[error("Configuration error for entity type '{entity_type}': {message}")]
    Configuration { entity_type: String, message: String },

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Permission '{permission}' denied on entity type '{entity_type}'")]
    Authorization {
        entity_type: String,
        permission: String,
    },

    #[error("Entity '{id}' not found in '{entity_type}'")]
    NotFound { entity_type: String, id: String },

    #[error("Unknown entity type '{0}'")]
    UnknownEntityType(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Expression error: {0}")]
    Expression(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Lock error: {0}")]
    Lock(String),
}

impl DataError {
    pub fn configuration(entity_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            entity_type: entity_type.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity_type: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

impl<T> From<std::sync::PoisonError<T>> for DataError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_collect_all() {
        let mut errors = ValidationErrors::new();
        errors.push(Violation::new("name", "may not be null"));
        errors.push(Violation::new("age", "expects type INT, got TEXT"));

        assert_eq!(errors.len(), 2);
        let err = errors.into_result().unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("name"));
        assert!(rendered.contains("age"));
    }

    #[test]
    fn test_empty_validation_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
