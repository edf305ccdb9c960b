// Copyright 2025 Cowboy AI, LLC.

//! Error types for domain decisions and value objects

use thiserror::Error;

/// Errors produced by pure domain logic: command decisions and value
/// object validation. Infrastructure failures live with their modules
/// (`EventStoreError`, `WorkflowEngineError`, ...).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid state transition
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current state
        from: String,
        /// Attempted target state
        to: String,
    },

    /// Review is missing something publication requires
    #[error("Review is incomplete: missing {missing}")]
    IncompleteReview {
        /// What the review still needs before publication
        missing: String,
    },

    /// Identifier failed validation
    #[error("Invalid {kind}: {value}")]
    InvalidIdentifier {
        /// Kind of identifier (e.g. "DOI", "ORCID iD")
        kind: String,
        /// The rejected input
        value: String,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl DomainError {
    /// Invalid state transition from the state's display name
    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        DomainError::InvalidStateTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Check if this is an invalid state transition
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, DomainError::InvalidStateTransition { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            DomainError::ValidationError(_)
                | DomainError::InvalidIdentifier { .. }
                | DomainError::IncompleteReview { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test error creation and display messages
    ///
    /// ```mermaid
    /// graph TD
    ///     A[DomainError] -->|Display| B[Error Message]
    ///     A -->|Clone| C[Cloned Error]
    /// ```
    #[test]
    fn test_error_display_messages() {
        let err = DomainError::InvalidStateTransition {
            from: "Rejected".to_string(),
            to: "Accepted".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition from Rejected to Accepted"
        );

        let err = DomainError::IncompleteReview {
            missing: "code of conduct agreement".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Review is incomplete: missing code of conduct agreement"
        );

        let err = DomainError::InvalidIdentifier {
            kind: "DOI".to_string(),
            value: "not-a-doi".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid DOI: not-a-doi");

        let err = DomainError::ValidationError("review text is empty".to_string());
        assert_eq!(err.to_string(), "Validation error: review text is empty");

        let err = DomainError::SerializationError("Invalid JSON".to_string());
        assert_eq!(err.to_string(), "Serialization error: Invalid JSON");
    }

    /// Test invalid_transition constructor
    #[test]
    fn test_invalid_transition_constructor() {
        let err = DomainError::invalid_transition("NotStarted", "Accepted");
        assert!(err.is_invalid_transition());
        assert_eq!(
            err.to_string(),
            "Invalid state transition from NotStarted to Accepted"
        );
    }

    /// Test is_validation_error helper
    #[test]
    fn test_is_validation_error() {
        assert!(DomainError::ValidationError("x".to_string()).is_validation_error());
        assert!(DomainError::InvalidIdentifier {
            kind: "ORCID iD".to_string(),
            value: "123".to_string(),
        }
        .is_validation_error());
        assert!(DomainError::IncompleteReview {
            missing: "text".to_string(),
        }
        .is_validation_error());

        assert!(!DomainError::invalid_transition("A", "B").is_validation_error());
    }

    /// Test helper methods don't match incorrect variants
    #[test]
    fn test_helper_method_exclusivity() {
        let transition = DomainError::invalid_transition("Started", "Started");
        assert!(transition.is_invalid_transition());
        assert!(!transition.is_validation_error());

        let validation = DomainError::ValidationError("test".to_string());
        assert!(!validation.is_invalid_transition());
        assert!(validation.is_validation_error());
    }

    /// Test serde_json error conversion
    #[test]
    fn test_serde_json_conversion() {
        let invalid_json = "{ invalid json }";
        let serde_err = serde_json::from_str::<serde_json::Value>(invalid_json).unwrap_err();

        let domain_err: DomainError = serde_err.into();

        match domain_err {
            DomainError::SerializationError(msg) => {
                assert!(!msg.is_empty());
            }
            _ => panic!("Expected SerializationError"),
        }
    }

    /// Test all error variants can be cloned
    #[test]
    fn test_all_errors_clone() {
        let errors: Vec<DomainError> = vec![
            DomainError::InvalidStateTransition {
                from: "A".to_string(),
                to: "B".to_string(),
            },
            DomainError::IncompleteReview {
                missing: "test".to_string(),
            },
            DomainError::InvalidIdentifier {
                kind: "DOI".to_string(),
                value: "test".to_string(),
            },
            DomainError::ValidationError("test".to_string()),
            DomainError::SerializationError("test".to_string()),
        ];

        for error in errors {
            let cloned = error.clone();
            assert_eq!(error.to_string(), cloned.to_string());
        }
    }
}
