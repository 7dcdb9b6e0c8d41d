//! Error types for form validation binding
use thiserror::Error;

/// Result type for form validation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by validators, factories and containers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by resolution and validation passes.
///
/// Nothing in this crate recovers from these locally. A failing pass leaves
/// the message store untouched for its scope and hands the error to whoever
/// awaits the [`Dispatch`](crate::form::Dispatch).
#[derive(Error, Debug)]
pub enum Error {
    /// A required argument was missing or malformed
    #[error("Invalid input '{argument}': {reason}")]
    InvalidInput {
        /// Name of the offending argument
        argument: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// No validator is registered or discoverable for the model type
    #[error("Unable to locate a validator for model type '{model_type}'")]
    ValidatorNotFound {
        /// Runtime type name of the model
        model_type: &'static str,
    },

    /// A validator was found but could not be instantiated
    #[error("Failed to construct validator '{validator_type}' for model type '{model_type}'")]
    ValidatorConstructionFailed {
        /// Runtime type name of the model
        model_type: &'static str,
        /// Type name of the validator being constructed
        validator_type: &'static str,
        /// The underlying failure
        #[source]
        source: BoxError,
    },

    /// The validator itself failed while evaluating the model
    #[error("Validator failed while validating model type '{model_type}'")]
    ValidationEngineFailure {
        /// Runtime type name of the validated model
        model_type: &'static str,
        /// The underlying failure
        #[source]
        source: BoxError,
    },

    /// A dispatched pass never completed (panicked or its task was cancelled)
    #[error("Validation pass aborted: {reason}")]
    PassAborted {
        /// What happened to the task
        reason: String,
    },
}

impl Error {
    /// Shorthand for [`Error::InvalidInput`].
    pub(crate) fn invalid_input(argument: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            argument,
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error came from resolving a validator rather
    /// than from running one.
    #[must_use]
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::ValidatorNotFound { .. } | Self::ValidatorConstructionFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_model_type() {
        let err = Error::ValidatorNotFound {
            model_type: "app::Person",
        };
        assert_eq!(
            err.to_string(),
            "Unable to locate a validator for model type 'app::Person'"
        );
        assert!(err.is_resolution_error());
    }

    #[test]
    fn engine_failure_keeps_source() {
        let err = Error::ValidationEngineFailure {
            model_type: "app::Person",
            source: "lookup timed out".into(),
        };
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("lookup timed out"));
        assert!(!err.is_resolution_error());
    }
}
