//! Error types for the step engine
//!
//! Usage errors surface from the declaration verbs while the tree is being
//! built. Run-time failures travel as values through step outcomes.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for stepwise
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // === Declaration (usage) Errors ===
    #[error("{hook} scope must be :step or :each, got :{scope}")]
    InvalidHookScope { hook: String, scope: String },

    #[error("around scope must be :each, got :{0}")]
    InvalidAroundScope(String),

    #[error("Nested group '{0}' is not allowed in a steps list; declare it with `step` instead")]
    NestedGroup(String),

    #[error("No shared steps named '{0}'")]
    UnknownSharedSteps(String),

    #[error("No shared examples named '{0}'")]
    UnknownSharedExamples(String),

    // === Resolution Errors ===
    #[error("Unknown member '{name}': no let or subject declared under that name")]
    UnknownMember { name: String },

    #[error("Value '{name}' is not of type {expected}")]
    ValueType { name: String, expected: String },

    // === Run Errors ===
    #[error("Assertion failed: {0}")]
    Assertion(String),

    #[error("Pending: {0}")]
    Pending(String),

    #[error("Panicked: {0}")]
    Panicked(String),

    #[error("Step '{step}' did not execute successfully: {reason}")]
    StepFailed { step: String, reason: String },

    // === Configuration Errors ===
    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },
}

impl Error {
    /// Create an invalid hook scope error
    pub fn invalid_hook_scope(hook: &str, scope: &str) -> Self {
        Self::InvalidHookScope {
            hook: hook.to_string(),
            scope: scope.to_string(),
        }
    }

    /// Create an unknown member error
    pub fn unknown_member(name: &str) -> Self {
        Self::UnknownMember {
            name: name.to_string(),
        }
    }

    /// Create a value type mismatch error for `T`
    pub fn value_type<T: ?Sized>(name: &str) -> Self {
        Self::ValueType {
            name: name.to_string(),
            expected: std::any::type_name::<T>().to_string(),
        }
    }

    /// Create a step failed error
    pub fn step_failed(step: &str, reason: &str) -> Self {
        Self::StepFailed {
            step: step.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this is the pending (skip) signal rather than a failure
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Whether this error was raised while declaring, not while running
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::InvalidHookScope { .. }
                | Self::InvalidAroundScope(_)
                | Self::NestedGroup(_)
                | Self::UnknownSharedSteps(_)
                | Self::UnknownSharedExamples(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_errors_are_classified() {
        assert!(Error::invalid_hook_scope("before", "all").is_usage());
        assert!(Error::InvalidAroundScope("step".into()).is_usage());
        assert!(!Error::Assertion("x".into()).is_usage());
        assert!(Error::Pending("later".into()).is_pending());
    }

    #[test]
    fn test_messages_name_the_scope() {
        let err = Error::invalid_hook_scope("after", "suite");
        assert_eq!(err.to_string(), "after scope must be :step or :each, got :suite");
        let err = Error::value_type::<u32>("count");
        assert_eq!(err.to_string(), "Value 'count' is not of type u32");
    }

    #[test]
    fn test_config_errors_are_run_time_errors() {
        let err = Error::FileRead {
            path: "stepwise.toml".into(),
            error: "not found".into(),
        };
        assert_eq!(err.to_string(), "Failed to read file 'stepwise.toml': not found");
        assert!(!err.is_usage());
        assert!(!Error::ConfigParse("bad".into()).is_pending());
    }
}
