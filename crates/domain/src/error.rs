//! Unified error types for the content model
//!
//! Validation of formulas, conditions and pack structure reports through
//! [`DomainError`]. Evaluation failures have their own error types next to the
//! evaluators (see [`crate::formula::FormulaError`] and
//! [`crate::condition::ConditionError`]).

use thiserror::Error;

/// Unified error type for content model validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A recursive structure exceeded one of its size bounds
    #[error("{structure} exceeds maximum {bound} ({actual} > {limit})")]
    LimitExceeded {
        structure: &'static str,
        bound: &'static str,
        limit: usize,
        actual: usize,
    },
}

impl DomainError {
    /// Creates a validation error for invariant violations.
    ///
    /// # Example
    /// ```ignore
    /// if pieces.is_empty() {
    ///     return Err(DomainError::validation("piecewise formula needs at least one segment"));
    /// }
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a depth bound violation
    pub fn depth_exceeded(structure: &'static str, limit: usize, actual: usize) -> Self {
        Self::LimitExceeded {
            structure,
            bound: "depth",
            limit,
            actual,
        }
    }

    /// Create a node-count bound violation
    pub fn node_count_exceeded(structure: &'static str, limit: usize, actual: usize) -> Self {
        Self::LimitExceeded {
            structure,
            bound: "node count",
            limit,
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = DomainError::validation("segments must increase");
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(err.to_string(), "Validation failed: segments must increase");
    }

    #[test]
    fn test_limit_errors() {
        let err = DomainError::depth_exceeded("expression", 16, 17);
        assert_eq!(err.to_string(), "expression exceeds maximum depth (17 > 16)");

        let err = DomainError::node_count_exceeded("condition", 256, 300);
        assert_eq!(
            err.to_string(),
            "condition exceeds maximum node count (300 > 256)"
        );
    }
}
