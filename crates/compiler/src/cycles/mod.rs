//! Semantic cycle detection over a normalized pack
//!
//! Two checks run after normalization: unlock-condition cycles (entities
//! that can only unlock each other) and transform loops whose conversion
//! ratio exceeds 1.

mod economy;
mod unlock;

use std::fmt;

use packforge_domain::{ContentId, ContentKind, PackModules};
use thiserror::Error;

pub use economy::{detect_profitable_transform_cycle, PROFIT_EPSILON};
pub use unlock::detect_unlock_cycle;

/// One entity on a reported cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleNode {
    pub kind: ContentKind,
    pub id: ContentId,
}

impl fmt::Display for CycleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.id)
    }
}

fn join_path<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A pack is structurally valid but its content cannot work at runtime
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemanticError {
    #[error("Unlock condition cycle detected: {} (at {location}). {}", join_path(.cycle), self.remediation())]
    UnlockCycle {
        /// Closed path, first node repeated at the end
        cycle: Vec<CycleNode>,
        location: String,
    },

    #[error(
        "Transform cycle {} multiplies resources by {ratio:.4} per loop (at {location}). {}",
        join_path(.transforms),
        self.remediation()
    )]
    ProfitableTransformCycle {
        transforms: Vec<ContentId>,
        ratio: f64,
        location: String,
    },

    #[error(
        "Transform cycle {} cannot be evaluated for profitability (at {location}). {}",
        join_path(.transforms),
        self.remediation()
    )]
    UnevaluableTransformCycle {
        transforms: Vec<ContentId>,
        location: String,
    },
}

impl SemanticError {
    pub fn remediation(&self) -> &'static str {
        match self {
            SemanticError::UnlockCycle { .. } => {
                "Remove one of these references so at least one entity can unlock on its own."
            }
            SemanticError::ProfitableTransformCycle { .. } => {
                "Lower an output amount or raise an input amount so the loop ratio is at most 1."
            }
            SemanticError::UnevaluableTransformCycle { .. } => {
                "Use exactly one input and one output with constant amounts for transforms on a loop."
            }
        }
    }

    /// JSON path of the entity the error is attached to
    pub fn location(&self) -> &str {
        match self {
            SemanticError::UnlockCycle { location, .. }
            | SemanticError::ProfitableTransformCycle { location, .. }
            | SemanticError::UnevaluableTransformCycle { location, .. } => location,
        }
    }
}

/// Run both detectors, unlock cycles first.
pub fn check_semantics(modules: &PackModules) -> Result<(), SemanticError> {
    detect_unlock_cycle(modules)?;
    detect_profitable_transform_cycle(&modules.transforms)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlock_message_contains_path_and_hint() {
        let err = SemanticError::UnlockCycle {
            cycle: vec![
                CycleNode {
                    kind: ContentKind::Resource,
                    id: "gems".into(),
                },
                CycleNode {
                    kind: ContentKind::Upgrade,
                    id: "mine".into(),
                },
                CycleNode {
                    kind: ContentKind::Resource,
                    id: "gems".into(),
                },
            ],
            location: "resources[0]".to_string(),
        };
        let message = err.to_string();
        assert!(message.starts_with(
            "Unlock condition cycle detected: resource 'gems' -> upgrade 'mine' -> resource 'gems'"
        ));
        assert!(message.contains("(at resources[0])"));
        assert!(message.ends_with(err.remediation()));
        assert_eq!(err.location(), "resources[0]");
    }

    #[test]
    fn test_empty_pack_passes() {
        assert!(check_semantics(&PackModules::default()).is_ok());
    }
}
