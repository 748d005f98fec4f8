//! Numeric formula variants

use serde::{Deserialize, Serialize};

use super::expression::{validate_expression, ExpressionNode};
use super::MAX_TREE_DEPTH;
use crate::error::DomainError;

/// A numeric formula evaluated against a level (and optional context)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NumericFormula {
    /// Fixed value regardless of level
    Constant { value: f64 },
    /// `base + slope * level`
    Linear { base: f64, slope: f64 },
    /// `base * growth ^ level + offset`
    Exponential {
        base: f64,
        growth: f64,
        #[serde(default, skip_serializing_if = "is_zero")]
        offset: f64,
    },
    /// `sum(coefficients[i] * level ^ i)`
    Polynomial { coefficients: Vec<f64> },
    /// Ordered segments; the first segment whose bound exceeds the level wins
    Piecewise { pieces: Vec<PiecewiseSegment> },
    /// Arbitrary expression tree
    Expression { expression: ExpressionNode },
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

/// One segment of a piecewise formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PiecewiseSegment {
    /// Exclusive upper bound; `None` marks the trailing catch-all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until_level: Option<f64>,
    pub formula: Box<NumericFormula>,
}

impl PiecewiseSegment {
    pub fn until(until_level: f64, formula: NumericFormula) -> Self {
        Self {
            until_level: Some(until_level),
            formula: Box::new(formula),
        }
    }

    pub fn catch_all(formula: NumericFormula) -> Self {
        Self {
            until_level: None,
            formula: Box::new(formula),
        }
    }
}

impl NumericFormula {
    pub fn constant(value: f64) -> Self {
        Self::Constant { value }
    }

    pub fn linear(base: f64, slope: f64) -> Self {
        Self::Linear { base, slope }
    }

    /// The constant value when this formula does not depend on its inputs
    pub fn as_constant(&self) -> Option<f64> {
        match self {
            NumericFormula::Constant { value } => Some(*value),
            _ => None,
        }
    }

    /// Visit every expression tree nested in this formula
    pub fn for_each_expression<'a>(&'a self, visit: &mut dyn FnMut(&'a ExpressionNode)) {
        match self {
            NumericFormula::Expression { expression } => visit(expression),
            NumericFormula::Piecewise { pieces } => {
                for piece in pieces {
                    piece.formula.for_each_expression(visit);
                }
            }
            _ => {}
        }
    }
}

/// Validate a formula's structural invariants.
///
/// - constants and coefficients are finite
/// - polynomials have at least one coefficient
/// - piecewise bounds strictly increase and exactly the last segment omits its bound
/// - expression trees respect the depth and node-count bounds
pub fn validate_numeric_formula(formula: &NumericFormula) -> Result<(), DomainError> {
    validate_at_depth(formula, 1)
}

fn validate_at_depth(formula: &NumericFormula, depth: usize) -> Result<(), DomainError> {
    if depth > MAX_TREE_DEPTH {
        return Err(DomainError::depth_exceeded("formula", MAX_TREE_DEPTH, depth));
    }

    match formula {
        NumericFormula::Constant { value } => require_finite("constant value", *value),
        NumericFormula::Linear { base, slope } => {
            require_finite("linear base", *base)?;
            require_finite("linear slope", *slope)
        }
        NumericFormula::Exponential {
            base,
            growth,
            offset,
        } => {
            require_finite("exponential base", *base)?;
            require_finite("exponential growth", *growth)?;
            require_finite("exponential offset", *offset)
        }
        NumericFormula::Polynomial { coefficients } => {
            if coefficients.is_empty() {
                return Err(DomainError::validation(
                    "polynomial formula needs at least one coefficient",
                ));
            }
            coefficients
                .iter()
                .try_for_each(|c| require_finite("polynomial coefficient", *c))
        }
        NumericFormula::Piecewise { pieces } => {
            validate_piecewise(pieces)?;
            pieces
                .iter()
                .try_for_each(|piece| validate_at_depth(&piece.formula, depth + 1))
        }
        NumericFormula::Expression { expression } => validate_expression(expression),
    }
}

fn validate_piecewise(pieces: &[PiecewiseSegment]) -> Result<(), DomainError> {
    let Some((last, bounded)) = pieces.split_last() else {
        return Err(DomainError::validation(
            "piecewise formula needs at least one segment",
        ));
    };

    if last.until_level.is_some() {
        return Err(DomainError::validation(
            "last piecewise segment must omit untilLevel",
        ));
    }

    let mut previous: Option<f64> = None;
    for (index, piece) in bounded.iter().enumerate() {
        let Some(bound) = piece.until_level else {
            return Err(DomainError::validation(format!(
                "piecewise segment {} omits untilLevel but is not last",
                index
            )));
        };
        require_finite("piecewise untilLevel", bound)?;
        if let Some(prev) = previous {
            if bound <= prev {
                return Err(DomainError::validation(format!(
                    "piecewise untilLevel must strictly increase (segment {}: {} <= {})",
                    index, bound, prev
                )));
            }
        }
        previous = Some(bound);
    }
    Ok(())
}

fn require_finite(what: &str, value: f64) -> Result<(), DomainError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DomainError::validation(format!("{} must be finite", what)))
    }
}
