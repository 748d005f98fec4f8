//! Numeric formulas and expression trees
//!
//! Formulas describe costs, rates and thresholds as a function of the entity
//! level (and optionally time or referenced entity values). All evaluators are
//! pure: identical `(formula, context)` pairs always produce identical results.

mod evaluate;
mod expression;
mod numeric;

pub use evaluate::{
    evaluate_expression, evaluate_numeric_formula, lookup_fn, EntityLookup, FnLookup,
    FormulaContext, FormulaError,
};
pub use expression::{
    validate_expression, BinaryOp, CallName, EntityRefKind, ExpressionNode, FormulaVariable,
    RefTarget, UnaryOp,
};
pub use numeric::{validate_numeric_formula, NumericFormula, PiecewiseSegment};

/// Maximum nesting depth of an expression or condition tree.
pub const MAX_TREE_DEPTH: usize = 16;

/// Maximum number of nodes in an expression or condition tree.
pub const MAX_TREE_NODES: usize = 256;
