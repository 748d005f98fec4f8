//! Pure formula evaluation

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use super::expression::{
    BinaryOp, CallName, EntityRefKind, ExpressionNode, FormulaVariable, RefTarget, UnaryOp,
};
use super::numeric::NumericFormula;
use super::MAX_TREE_DEPTH;

/// Error when evaluating a formula
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// The context has no lookup registered for this entity kind
    #[error("No {kind} lookup provided to resolve '{id}'")]
    MissingLookup { kind: &'static str, id: String },
    /// The lookup exists but does not know this entity
    #[error("Unknown {kind} '{id}' referenced by formula")]
    UnknownEntity { kind: &'static str, id: String },
    /// A call was made with the wrong number of arguments
    #[error("Call '{name}' received {actual} argument(s)")]
    Arity { name: &'static str, actual: usize },
    /// No piecewise segment matched the level
    #[error("No piecewise segment matches level {0}")]
    NoSegment(f64),
    /// Recursion exceeded the evaluator's depth guard
    #[error("Formula evaluation exceeded maximum depth {0}")]
    DepthExceeded(usize),
}

/// Resolves the current numeric value of an entity by id
pub trait EntityLookup {
    fn lookup(&self, id: &str) -> Option<f64>;
}

impl EntityLookup for HashMap<String, f64> {
    fn lookup(&self, id: &str) -> Option<f64> {
        self.get(id).copied()
    }
}

impl EntityLookup for BTreeMap<String, f64> {
    fn lookup(&self, id: &str) -> Option<f64> {
        self.get(id).copied()
    }
}

/// Adapts a closure into an [`EntityLookup`]
#[derive(Debug, Clone, Copy)]
pub struct FnLookup<F>(pub F);

impl<F> EntityLookup for FnLookup<F>
where
    F: Fn(&str) -> Option<f64>,
{
    fn lookup(&self, id: &str) -> Option<f64> {
        (self.0)(id)
    }
}

/// Wrap a closure as an entity lookup
pub fn lookup_fn<F>(f: F) -> FnLookup<F>
where
    F: Fn(&str) -> Option<f64>,
{
    FnLookup(f)
}

/// Inputs available while evaluating a formula
#[derive(Clone, Copy, Default)]
pub struct FormulaContext<'a> {
    pub level: f64,
    pub time: f64,
    pub delta_time: f64,
    lookups: [Option<&'a dyn EntityLookup>; 5],
}

impl std::fmt::Debug for FormulaContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registered: Vec<&str> = EntityRefKind::ALL
            .iter()
            .filter(|kind| self.lookups[kind.index()].is_some())
            .map(|kind| kind.as_str())
            .collect();
        f.debug_struct("FormulaContext")
            .field("level", &self.level)
            .field("time", &self.time)
            .field("delta_time", &self.delta_time)
            .field("lookups", &registered)
            .finish()
    }
}

impl<'a> FormulaContext<'a> {
    pub fn at_level(level: f64) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn with_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    pub fn with_delta_time(mut self, delta_time: f64) -> Self {
        self.delta_time = delta_time;
        self
    }

    /// Register the lookup used for `kind` references
    pub fn with_lookup(mut self, kind: EntityRefKind, lookup: &'a dyn EntityLookup) -> Self {
        self.lookups[kind.index()] = Some(lookup);
        self
    }

    fn variable(&self, name: FormulaVariable) -> f64 {
        match name {
            FormulaVariable::Level => self.level,
            FormulaVariable::Time => self.time,
            FormulaVariable::DeltaTime => self.delta_time,
        }
    }

    fn entity(&self, kind: EntityRefKind, id: &str) -> Result<f64, FormulaError> {
        let lookup = self.lookups[kind.index()].ok_or_else(|| FormulaError::MissingLookup {
            kind: kind.as_str(),
            id: id.to_string(),
        })?;
        lookup
            .lookup(id)
            .ok_or_else(|| FormulaError::UnknownEntity {
                kind: kind.as_str(),
                id: id.to_string(),
            })
    }
}

/// Evaluate a numeric formula at the context's level.
///
/// Piecewise formulas are assumed to be validated (strictly increasing bounds,
/// one trailing catch-all); an unvalidated formula that matches no segment
/// reports [`FormulaError::NoSegment`].
pub fn evaluate_numeric_formula(
    formula: &NumericFormula,
    context: &FormulaContext<'_>,
) -> Result<f64, FormulaError> {
    evaluate_formula_at_depth(formula, context, 1)
}

fn evaluate_formula_at_depth(
    formula: &NumericFormula,
    context: &FormulaContext<'_>,
    depth: usize,
) -> Result<f64, FormulaError> {
    if depth > MAX_TREE_DEPTH {
        return Err(FormulaError::DepthExceeded(MAX_TREE_DEPTH));
    }

    let level = context.level;
    match formula {
        NumericFormula::Constant { value } => Ok(*value),
        NumericFormula::Linear { base, slope } => Ok(base + slope * level),
        NumericFormula::Exponential {
            base,
            growth,
            offset,
        } => Ok(base * growth.powf(level) + offset),
        NumericFormula::Polynomial { coefficients } => Ok(coefficients
            .iter()
            .enumerate()
            .map(|(power, coefficient)| coefficient * level.powi(power as i32))
            .sum()),
        NumericFormula::Piecewise { pieces } => {
            let piece = pieces
                .iter()
                .find(|piece| piece.until_level.map_or(true, |bound| level < bound))
                .ok_or(FormulaError::NoSegment(level))?;
            evaluate_formula_at_depth(&piece.formula, context, depth + 1)
        }
        // Expression trees carry their own depth budget, as in validation.
        NumericFormula::Expression { expression } => evaluate_node(expression, context, 1),
    }
}

/// Evaluate a bare expression tree
pub fn evaluate_expression(
    node: &ExpressionNode,
    context: &FormulaContext<'_>,
) -> Result<f64, FormulaError> {
    evaluate_node(node, context, 1)
}

fn evaluate_node(
    node: &ExpressionNode,
    context: &FormulaContext<'_>,
    depth: usize,
) -> Result<f64, FormulaError> {
    if depth > MAX_TREE_DEPTH {
        return Err(FormulaError::DepthExceeded(MAX_TREE_DEPTH));
    }

    match node {
        ExpressionNode::Literal { value } => Ok(*value),
        ExpressionNode::Ref { target } => match target {
            RefTarget::Variable { name } => Ok(context.variable(*name)),
            RefTarget::Entity { kind, id } => context.entity(*kind, id.as_str()),
        },
        ExpressionNode::Binary { op, left, right } => {
            let l = evaluate_node(left, context, depth + 1)?;
            let r = evaluate_node(right, context, depth + 1)?;
            Ok(match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => l / r,
                BinaryOp::Pow => l.powf(r),
                BinaryOp::Min => l.min(r),
                BinaryOp::Max => l.max(r),
            })
        }
        ExpressionNode::Unary { op, operand } => {
            let v = evaluate_node(operand, context, depth + 1)?;
            Ok(match op {
                UnaryOp::Abs => v.abs(),
                UnaryOp::Ceil => v.ceil(),
                UnaryOp::Floor => v.floor(),
                UnaryOp::Round => v.round(),
                UnaryOp::Sqrt => v.sqrt(),
                UnaryOp::Log10 => v.log10(),
                UnaryOp::Ln => v.ln(),
            })
        }
        ExpressionNode::Call { name, args } => {
            let values = args
                .iter()
                .map(|arg| evaluate_node(arg, context, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            apply_call(*name, &values)
        }
    }
}

fn apply_call(name: CallName, args: &[f64]) -> Result<f64, FormulaError> {
    let arity_error = || FormulaError::Arity {
        name: name.as_str(),
        actual: args.len(),
    };

    match (name, args) {
        (CallName::Clamp, [value, min, max]) => Ok(value.max(*min).min(*max)),
        (CallName::Lerp, [from, to, t]) => Ok(from + (to - from) * t),
        (CallName::Min3, [a, b, c]) => Ok(a.min(*b).min(*c)),
        (CallName::Max3, [a, b, c]) => Ok(a.max(*b).max(*c)),
        (CallName::Pow10, [x]) => Ok(10f64.powf(*x)),
        // Degree must be validated > 0 upstream; 0 yields inf/NaN here
        (CallName::Root, [x]) => Ok(x.sqrt()),
        (CallName::Root, [x, degree]) => Ok(x.powf(1.0 / degree)),
        _ => Err(arity_error()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::PiecewiseSegment;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_basic_formulas() {
        let ctx = FormulaContext::at_level(3.0);
        assert_eq!(
            evaluate_numeric_formula(&NumericFormula::constant(7.0), &ctx).unwrap(),
            7.0
        );
        assert_eq!(
            evaluate_numeric_formula(&NumericFormula::linear(10.0, 2.0), &ctx).unwrap(),
            16.0
        );
        let exp = NumericFormula::Exponential {
            base: 2.0,
            growth: 2.0,
            offset: 1.0,
        };
        assert_eq!(evaluate_numeric_formula(&exp, &ctx).unwrap(), 17.0);
        let poly = NumericFormula::Polynomial {
            coefficients: vec![1.0, 0.0, 2.0],
        };
        assert_eq!(evaluate_numeric_formula(&poly, &ctx).unwrap(), 19.0);
    }

    #[test]
    fn test_piecewise_selection_uses_exclusive_bound() {
        let formula = NumericFormula::Piecewise {
            pieces: vec![
                PiecewiseSegment::until(5.0, NumericFormula::constant(1.0)),
                PiecewiseSegment::until(10.0, NumericFormula::constant(2.0)),
                PiecewiseSegment::catch_all(NumericFormula::constant(3.0)),
            ],
        };
        let at = |level| evaluate_numeric_formula(&formula, &FormulaContext::at_level(level));
        assert_eq!(at(0.0).unwrap(), 1.0);
        assert_eq!(at(4.99).unwrap(), 1.0);
        assert_eq!(at(5.0).unwrap(), 2.0);
        assert_eq!(at(10.0).unwrap(), 3.0);
        assert_eq!(at(1e9).unwrap(), 3.0);
    }

    #[test]
    fn test_deepest_valid_expression_evaluates_inside_piecewise() {
        let mut expression = ExpressionNode::literal(-2.0);
        for _ in 1..MAX_TREE_DEPTH {
            expression = ExpressionNode::unary(UnaryOp::Abs, expression);
        }
        let formula = NumericFormula::Piecewise {
            pieces: vec![
                PiecewiseSegment::until(1.0, NumericFormula::constant(0.0)),
                PiecewiseSegment::catch_all(NumericFormula::Expression { expression }),
            ],
        };
        crate::formula::validate_numeric_formula(&formula).unwrap();
        let value = evaluate_numeric_formula(&formula, &FormulaContext::at_level(5.0)).unwrap();
        assert_eq!(value, 2.0);
    }

    #[test]
    fn test_evaluation_is_pure() {
        let formula = NumericFormula::Expression {
            expression: ExpressionNode::binary(
                BinaryOp::Pow,
                ExpressionNode::literal(1.07),
                ExpressionNode::variable(FormulaVariable::Level),
            ),
        };
        let ctx = FormulaContext::at_level(12.0);
        let first = evaluate_numeric_formula(&formula, &ctx).unwrap();
        for _ in 0..10 {
            assert_eq!(evaluate_numeric_formula(&formula, &ctx).unwrap(), first);
        }
    }

    #[test]
    fn test_entity_lookup_sources() {
        let expr = ExpressionNode::binary(
            BinaryOp::Add,
            ExpressionNode::entity(EntityRefKind::Resource, "gold"),
            ExpressionNode::entity(EntityRefKind::Generator, "mine"),
        );
        let resources: HashMap<String, f64> = HashMap::from([("gold".to_string(), 5.0)]);
        let generators = lookup_fn(|id: &str| (id == "mine").then_some(3.0));
        let ctx = FormulaContext::at_level(0.0)
            .with_lookup(EntityRefKind::Resource, &resources)
            .with_lookup(EntityRefKind::Generator, &generators);

        assert_eq!(evaluate_expression(&expr, &ctx).unwrap(), 8.0);
    }

    #[test]
    fn test_missing_lookup_is_an_error() {
        let expr = ExpressionNode::entity(EntityRefKind::Upgrade, "boost");
        let err = evaluate_expression(&expr, &FormulaContext::at_level(0.0)).unwrap_err();
        assert!(matches!(err, FormulaError::MissingLookup { kind: "upgrade", .. }));

        let upgrades: BTreeMap<String, f64> = BTreeMap::new();
        let ctx = FormulaContext::at_level(0.0).with_lookup(EntityRefKind::Upgrade, &upgrades);
        let err = evaluate_expression(&expr, &ctx).unwrap_err();
        assert!(matches!(err, FormulaError::UnknownEntity { .. }));
    }

    #[test]
    fn test_calls() {
        let ctx = FormulaContext::at_level(0.0);
        let call = |name, args: Vec<f64>| {
            evaluate_expression(
                &ExpressionNode::call(name, args.into_iter().map(ExpressionNode::literal).collect()),
                &ctx,
            )
        };
        assert_eq!(call(CallName::Clamp, vec![15.0, 0.0, 10.0]).unwrap(), 10.0);
        assert_eq!(call(CallName::Lerp, vec![0.0, 10.0, 0.25]).unwrap(), 2.5);
        assert_eq!(call(CallName::Min3, vec![3.0, 1.0, 2.0]).unwrap(), 1.0);
        assert_eq!(call(CallName::Max3, vec![3.0, 1.0, 2.0]).unwrap(), 3.0);
        assert!(approx(call(CallName::Pow10, vec![2.0]).unwrap(), 100.0));
        assert_eq!(call(CallName::Root, vec![9.0]).unwrap(), 3.0);
        assert!(approx(call(CallName::Root, vec![27.0, 3.0]).unwrap(), 3.0));
        assert!(matches!(
            call(CallName::Pow10, vec![1.0, 2.0]),
            Err(FormulaError::Arity { name: "pow10", actual: 2 })
        ));
    }

    #[test]
    fn test_time_variables() {
        let expr = ExpressionNode::binary(
            BinaryOp::Mul,
            ExpressionNode::variable(FormulaVariable::Time),
            ExpressionNode::variable(FormulaVariable::DeltaTime),
        );
        let ctx = FormulaContext::at_level(1.0)
            .with_time(10.0)
            .with_delta_time(0.5);
        assert_eq!(evaluate_expression(&expr, &ctx).unwrap(), 5.0);
    }
}
