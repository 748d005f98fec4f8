//! Unlock and visibility conditions
//!
//! Conditions gate when content becomes available. They are recursive
//! (`allOf`, `anyOf`, `not`) and share the depth/node bounds of expression
//! trees. Evaluation is a depth-guarded recursive descent: a tree deeper than
//! the configured maximum aborts with [`ConditionError::DepthExceeded`] instead
//! of recursing further.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::DomainError;
use crate::formula::{
    evaluate_numeric_formula, validate_numeric_formula, EntityRefKind, FormulaContext,
    FormulaError, NumericFormula, MAX_TREE_DEPTH, MAX_TREE_NODES,
};
use crate::ids::ContentId;

/// Comparison used by threshold conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Comparator {
    #[default]
    Gte,
    Gt,
    Lte,
    Lt,
}

impl Comparator {
    pub fn compare(&self, actual: f64, target: f64) -> bool {
        match self {
            Comparator::Gte => actual >= target,
            Comparator::Gt => actual > target,
            Comparator::Lte => actual <= target,
            Comparator::Lt => actual < target,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Gte => ">=",
            Comparator::Gt => ">",
            Comparator::Lte => "<=",
            Comparator::Lt => "<",
        }
    }
}

fn default_purchases() -> u32 {
    1
}

/// A boolean condition over game state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Condition {
    #[default]
    Always,
    Never,
    ResourceThreshold {
        resource_id: ContentId,
        #[serde(default)]
        comparator: Comparator,
        amount: NumericFormula,
    },
    GeneratorLevel {
        generator_id: ContentId,
        #[serde(default)]
        comparator: Comparator,
        level: NumericFormula,
    },
    UpgradeOwned {
        upgrade_id: ContentId,
        #[serde(default = "default_purchases")]
        required_purchases: u32,
    },
    PrestigeUnlocked {
        prestige_layer_id: ContentId,
    },
    Flag {
        flag_id: String,
    },
    Script {
        script_id: String,
    },
    AllOf {
        conditions: Vec<Condition>,
    },
    AnyOf {
        conditions: Vec<Condition>,
    },
    Not {
        condition: Box<Condition>,
    },
}

/// An entity reference found inside a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionRef<'a> {
    pub kind: EntityRefKind,
    pub id: &'a ContentId,
}

impl Condition {
    pub fn resource_at_least(resource_id: impl Into<ContentId>, amount: f64) -> Self {
        Condition::ResourceThreshold {
            resource_id: resource_id.into(),
            comparator: Comparator::Gte,
            amount: NumericFormula::constant(amount),
        }
    }

    pub fn generator_at_least(generator_id: impl Into<ContentId>, level: f64) -> Self {
        Condition::GeneratorLevel {
            generator_id: generator_id.into(),
            comparator: Comparator::Gte,
            level: NumericFormula::constant(level),
        }
    }

    pub fn upgrade_owned(upgrade_id: impl Into<ContentId>) -> Self {
        Condition::UpgradeOwned {
            upgrade_id: upgrade_id.into(),
            required_purchases: 1,
        }
    }

    pub fn prestige_unlocked(prestige_layer_id: impl Into<ContentId>) -> Self {
        Condition::PrestigeUnlocked {
            prestige_layer_id: prestige_layer_id.into(),
        }
    }

    /// The entity this node references directly, if any
    fn direct_ref(&self) -> Option<ConditionRef<'_>> {
        let (kind, id) = match self {
            Condition::ResourceThreshold { resource_id, .. } => {
                (EntityRefKind::Resource, resource_id)
            }
            Condition::GeneratorLevel { generator_id, .. } => {
                (EntityRefKind::Generator, generator_id)
            }
            Condition::UpgradeOwned { upgrade_id, .. } => (EntityRefKind::Upgrade, upgrade_id),
            Condition::PrestigeUnlocked { prestige_layer_id } => {
                (EntityRefKind::PrestigeLayer, prestige_layer_id)
            }
            _ => return None,
        };
        Some(ConditionRef { kind, id })
    }

    /// Every entity referenced anywhere in the tree, including inside
    /// `anyOf`/`not` and inside threshold formulas.
    pub fn all_refs(&self) -> Vec<ConditionRef<'_>> {
        let mut out = Vec::new();
        self.collect_all_refs(&mut out);
        out
    }

    fn collect_all_refs<'a>(&'a self, out: &mut Vec<ConditionRef<'a>>) {
        if let Some(direct) = self.direct_ref() {
            out.push(direct);
        }
        match self {
            Condition::ResourceThreshold { amount: formula, .. }
            | Condition::GeneratorLevel { level: formula, .. } => {
                let mut refs = Vec::new();
                formula.for_each_expression(&mut |expr| expr.collect_entity_refs(&mut refs));
                out.extend(refs.into_iter().map(|(kind, id)| ConditionRef { kind, id }));
            }
            Condition::AllOf { conditions } | Condition::AnyOf { conditions } => {
                for condition in conditions {
                    condition.collect_all_refs(out);
                }
            }
            Condition::Not { condition } => condition.collect_all_refs(out),
            _ => {}
        }
    }

    /// Entity references that can only make this condition *more* satisfied
    /// as they grow: direct threshold fields and `allOf` operands.
    ///
    /// References under `anyOf` or `not` are excluded; such branches can be
    /// satisfied without the referenced entity, so they never form a hard
    /// unlock dependency.
    pub fn monotonic_refs(&self) -> Vec<ConditionRef<'_>> {
        let mut out = Vec::new();
        self.collect_monotonic_refs(&mut out);
        out
    }

    fn collect_monotonic_refs<'a>(&'a self, out: &mut Vec<ConditionRef<'a>>) {
        if let Some(direct) = self.direct_ref() {
            out.push(direct);
            return;
        }
        if let Condition::AllOf { conditions } = self {
            for condition in conditions {
                condition.collect_monotonic_refs(out);
            }
        }
    }
}

/// Enforce depth and node-count bounds and validate nested formulas.
///
/// Only `allOf`, `anyOf` and `not` contribute depth.
pub fn validate_condition(condition: &Condition) -> Result<(), DomainError> {
    let mut nodes = 0usize;
    validate_at_depth(condition, 1, &mut nodes)
}

fn validate_at_depth(
    condition: &Condition,
    depth: usize,
    nodes: &mut usize,
) -> Result<(), DomainError> {
    if depth > MAX_TREE_DEPTH {
        return Err(DomainError::depth_exceeded("condition", MAX_TREE_DEPTH, depth));
    }
    *nodes += 1;
    if *nodes > MAX_TREE_NODES {
        return Err(DomainError::node_count_exceeded(
            "condition",
            MAX_TREE_NODES,
            *nodes,
        ));
    }

    match condition {
        Condition::ResourceThreshold { amount, .. } => validate_numeric_formula(amount),
        Condition::GeneratorLevel { level, .. } => validate_numeric_formula(level),
        Condition::AllOf { conditions } | Condition::AnyOf { conditions } => conditions
            .iter()
            .try_for_each(|c| validate_at_depth(c, depth + 1, nodes)),
        Condition::Not { condition } => validate_at_depth(condition, depth + 1, nodes),
        _ => Ok(()),
    }
}

/// Error when evaluating a condition
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error("Condition evaluation exceeded maximum depth ({max_depth}); possible circular dependency")]
    DepthExceeded { max_depth: usize },
    #[error("Condition threshold formula failed: {0}")]
    Formula(#[from] FormulaError),
}

/// Game state queried while evaluating a condition
pub trait ConditionContext {
    fn resource_amount(&self, resource_id: &ContentId) -> f64;
    fn generator_level(&self, generator_id: &ContentId) -> f64;
    fn upgrade_purchases(&self, upgrade_id: &ContentId) -> u32;
    fn is_prestige_unlocked(&self, prestige_layer_id: &ContentId) -> bool;

    fn is_flag_set(&self, _flag_id: &str) -> bool {
        false
    }

    fn evaluate_script(&self, _script_id: &str) -> bool {
        false
    }

    /// Context used for threshold formulas
    fn formula_context(&self) -> FormulaContext<'_> {
        FormulaContext::at_level(0.0)
    }
}

/// Depth-guarded condition evaluator
#[derive(Debug, Clone, Copy)]
pub struct ConditionEvaluator {
    max_depth: usize,
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self {
            max_depth: MAX_TREE_DEPTH,
        }
    }
}

impl ConditionEvaluator {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn evaluate(
        &self,
        condition: &Condition,
        context: &dyn ConditionContext,
    ) -> Result<bool, ConditionError> {
        self.evaluate_at_depth(condition, context, 1)
    }

    fn evaluate_at_depth(
        &self,
        condition: &Condition,
        context: &dyn ConditionContext,
        depth: usize,
    ) -> Result<bool, ConditionError> {
        if depth > self.max_depth {
            return Err(ConditionError::DepthExceeded {
                max_depth: self.max_depth,
            });
        }

        Ok(match condition {
            Condition::Always => true,
            Condition::Never => false,
            Condition::ResourceThreshold {
                resource_id,
                comparator,
                amount,
            } => {
                let target = evaluate_numeric_formula(amount, &context.formula_context())?;
                comparator.compare(context.resource_amount(resource_id), target)
            }
            Condition::GeneratorLevel {
                generator_id,
                comparator,
                level,
            } => {
                let target = evaluate_numeric_formula(level, &context.formula_context())?;
                comparator.compare(context.generator_level(generator_id), target)
            }
            Condition::UpgradeOwned {
                upgrade_id,
                required_purchases,
            } => context.upgrade_purchases(upgrade_id) >= *required_purchases,
            Condition::PrestigeUnlocked { prestige_layer_id } => {
                context.is_prestige_unlocked(prestige_layer_id)
            }
            Condition::Flag { flag_id } => context.is_flag_set(flag_id),
            Condition::Script { script_id } => context.evaluate_script(script_id),
            Condition::AllOf { conditions } => {
                for c in conditions {
                    if !self.evaluate_at_depth(c, context, depth + 1)? {
                        return Ok(false);
                    }
                }
                true
            }
            Condition::AnyOf { conditions } => {
                for c in conditions {
                    if self.evaluate_at_depth(c, context, depth + 1)? {
                        return Ok(true);
                    }
                }
                false
            }
            Condition::Not { condition } => !self.evaluate_at_depth(condition, context, depth + 1)?,
        })
    }
}

/// Evaluate with the default depth guard
pub fn evaluate_condition(
    condition: &Condition,
    context: &dyn ConditionContext,
) -> Result<bool, ConditionError> {
    ConditionEvaluator::default().evaluate(condition, context)
}

/// Render a condition as human-readable text for diagnostics
pub fn describe_condition(condition: &Condition) -> String {
    match condition {
        Condition::Always => "always".to_string(),
        Condition::Never => "never".to_string(),
        Condition::ResourceThreshold {
            resource_id,
            comparator,
            amount,
        } => format!(
            "resource '{}' {} {}",
            resource_id,
            comparator.symbol(),
            describe_formula(amount)
        ),
        Condition::GeneratorLevel {
            generator_id,
            comparator,
            level,
        } => format!(
            "generator '{}' level {} {}",
            generator_id,
            comparator.symbol(),
            describe_formula(level)
        ),
        Condition::UpgradeOwned {
            upgrade_id,
            required_purchases,
        } => {
            if *required_purchases <= 1 {
                format!("owns upgrade '{}'", upgrade_id)
            } else {
                format!("owns upgrade '{}' x{}", upgrade_id, required_purchases)
            }
        }
        Condition::PrestigeUnlocked { prestige_layer_id } => {
            format!("prestige layer '{}' unlocked", prestige_layer_id)
        }
        Condition::Flag { flag_id } => format!("flag '{}' set", flag_id),
        Condition::Script { script_id } => format!("script '{}'", script_id),
        Condition::AllOf { conditions } => join_described(conditions, " and "),
        Condition::AnyOf { conditions } => join_described(conditions, " or "),
        Condition::Not { condition } => format!("not {}", describe_condition(condition)),
    }
}

fn join_described(conditions: &[Condition], separator: &str) -> String {
    let parts: Vec<String> = conditions.iter().map(describe_condition).collect();
    format!("({})", parts.join(separator))
}

fn describe_formula(formula: &NumericFormula) -> String {
    match formula.as_constant() {
        Some(value) => value.to_string(),
        None => "<formula>".to_string(),
    }
}
