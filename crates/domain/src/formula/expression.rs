//! Expression tree nodes used by `expression` formulas

use serde::{Deserialize, Serialize};

use super::{MAX_TREE_DEPTH, MAX_TREE_NODES};
use crate::error::DomainError;
use crate::ids::ContentId;

/// Built-in variables an expression may read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormulaVariable {
    Level,
    Time,
    DeltaTime,
}

/// Kinds of entity an expression may reference by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityRefKind {
    Resource,
    Generator,
    Upgrade,
    Automation,
    PrestigeLayer,
}

impl EntityRefKind {
    pub const ALL: [EntityRefKind; 5] = [
        EntityRefKind::Resource,
        EntityRefKind::Generator,
        EntityRefKind::Upgrade,
        EntityRefKind::Automation,
        EntityRefKind::PrestigeLayer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityRefKind::Resource => "resource",
            EntityRefKind::Generator => "generator",
            EntityRefKind::Upgrade => "upgrade",
            EntityRefKind::Automation => "automation",
            EntityRefKind::PrestigeLayer => "prestigeLayer",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            EntityRefKind::Resource => 0,
            EntityRefKind::Generator => 1,
            EntityRefKind::Upgrade => 2,
            EntityRefKind::Automation => 3,
            EntityRefKind::PrestigeLayer => 4,
        }
    }
}

/// What a `ref` node points at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RefTarget {
    Variable { name: FormulaVariable },
    Entity { kind: EntityRefKind, id: ContentId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnaryOp {
    Abs,
    Ceil,
    Floor,
    Round,
    Sqrt,
    Log10,
    Ln,
}

/// Named functions callable from an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallName {
    /// `clamp(value, min, max)`
    Clamp,
    /// `lerp(from, to, t)`
    Lerp,
    Min3,
    Max3,
    /// `pow10(x)` = 10^x
    Pow10,
    /// `root(x)` or `root(x, degree)`; degree defaults to 2
    Root,
}

impl CallName {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallName::Clamp => "clamp",
            CallName::Lerp => "lerp",
            CallName::Min3 => "min3",
            CallName::Max3 => "max3",
            CallName::Pow10 => "pow10",
            CallName::Root => "root",
        }
    }

    /// Accepted argument counts (inclusive range)
    pub fn arity(&self) -> (usize, usize) {
        match self {
            CallName::Clamp | CallName::Lerp | CallName::Min3 | CallName::Max3 => (3, 3),
            CallName::Pow10 => (1, 1),
            CallName::Root => (1, 2),
        }
    }
}

/// A node of an expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExpressionNode {
    Literal {
        value: f64,
    },
    Ref {
        target: RefTarget,
    },
    Binary {
        op: BinaryOp,
        left: Box<ExpressionNode>,
        right: Box<ExpressionNode>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<ExpressionNode>,
    },
    Call {
        name: CallName,
        args: Vec<ExpressionNode>,
    },
}

impl ExpressionNode {
    pub fn literal(value: f64) -> Self {
        Self::Literal { value }
    }

    pub fn variable(name: FormulaVariable) -> Self {
        Self::Ref {
            target: RefTarget::Variable { name },
        }
    }

    pub fn entity(kind: EntityRefKind, id: impl Into<ContentId>) -> Self {
        Self::Ref {
            target: RefTarget::Entity {
                kind,
                id: id.into(),
            },
        }
    }

    pub fn binary(op: BinaryOp, left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: ExpressionNode) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn call(name: CallName, args: Vec<ExpressionNode>) -> Self {
        Self::Call { name, args }
    }

    /// Append every entity reference in this tree to `out`, in traversal order.
    pub fn collect_entity_refs<'a>(&'a self, out: &mut Vec<(EntityRefKind, &'a ContentId)>) {
        match self {
            ExpressionNode::Literal { .. } => {}
            ExpressionNode::Ref { target } => {
                if let RefTarget::Entity { kind, id } = target {
                    out.push((*kind, id));
                }
            }
            ExpressionNode::Binary { left, right, .. } => {
                left.collect_entity_refs(out);
                right.collect_entity_refs(out);
            }
            ExpressionNode::Unary { operand, .. } => operand.collect_entity_refs(out),
            ExpressionNode::Call { args, .. } => {
                for arg in args {
                    arg.collect_entity_refs(out);
                }
            }
        }
    }
}

/// Enforce the depth and node-count bounds on a parsed expression.
///
/// Walks the tree with explicit counters and stops as soon as either bound is
/// crossed, so a pathological tree is rejected without being fully visited.
pub fn validate_expression(node: &ExpressionNode) -> Result<(), DomainError> {
    let mut nodes = 0usize;
    walk_bounds(node, 1, &mut nodes)
}

fn walk_bounds(node: &ExpressionNode, depth: usize, nodes: &mut usize) -> Result<(), DomainError> {
    if depth > MAX_TREE_DEPTH {
        return Err(DomainError::depth_exceeded("expression", MAX_TREE_DEPTH, depth));
    }
    *nodes += 1;
    if *nodes > MAX_TREE_NODES {
        return Err(DomainError::node_count_exceeded(
            "expression",
            MAX_TREE_NODES,
            *nodes,
        ));
    }

    match node {
        ExpressionNode::Literal { value } => {
            if !value.is_finite() {
                return Err(DomainError::validation("expression literal must be finite"));
            }
            Ok(())
        }
        ExpressionNode::Ref { .. } => Ok(()),
        ExpressionNode::Binary { left, right, .. } => {
            walk_bounds(left, depth + 1, nodes)?;
            walk_bounds(right, depth + 1, nodes)
        }
        ExpressionNode::Unary { operand, .. } => walk_bounds(operand, depth + 1, nodes),
        ExpressionNode::Call { name, args } => {
            let (min, max) = name.arity();
            if args.len() < min || args.len() > max {
                return Err(DomainError::validation(format!(
                    "call '{}' expects {} argument(s), got {}",
                    name.as_str(),
                    if min == max {
                        min.to_string()
                    } else {
                        format!("{}-{}", min, max)
                    },
                    args.len()
                )));
            }
            for arg in args {
                walk_bounds(arg, depth + 1, nodes)?;
            }
            Ok(())
        }
    }
}
