//! Packforge Domain - content pack model, formulas and conditions
//!
//! Everything here is pure data and pure functions: no I/O, no clocks.

pub mod condition;
pub mod entities;
pub mod error;
pub mod formula;
pub mod ids;
pub mod localization;
pub mod pack;

pub use condition::{
    describe_condition, evaluate_condition, validate_condition, Comparator, Condition,
    ConditionContext, ConditionError, ConditionEvaluator, ConditionRef,
};
pub use entities::{
    Achievement, AchievementReward, ContentKind, EffectOperation, FontAsset, Generator,
    MsdfSettings, PrestigeLayer, PrestigeReward, PurchaseCost, Repeatable, Resource, ResourceRate,
    Transform, TransformEndpoint, TransformMode, TransformTrigger, Upgrade, UpgradeEffect,
    UpgradeTarget,
};
pub use error::DomainError;
pub use formula::{
    evaluate_expression, evaluate_numeric_formula, lookup_fn, validate_expression,
    validate_numeric_formula, BinaryOp, CallName, EntityLookup, EntityRefKind, ExpressionNode,
    FormulaContext, FormulaError, FormulaVariable, NumericFormula, PiecewiseSegment, RefTarget,
    UnaryOp, MAX_TREE_DEPTH, MAX_TREE_NODES,
};
pub use ids::{is_valid_slug, ContentId, PackSlug};
pub use localization::LocalizedText;
pub use pack::{
    DependencyCollection, DependencyEdge, IndexEntry, NormalizedContentPack, PackIndex,
    PackMetadata, PackModules,
};
