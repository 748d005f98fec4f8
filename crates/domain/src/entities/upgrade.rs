use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::entities::generator::PurchaseCost;
use crate::formula::NumericFormula;
use crate::ids::ContentId;
use crate::localization::LocalizedText;

/// What an upgrade applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum UpgradeTarget {
    Resource { id: ContentId },
    Generator { id: ContentId },
    Global,
}

/// How an effect combines with the current value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EffectOperation {
    Add,
    Multiply,
    Set,
}

/// A change applied once an upgrade is owned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UpgradeEffect {
    ModifyResourceRate {
        resource_id: ContentId,
        operation: EffectOperation,
        value: NumericFormula,
    },
    ModifyGeneratorRate {
        generator_id: ContentId,
        operation: EffectOperation,
        value: NumericFormula,
    },
    ModifyGeneratorCost {
        generator_id: ContentId,
        operation: EffectOperation,
        value: NumericFormula,
    },
    GrantFlag {
        flag_id: String,
    },
    UnlockResource {
        resource_id: ContentId,
    },
    UnlockGenerator {
        generator_id: ContentId,
    },
}

impl UpgradeEffect {
    /// The formula carried by this effect, if any
    pub fn value(&self) -> Option<&NumericFormula> {
        match self {
            UpgradeEffect::ModifyResourceRate { value, .. }
            | UpgradeEffect::ModifyGeneratorRate { value, .. }
            | UpgradeEffect::ModifyGeneratorCost { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Repeat-purchase settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repeatable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_purchases: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_curve: Option<NumericFormula>,
}

/// A one-off (or repeatable) purchase that modifies other content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upgrade {
    pub id: ContentId,
    pub name: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<UpgradeTarget>,
    pub cost: PurchaseCost,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeatable: Option<Repeatable>,
    /// Every prerequisite must hold before the upgrade can be bought
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<UpgradeEffect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
}
