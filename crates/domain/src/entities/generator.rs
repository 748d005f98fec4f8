use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::formula::NumericFormula;
use crate::ids::ContentId;
use crate::localization::LocalizedText;

fn default_multiplier() -> f64 {
    1.0
}

/// Per-second production or consumption of one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRate {
    pub resource_id: ContentId,
    pub rate: NumericFormula,
}

/// How a generator level is bought
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseCost {
    pub currency_id: ContentId,
    #[serde(default = "default_multiplier")]
    pub cost_multiplier: f64,
    pub cost_curve: NumericFormula,
}

/// Something that produces resources over time as it levels up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generator {
    pub id: ContentId,
    pub name: LocalizedText,
    pub produces: Vec<ResourceRate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<ResourceRate>,
    pub purchase: PurchaseCost,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_level: Option<u32>,
    /// Gate that makes the generator purchasable
    #[serde(default)]
    pub base_unlock: Condition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
}
