use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::formula::NumericFormula;
use crate::ids::ContentId;
use crate::localization::LocalizedText;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrestigeReward {
    pub resource_id: ContentId,
    pub base_reward: NumericFormula,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier_curve: Option<NumericFormula>,
}

/// A reset layer trading progress for a persistent reward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrestigeLayer {
    pub id: ContentId,
    pub name: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<LocalizedText>,
    /// Resources and generators reset when the layer is triggered
    pub reset_targets: Vec<ContentId>,
    pub unlock_condition: Condition,
    pub reward: PrestigeReward,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
}
