use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::formula::NumericFormula;
use crate::ids::ContentId;
use crate::localization::LocalizedText;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AchievementReward {
    GrantResource {
        resource_id: ContentId,
        amount: NumericFormula,
    },
    GrantFlag {
        flag_id: String,
    },
}

/// A milestone tracked by a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: ContentId,
    pub name: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedText>,
    /// Completes the achievement once satisfied
    pub track: Condition,
    /// Gate before the achievement is shown or tracked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<AchievementReward>,
    #[serde(default)]
    pub hidden: bool,
}
