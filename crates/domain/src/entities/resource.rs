use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::ids::ContentId;
use crate::localization::LocalizedText;

fn default_true() -> bool {
    true
}

/// A currency or material the player accumulates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: ContentId,
    pub name: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<u32>,
    #[serde(default)]
    pub start_amount: f64,
    /// Upper bound on the stored amount; `None` is unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
}

impl Resource {
    /// Minimal unlocked resource, mostly useful in tests and fixtures
    pub fn new(id: impl Into<ContentId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: LocalizedText::new(name),
            category: None,
            tier: None,
            start_amount: 0.0,
            capacity: None,
            visible: true,
            unlocked: true,
            unlock_condition: None,
            visibility_condition: None,
            order: None,
        }
    }
}
