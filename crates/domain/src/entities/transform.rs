use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::formula::NumericFormula;
use crate::ids::ContentId;
use crate::localization::LocalizedText;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransformMode {
    #[default]
    Instant,
    Continuous,
    Batch,
}

/// When a transform runs
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TransformTrigger {
    #[default]
    Manual,
    Condition { condition: Condition },
    Event { event_id: String },
}

/// An amount of one resource consumed or produced by a transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformEndpoint {
    pub resource_id: ContentId,
    pub amount: NumericFormula,
}

impl TransformEndpoint {
    pub fn constant(resource_id: impl Into<ContentId>, amount: f64) -> Self {
        Self {
            resource_id: resource_id.into(),
            amount: NumericFormula::constant(amount),
        }
    }
}

/// Converts input resources into output resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub id: ContentId,
    pub name: LocalizedText,
    #[serde(default)]
    pub mode: TransformMode,
    pub inputs: Vec<TransformEndpoint>,
    pub outputs: Vec<TransformEndpoint>,
    #[serde(default)]
    pub trigger: TransformTrigger,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<NumericFormula>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,
}

impl Transform {
    /// Minimal manual transform, mostly useful in tests and fixtures
    pub fn new(
        id: impl Into<ContentId>,
        inputs: Vec<TransformEndpoint>,
        outputs: Vec<TransformEndpoint>,
    ) -> Self {
        let id = id.into();
        Self {
            name: LocalizedText::new(id.as_str()),
            id,
            mode: TransformMode::Instant,
            inputs,
            outputs,
            trigger: TransformTrigger::Manual,
            cooldown: None,
            unlock_condition: None,
            visibility_condition: None,
            order: None,
        }
    }
}
