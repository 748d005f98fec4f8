//! Content entities declared by a pack

mod achievement;
mod font;
mod generator;
mod prestige_layer;
mod resource;
mod transform;
mod upgrade;

use serde::{Deserialize, Serialize};

pub use achievement::{Achievement, AchievementReward};
pub use font::{FontAsset, MsdfSettings};
pub use generator::{Generator, PurchaseCost, ResourceRate};
pub use prestige_layer::{PrestigeLayer, PrestigeReward};
pub use resource::Resource;
pub use transform::{Transform, TransformEndpoint, TransformMode, TransformTrigger};
pub use upgrade::{EffectOperation, Repeatable, Upgrade, UpgradeEffect, UpgradeTarget};

use crate::formula::EntityRefKind;

/// The module an entity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentKind {
    Resource,
    Generator,
    Upgrade,
    Transform,
    Achievement,
    PrestigeLayer,
    Font,
}

impl ContentKind {
    /// Modules in serialization order
    pub const ALL: [ContentKind; 7] = [
        ContentKind::Resource,
        ContentKind::Generator,
        ContentKind::Upgrade,
        ContentKind::Transform,
        ContentKind::Achievement,
        ContentKind::PrestigeLayer,
        ContentKind::Font,
    ];

    /// Singular name used in diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Resource => "resource",
            ContentKind::Generator => "generator",
            ContentKind::Upgrade => "upgrade",
            ContentKind::Transform => "transform",
            ContentKind::Achievement => "achievement",
            ContentKind::PrestigeLayer => "prestigeLayer",
            ContentKind::Font => "font",
        }
    }

    /// Module key in the pack document
    pub fn module_name(&self) -> &'static str {
        match self {
            ContentKind::Resource => "resources",
            ContentKind::Generator => "generators",
            ContentKind::Upgrade => "upgrades",
            ContentKind::Transform => "transforms",
            ContentKind::Achievement => "achievements",
            ContentKind::PrestigeLayer => "prestigeLayers",
            ContentKind::Font => "fonts",
        }
    }

    /// The content kind an entity reference must resolve to.
    ///
    /// Automations are runtime-defined and have no module here.
    pub fn for_ref(kind: EntityRefKind) -> Option<ContentKind> {
        match kind {
            EntityRefKind::Resource => Some(ContentKind::Resource),
            EntityRefKind::Generator => Some(ContentKind::Generator),
            EntityRefKind::Upgrade => Some(ContentKind::Upgrade),
            EntityRefKind::PrestigeLayer => Some(ContentKind::PrestigeLayer),
            EntityRefKind::Automation => None,
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
