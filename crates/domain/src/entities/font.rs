use serde::{Deserialize, Serialize};

use crate::ids::ContentId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsdfSettings {
    pub px_range: f64,
}

impl Default for MsdfSettings {
    fn default() -> Self {
        Self { px_range: 4.0 }
    }
}

/// A font the renderer needs an MSDF atlas for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontAsset {
    pub id: ContentId,
    /// Pack-relative directory holding the pre-rendered atlas
    pub source: String,
    pub base_size_px: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height_px: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_code_point: Option<u32>,
    #[serde(default)]
    pub msdf: MsdfSettings,
}
