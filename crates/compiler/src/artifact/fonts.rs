//! Font atlas assets and the renderer asset manifest

use std::fs;
use std::path::{Path, PathBuf};

use packforge_domain::{ContentId, FontAsset, NormalizedContentPack};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use super::canonical::to_canonical_pretty;
use super::digest::sha256_hex;

pub const FONT_METADATA_SCHEMA_VERSION: u32 = 1;
pub const RENDERER_MANIFEST_SCHEMA_VERSION: u32 = 4;

pub const ATLAS_FILE: &str = "atlas.png";
pub const GLYPHS_FILE: &str = "glyphs.json";
pub const FONT_METADATA_FILE: &str = "font.json";

#[derive(Debug, Error)]
pub enum FontAtlasError {
    #[error("Font '{font}': cannot read {path}: {source}")]
    Io {
        font: ContentId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Font '{font}': invalid glyph table {path}: {source}")]
    Glyphs {
        font: ContentId,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Font '{font}': {message}")]
    Invalid { font: ContentId, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Glyph {
    pub code_point: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub x_offset_px: f64,
    pub y_offset_px: f64,
    pub x_advance_px: f64,
}

/// Raster atlas plus its glyph table
#[derive(Debug, Clone, PartialEq)]
pub struct FontAtlas {
    pub image: Vec<u8>,
    pub glyphs: Vec<Glyph>,
}

/// Produces the MSDF atlas for a declared font
#[cfg_attr(test, mockall::automock)]
pub trait FontAtlasPort {
    fn render(&self, font: &FontAsset, content_dir: &Path) -> Result<FontAtlas, FontAtlasError>;
}

/// Reads atlases rendered ahead of time: `<content>/<source>/atlas.png` and
/// `<content>/<source>/glyphs.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrebuiltFontAtlas;

impl FontAtlasPort for PrebuiltFontAtlas {
    fn render(&self, font: &FontAsset, content_dir: &Path) -> Result<FontAtlas, FontAtlasError> {
        let dir = content_dir.join(&font.source);
        let read = |name: &str| {
            let path = dir.join(name);
            fs::read(&path).map_err(|source| FontAtlasError::Io {
                font: font.id.clone(),
                path,
                source,
            })
        };
        let image = read(ATLAS_FILE)?;
        let glyphs_bytes = read(GLYPHS_FILE)?;
        let glyphs = serde_json::from_slice(&glyphs_bytes).map_err(|source| {
            FontAtlasError::Glyphs {
                font: font.id.clone(),
                path: dir.join(GLYPHS_FILE),
                source,
            }
        })?;
        Ok(FontAtlas { image, glyphs })
    }
}

/// One font's files under `<slug>.assets/fonts/<encoded-id>/`
#[derive(Debug, Clone, PartialEq)]
pub struct FontArtifact {
    pub id: ContentId,
    pub directory: String,
    pub atlas: Vec<u8>,
    pub metadata: String,
    pub content_hash: String,
}

/// Percent-encode everything outside `[A-Za-z0-9._-]` so an id is always a
/// single safe path segment.
pub fn encode_asset_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    if out.starts_with('.') {
        out.replace_range(0..1, "%2E");
    }
    out
}

fn font_metadata(font: &FontAsset, glyphs: &[Glyph]) -> serde_json::Result<String> {
    let mut glyphs = glyphs.to_vec();
    glyphs.sort_by_key(|g| g.code_point);
    let mut value = json!({
        "schemaVersion": FONT_METADATA_SCHEMA_VERSION,
        "id": font.id.as_str(),
        "technique": "msdf",
        "baseFontSizePx": font.base_size_px,
        "lineHeightPx": font.line_height_px.unwrap_or(font.base_size_px),
        "glyphs": serde_json::to_value(&glyphs)?,
        "msdf": { "pxRange": font.msdf.px_range },
    });
    if let (Some(code_point), Some(map)) = (font.fallback_code_point, value.as_object_mut()) {
        map.insert("fallbackCodePoint".to_string(), json!(code_point));
    }
    Ok(to_canonical_pretty(&value))
}

/// Render every declared font of a pack. Fonts come back sorted by id.
pub fn build_font_artifacts(
    pack: &NormalizedContentPack,
    content_dir: &Path,
    port: &dyn FontAtlasPort,
) -> Result<Vec<FontArtifact>, FontAtlasError> {
    let mut fonts: Vec<&FontAsset> = pack.modules().fonts.iter().collect();
    fonts.sort_by(|a, b| a.id.cmp(&b.id));

    let mut out = Vec::with_capacity(fonts.len());
    for font in fonts {
        let atlas = port.render(font, content_dir)?;
        if atlas.glyphs.is_empty() {
            return Err(FontAtlasError::Invalid {
                font: font.id.clone(),
                message: "atlas has no glyphs".to_string(),
            });
        }
        if let Some(fallback) = font.fallback_code_point {
            if !atlas.glyphs.iter().any(|g| g.code_point == fallback) {
                return Err(FontAtlasError::Invalid {
                    font: font.id.clone(),
                    message: format!("fallback code point {} has no glyph", fallback),
                });
            }
        }

        let metadata = font_metadata(font, &atlas.glyphs).map_err(|e| FontAtlasError::Invalid {
            font: font.id.clone(),
            message: e.to_string(),
        })?;
        let mut hashed = atlas.image.clone();
        hashed.extend_from_slice(metadata.as_bytes());

        tracing::debug!(font = %font.id, glyphs = atlas.glyphs.len(), "font atlas ready");
        out.push(FontArtifact {
            id: font.id.clone(),
            directory: encode_asset_id(font.id.as_str()),
            content_hash: sha256_hex(&hashed),
            atlas: atlas.image,
            metadata,
        });
    }
    Ok(out)
}

/// `renderer-assets.manifest.json` contents
pub fn renderer_manifest(fonts: &[FontArtifact]) -> String {
    let mut assets: Vec<serde_json::Value> = fonts
        .iter()
        .map(|font| {
            json!({
                "id": font.id.as_str(),
                "kind": "font",
                "contentHash": font.content_hash,
            })
        })
        .collect();
    assets.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));
    to_canonical_pretty(&json!({
        "schemaVersion": RENDERER_MANIFEST_SCHEMA_VERSION,
        "assets": assets,
    }))
}
