//! Artifact synchronization
//!
//! Inventory existing artifacts, write each compiled pack's files (only when
//! the bytes differ), then prune whatever no pack claimed. Failed packs
//! claim nothing, so their stale outputs disappear.

pub mod inventory;
pub mod layout;
pub mod writer;

use std::io;
use std::path::{Path, PathBuf};

use packforge_domain::PackSlug;
use thiserror::Error;

use crate::artifact::fonts::{renderer_manifest, FontArtifact, ATLAS_FILE, FONT_METADATA_FILE};
use crate::artifact::module_source::render_module;
use crate::artifact::{ArtifactError, CompiledArtifact, SerializedContentPack};

pub use inventory::{scan, Inventory, InventoryEntry};
pub use layout::PackLayout;
pub use writer::{
    write_atomic, ArtifactKind, ArtifactWriteOperation, ArtifactWriter, SyncReport, WriteAction,
};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl SyncError {
    pub fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        SyncError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Rendered files of one compiled pack, ready to synchronize
#[derive(Debug, Clone)]
pub struct PackArtifacts {
    pub slug: PackSlug,
    pub layout: PackLayout,
    pub normalized_json: String,
    pub module_source: String,
    pub fonts: Vec<FontArtifact>,
}

impl PackArtifacts {
    pub fn render(
        artifact: &CompiledArtifact,
        fonts: Vec<FontArtifact>,
        package_root: &Path,
    ) -> Result<Self, ArtifactError> {
        let slug = artifact.normalized_pack.slug().clone();
        Ok(Self {
            layout: PackLayout::new(package_root, slug.clone()),
            normalized_json: SerializedContentPack::from_artifact(artifact).to_json()?,
            module_source: render_module(artifact)?,
            fonts,
            slug,
        })
    }

    fn write(&self, writer: &mut ArtifactWriter) -> Result<(), SyncError> {
        writer.write(
            &self.slug,
            ArtifactKind::Json,
            &self.layout.normalized_json(),
            self.normalized_json.as_bytes(),
        )?;
        writer.write(
            &self.slug,
            ArtifactKind::Module,
            &self.layout.generated_module(),
            self.module_source.as_bytes(),
        )?;

        if self.fonts.is_empty() {
            return Ok(());
        }
        for font in &self.fonts {
            let dir = self.layout.font_dir(&font.directory);
            writer.write(&self.slug, ArtifactKind::Asset, &dir.join(ATLAS_FILE), &font.atlas)?;
            writer.write(
                &self.slug,
                ArtifactKind::Asset,
                &dir.join(FONT_METADATA_FILE),
                font.metadata.as_bytes(),
            )?;
        }
        writer.write(
            &self.slug,
            ArtifactKind::Asset,
            &self.layout.renderer_manifest(),
            renderer_manifest(&self.fonts).as_bytes(),
        )?;
        Ok(())
    }
}

/// Synchronize all compiled packs against the artifacts under
/// `package_roots`. `package_roots` should cover every discovered package,
/// failed ones included, so their stale artifacts are pruned.
pub fn synchronize(
    package_roots: &[PathBuf],
    packs: &[PackArtifacts],
    check: bool,
) -> Result<SyncReport, SyncError> {
    let inventory = scan(package_roots)?;
    let mut writer = ArtifactWriter::new(check);

    for pack in packs {
        pack.write(&mut writer)?;
    }
    writer.prune(&inventory)?;

    let report = writer.finish();
    tracing::info!(
        written = report.count(WriteAction::Written),
        unchanged = report.count(WriteAction::Unchanged),
        deleted = report.count(WriteAction::Deleted),
        would_write = report.count(WriteAction::WouldWrite),
        would_delete = report.count(WriteAction::WouldDelete),
        check,
        "artifacts synchronized"
    );
    Ok(report)
}
