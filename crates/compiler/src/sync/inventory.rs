//! Pre-pass listing every artifact already on disk
//!
//! Only names the compiler owns are collected: `*.normalized.json` and
//! `*.assets/` under `content/compiled`, `*.generated.ts` under
//! `src/generated`, and orphan temp files in either place. Anything else in
//! those directories is left alone.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use packforge_domain::PackSlug;

use super::layout::{
    is_orphan_temp_file, slug_from_artifact_name, ASSETS_SUFFIX, COMPILED_DIR, GENERATED_DIR,
    GENERATED_SUFFIX, NORMALIZED_SUFFIX,
};
use super::writer::ArtifactKind;
use super::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub slug: Option<PackSlug>,
    pub is_dir: bool,
}

/// Existing artifacts, sorted by path so directories precede their contents
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    entries: Vec<InventoryEntry>,
}

impl Inventory {
    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_dir_if_exists(dir: &Path) -> Result<Vec<fs::DirEntry>, SyncError> {
    let reader = match fs::read_dir(dir) {
        Ok(reader) => reader,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SyncError::io("list", dir, e)),
    };
    reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SyncError::io("list", dir, e))
}

fn temp_kind(name: &str) -> ArtifactKind {
    if name.contains(GENERATED_SUFFIX) {
        ArtifactKind::Module
    } else if name.contains(NORMALIZED_SUFFIX) {
        ArtifactKind::Json
    } else {
        ArtifactKind::Asset
    }
}

/// Collect the artifacts of every package root.
pub fn scan(package_roots: &[PathBuf]) -> Result<Inventory, SyncError> {
    let mut entries = Vec::new();

    for root in package_roots {
        for entry in read_dir_if_exists(&root.join(COMPILED_DIR))? {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry
                .file_type()
                .map_err(|e| SyncError::io("inspect", &path, e))?
                .is_dir();

            if is_dir && name.ends_with(ASSETS_SUFFIX) {
                let slug = slug_from_artifact_name(&name);
                walk_assets(&path, slug.as_ref(), &mut entries)?;
                entries.push(InventoryEntry {
                    path,
                    kind: ArtifactKind::Asset,
                    slug,
                    is_dir: true,
                });
            } else if !is_dir && name.ends_with(NORMALIZED_SUFFIX) {
                entries.push(InventoryEntry {
                    path,
                    kind: ArtifactKind::Json,
                    slug: slug_from_artifact_name(&name),
                    is_dir: false,
                });
            } else if !is_dir && is_orphan_temp_file(&name) {
                entries.push(InventoryEntry {
                    path,
                    kind: temp_kind(&name),
                    slug: None,
                    is_dir: false,
                });
            }
        }

        for entry in read_dir_if_exists(&root.join(GENERATED_DIR))? {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if path.is_dir() {
                continue;
            }
            if name.ends_with(GENERATED_SUFFIX) {
                entries.push(InventoryEntry {
                    path,
                    kind: ArtifactKind::Module,
                    slug: slug_from_artifact_name(&name),
                    is_dir: false,
                });
            } else if is_orphan_temp_file(&name) {
                entries.push(InventoryEntry {
                    path,
                    kind: ArtifactKind::Module,
                    slug: None,
                    is_dir: false,
                });
            }
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    entries.dedup_by(|a, b| a.path == b.path);
    tracing::debug!(count = entries.len(), "artifact inventory collected");
    Ok(Inventory { entries })
}

/// Everything below an assets directory, iteratively
fn walk_assets(
    dir: &Path,
    slug: Option<&PackSlug>,
    out: &mut Vec<InventoryEntry>,
) -> Result<(), SyncError> {
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in read_dir_if_exists(&current)? {
            let path = entry.path();
            let is_dir = entry
                .file_type()
                .map_err(|e| SyncError::io("inspect", &path, e))?
                .is_dir();
            if is_dir {
                pending.push(path.clone());
            }
            out.push(InventoryEntry {
                path,
                kind: ArtifactKind::Asset,
                slug: slug.cloned(),
                is_dir,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_scan_collects_owned_names_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("packages/core");
        touch(&root.join("content/compiled/core.normalized.json"));
        touch(&root.join("content/compiled/core.assets/fonts/body/atlas.png"));
        touch(&root.join("content/compiled/.core.normalized.json.x1y2.tmp"));
        touch(&root.join("content/compiled/README.md"));
        touch(&root.join("src/generated/core.generated.ts"));
        touch(&root.join("src/generated/helpers.ts"));

        let inventory = scan(&[root.clone()]).unwrap();
        let relative: Vec<String> = inventory
            .entries()
            .iter()
            .map(|e| {
                e.path
                    .strip_prefix(&root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();

        assert_eq!(
            relative,
            vec![
                "content/compiled/.core.normalized.json.x1y2.tmp",
                "content/compiled/core.assets",
                "content/compiled/core.assets/fonts",
                "content/compiled/core.assets/fonts/body",
                "content/compiled/core.assets/fonts/body/atlas.png",
                "content/compiled/core.normalized.json",
                "src/generated/core.generated.ts",
            ]
        );
        let temp = &inventory.entries()[0];
        assert_eq!(temp.kind, ArtifactKind::Json);
        assert_eq!(temp.slug, None);
        assert!(inventory.entries()[1].is_dir);
    }

    #[test]
    fn test_missing_directories_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let inventory = scan(&[dir.path().join("packages/none")]).unwrap();
        assert!(inventory.is_empty());
    }
}
