//! Idempotent artifact writes and pruning

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use packforge_domain::PackSlug;
use serde::{Deserialize, Serialize};

use super::inventory::Inventory;
use super::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Json,
    Module,
    Asset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteAction {
    Written,
    Unchanged,
    WouldWrite,
    Deleted,
    WouldDelete,
}

impl WriteAction {
    pub const ALL: [WriteAction; 5] = [
        WriteAction::Written,
        WriteAction::Unchanged,
        WriteAction::WouldWrite,
        WriteAction::Deleted,
        WriteAction::WouldDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WriteAction::Written => "written",
            WriteAction::Unchanged => "unchanged",
            WriteAction::WouldWrite => "would-write",
            WriteAction::Deleted => "deleted",
            WriteAction::WouldDelete => "would-delete",
        }
    }

    /// True for actions that change (or would change) the disk
    pub fn is_change(&self) -> bool {
        !matches!(self, WriteAction::Unchanged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactWriteOperation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<PackSlug>,
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub action: WriteAction,
}

/// Every operation of one synchronization run, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub operations: Vec<ArtifactWriteOperation>,
}

impl SyncReport {
    pub fn count(&self, action: WriteAction) -> usize {
        self.operations.iter().filter(|op| op.action == action).count()
    }

    pub fn has_changes(&self) -> bool {
        self.operations.iter().any(|op| op.action.is_change())
    }
}

/// Writes artifacts atomically, skipping unchanged bytes, and prunes what
/// nobody claimed. In check mode nothing on disk is touched.
#[derive(Debug)]
pub struct ArtifactWriter {
    check: bool,
    claimed: BTreeSet<PathBuf>,
    report: SyncReport,
}

impl ArtifactWriter {
    pub fn new(check: bool) -> Self {
        Self {
            check,
            claimed: BTreeSet::new(),
            report: SyncReport::default(),
        }
    }

    pub fn write(
        &mut self,
        slug: &PackSlug,
        kind: ArtifactKind,
        path: &Path,
        contents: &[u8],
    ) -> Result<WriteAction, SyncError> {
        self.claimed.insert(path.to_path_buf());

        let action = match fs::read(path) {
            Ok(existing) if existing == contents => WriteAction::Unchanged,
            Ok(_) => self.replace(path, contents)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.replace(path, contents)?,
            Err(e) => return Err(SyncError::io("read", path, e)),
        };

        tracing::debug!(slug = %slug, path = ?path, action = action.as_str(), "artifact");
        self.report.operations.push(ArtifactWriteOperation {
            slug: Some(slug.clone()),
            kind,
            path: path.to_path_buf(),
            action,
        });
        Ok(action)
    }

    fn replace(&self, path: &Path, contents: &[u8]) -> Result<WriteAction, SyncError> {
        if self.check {
            return Ok(WriteAction::WouldWrite);
        }
        write_atomic(path, contents)?;
        Ok(WriteAction::Written)
    }

    /// True when `path` or something below it was written this run
    fn is_claimed(&self, path: &Path) -> bool {
        self.claimed
            .range(path.to_path_buf()..)
            .next()
            .is_some_and(|claimed| claimed.starts_with(path))
    }

    /// Delete (or report) every inventoried artifact not claimed this run.
    pub fn prune(&mut self, inventory: &Inventory) -> Result<(), SyncError> {
        let mut removed_dirs: Vec<&Path> = Vec::new();

        for entry in inventory.entries() {
            if removed_dirs.iter().any(|dir| entry.path.starts_with(dir)) {
                continue;
            }
            if self.is_claimed(&entry.path) {
                continue;
            }

            let action = if self.check {
                WriteAction::WouldDelete
            } else {
                let result = if entry.is_dir {
                    fs::remove_dir_all(&entry.path)
                } else {
                    fs::remove_file(&entry.path)
                };
                match result {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(SyncError::io("delete", &entry.path, e)),
                }
                WriteAction::Deleted
            };
            if entry.is_dir {
                removed_dirs.push(&entry.path);
            }

            tracing::warn!(path = ?entry.path, action = action.as_str(), "pruning stale artifact");
            self.report.operations.push(ArtifactWriteOperation {
                slug: entry.slug.clone(),
                kind: entry.kind,
                path: entry.path.clone(),
                action,
            });
        }
        Ok(())
    }

    pub fn finish(self) -> SyncReport {
        self.report
    }
}

/// Write through a temp file in the target directory, then rename over the
/// target. The temp file is removed when any step fails.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), SyncError> {
    let dir = path
        .parent()
        .ok_or_else(|| SyncError::io("write", path, io::Error::other("no parent directory")))?;
    fs::create_dir_all(dir).map_err(|e| SyncError::io("create directory", dir, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut temp = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| SyncError::io("create temp file", dir, e))?;

    temp.write_all(contents)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| SyncError::io("write", temp.path(), e))?;
    temp.persist(path)
        .map_err(|e| SyncError::io("rename", path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::inventory::scan;

    fn slug() -> PackSlug {
        PackSlug::from("core")
    }

    #[test]
    fn test_write_then_unchanged_keeps_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/core.normalized.json");

        let mut writer = ArtifactWriter::new(false);
        let first = writer.write(&slug(), ArtifactKind::Json, &path, b"{}\n").unwrap();
        assert_eq!(first, WriteAction::Written);
        let mtime = fs::metadata(&path).unwrap().modified().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(20));
        let second = writer.write(&slug(), ArtifactKind::Json, &path, b"{}\n").unwrap();
        assert_eq!(second, WriteAction::Unchanged);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), mtime);

        let report = writer.finish();
        assert_eq!(report.count(WriteAction::Written), 1);
        assert_eq!(report.count(WriteAction::Unchanged), 1);
    }

    #[test]
    fn test_changed_bytes_rewritten_without_temp_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.generated.ts");
        fs::write(&path, b"old").unwrap();

        let mut writer = ArtifactWriter::new(false);
        let action = writer.write(&slug(), ArtifactKind::Module, &path, b"new").unwrap();
        assert_eq!(action, WriteAction::Written);
        assert_eq!(fs::read(&path).unwrap(), b"new");

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["core.generated.ts"]);
    }

    #[test]
    fn test_check_mode_never_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.normalized.json");

        let mut writer = ArtifactWriter::new(true);
        let action = writer.write(&slug(), ArtifactKind::Json, &path, b"{}").unwrap();
        assert_eq!(action, WriteAction::WouldWrite);
        assert!(!path.exists());
        assert!(writer.finish().has_changes());
    }

    #[test]
    fn test_prune_removes_unclaimed_and_skips_children() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("packages/core");
        let compiled = root.join("content/compiled");
        fs::create_dir_all(compiled.join("old.assets/fonts/body")).unwrap();
        fs::write(compiled.join("old.assets/fonts/body/atlas.png"), b"png").unwrap();
        fs::write(compiled.join("old.normalized.json"), b"{}").unwrap();
        fs::write(compiled.join(".core.normalized.json.abc.tmp"), b"partial").unwrap();

        let inventory = scan(&[root.clone()]).unwrap();
        let mut writer = ArtifactWriter::new(false);
        writer
            .write(&slug(), ArtifactKind::Json, &compiled.join("core.normalized.json"), b"{}")
            .unwrap();
        writer.prune(&inventory).unwrap();
        let report = writer.finish();

        assert_eq!(report.count(WriteAction::Deleted), 3);
        assert!(!compiled.join("old.assets").exists());
        assert!(!compiled.join("old.normalized.json").exists());
        assert!(!compiled.join(".core.normalized.json.abc.tmp").exists());
        assert!(compiled.join("core.normalized.json").exists());
    }

    #[test]
    fn test_prune_keeps_claimed_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("packages/core");
        let assets = root.join("content/compiled/core.assets");
        fs::create_dir_all(assets.join("fonts/gone")).unwrap();
        fs::write(assets.join("fonts/gone/atlas.png"), b"png").unwrap();

        let inventory = scan(&[root.clone()]).unwrap();
        let mut writer = ArtifactWriter::new(true);
        writer
            .write(&slug(), ArtifactKind::Asset, &assets.join("fonts/body/atlas.png"), b"png")
            .unwrap();
        writer.prune(&inventory).unwrap();
        let report = writer.finish();

        let deleted: Vec<&Path> = report
            .operations
            .iter()
            .filter(|op| op.action == WriteAction::WouldDelete)
            .map(|op| op.path.as_path())
            .collect();
        assert_eq!(deleted, vec![assets.join("fonts/gone").as_path()]);
        assert!(assets.join("fonts/gone/atlas.png").exists());
    }
}
