//! Content pack discovery: one `packages/*/content/pack.json` per package

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use packforge_domain::PackSlug;
use serde_json::Value;
use thiserror::Error;

pub const PACKAGES_DIR: &str = "packages";
pub const MANIFEST_PATH: &str = "content/pack.json";
pub const JSON5_MANIFEST_PATH: &str = "content/pack.json5";

/// Discovery problems abort the whole run
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Content pack {} has no metadata.id", .path.display())]
    MissingId { path: PathBuf },

    #[error("Duplicate pack slug '{slug}' in {} and {}", .first.display(), .second.display())]
    DuplicateSlug {
        slug: PackSlug,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Unsupported manifest {}: only pack.json is supported", .path.display())]
    UnsupportedManifest { path: PathBuf },
}

/// A raw pack document and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ContentDocument {
    pub absolute_path: PathBuf,
    /// Relative to the workspace root
    pub relative_path: PathBuf,
    pub pack_slug: PackSlug,
    pub document: Value,
}

impl ContentDocument {
    /// The package directory (`packages/<name>`)
    pub fn package_root(&self) -> PathBuf {
        crate::sync::layout::package_root_of(&self.absolute_path)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.absolute_path.clone())
    }

    /// The directory holding `pack.json`
    pub fn content_dir(&self) -> PathBuf {
        self.absolute_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}

fn read_document(path: &Path) -> Result<Value, DiscoveryError> {
    let text = fs::read_to_string(path).map_err(|source| DiscoveryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| DiscoveryError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn pack_slug(document: &Value) -> Option<PackSlug> {
    let raw = document.get("metadata")?.get("id")?.as_str()?;
    let slug = PackSlug::normalize(raw);
    (!slug.as_str().is_empty()).then_some(slug)
}

/// Every directory under `<root>/packages`, sorted, whether or not it holds
/// a manifest.
pub fn list_package_dirs(root: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let packages = root.join(PACKAGES_DIR);
    let entries = match fs::read_dir(&packages) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = ?packages, "no packages directory");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(DiscoveryError::Io {
                path: packages,
                source,
            })
        }
    };

    let mut package_dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DiscoveryError::Io {
            path: packages.clone(),
            source,
        })?;
        if entry.path().is_dir() {
            package_dirs.push(entry.path());
        }
    }
    package_dirs.sort();
    Ok(package_dirs)
}

/// Find every content pack under `<root>/packages`, sorted by slug then path.
pub fn discover_content_documents(root: &Path) -> Result<Vec<ContentDocument>, DiscoveryError> {
    let package_dirs = list_package_dirs(root)?;

    let mut documents = Vec::new();
    let mut seen: BTreeMap<PackSlug, PathBuf> = BTreeMap::new();
    for dir in package_dirs {
        let manifest = dir.join(MANIFEST_PATH);
        if !manifest.is_file() {
            let json5 = dir.join(JSON5_MANIFEST_PATH);
            if json5.is_file() {
                return Err(DiscoveryError::UnsupportedManifest { path: json5 });
            }
            continue;
        }

        let document = read_document(&manifest)?;
        let slug = pack_slug(&document).ok_or_else(|| DiscoveryError::MissingId {
            path: manifest.clone(),
        })?;
        if let Some(first) = seen.get(&slug) {
            return Err(DiscoveryError::DuplicateSlug {
                slug,
                first: first.clone(),
                second: manifest,
            });
        }
        seen.insert(slug.clone(), manifest.clone());

        let relative_path = manifest
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| manifest.clone());
        tracing::debug!(slug = %slug, path = ?relative_path, "discovered content pack");
        documents.push(ContentDocument {
            absolute_path: manifest,
            relative_path,
            pack_slug: slug,
            document,
        });
    }

    documents.sort_by(|a, b| {
        a.pack_slug
            .cmp(&b.pack_slug)
            .then_with(|| a.relative_path.cmp(&b.relative_path))
    });
    Ok(documents)
}
