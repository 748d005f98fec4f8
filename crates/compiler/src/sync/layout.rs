//! Where a pack's artifacts live, relative to its package directory

use std::path::{Path, PathBuf};

use packforge_domain::PackSlug;

pub const COMPILED_DIR: &str = "content/compiled";
pub const GENERATED_DIR: &str = "src/generated";

pub const NORMALIZED_SUFFIX: &str = ".normalized.json";
pub const GENERATED_SUFFIX: &str = ".generated.ts";
pub const ASSETS_SUFFIX: &str = ".assets";
pub const FONTS_DIR: &str = "fonts";
pub const RENDERER_MANIFEST_FILE: &str = "renderer-assets.manifest.json";

/// Artifact paths of one pack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackLayout {
    package_root: PathBuf,
    slug: PackSlug,
}

impl PackLayout {
    pub fn new(package_root: impl Into<PathBuf>, slug: PackSlug) -> Self {
        Self {
            package_root: package_root.into(),
            slug,
        }
    }

    pub fn compiled_dir(&self) -> PathBuf {
        self.package_root.join(COMPILED_DIR)
    }

    pub fn normalized_json(&self) -> PathBuf {
        self.compiled_dir()
            .join(format!("{}{}", self.slug, NORMALIZED_SUFFIX))
    }

    pub fn generated_module(&self) -> PathBuf {
        self.package_root
            .join(GENERATED_DIR)
            .join(format!("{}{}", self.slug, GENERATED_SUFFIX))
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.compiled_dir()
            .join(format!("{}{}", self.slug, ASSETS_SUFFIX))
    }

    pub fn font_dir(&self, encoded_id: &str) -> PathBuf {
        self.assets_dir().join(FONTS_DIR).join(encoded_id)
    }

    pub fn renderer_manifest(&self) -> PathBuf {
        self.assets_dir().join(RENDERER_MANIFEST_FILE)
    }
}

/// `packages/<name>/content/pack.json` -> `packages/<name>`
pub fn package_root_of(document_path: &Path) -> Option<&Path> {
    document_path.parent()?.parent()
}

/// The pack slug encoded in an artifact file or directory name
pub fn slug_from_artifact_name(name: &str) -> Option<PackSlug> {
    [NORMALIZED_SUFFIX, GENERATED_SUFFIX, ASSETS_SUFFIX]
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .filter(|slug| !slug.is_empty())
        .map(PackSlug::from)
}

/// Temp files left behind by an interrupted write: `.<name>.<random>.tmp`
pub fn is_orphan_temp_file(name: &str) -> bool {
    name.len() > ".tmp".len() + 1 && name.starts_with('.') && name.ends_with(".tmp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let layout = PackLayout::new("/ws/packages/core", PackSlug::from("core"));
        assert_eq!(
            layout.normalized_json(),
            PathBuf::from("/ws/packages/core/content/compiled/core.normalized.json")
        );
        assert_eq!(
            layout.generated_module(),
            PathBuf::from("/ws/packages/core/src/generated/core.generated.ts")
        );
        assert_eq!(
            layout.font_dir("body"),
            PathBuf::from("/ws/packages/core/content/compiled/core.assets/fonts/body")
        );
        assert_eq!(
            layout.renderer_manifest(),
            PathBuf::from(
                "/ws/packages/core/content/compiled/core.assets/renderer-assets.manifest.json"
            )
        );
    }

    #[test]
    fn test_package_root_of() {
        assert_eq!(
            package_root_of(Path::new("/ws/packages/core/content/pack.json")),
            Some(Path::new("/ws/packages/core"))
        );
    }

    #[test]
    fn test_artifact_names() {
        assert_eq!(
            slug_from_artifact_name("core.normalized.json"),
            Some(PackSlug::from("core"))
        );
        assert_eq!(
            slug_from_artifact_name("core.assets"),
            Some(PackSlug::from("core"))
        );
        assert_eq!(slug_from_artifact_name("notes.txt"), None);
        assert!(is_orphan_temp_file(".core.normalized.json.a1B2c3.tmp"));
        assert!(!is_orphan_temp_file("core.tmp"));
        assert!(!is_orphan_temp_file(".tmp"));
    }
}
