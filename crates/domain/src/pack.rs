//! Pack metadata, dependency declarations and the normalized pack shape

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::{
    Achievement, ContentKind, FontAsset, Generator, PrestigeLayer, Resource, Transform, Upgrade,
};
use crate::ids::{ContentId, PackSlug};
use crate::localization::LocalizedText;

/// A dependency on another pack, optionally constrained by a semver range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    pub pack_id: PackSlug,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl DependencyEdge {
    pub fn new(pack_id: &str) -> Self {
        Self {
            pack_id: PackSlug::normalize(pack_id),
            version: None,
        }
    }

    pub fn with_version(mut self, range: impl Into<String>) -> Self {
        self.version = Some(range.into());
        self
    }
}

/// Dependency declarations of one pack
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyCollection {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<DependencyEdge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional: Vec<DependencyEdge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<DependencyEdge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<String>,
}

impl DependencyCollection {
    pub fn is_empty(&self) -> bool {
        self.requires.is_empty()
            && self.optional.is_empty()
            && self.conflicts.is_empty()
            && self.provides.is_empty()
    }

    /// Normalize slugs, drop duplicate edges (first declaration wins) and sort
    /// everything so equal declarations always produce equal collections.
    pub fn normalized(self) -> Self {
        let mut provides: Vec<String> = self
            .provides
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        provides.sort();
        provides.dedup();

        Self {
            requires: normalize_edges(self.requires),
            optional: normalize_edges(self.optional),
            conflicts: normalize_edges(self.conflicts),
            provides,
        }
    }
}

fn normalize_edges(edges: Vec<DependencyEdge>) -> Vec<DependencyEdge> {
    let mut by_slug: BTreeMap<PackSlug, DependencyEdge> = BTreeMap::new();
    for edge in edges {
        let slug = PackSlug::normalize(edge.pack_id.as_str());
        let version = edge
            .version
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        by_slug.entry(slug.clone()).or_insert(DependencyEdge {
            pack_id: slug,
            version,
        });
    }
    by_slug.into_values().collect()
}

fn is_empty_deps(deps: &DependencyCollection) -> bool {
    deps.is_empty()
}

/// Identity and descriptive metadata of a pack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackMetadata {
    pub id: PackSlug,
    pub title: LocalizedText,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    pub default_locale: String,
    pub supported_locales: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Engine semver range the pack targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "is_empty_deps")]
    pub dependencies: DependencyCollection,
}

impl PackMetadata {
    pub fn new(id: &str, version: &str) -> Self {
        Self {
            id: PackSlug::normalize(id),
            title: LocalizedText::new(id),
            version: version.to_string(),
            summary: None,
            authors: Vec::new(),
            default_locale: "en-US".to_string(),
            supported_locales: vec!["en-US".to_string()],
            tags: Vec::new(),
            engine: None,
            dependencies: DependencyCollection::default(),
        }
    }
}

/// Entity arrays of a pack, one per module
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackModules {
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub generators: Vec<Generator>,
    #[serde(default)]
    pub upgrades: Vec<Upgrade>,
    #[serde(default)]
    pub transforms: Vec<Transform>,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
    #[serde(default)]
    pub prestige_layers: Vec<PrestigeLayer>,
    #[serde(default)]
    pub fonts: Vec<FontAsset>,
}

impl PackModules {
    /// Ids of one module, in declaration order
    pub fn ids(&self, kind: ContentKind) -> Vec<&ContentId> {
        match kind {
            ContentKind::Resource => self.resources.iter().map(|e| &e.id).collect(),
            ContentKind::Generator => self.generators.iter().map(|e| &e.id).collect(),
            ContentKind::Upgrade => self.upgrades.iter().map(|e| &e.id).collect(),
            ContentKind::Transform => self.transforms.iter().map(|e| &e.id).collect(),
            ContentKind::Achievement => self.achievements.iter().map(|e| &e.id).collect(),
            ContentKind::PrestigeLayer => self.prestige_layers.iter().map(|e| &e.id).collect(),
            ContentKind::Font => self.fonts.iter().map(|e| &e.id).collect(),
        }
    }

    pub fn entity_count(&self) -> usize {
        ContentKind::ALL.iter().map(|kind| self.ids(*kind).len()).sum()
    }
}

/// A validated pack. Construction happens once in the normalizer (or when a
/// serialized pack is rehydrated); afterwards the pack is read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedContentPack {
    metadata: PackMetadata,
    modules: PackModules,
}

impl NormalizedContentPack {
    pub fn new(metadata: PackMetadata, modules: PackModules) -> Self {
        Self { metadata, modules }
    }

    pub fn metadata(&self) -> &PackMetadata {
        &self.metadata
    }

    pub fn modules(&self) -> &PackModules {
        &self.modules
    }

    pub fn slug(&self) -> &PackSlug {
        &self.metadata.id
    }

    pub fn into_parts(self) -> (PackMetadata, PackModules) {
        (self.metadata, self.modules)
    }
}

/// Position of an entity inside its module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub kind: ContentKind,
    pub index: usize,
}

/// id -> (module, position) lookup derived from a normalized pack
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackIndex {
    entries: BTreeMap<ContentId, IndexEntry>,
}

impl PackIndex {
    pub fn build(pack: &NormalizedContentPack) -> Self {
        let mut entries = BTreeMap::new();
        for kind in ContentKind::ALL {
            for (index, id) in pack.modules().ids(kind).into_iter().enumerate() {
                entries
                    .entry(id.clone())
                    .or_insert(IndexEntry { kind, index });
            }
        }
        Self { entries }
    }

    pub fn get(&self, id: &str) -> Option<IndexEntry> {
        self.entries.get(id).copied()
    }

    pub fn kind_of(&self, id: &str) -> Option<ContentKind> {
        self.get(id).map(|entry| entry.kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_normalization_dedupes_and_sorts() {
        let deps = DependencyCollection {
            requires: vec![
                DependencyEdge::new("Zeta"),
                DependencyEdge::new("alpha").with_version("^1.0.0"),
                DependencyEdge::new(" ALPHA ").with_version("^2.0.0"),
            ],
            optional: vec![],
            conflicts: vec![],
            provides: vec!["b".into(), "a".into(), "b".into(), " ".into()],
        }
        .normalized();

        let slugs: Vec<&str> = deps.requires.iter().map(|e| e.pack_id.as_str()).collect();
        assert_eq!(slugs, vec!["alpha", "zeta"]);
        assert_eq!(deps.requires[0].version.as_deref(), Some("^1.0.0"));
        assert_eq!(deps.provides, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_pack_index() {
        let modules = PackModules {
            resources: vec![Resource::new("gold", "Gold"), Resource::new("gems", "Gems")],
            ..PackModules::default()
        };
        let pack = NormalizedContentPack::new(PackMetadata::new("core", "1.0.0"), modules);
        let index = PackIndex::build(&pack);

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.get("gems"),
            Some(IndexEntry {
                kind: ContentKind::Resource,
                index: 1
            })
        );
        assert_eq!(index.kind_of("missing"), None);
    }
}
