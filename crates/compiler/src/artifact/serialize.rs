//! The on-disk form of a compiled pack (`<slug>.normalized.json`)

use packforge_domain::{NormalizedContentPack, PackMetadata, PackModules};
use serde::{Deserialize, Serialize};

use super::canonical::to_canonical_pretty;
use super::digest::{compute_artifact_hash, compute_digest, ContentDigest};
use super::{ArtifactError, CompiledArtifact};
use crate::warnings::CompilerWarning;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedContentPack {
    pub format_version: u32,
    pub metadata: PackMetadata,
    pub modules: PackModules,
    pub digest: ContentDigest,
    pub artifact_hash: String,
    #[serde(default)]
    pub warnings: Vec<CompilerWarning>,
}

impl SerializedContentPack {
    pub fn from_artifact(artifact: &CompiledArtifact) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            metadata: artifact.normalized_pack.metadata().clone(),
            modules: artifact.normalized_pack.modules().clone(),
            digest: artifact.digest.clone(),
            artifact_hash: artifact.artifact_hash.clone(),
            warnings: artifact.warnings.clone(),
        }
    }

    /// Canonical, indented JSON with a trailing newline
    pub fn to_json(&self) -> Result<String, ArtifactError> {
        Ok(to_canonical_pretty(&serde_json::to_value(self)?))
    }
}

/// Rebuild a compiled artifact, re-verifying digest and hash.
pub fn rehydrate(serialized: SerializedContentPack) -> Result<CompiledArtifact, ArtifactError> {
    if serialized.format_version != FORMAT_VERSION {
        return Err(ArtifactError::UnsupportedFormat {
            found: serialized.format_version,
            expected: FORMAT_VERSION,
        });
    }

    let pack = NormalizedContentPack::new(serialized.metadata, serialized.modules);
    let slug = pack.slug().to_string();

    let digest = compute_digest(&pack);
    if digest != serialized.digest {
        return Err(ArtifactError::DigestMismatch {
            slug,
            stored: serialized.digest.to_string(),
            computed: digest.to_string(),
        });
    }

    let artifact_hash = compute_artifact_hash(&pack)?;
    if artifact_hash != serialized.artifact_hash {
        return Err(ArtifactError::HashMismatch {
            slug,
            stored: serialized.artifact_hash,
            computed: artifact_hash,
        });
    }

    Ok(CompiledArtifact {
        normalized_pack: pack,
        digest,
        artifact_hash,
        warnings: serialized.warnings,
    })
}

pub fn rehydrate_str(json: &str) -> Result<CompiledArtifact, ArtifactError> {
    rehydrate(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warnings::codes;
    use packforge_domain::{Condition, Resource, Transform, TransformEndpoint};

    fn artifact() -> CompiledArtifact {
        let mut gems = Resource::new("gems", "Gems");
        gems.unlock_condition = Some(Condition::resource_at_least("gold", 100.0));
        let modules = PackModules {
            resources: vec![Resource::new("gold", "Gold"), gems],
            transforms: vec![Transform::new(
                "polish",
                vec![TransformEndpoint::constant("gold", 10.0)],
                vec![TransformEndpoint::constant("gems", 1.0)],
            )],
            ..PackModules::default()
        };
        let pack = NormalizedContentPack::new(PackMetadata::new("sample", "1.2.0"), modules);
        let warnings = vec![CompilerWarning::new(codes::OPTIONAL_DEPENDENCY_MISSING, "x")];
        CompiledArtifact::build(pack, warnings).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let original = artifact();
        let json = SerializedContentPack::from_artifact(&original).to_json().unwrap();
        let restored = rehydrate_str(&json).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_serialization_is_byte_stable() {
        let a = SerializedContentPack::from_artifact(&artifact()).to_json().unwrap();
        let b = SerializedContentPack::from_artifact(&artifact()).to_json().unwrap();
        assert_eq!(a, b);
        assert!(a.ends_with("}\n"));
        assert!(a.contains("\"formatVersion\": 1"));
    }

    #[test]
    fn test_tampered_content_rejected() {
        let mut serialized = SerializedContentPack::from_artifact(&artifact());
        serialized.modules.resources[0].start_amount = 5.0;
        assert!(matches!(
            rehydrate(serialized),
            Err(ArtifactError::HashMismatch { .. })
        ));
    }

    #[test]
    fn test_renamed_entity_rejected_by_digest() {
        let mut serialized = SerializedContentPack::from_artifact(&artifact());
        serialized.modules.resources[0].id = "silver".into();
        assert!(matches!(
            rehydrate(serialized),
            Err(ArtifactError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let mut serialized = SerializedContentPack::from_artifact(&artifact());
        serialized.format_version = 7;
        assert!(matches!(
            rehydrate(serialized),
            Err(ArtifactError::UnsupportedFormat { found: 7, .. })
        ));
    }
}
