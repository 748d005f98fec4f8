//! Compiled artifacts: digest, hash, serialized form and generated sources

pub mod canonical;
pub mod digest;
pub mod fonts;
pub mod module_source;
pub mod serialize;

use packforge_domain::NormalizedContentPack;
use thiserror::Error;

use crate::warnings::CompilerWarning;

pub use canonical::{canonical_string, to_canonical_pretty, to_canonical_string};
pub use digest::{compute_artifact_hash, compute_digest, ContentDigest, DIGEST_VERSION};
pub use serialize::{rehydrate, rehydrate_str, SerializedContentPack, FORMAT_VERSION};

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to serialize pack: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Unsupported serialized format version {found} (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },

    #[error("Digest mismatch for pack '{slug}': stored {stored}, computed {computed}")]
    DigestMismatch {
        slug: String,
        stored: String,
        computed: String,
    },

    #[error("Artifact hash mismatch for pack '{slug}': stored {stored}, computed {computed}")]
    HashMismatch {
        slug: String,
        stored: String,
        computed: String,
    },
}

/// Everything produced for one successfully compiled pack.
/// A pure function of the normalized pack and its warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledArtifact {
    pub normalized_pack: NormalizedContentPack,
    pub digest: ContentDigest,
    pub artifact_hash: String,
    pub warnings: Vec<CompilerWarning>,
}

impl CompiledArtifact {
    pub fn build(
        normalized_pack: NormalizedContentPack,
        warnings: Vec<CompilerWarning>,
    ) -> Result<Self, ArtifactError> {
        let digest = compute_digest(&normalized_pack);
        let artifact_hash = compute_artifact_hash(&normalized_pack)?;
        Ok(Self {
            normalized_pack,
            digest,
            artifact_hash,
            warnings,
        })
    }
}
