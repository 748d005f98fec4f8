//! Content digest and artifact hash
//!
//! The digest identifies a pack by its id, version and entity ids only, so
//! edits to balance numbers keep the digest stable while the artifact hash
//! changes. FNV-1a is not cryptographic; the artifact hash (SHA-256) is the
//! integrity check.

use std::fmt;

use packforge_domain::{ContentKind, NormalizedContentPack};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use super::canonical::to_canonical_string;

pub const DIGEST_VERSION: u32 = 1;

const FNV1A_OFFSET_BASIS_32: u32 = 0x811c_9dc5;
const FNV1A_PRIME_32: u32 = 0x0100_0193;

/// 32-bit FNV-1a
pub const fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut hash = FNV1A_OFFSET_BASIS_32;
    let mut i = 0usize;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV1A_PRIME_32);
        i += 1;
    }
    hash
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDigest {
    pub version: u32,
    pub hash: String,
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}:{}", self.version, self.hash)
    }
}

/// Canonical digest input: `{id, version, modules: {name: [sorted ids]}}`
pub fn digest_input(pack: &NormalizedContentPack) -> String {
    let mut modules = Map::new();
    for kind in ContentKind::ALL {
        let mut ids: Vec<&str> = pack
            .modules()
            .ids(kind)
            .into_iter()
            .map(|id| id.as_str())
            .collect();
        ids.sort_unstable();
        modules.insert(kind.module_name().to_string(), json!(ids));
    }
    let value = json!({
        "id": pack.metadata().id.as_str(),
        "version": pack.metadata().version,
        "modules": Value::Object(modules),
    });
    to_canonical_string(&value)
}

pub fn compute_digest(pack: &NormalizedContentPack) -> ContentDigest {
    ContentDigest {
        version: DIGEST_VERSION,
        hash: format!("fnv1a-{:08x}", fnv1a32(digest_input(pack).as_bytes())),
    }
}

/// SHA-256 hex of the canonical compact serialization of the whole pack
pub fn compute_artifact_hash(pack: &NormalizedContentPack) -> serde_json::Result<String> {
    let canonical = to_canonical_string(&serde_json::to_value(pack)?);
    Ok(sha256_hex(canonical.as_bytes()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use packforge_domain::{PackMetadata, PackModules, Resource};

    fn pack(resources: &[&str]) -> NormalizedContentPack {
        let modules = PackModules {
            resources: resources.iter().map(|id| Resource::new(*id, *id)).collect(),
            ..PackModules::default()
        };
        NormalizedContentPack::new(PackMetadata::new("sample", "1.0.0"), modules)
    }

    #[test]
    fn test_fnv1a32_reference_values() {
        assert_eq!(fnv1a32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_digest_format_and_stability() {
        let digest = compute_digest(&pack(&["gold", "gems"]));
        assert_eq!(digest.version, 1);
        assert!(digest.hash.starts_with("fnv1a-"));
        assert_eq!(digest.hash.len(), "fnv1a-".len() + 8);
        assert_eq!(digest, compute_digest(&pack(&["gold", "gems"])));
    }

    #[test]
    fn test_digest_ignores_declaration_order() {
        assert_eq!(
            compute_digest(&pack(&["gold", "gems"])),
            compute_digest(&pack(&["gems", "gold"]))
        );
    }

    #[test]
    fn test_digest_changes_with_ids() {
        assert_ne!(
            compute_digest(&pack(&["gold"])),
            compute_digest(&pack(&["gold", "gems"]))
        );
    }

    #[test]
    fn test_digest_changes_with_id_and_version() {
        let base = pack(&["gold"]);
        let with_metadata = |id, version| {
            NormalizedContentPack::new(PackMetadata::new(id, version), base.modules().clone())
        };
        assert_eq!(compute_digest(&base), compute_digest(&with_metadata("sample", "1.0.0")));
        assert_ne!(compute_digest(&base), compute_digest(&with_metadata("other", "1.0.0")));
        assert_ne!(compute_digest(&base), compute_digest(&with_metadata("sample", "1.0.1")));
    }

    #[test]
    fn test_artifact_hash_tracks_content() {
        let a = pack(&["gold"]);
        let mut modules = a.modules().clone();
        modules.resources[0].start_amount = 10.0;
        let b = NormalizedContentPack::new(a.metadata().clone(), modules);

        assert_eq!(compute_digest(&a), compute_digest(&b));
        let hash_a = compute_artifact_hash(&a).unwrap();
        assert_eq!(hash_a.len(), 64);
        assert_ne!(hash_a, compute_artifact_hash(&b).unwrap());
        assert_eq!(hash_a, compute_artifact_hash(&pack(&["gold"])).unwrap());
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
