//! Generated TypeScript module (`src/generated/<slug>.generated.ts`)

use packforge_domain::PackIndex;

use super::canonical::to_canonical_pretty;
use super::{ArtifactError, CompiledArtifact};

const PRELUDE: &str = "\
function deepFreeze<T>(value: T): T {
  if (value !== null && typeof value === 'object') {
    for (const child of Object.values(value)) {
      deepFreeze(child);
    }
    Object.freeze(value);
  }
  return value;
}
";

fn literal(value: &serde_json::Value) -> String {
    to_canonical_pretty(value).trim_end().to_string()
}

/// Render the runtime module exporting the frozen pack, its digest, artifact
/// hash and entity index.
pub fn render_module(artifact: &CompiledArtifact) -> Result<String, ArtifactError> {
    let pack = &artifact.normalized_pack;
    let index = PackIndex::build(pack);

    let mut out = String::new();
    out.push_str(&format!(
        "// Generated by packforge from pack '{}'. Do not edit.\n\n",
        pack.slug()
    ));
    out.push_str(PRELUDE);
    out.push('\n');
    out.push_str(&format!(
        "export const PACK = deepFreeze({});\n\n",
        literal(&serde_json::to_value(pack)?)
    ));
    out.push_str(&format!(
        "export const DIGEST = deepFreeze({});\n\n",
        literal(&serde_json::to_value(&artifact.digest)?)
    ));
    out.push_str(&format!(
        "export const ARTIFACT_HASH = {};\n\n",
        serde_json::to_string(&artifact.artifact_hash)?
    ));
    out.push_str(&format!(
        "export const INDEX = deepFreeze({});\n\n",
        literal(&serde_json::to_value(&index)?)
    ));
    out.push_str("export default PACK;\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use packforge_domain::{NormalizedContentPack, PackMetadata, PackModules, Resource};

    #[test]
    fn test_module_exports() {
        let pack = NormalizedContentPack::new(
            PackMetadata::new("starter", "0.1.0"),
            PackModules {
                resources: vec![Resource::new("gold", "Gold")],
                ..PackModules::default()
            },
        );
        let artifact = CompiledArtifact::build(pack, Vec::new()).unwrap();
        let source = render_module(&artifact).unwrap();

        assert!(source.starts_with("// Generated by packforge from pack 'starter'"));
        assert!(source.contains("export const PACK = deepFreeze({"));
        assert!(source.contains(&format!(
            "export const ARTIFACT_HASH = \"{}\";",
            artifact.artifact_hash
        )));
        assert!(source.contains(&artifact.digest.hash));
        assert!(source.contains("\"gold\": {"));
        assert!(source.ends_with("export default PACK;\n"));
        assert_eq!(source, render_module(&artifact).unwrap());
    }
}
