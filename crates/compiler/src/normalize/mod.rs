//! Pack normalizer
//!
//! Turns one raw pack document into a [`NormalizedContentPack`] plus
//! non-fatal warnings. Every schema problem found is collected with its JSON
//! path so authors see all issues of a pack in one run.

mod fields;

use std::collections::{BTreeSet, HashMap};

use packforge_domain::{
    validate_condition, validate_numeric_formula, ContentId, ContentKind, FontAsset,
    NormalizedContentPack, PackMetadata, PackModules,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use fields::{collect_fields, SourcePositions};

use crate::warnings::{codes, CompilerWarning};

/// One schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Errors that can occur while normalizing a pack
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("Pack document must be a JSON object")]
    NotAnObject,
    #[error("Pack failed schema validation with {} issue(s): {}", .0.len(), format_issues(.0))]
    Schema(Vec<SchemaIssue>),
}

fn format_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(SchemaIssue::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl NormalizeError {
    pub fn issues(&self) -> &[SchemaIssue] {
        match self {
            NormalizeError::NotAnObject => &[],
            NormalizeError::Schema(issues) => issues,
        }
    }
}

/// A normalized pack and the warnings raised while producing it
#[derive(Debug, Clone)]
pub struct NormalizedPackOutput {
    pub pack: NormalizedContentPack,
    pub warnings: Vec<CompilerWarning>,
}

const KNOWN_KEYS: [&str; 8] = [
    "metadata",
    "resources",
    "generators",
    "upgrades",
    "transforms",
    "achievements",
    "prestigeLayers",
    "fonts",
];

#[derive(Default)]
struct IssueSink {
    issues: Vec<SchemaIssue>,
}

impl IssueSink {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.issues.push(SchemaIssue {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate and normalize a raw pack document.
pub fn normalize_pack(document: &Value) -> Result<NormalizedPackOutput, NormalizeError> {
    let object = document.as_object().ok_or(NormalizeError::NotAnObject)?;
    let mut sink = IssueSink::default();
    let mut warnings = Vec::new();

    for key in object.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            sink.push(key.as_str(), format!("unknown module '{}'", key));
        }
    }

    let metadata = match object.get("metadata") {
        Some(raw) => parse_entry::<PackMetadata>(raw, "metadata", &mut sink),
        None => {
            sink.push("metadata", "missing required field");
            None
        }
    };

    let mut source = SourcePositions::default();
    let modules = PackModules {
        resources: parse_module(object, ContentKind::Resource, &mut source, &mut sink),
        generators: parse_module(object, ContentKind::Generator, &mut source, &mut sink),
        upgrades: parse_module(object, ContentKind::Upgrade, &mut source, &mut sink),
        transforms: parse_module(object, ContentKind::Transform, &mut source, &mut sink),
        achievements: parse_module(object, ContentKind::Achievement, &mut source, &mut sink),
        prestige_layers: parse_module(object, ContentKind::PrestigeLayer, &mut source, &mut sink),
        fonts: parse_module(object, ContentKind::Font, &mut source, &mut sink),
    };

    let metadata = metadata.map(|m| normalize_metadata(m, &mut sink, &mut warnings));

    let kinds = check_content_ids(&modules, &source, &mut sink);
    check_fields(&modules, &source, &kinds, &mut sink);
    check_fonts(&modules.fonts, &source, &mut sink);
    if let Some(metadata) = &metadata {
        check_locales(metadata, &modules, &source, &mut warnings);
    }

    match metadata {
        Some(metadata) if sink.issues.is_empty() => Ok(NormalizedPackOutput {
            pack: NormalizedContentPack::new(metadata, modules),
            warnings,
        }),
        _ => Err(NormalizeError::Schema(sink.issues)),
    }
}

fn parse_entry<T: DeserializeOwned>(raw: &Value, path: &str, sink: &mut IssueSink) -> Option<T> {
    match serde_json::from_value::<T>(raw.clone()) {
        Ok(value) => Some(value),
        Err(err) => {
            sink.push(path, err.to_string());
            None
        }
    }
}

/// Parse a module array entity by entity so each failure carries its index.
fn parse_module<T: DeserializeOwned>(
    object: &serde_json::Map<String, Value>,
    kind: ContentKind,
    source: &mut SourcePositions,
    sink: &mut IssueSink,
) -> Vec<T> {
    let key = kind.module_name();
    let Some(raw) = object.get(key) else {
        return Vec::new();
    };
    let Some(items) = raw.as_array() else {
        sink.push(key, "expected an array");
        return Vec::new();
    };
    let mut parsed = Vec::with_capacity(items.len());
    let mut positions = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        if let Some(entity) = parse_entry::<T>(item, &format!("{}[{}]", key, i), sink) {
            parsed.push(entity);
            positions.push(i);
        }
    }
    source.record(kind, positions);
    parsed
}

fn normalize_metadata(
    mut metadata: PackMetadata,
    sink: &mut IssueSink,
    warnings: &mut Vec<CompilerWarning>,
) -> PackMetadata {
    metadata.id = packforge_domain::PackSlug::normalize(metadata.id.as_str());
    if !packforge_domain::is_valid_slug(metadata.id.as_str()) {
        sink.push(
            "metadata.id",
            format!("'{}' is not a valid pack slug", metadata.id),
        );
    }

    if let Err(err) = semver::Version::parse(&metadata.version) {
        sink.push(
            "metadata.version",
            format!("'{}' is not a semantic version: {}", metadata.version, err),
        );
    }

    if let Some(engine) = &metadata.engine {
        if let Err(err) = semver::VersionReq::parse(engine) {
            sink.push(
                "metadata.engine",
                format!("'{}' is not a version range: {}", engine, err),
            );
        }
    }

    if metadata.supported_locales.is_empty() {
        sink.push("metadata.supportedLocales", "at least one locale is required");
    } else if !metadata
        .supported_locales
        .iter()
        .any(|l| l == &metadata.default_locale)
    {
        warnings.push(
            CompilerWarning::new(
                codes::DEFAULT_LOCALE_UNSUPPORTED,
                format!(
                    "default locale '{}' is not listed in supportedLocales",
                    metadata.default_locale
                ),
            )
            .at("metadata.defaultLocale"),
        );
    }

    metadata.dependencies = std::mem::take(&mut metadata.dependencies).normalized();
    let deps = &metadata.dependencies;
    let groups = [
        ("requires", &deps.requires),
        ("optional", &deps.optional),
        ("conflicts", &deps.conflicts),
    ];
    for (group, edges) in groups {
        for (i, edge) in edges.iter().enumerate() {
            let path = format!("metadata.dependencies.{}[{}]", group, i);
            if edge.pack_id == metadata.id {
                sink.push(path.clone(), "a pack cannot depend on itself");
            }
            if !packforge_domain::is_valid_slug(edge.pack_id.as_str()) {
                sink.push(
                    format!("{}.packId", path),
                    format!("'{}' is not a valid pack slug", edge.pack_id),
                );
            }
            if let Some(range) = &edge.version {
                if let Err(err) = semver::VersionReq::parse(range) {
                    sink.push(
                        format!("{}.version", path),
                        format!("'{}' is not a version range: {}", range, err),
                    );
                }
            }
        }
    }

    let required: BTreeSet<&str> = deps.requires.iter().map(|e| e.pack_id.as_str()).collect();
    for (i, edge) in deps.conflicts.iter().enumerate() {
        if required.contains(edge.pack_id.as_str()) {
            sink.push(
                format!("metadata.dependencies.conflicts[{}]", i),
                format!("'{}' is both required and declared as a conflict", edge.pack_id),
            );
        }
    }

    metadata
}

/// Check id format and pack-wide uniqueness; returns id -> kind for the
/// reference checks.
fn check_content_ids<'a>(
    modules: &'a PackModules,
    source: &SourcePositions,
    sink: &mut IssueSink,
) -> HashMap<&'a str, ContentKind> {
    let mut seen: HashMap<&'a str, (ContentKind, String)> = HashMap::new();

    for kind in ContentKind::ALL {
        for (i, id) in modules.ids(kind).into_iter().enumerate() {
            let path = format!("{}.id", source.path(kind, i));
            if !packforge_domain::is_valid_slug(id.as_str()) {
                sink.push(path.clone(), format!("'{}' is not a valid content id", id));
            }
            match seen.get(id.as_str()) {
                Some((_, first)) => sink.push(
                    path,
                    format!("duplicate content id '{}' (first declared at {})", id, first),
                ),
                None => {
                    seen.insert(id.as_str(), (kind, path));
                }
            }
        }
    }

    seen.into_iter().map(|(id, (kind, _))| (id, kind)).collect()
}

fn check_fields(
    modules: &PackModules,
    source: &SourcePositions,
    kinds: &HashMap<&str, ContentKind>,
    sink: &mut IssueSink,
) {
    let fields = collect_fields(modules, source);

    for field in &fields.refs {
        check_ref(&field.path, field.expected, field.id, kinds, sink);
    }

    for (path, formula) in &fields.formulas {
        if let Err(err) = validate_numeric_formula(formula) {
            sink.push(path.as_str(), err.to_string());
        }
        check_formula_refs(path, formula, kinds, sink);
    }

    for (path, condition) in &fields.conditions {
        if let Err(err) = validate_condition(condition) {
            sink.push(path.as_str(), err.to_string());
            continue;
        }
        for reference in condition.all_refs() {
            if let Some(expected) = ContentKind::for_ref(reference.kind) {
                check_ref(path, &[expected], reference.id, kinds, sink);
            }
        }
    }
}

fn check_formula_refs(
    path: &str,
    formula: &packforge_domain::NumericFormula,
    kinds: &HashMap<&str, ContentKind>,
    sink: &mut IssueSink,
) {
    let mut refs = Vec::new();
    formula.for_each_expression(&mut |expr| expr.collect_entity_refs(&mut refs));
    for (kind, id) in refs {
        if let Some(expected) = ContentKind::for_ref(kind) {
            check_ref(path, &[expected], id, kinds, sink);
        }
    }
}

fn check_ref(
    path: &str,
    expected: &[ContentKind],
    id: &ContentId,
    kinds: &HashMap<&str, ContentKind>,
    sink: &mut IssueSink,
) {
    let expected_names = || {
        expected
            .iter()
            .map(ContentKind::as_str)
            .collect::<Vec<_>>()
            .join(" or ")
    };
    match kinds.get(id.as_str()) {
        None => sink.push(path, format!("unknown {} '{}'", expected_names(), id)),
        Some(actual) if !expected.contains(actual) => sink.push(
            path,
            format!("'{}' is a {}, expected a {}", id, actual, expected_names()),
        ),
        Some(_) => {}
    }
}

fn check_fonts(fonts: &[FontAsset], source: &SourcePositions, sink: &mut IssueSink) {
    for (i, font) in fonts.iter().enumerate() {
        let base = source.path(ContentKind::Font, i);
        if font.source.trim().is_empty() {
            sink.push(format!("{}.source", base), "font source must not be empty");
        }
        if !(font.base_size_px.is_finite() && font.base_size_px > 0.0) {
            sink.push(format!("{}.baseSizePx", base), "must be a positive number");
        }
        if !(font.msdf.px_range.is_finite() && font.msdf.px_range > 0.0) {
            sink.push(format!("{}.msdf.pxRange", base), "must be a positive number");
        }
    }
}

fn check_locales(
    metadata: &PackMetadata,
    modules: &PackModules,
    source: &SourcePositions,
    warnings: &mut Vec<CompilerWarning>,
) {
    let supported: BTreeSet<&str> = metadata
        .supported_locales
        .iter()
        .map(String::as_str)
        .collect();

    let mut texts = vec![("metadata.title".to_string(), &metadata.title)];
    if let Some(summary) = &metadata.summary {
        texts.push(("metadata.summary".to_string(), summary));
    }
    texts.extend(collect_fields(modules, source).texts);

    for (path, text) in texts {
        for locale in text.variants.keys() {
            if !supported.contains(locale.as_str()) {
                warnings.push(
                    CompilerWarning::new(
                        codes::VARIANT_LOCALE_UNSUPPORTED,
                        format!(
                            "variant locale '{}' is not listed in supportedLocales",
                            locale
                        ),
                    )
                    .at(format!("{}.variants.{}", path, locale)),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_document() -> Value {
        json!({
            "metadata": {
                "id": "core",
                "title": "Core",
                "version": "1.0.0",
                "defaultLocale": "en-US",
                "supportedLocales": ["en-US"]
            },
            "resources": [
                { "id": "gold", "name": "Gold" },
                {
                    "id": "gems",
                    "name": "Gems",
                    "unlockCondition": {
                        "kind": "resourceThreshold",
                        "resourceId": "gold",
                        "amount": { "kind": "constant", "value": 100 }
                    }
                }
            ],
            "generators": [
                {
                    "id": "mine",
                    "name": "Mine",
                    "produces": [{ "resourceId": "gold", "rate": { "kind": "constant", "value": 1 } }],
                    "purchase": {
                        "currencyId": "gold",
                        "costCurve": { "kind": "exponential", "base": 10, "growth": 1.15 }
                    }
                }
            ]
        })
    }

    #[test]
    fn test_normalizes_valid_pack() {
        let output = normalize_pack(&base_document()).unwrap();
        assert_eq!(output.pack.slug().as_str(), "core");
        assert_eq!(output.pack.modules().resources.len(), 2);
        assert_eq!(output.pack.modules().generators.len(), 1);
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_rejects_non_object() {
        assert_eq!(
            normalize_pack(&json!([1, 2])).unwrap_err(),
            NormalizeError::NotAnObject
        );
    }

    #[test]
    fn test_reports_issue_paths() {
        let mut doc = base_document();
        doc["resources"][1]["unlockCondition"]["resourceId"] = json!("silver");
        doc["generators"][0]["purchase"]["currencyId"] = json!("mine");

        let err = normalize_pack(&doc).unwrap_err();
        let issues = err.issues();
        assert!(issues
            .iter()
            .any(|i| i.path == "resources[1].unlockCondition" && i.message.contains("silver")));
        assert!(issues.iter().any(|i| i.path == "generators[0].purchase.currencyId"
            && i.message.contains("is a generator")));
    }

    #[test]
    fn test_paths_keep_source_index_after_unparseable_entry() {
        let mut doc = base_document();
        doc["resources"] = json!([
            { "id": 42, "name": "Broken" },
            { "id": "gold", "name": "Gold" },
            { "id": "Bad Id", "name": "Bad" }
        ]);
        let err = normalize_pack(&doc).unwrap_err();
        let paths: Vec<&str> = err.issues().iter().map(|i| i.path.as_str()).collect();
        assert!(paths.contains(&"resources[0]"), "{:?}", paths);
        assert!(paths.contains(&"resources[2].id"), "{:?}", paths);
        assert!(!paths.contains(&"resources[1].id"), "{:?}", paths);
    }

    #[test]
    fn test_rejects_duplicate_ids_across_modules() {
        let mut doc = base_document();
        doc["generators"][0]["id"] = json!("gold");
        let err = normalize_pack(&doc).unwrap_err();
        assert!(err
            .issues()
            .iter()
            .any(|i| i.message.contains("duplicate content id 'gold'")));
    }

    #[test]
    fn test_rejects_bad_piecewise() {
        let mut doc = base_document();
        doc["generators"][0]["produces"][0]["rate"] = json!({
            "kind": "piecewise",
            "pieces": [
                { "untilLevel": 10, "formula": { "kind": "constant", "value": 1 } },
                { "untilLevel": 5, "formula": { "kind": "constant", "value": 2 } },
                { "formula": { "kind": "constant", "value": 3 } }
            ]
        });
        let err = normalize_pack(&doc).unwrap_err();
        assert!(err
            .issues()
            .iter()
            .any(|i| i.path == "generators[0].produces[0].rate"
                && i.message.contains("strictly increase")));
    }

    #[test]
    fn test_rejects_unknown_module_and_bad_entity() {
        let mut doc = base_document();
        doc["widgets"] = json!([]);
        doc["resources"][0] = json!({ "name": "No id" });
        let err = normalize_pack(&doc).unwrap_err();
        let paths: Vec<&str> = err.issues().iter().map(|i| i.path.as_str()).collect();
        assert!(paths.contains(&"widgets"));
        assert!(paths.contains(&"resources[0]"));
    }

    #[test]
    fn test_dependency_declarations() {
        let mut doc = base_document();
        doc["metadata"]["dependencies"] = json!({
            "requires": [{ "packId": "Base", "version": "^1.0" }, { "packId": "base" }],
            "conflicts": [{ "packId": "base" }]
        });
        let err = normalize_pack(&doc).unwrap_err();
        assert!(err
            .issues()
            .iter()
            .any(|i| i.message.contains("both required and declared as a conflict")));

        doc["metadata"]["dependencies"] = json!({ "requires": [{ "packId": "core" }] });
        let err = normalize_pack(&doc).unwrap_err();
        assert!(err
            .issues()
            .iter()
            .any(|i| i.message.contains("cannot depend on itself")));
    }

    #[test]
    fn test_locale_warnings() {
        let mut doc = base_document();
        doc["metadata"]["defaultLocale"] = json!("fr-FR");
        doc["resources"][0]["name"] = json!({ "default": "Gold", "variants": { "de-DE": "Gold" } });
        let output = normalize_pack(&doc).unwrap();
        let found: Vec<&str> = output.warnings.iter().map(|w| w.code.as_str()).collect();
        assert!(found.contains(&codes::DEFAULT_LOCALE_UNSUPPORTED));
        assert!(found.contains(&codes::VARIANT_LOCALE_UNSUPPORTED));
    }

    #[test]
    fn test_condition_depth_is_a_schema_issue() {
        let mut condition = json!({ "kind": "always" });
        for _ in 0..20 {
            condition = json!({ "kind": "not", "condition": condition });
        }
        let mut doc = base_document();
        doc["resources"][1]["unlockCondition"] = condition;
        let err = normalize_pack(&doc).unwrap_err();
        assert!(err
            .issues()
            .iter()
            .any(|i| i.message.contains("exceeds maximum depth")));
    }
}
