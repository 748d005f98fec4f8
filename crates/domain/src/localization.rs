//! Localized display text

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Display text with optional per-locale variants.
///
/// Accepts either a bare string (`"Gold"`) or the full object form
/// (`{ "default": "Gold", "variants": { "fr-FR": "Or" } }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LocalizedTextRepr")]
pub struct LocalizedText {
    pub default: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variants: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LocalizedTextRepr {
    Plain(String),
    Full {
        default: String,
        #[serde(default)]
        variants: BTreeMap<String, String>,
    },
}

impl From<LocalizedTextRepr> for LocalizedText {
    fn from(repr: LocalizedTextRepr) -> Self {
        match repr {
            LocalizedTextRepr::Plain(default) => Self {
                default,
                variants: BTreeMap::new(),
            },
            LocalizedTextRepr::Full { default, variants } => Self { default, variants },
        }
    }
}

impl LocalizedText {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            variants: BTreeMap::new(),
        }
    }

    pub fn with_variant(mut self, locale: impl Into<String>, text: impl Into<String>) -> Self {
        self.variants.insert(locale.into(), text.into());
        self
    }

    /// Text for `locale`, falling back to the default
    pub fn resolve(&self, locale: &str) -> &str {
        self.variants
            .get(locale)
            .map(String::as_str)
            .unwrap_or(&self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_string_form() {
        let text: LocalizedText = serde_json::from_value(json!("Gold")).unwrap();
        assert_eq!(text, LocalizedText::new("Gold"));
    }

    #[test]
    fn test_full_form_and_resolve() {
        let text: LocalizedText =
            serde_json::from_value(json!({ "default": "Gold", "variants": { "fr-FR": "Or" } }))
                .unwrap();
        assert_eq!(text.resolve("fr-FR"), "Or");
        assert_eq!(text.resolve("de-DE"), "Gold");
    }

    #[test]
    fn test_serializes_object_form() {
        let value = serde_json::to_value(LocalizedText::new("Gold")).unwrap();
        assert_eq!(value, json!({ "default": "Gold" }));
    }
}
