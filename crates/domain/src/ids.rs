use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

// Workspace-level identity of a pack
define_id!(PackSlug);

// Identity of an entity inside a pack (resource, generator, ...)
define_id!(ContentId);

impl PackSlug {
    /// Normalize a raw pack id into the slug used as the dependency key.
    ///
    /// Slugs are trimmed and lowercased so `"Core-Pack "` and `"core-pack"`
    /// address the same pack.
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }
}

/// Returns true when `value` matches `[a-z0-9][a-z0-9-]*` (also accepts `_` and `.`
/// after the first character for content ids such as `core.gold`).
pub fn is_valid_slug(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first.is_ascii_digit() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_slug_normalize() {
        assert_eq!(PackSlug::normalize("  Core-Pack ").as_str(), "core-pack");
    }

    #[test]
    fn test_slug_validation() {
        assert!(is_valid_slug("gold"));
        assert!(is_valid_slug("core.gold-2"));
        assert!(is_valid_slug("9lives"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("-gold"));
        assert!(!is_valid_slug("Gold"));
        assert!(!is_valid_slug("gold coin"));
    }

    #[test]
    fn test_content_id_serializes_transparently() {
        let id = ContentId::from("gold");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"gold\"");
        let back: ContentId = serde_json::from_str("\"gold\"").unwrap();
        assert_eq!(back, id);
    }
}
