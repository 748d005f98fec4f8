//! Non-fatal compiler diagnostics

use serde::{Deserialize, Serialize};

/// Warning codes emitted by the compiler
pub mod codes {
    pub const OPTIONAL_DEPENDENCY_MISSING: &str = "dependencies.optionalMissing";
    pub const DEFAULT_LOCALE_UNSUPPORTED: &str = "localization.defaultLocaleUnsupported";
    pub const VARIANT_LOCALE_UNSUPPORTED: &str = "localization.variantUnsupported";
}

/// A warning attached to a pack's compile result. Never fails the pack.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerWarning {
    pub code: String,
    pub message: String,
    /// JSON path inside the pack document, when the warning has a location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl CompilerWarning {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            path: None,
        }
    }

    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl std::fmt::Display for CompilerWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "[{}] {} (at {})", self.code, self.message, path),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}
