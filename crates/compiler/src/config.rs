//! Compiler configuration from environment and command line

use std::path::{Path, PathBuf};

use thiserror::Error;

pub const WORKSPACE_ENV: &str = "PACKFORGE_WORKSPACE";
pub const CHECK_ENV: &str = "PACKFORGE_CHECK";
pub const SUMMARY_ENV: &str = "PACKFORGE_SUMMARY";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Unknown command '{0}' (expected 'compile' or 'check')")]
    UnknownCommand(String),
    #[error("Unexpected argument '{0}'")]
    UnexpectedArgument(String),
    #[error("Invalid boolean '{value}' for {name}")]
    InvalidBool { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    pub workspace_root: PathBuf,
    /// Report what would change without touching the disk
    pub check: bool,
    /// Where to write the workspace summary JSON, if anywhere
    pub summary_path: Option<PathBuf>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("."),
            check: false,
            summary_path: None,
        }
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            name,
            value: value.to_string(),
        }),
    }
}

impl CompilerConfig {
    /// Build from a variable lookup (usually `std::env::var`)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(root) = lookup(WORKSPACE_ENV).filter(|v| !v.trim().is_empty()) {
            config.workspace_root = PathBuf::from(root.trim());
        }
        if let Some(check) = lookup(CHECK_ENV) {
            config.check = parse_bool(CHECK_ENV, &check)?;
        }
        config.summary_path = lookup(SUMMARY_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Apply `[compile|check] [workspace-root]`
    pub fn with_args<I, S>(mut self, args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = args.into_iter().map(Into::<String>::into).peekable();
        match args.peek().cloned().as_deref() {
            Some("compile") => {
                self.check = false;
                args.next();
            }
            Some("check") => {
                self.check = true;
                args.next();
            }
            Some(flag) if flag.starts_with('-') => {
                return Err(ConfigError::UnknownCommand(flag.to_string()))
            }
            _ => {}
        }
        if let Some(root) = args.next() {
            self.workspace_root = PathBuf::from(root);
        }
        if let Some(extra) = args.next() {
            return Err(ConfigError::UnexpectedArgument(extra));
        }
        Ok(self)
    }
}

/// Load `.env.local` then `.env` from `root` when present.
pub fn load_dotenv(root: &Path) {
    for filename in [".env.local", ".env"] {
        let path = root.join(filename);
        if path.exists() {
            if let Err(err) = dotenvy::from_path(&path) {
                tracing::warn!(path = ?path, error = %err, "failed to load env file");
            }
        }
    }
}
