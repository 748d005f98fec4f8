//! Why a single pack failed to compile

use thiserror::Error;

use crate::artifact::fonts::FontAtlasError;
use crate::artifact::ArtifactError;
use crate::cycles::SemanticError;
use crate::normalize::NormalizeError;
use crate::resolver::DependencyFailure;

/// A failure scoped to one pack. Never aborts the workspace.
#[derive(Debug, Error)]
pub enum PackFailure {
    #[error(transparent)]
    Dependency(#[from] DependencyFailure),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Font(#[from] FontAtlasError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl PackFailure {
    /// Stage that produced the failure, for summaries and logs
    pub fn stage(&self) -> &'static str {
        match self {
            PackFailure::Dependency(_) => "dependencies",
            PackFailure::Normalize(_) => "schema",
            PackFailure::Semantic(_) => "semantics",
            PackFailure::Font(_) => "fonts",
            PackFailure::Artifact(_) => "artifact",
        }
    }
}
