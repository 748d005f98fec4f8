//! Workspace compilation
//!
//! Packs compile one at a time in resolver order. A pack fails when the
//! resolver already failed it, when a pack it `requires` failed, or at any
//! of its own stages: normalize, semantic checks, fonts, artifact hashing.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use packforge_domain::PackSlug;
use serde_json::Value;
use thiserror::Error;

use crate::artifact::fonts::{build_font_artifacts, FontArtifact, FontAtlasPort, PrebuiltFontAtlas};
use crate::artifact::{ArtifactError, CompiledArtifact};
use crate::cycles::check_semantics;
use crate::discovery::{discover_content_documents, list_package_dirs, ContentDocument, DiscoveryError};
use crate::error::PackFailure;
use crate::normalize::{normalize_pack, NormalizeError, NormalizedPackOutput};
use crate::resolver::{resolve_workspace, DependencyFailure, PackDeclaration};
use crate::sync::{synchronize, PackArtifacts, SyncError, SyncReport};
use crate::warnings::CompilerWarning;

/// Turns a raw document into a normalized pack
pub trait PackNormalizer {
    fn normalize(&self, document: &Value) -> Result<NormalizedPackOutput, NormalizeError>;
}

/// The schema normalizer
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaNormalizer;

impl PackNormalizer for SchemaNormalizer {
    fn normalize(&self, document: &Value) -> Result<NormalizedPackOutput, NormalizeError> {
        normalize_pack(document)
    }
}

#[derive(Debug)]
pub enum PackCompileResult {
    Compiled {
        slug: PackSlug,
        package_root: PathBuf,
        artifact: CompiledArtifact,
        fonts: Vec<FontArtifact>,
        warnings: Vec<CompilerWarning>,
        duration: Duration,
    },
    Failed {
        slug: PackSlug,
        package_root: PathBuf,
        error: PackFailure,
        warnings: Vec<CompilerWarning>,
        duration: Duration,
    },
}

impl PackCompileResult {
    pub fn slug(&self) -> &PackSlug {
        match self {
            PackCompileResult::Compiled { slug, .. } | PackCompileResult::Failed { slug, .. } => {
                slug
            }
        }
    }

    pub fn package_root(&self) -> &Path {
        match self {
            PackCompileResult::Compiled { package_root, .. }
            | PackCompileResult::Failed { package_root, .. } => package_root,
        }
    }

    pub fn warnings(&self) -> &[CompilerWarning] {
        match self {
            PackCompileResult::Compiled { warnings, .. }
            | PackCompileResult::Failed { warnings, .. } => warnings,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            PackCompileResult::Compiled { duration, .. }
            | PackCompileResult::Failed { duration, .. } => *duration,
        }
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self, PackCompileResult::Compiled { .. })
    }

    pub fn error(&self) -> Option<&PackFailure> {
        match self {
            PackCompileResult::Failed { error, .. } => Some(error),
            PackCompileResult::Compiled { .. } => None,
        }
    }
}

/// Per-pack results in compile order
#[derive(Debug, Default)]
pub struct WorkspaceCompileResult {
    pub packs: Vec<PackCompileResult>,
}

impl WorkspaceCompileResult {
    pub fn get(&self, slug: &str) -> Option<&PackCompileResult> {
        self.packs.iter().find(|p| p.slug().as_str() == slug)
    }

    pub fn failed_count(&self) -> usize {
        self.packs.iter().filter(|p| !p.is_compiled()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }
}

/// Compiles workspaces with pluggable normalization and font rendering
#[derive(Clone, Copy)]
pub struct WorkspaceCompiler<'a> {
    normalizer: &'a dyn PackNormalizer,
    fonts: &'a dyn FontAtlasPort,
}

impl Default for WorkspaceCompiler<'static> {
    fn default() -> Self {
        Self {
            normalizer: &SchemaNormalizer,
            fonts: &PrebuiltFontAtlas,
        }
    }
}

impl<'a> WorkspaceCompiler<'a> {
    pub fn new(normalizer: &'a dyn PackNormalizer, fonts: &'a dyn FontAtlasPort) -> Self {
        Self { normalizer, fonts }
    }

    pub fn compile(&self, documents: &[ContentDocument]) -> WorkspaceCompileResult {
        let declarations: Vec<PackDeclaration> = documents
            .iter()
            .map(|d| PackDeclaration::from_document(d.pack_slug.clone(), &d.document))
            .collect();
        let plan = resolve_workspace(&declarations);

        let mut failed: BTreeSet<PackSlug> = plan.failures.keys().cloned().collect();
        let mut result = WorkspaceCompileResult::default();

        for slug in &plan.order {
            let Some(document) = documents.iter().find(|d| &d.pack_slug == slug) else {
                continue;
            };
            let started = Instant::now();
            let mut warnings = plan.warnings_for(slug).to_vec();

            let outcome = match plan.failure(slug) {
                Some(failure) => Err(PackFailure::from(failure.clone())),
                None => match plan
                    .required_dependencies(slug)
                    .iter()
                    .find(|dep| failed.contains(*dep))
                {
                    Some(dependency) => Err(PackFailure::from(DependencyFailure::DependencyFailed {
                        pack: slug.clone(),
                        dependency: dependency.clone(),
                    })),
                    None => self.compile_pack(document, &mut warnings),
                },
            };

            let duration = started.elapsed();
            let package_root = document.package_root();
            match outcome {
                Ok((artifact, fonts)) => {
                    tracing::info!(
                        slug = %slug,
                        digest = %artifact.digest.hash,
                        warnings = warnings.len(),
                        elapsed_ms = duration.as_millis() as u64,
                        "pack compiled"
                    );
                    for warning in &warnings {
                        tracing::warn!(slug = %slug, "{}", warning);
                    }
                    result.packs.push(PackCompileResult::Compiled {
                        slug: slug.clone(),
                        package_root,
                        artifact,
                        fonts,
                        warnings,
                        duration,
                    });
                }
                Err(error) => {
                    tracing::error!(slug = %slug, stage = error.stage(), "pack failed: {}", error);
                    failed.insert(slug.clone());
                    result.packs.push(PackCompileResult::Failed {
                        slug: slug.clone(),
                        package_root,
                        error,
                        warnings,
                        duration,
                    });
                }
            }
        }
        result
    }

    fn compile_pack(
        &self,
        document: &ContentDocument,
        warnings: &mut Vec<CompilerWarning>,
    ) -> Result<(CompiledArtifact, Vec<FontArtifact>), PackFailure> {
        let output = self.normalizer.normalize(&document.document)?;
        warnings.extend(output.warnings);

        check_semantics(output.pack.modules())?;
        let fonts = build_font_artifacts(&output.pack, &document.content_dir(), self.fonts)?;
        let artifact = CompiledArtifact::build(output.pack, warnings.clone())?;
        Ok((artifact, fonts))
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Result of a full discover, compile and synchronize run
#[derive(Debug)]
pub struct WorkspaceBuild {
    pub compile: WorkspaceCompileResult,
    pub sync: SyncReport,
}

/// Discover, compile and synchronize the workspace at `root`.
pub fn build_workspace(
    root: &Path,
    check: bool,
    compiler: &WorkspaceCompiler<'_>,
) -> Result<WorkspaceBuild, BuildError> {
    let documents = discover_content_documents(root)?;
    tracing::info!(packs = documents.len(), root = ?root, "discovered content packs");

    let compile = compiler.compile(&documents);

    // Packages whose manifest was removed still get their artifacts pruned.
    let package_roots = list_package_dirs(root)?;
    let mut packs = Vec::new();
    for pack in &compile.packs {
        if let PackCompileResult::Compiled {
            artifact,
            fonts,
            package_root,
            ..
        } = pack
        {
            packs.push(PackArtifacts::render(artifact, fonts.clone(), package_root)?);
        }
    }

    let sync = synchronize(&package_roots, &packs, check)?;
    Ok(WorkspaceBuild { compile, sync })
}
