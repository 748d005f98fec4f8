//! Packforge Compiler library.
//!
//! Compiles a workspace of content packs into normalized, content-addressed
//! artifacts.
//!
//! ## Structure
//!
//! - `discovery` - Finds `packages/*/content/pack.json`
//! - `resolver` - Orders packs and fails them on dependency problems
//! - `normalize` - Schema validation of one pack document
//! - `cycles` - Unlock-condition and transform-economy cycle checks
//! - `artifact` - Digest, hash, serialized pack, generated module, fonts
//! - `sync` - Idempotent writes and pruning of artifacts
//! - `workspace` - The per-pack pipeline tying it together

pub mod artifact;
pub mod config;
pub mod cycles;
pub mod discovery;
pub mod error;
mod graph;
pub mod normalize;
pub mod resolver;
pub mod summary;
pub mod sync;
pub mod warnings;
pub mod workspace;

pub use artifact::{CompiledArtifact, ContentDigest, SerializedContentPack};
pub use config::CompilerConfig;
pub use discovery::{discover_content_documents, list_package_dirs, ContentDocument, DiscoveryError};
pub use error::PackFailure;
pub use summary::WorkspaceSummary;
pub use warnings::CompilerWarning;
pub use workspace::{
    build_workspace, BuildError, PackCompileResult, WorkspaceBuild, WorkspaceCompileResult,
    WorkspaceCompiler,
};
