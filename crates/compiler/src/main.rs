//! Packforge - compile every content pack in a workspace.
//!
//! Usage: `packforge [compile|check] [workspace-root]`

use std::process::ExitCode;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use packforge_compiler::config::load_dotenv;
use packforge_compiler::sync::write_atomic;
use packforge_compiler::{build_workspace, CompilerConfig, WorkspaceCompiler, WorkspaceSummary};

fn main() -> anyhow::Result<ExitCode> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    load_dotenv(&cwd);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "packforge_compiler=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CompilerConfig::from_env()
        .and_then(|config| config.with_args(std::env::args().skip(1)))
        .context("invalid configuration")?;
    tracing::info!(
        root = ?config.workspace_root,
        check = config.check,
        "Starting packforge"
    );

    let compiler = WorkspaceCompiler::default();
    let build = build_workspace(&config.workspace_root, config.check, &compiler)
        .with_context(|| format!("failed to build {}", config.workspace_root.display()))?;

    let summary = WorkspaceSummary::new(&build, config.check);
    if let Some(path) = &config.summary_path {
        let json = summary.to_json().context("failed to serialize summary")?;
        write_atomic(path, json.as_bytes())
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
    }

    let failed = summary.failed();
    tracing::info!(
        packs = summary.packs.len(),
        failed,
        "Finished packforge"
    );
    if summary.should_fail() {
        if config.check && failed == 0 {
            tracing::error!("artifacts are out of date; run `packforge compile`");
        }
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
