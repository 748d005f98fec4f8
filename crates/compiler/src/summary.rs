//! Workspace summary written after a run

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::artifact::to_canonical_pretty;
use crate::sync::{SyncReport, WriteAction};
use crate::warnings::CompilerWarning;
use crate::workspace::{PackCompileResult, WorkspaceBuild};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PackStatus {
    Compiled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackSummary {
    pub slug: String,
    pub status: PackStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CompilerWarning>,
    pub duration_ms: f64,
}

impl From<&PackCompileResult> for PackSummary {
    fn from(result: &PackCompileResult) -> Self {
        let (status, digest, artifact_hash, error) = match result {
            PackCompileResult::Compiled { artifact, .. } => (
                PackStatus::Compiled,
                Some(artifact.digest.hash.clone()),
                Some(artifact.artifact_hash.clone()),
                None,
            ),
            PackCompileResult::Failed { error, .. } => {
                (PackStatus::Failed, None, None, Some(error.to_string()))
            }
        };
        Self {
            slug: result.slug().to_string(),
            status,
            digest,
            artifact_hash,
            error,
            warnings: result.warnings().to_vec(),
            duration_ms: result.duration().as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSummary {
    pub check: bool,
    pub packs: Vec<PackSummary>,
    /// Operation count per action name
    pub operations: BTreeMap<String, usize>,
}

impl WorkspaceSummary {
    pub fn new(build: &WorkspaceBuild, check: bool) -> Self {
        Self {
            check,
            packs: build.compile.packs.iter().map(PackSummary::from).collect(),
            operations: operation_counts(&build.sync),
        }
    }

    pub fn failed(&self) -> usize {
        self.packs
            .iter()
            .filter(|p| p.status == PackStatus::Failed)
            .count()
    }

    /// Whether the run should exit non-zero
    pub fn should_fail(&self) -> bool {
        let pending = self.operations.get(WriteAction::WouldWrite.as_str()).copied().unwrap_or(0)
            + self.operations.get(WriteAction::WouldDelete.as_str()).copied().unwrap_or(0);
        self.failed() > 0 || (self.check && pending > 0)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        Ok(to_canonical_pretty(&serde_json::to_value(self)?))
    }
}

fn operation_counts(report: &SyncReport) -> BTreeMap<String, usize> {
    WriteAction::ALL
        .iter()
        .map(|action| (action.as_str().to_string(), report.count(*action)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{ArtifactKind, ArtifactWriteOperation};
    use crate::workspace::WorkspaceCompileResult;
    use std::path::PathBuf;

    fn build(actions: &[WriteAction]) -> WorkspaceBuild {
        WorkspaceBuild {
            compile: WorkspaceCompileResult::default(),
            sync: SyncReport {
                operations: actions
                    .iter()
                    .map(|action| ArtifactWriteOperation {
                        slug: None,
                        kind: ArtifactKind::Json,
                        path: PathBuf::from("x"),
                        action: *action,
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn test_counts_every_action() {
        let summary = WorkspaceSummary::new(&build(&[WriteAction::Written, WriteAction::Written]), false);
        assert_eq!(summary.operations["written"], 2);
        assert_eq!(summary.operations["would-delete"], 0);
        assert_eq!(summary.operations.len(), 5);
        assert!(!summary.should_fail());
    }

    #[test]
    fn test_check_mode_fails_on_pending_changes() {
        let pending = WorkspaceSummary::new(&build(&[WriteAction::WouldWrite]), true);
        assert!(pending.should_fail());
        let clean = WorkspaceSummary::new(&build(&[WriteAction::Unchanged]), true);
        assert!(!clean.should_fail());
    }

    #[test]
    fn test_json_is_canonical() {
        let json = WorkspaceSummary::new(&build(&[]), false).to_json().unwrap();
        assert!(json.starts_with("{\n  \"check\": false,"));
    }
}
