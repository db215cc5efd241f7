use crate::{settings::Credentials, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod aws_cli;
pub mod errors;

pub use aws_cli::AwsCliClient;

/// Outcome of one pipeline stage's latest execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageStatus {
    Succeeded,
    Failed,
    /// In progress, stopped, superseded, never run, or anything else the API reports.
    InProgress,
}

impl StageStatus {
    pub fn from_api(raw: &str) -> Self {
        match raw {
            "Succeeded" => StageStatus::Succeeded,
            "Failed" => StageStatus::Failed,
            _ => StageStatus::InProgress,
        }
    }

    /// Lenient parser for the CLI render helper ("s", "ok", "failed", ...).
    pub fn parse_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "s" | "ok" | "succeeded" | "success" => Some(StageStatus::Succeeded),
            "f" | "fail" | "failed" => Some(StageStatus::Failed),
            "p" | "pending" | "inprogress" | "in_progress" | "running" => {
                Some(StageStatus::InProgress)
            }
            _ => None,
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StageStatus::Succeeded => "Succeeded",
            StageStatus::Failed => "Failed",
            StageStatus::InProgress => "InProgress",
        };
        f.write_str(label)
    }
}

/// True when nothing is left to wait on. An empty stage list counts as settled.
pub fn all_succeeded(statuses: &[StageStatus]) -> bool {
    statuses.iter().all(|s| *s == StageStatus::Succeeded)
}

/// Everything a client needs to look up one pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    pub pipeline_name: String,
    pub region: String,
    pub credentials: Credentials,
}

/// Returns the ordered per-stage statuses of a pipeline's latest executions.
///
/// Implementations block; the daemon calls them from a worker thread.
pub trait PipelineClient: Send + Sync {
    fn pipeline_state(&self, request: &PipelineRequest) -> Result<Vec<StageStatus>>;
}
