use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;

use super::errors::{classify_cli_stderr, classify_io_error, FetchFailureKind};
use super::{PipelineClient, PipelineRequest, StageStatus};
use crate::{Error, Result};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);
const STDERR_SNIPPET_CHARS: usize = 240;

#[derive(Debug, Deserialize)]
struct PipelineStateResponse {
    #[serde(rename = "stageStates", default)]
    stage_states: Vec<StageState>,
}

#[derive(Debug, Deserialize)]
struct StageState {
    #[serde(rename = "latestExecution")]
    latest_execution: Option<StageExecution>,
}

#[derive(Debug, Deserialize)]
struct StageExecution {
    #[serde(default)]
    status: String,
}

/// Fetches pipeline state by running `aws codepipeline get-pipeline-state`.
///
/// Credentials go onto the child's environment only; the daemon's own
/// environment is never touched.
#[derive(Debug, Clone)]
pub struct AwsCliClient {
    program: String,
    base_args: Vec<String>,
    timeout: Duration,
}

impl AwsCliClient {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            timeout,
        }
    }

    /// Arguments placed before the `codepipeline` subcommand.
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    fn command(&self, request: &PipelineRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .args([
                "codepipeline",
                "get-pipeline-state",
                "--name",
                request.pipeline_name.as_str(),
                "--region",
                request.region.as_str(),
                "--output",
                "json",
            ])
            .env("AWS_ACCESS_KEY_ID", &request.credentials.access_key_id)
            .env(
                "AWS_SECRET_ACCESS_KEY",
                &request.credentials.secret_access_key,
            )
            .env_remove("AWS_SESSION_TOKEN")
            .env_remove("AWS_PROFILE")
            .env("AWS_PAGER", "")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl PipelineClient for AwsCliClient {
    fn pipeline_state(&self, request: &PipelineRequest) -> Result<Vec<StageStatus>> {
        let mut child = self.command(request).spawn().map_err(|e| {
            Error::fetch(
                classify_io_error(&e),
                format!("failed to launch '{}': {e}", self.program),
            )
        })?;
        let deadline = Instant::now() + self.timeout;
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = wait_with_deadline(&mut child, deadline, self.timeout)?;
        // A forked helper can outlive the CLI and keep the pipes open.
        let stdout = collect_until(&stdout, deadline, self.timeout)?;
        let stderr = collect_until(&stderr, deadline, self.timeout)?;

        if !status.success() {
            let text = String::from_utf8_lossy(&stderr);
            return Err(Error::fetch(
                classify_cli_stderr(&text),
                format!("{} exited with {status}: {}", self.program, snippet(&text)),
            ));
        }
        parse_pipeline_state(&String::from_utf8_lossy(&stdout))
    }
}

/// Extract the ordered stage statuses from a `GetPipelineState` JSON response.
pub fn parse_pipeline_state(raw: &str) -> Result<Vec<StageStatus>> {
    let response: PipelineStateResponse = serde_json::from_str(raw).map_err(|e| {
        Error::fetch(
            FetchFailureKind::Malformed,
            format!("unexpected get-pipeline-state output: {e}"),
        )
    })?;
    Ok(response
        .stage_states
        .iter()
        .map(|stage| {
            stage
                .latest_execution
                .as_ref()
                .map(|exec| StageStatus::from_api(&exec.status))
                .unwrap_or(StageStatus::InProgress)
        })
        .collect())
}

fn spawn_reader<R>(reader: Option<R>) -> Receiver<Vec<u8>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut reader) = reader {
            let _ = reader.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });
    rx
}

/// Wait for a reader thread's output, giving up at `deadline`.
fn collect_until(
    rx: &Receiver<Vec<u8>>,
    deadline: Instant,
    timeout: Duration,
) -> Result<Vec<u8>> {
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(buf) => Ok(buf),
        Err(RecvTimeoutError::Disconnected) => Ok(Vec::new()),
        Err(RecvTimeoutError::Timeout) => Err(timed_out(timeout)),
    }
}

fn wait_with_deadline(
    child: &mut Child,
    deadline: Instant,
    timeout: Duration,
) -> Result<ExitStatus> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(err) => {
                reap(child);
                return Err(err.into());
            }
        }
        if Instant::now() >= deadline {
            reap(child);
            return Err(timed_out(timeout));
        }
        thread::sleep(WAIT_POLL_INTERVAL);
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn timed_out(timeout: Duration) -> Error {
    Error::fetch(
        FetchFailureKind::Timeout,
        format!(
            "no response within {}",
            humantime::format_duration(timeout)
        ),
    )
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= STDERR_SNIPPET_CHARS {
        return trimmed.to_string();
    }
    let mut s: String = trimmed.chars().take(STDERR_SNIPPET_CHARS - 3).collect();
    s.push_str("...");
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfinished_output_gives_up_at_the_deadline() {
        let (_tx, rx) = mpsc::channel::<Vec<u8>>();
        let started = Instant::now();
        let err = collect_until(
            &rx,
            started + Duration::from_millis(50),
            Duration::from_millis(50),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Fetch {
                kind: FetchFailureKind::Timeout,
                ..
            }
        ));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn closed_reader_yields_empty_output() {
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        drop(tx);
        let out = collect_until(&rx, Instant::now(), Duration::ZERO).unwrap();
        assert!(out.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn reap_leaves_no_running_child() {
        let mut child = Command::new("sleep").arg("5").spawn().unwrap();
        reap(&mut child);
        assert!(child.try_wait().unwrap().is_some());
    }

    #[test]
    fn parses_stage_states_in_order() {
        let raw = r#"{
            "pipelineName": "demo",
            "stageStates": [
                {"stageName": "Source", "latestExecution": {"pipelineExecutionId": "a", "status": "Succeeded"}},
                {"stageName": "Build", "latestExecution": {"pipelineExecutionId": "a", "status": "InProgress"}},
                {"stageName": "Deploy", "latestExecution": {"pipelineExecutionId": "b", "status": "Failed"}},
                {"stageName": "Verify"}
            ]
        }"#;
        let statuses = parse_pipeline_state(raw).unwrap();
        assert_eq!(
            statuses,
            vec![
                StageStatus::Succeeded,
                StageStatus::InProgress,
                StageStatus::Failed,
                StageStatus::InProgress
            ]
        );
    }

    #[test]
    fn missing_stage_states_is_empty() {
        let statuses = parse_pipeline_state(r#"{"pipelineName":"demo"}"#).unwrap();
        assert!(statuses.is_empty());
    }

    #[test]
    fn rejects_non_json_output() {
        let err = parse_pipeline_state("<html>").unwrap_err();
        assert!(matches!(
            err,
            Error::Fetch {
                kind: FetchFailureKind::Malformed,
                ..
            }
        ));
    }

    #[test]
    fn snippet_truncates_long_stderr() {
        let long = "x".repeat(STDERR_SNIPPET_CHARS * 2);
        let s = snippet(&long);
        assert_eq!(s.chars().count(), STDERR_SNIPPET_CHARS);
        assert!(s.ends_with("..."));
    }
}
