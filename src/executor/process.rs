//! Child-process executor
//!
//! Runs one interpreter process per request:
//!
//! ```text
//! <node_path> <scripts_dir>/<script> <args...>
//!     ├── stdout: one JSON line with the response
//!     ├── stderr: diagnostics, inspected when the exit code is non-zero
//!     └── killed when the timeout expires or stdout outgrows its read bound
//! ```
//!
//! Arguments are passed directly, never through a shell. Find requests run
//! through the aggregate script as a single `$match` stage.

use super::protocol::{
    enforce_size_cap, CollectionsListing, ConnectionTestReport, ExecutorResponse, Operation,
    QueryRequest,
};
use super::{ExecutorError, QueryExecutor};
use crate::config::ExecutorConfig;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

const FIND_BY_ID_SCRIPT: &str = "findMongoDocument.js";
const AGGREGATE_SCRIPT: &str = "runAggregatePipeline.js";
const LIST_COLLECTIONS_SCRIPT: &str = "listMongoCollections.js";
const TEST_CONNECTION_SCRIPT: &str = "testMongoConnection.js";

/// Stdout may exceed the response cap by this factor before reading stops
const STDOUT_HEADROOM: usize = 4;
const STDERR_LIMIT: u64 = 64 * 1024;

/// Captured output of a finished script
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Bytes of stdout read before the bound was hit, if it was
    pub stdout_overflow: Option<usize>,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    fn into_failure(self) -> ExecutorError {
        ExecutorError::Failed {
            exit_code: self.exit_code,
            stdout: self.stdout,
            stderr: self.stderr,
        }
    }
}

pub struct ProcessExecutor {
    config: ExecutorConfig,
}

impl ProcessExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Script and positional arguments for a request
    pub fn script_invocation(request: &QueryRequest) -> (&'static str, Vec<String>) {
        let json_arg = |v: &Option<Value>| v.as_ref().map(|v| v.to_string()).unwrap_or_default();
        let limit_arg = request.limit.map(|l| l.to_string()).unwrap_or_default();
        let collection = request.collection.clone().unwrap_or_default();

        match request.operation {
            Operation::FindById => (
                FIND_BY_ID_SCRIPT,
                vec![
                    request.connection_uri.clone(),
                    request.object_id.clone().unwrap_or_default(),
                ],
            ),
            Operation::Find => {
                let filter = request.filter.clone().unwrap_or_else(|| json!({}));
                (
                    AGGREGATE_SCRIPT,
                    vec![
                        request.connection_uri.clone(),
                        collection,
                        json!([{ "$match": filter }]).to_string(),
                        limit_arg,
                    ],
                )
            }
            Operation::Aggregate => (
                AGGREGATE_SCRIPT,
                vec![
                    request.connection_uri.clone(),
                    collection,
                    json_arg(&request.pipeline),
                    limit_arg,
                ],
            ),
        }
    }

    async fn run_script(&self, script: &str, args: &[String]) -> Result<ScriptOutput, ExecutorError> {
        let script_path = self.config.scripts_dir.join(script);
        let timeout = self.config.timeout();
        let start = Instant::now();

        let mut child = Command::new(&self.config.node_path)
            .arg(&script_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecutorError::Spawn {
                program: self.config.node_path.clone(),
                source,
            })?;

        let stdout_limit = self.config.max_output_bytes.saturating_mul(STDOUT_HEADROOM) as u64;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let collect = async {
            let stdout_side = async {
                let captured = read_bounded(stdout, stdout_limit).await?;
                if captured.overflowed {
                    // Nothing else drains stdout now
                    let _ = child.start_kill();
                }
                let status = child.wait().await?;
                Ok::<_, std::io::Error>((status, captured))
            };
            let (stdout_side, stderr_side) =
                tokio::join!(stdout_side, read_bounded(stderr, STDERR_LIMIT));
            let (status, stdout) = stdout_side?;
            Ok::<_, std::io::Error>((status, stdout, stderr_side?))
        };

        let (status, stdout, stderr) = match tokio::time::timeout(timeout, collect).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(target: "executor", "{} timed out after {:?}", script, timeout);
                return Err(ExecutorError::Timeout(timeout));
            }
        };

        if stdout.overflowed {
            warn!(
                target: "executor",
                "{} wrote more than {} bytes to stdout; stopped reading",
                script,
                stdout_limit
            );
        }

        let result = ScriptOutput {
            exit_code: status.code(),
            stdout_overflow: stdout.overflowed.then_some(stdout.bytes.len()),
            stdout: String::from_utf8_lossy(&stdout.bytes).trim().to_string(),
            stderr: String::from_utf8_lossy(&stderr.bytes).trim().to_string(),
        };
        debug!(
            target: "executor",
            "{} finished with {:?} in {}ms",
            script,
            result.exit_code,
            start.elapsed().as_millis()
        );
        Ok(result)
    }
}

struct BoundedRead {
    bytes: Vec<u8>,
    overflowed: bool,
}

/// Read until EOF or until more than `limit` bytes arrived
async fn read_bounded<R>(source: Option<R>, limit: u64) -> std::io::Result<BoundedRead>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    if let Some(source) = source {
        source.take(limit + 1).read_to_end(&mut bytes).await?;
    }
    let overflowed = bytes.len() as u64 > limit;
    if overflowed {
        bytes.truncate(limit as usize);
    }
    Ok(BoundedRead { bytes, overflowed })
}

/// First stdout line that parses as `T` and carries `marker` as a key
pub fn first_json_line<T: DeserializeOwned>(stdout: &str, marker: &str) -> Option<T> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .find(|value| value.get(marker).is_some())
        .and_then(|value| serde_json::from_value(value).ok())
}

/// One-line description of a failed script run
pub fn summarize_failure(output: &ScriptOutput) -> String {
    let text = if output.stderr.is_empty() {
        &output.stdout
    } else {
        &output.stderr
    };
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if !lines.is_empty() {
        let start = lines.len().saturating_sub(3);
        return lines[start..].join(" ");
    }
    match output.exit_code {
        Some(code) => format!("exited with code {}", code),
        None => "unknown failure".to_string(),
    }
}

#[async_trait]
impl QueryExecutor for ProcessExecutor {
    async fn execute(&self, request: &QueryRequest) -> Result<ExecutorResponse, ExecutorError> {
        let (script, args) = Self::script_invocation(request);
        let output = self.run_script(script, &args).await?;

        if let Some(read) = output.stdout_overflow {
            return Ok(ExecutorResponse::oversized(read, self.config.max_output_bytes));
        }
        if !output.success() {
            return Err(output.into_failure());
        }

        let response: ExecutorResponse = first_json_line(&output.stdout, "status")
            .ok_or_else(|| ExecutorError::UnexpectedOutput(output.stdout.clone()))?;
        Ok(enforce_size_cap(response, self.config.max_output_bytes))
    }

    async fn list_collections(&self, connection_uri: &str) -> Result<CollectionsListing, ExecutorError> {
        let output = self
            .run_script(LIST_COLLECTIONS_SCRIPT, &[connection_uri.to_string()])
            .await?;

        if !output.success() {
            return Err(output.into_failure());
        }

        first_json_line(&output.stdout, "ok")
            .ok_or_else(|| ExecutorError::UnexpectedOutput(output.stdout.clone()))
    }

    async fn test_connection(&self, connection_uri: &str) -> Result<ConnectionTestReport, ExecutorError> {
        let output = self
            .run_script(TEST_CONNECTION_SCRIPT, &[connection_uri.to_string()])
            .await?;

        let mut report: ConnectionTestReport =
            first_json_line(&output.stdout, "ok").unwrap_or_default();
        if output.success() {
            // Older scripts print nothing on success
            if report.ok.is_null() {
                report.ok = Value::Bool(true);
            }
        } else {
            report.ok = Value::Bool(false);
            report.summary = Some(summarize_failure(&output));
        }
        Ok(report)
    }
}
