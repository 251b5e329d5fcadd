//! Maps whatever the executor produced onto the canonical outcome vocabulary

use crate::executor::{DocumentMatch, ExecutorError, ExecutorResponse};
use serde_json::Value;
use std::fmt;
use std::io::ErrorKind;
use tracing::warn;

const UNEXPECTED_RESPONSE: &str = "Lookup script returned an unexpected response.";

/// Canonical outcome statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Found,
    Ok,
    NotFound,
    NoCollections,
    Invalid,
    InvalidLimit,
    DependencyMissing,
    TooLarge,
    Error,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Found => "found",
            OutcomeStatus::Ok => "ok",
            OutcomeStatus::NotFound => "not_found",
            OutcomeStatus::NoCollections => "no_collections",
            OutcomeStatus::Invalid => "invalid",
            OutcomeStatus::InvalidLimit => "invalid_limit",
            OutcomeStatus::DependencyMissing => "dependency_missing",
            OutcomeStatus::TooLarge => "too_large",
            OutcomeStatus::Error => "error",
        }
    }

    pub fn parse(status: &str) -> Option<Self> {
        let status = match status.trim().to_ascii_lowercase().as_str() {
            "found" => OutcomeStatus::Found,
            "ok" => OutcomeStatus::Ok,
            "not_found" => OutcomeStatus::NotFound,
            "no_collections" => OutcomeStatus::NoCollections,
            "invalid" => OutcomeStatus::Invalid,
            "invalid_limit" => OutcomeStatus::InvalidLimit,
            "dependency_missing" => OutcomeStatus::DependencyMissing,
            "too_large" => OutcomeStatus::TooLarge,
            "error" => OutcomeStatus::Error,
            _ => return None,
        };
        Some(status)
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size information attached to a `too_large` outcome
#[derive(Debug, Clone, PartialEq)]
pub struct SizeReport {
    pub approx_size_bytes: u64,
    pub max_size_bytes: u64,
    pub matches_metadata: Option<Value>,
}

/// Normalized result of one request
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub status: OutcomeStatus,
    pub matches: Vec<DocumentMatch>,
    pub results: Vec<Value>,
    pub message: Option<String>,
    pub collections: Option<Vec<String>>,
    pub read_only: Option<bool>,
    pub size: Option<SizeReport>,
}

impl QueryOutcome {
    pub fn new(status: OutcomeStatus) -> Self {
        Self {
            status,
            matches: Vec::new(),
            results: Vec::new(),
            message: None,
            collections: None,
            read_only: None,
            size: None,
        }
    }

    pub fn with_message(status: OutcomeStatus, message: impl Into<String>) -> Self {
        let mut outcome = Self::new(status);
        outcome.message = Some(message.into());
        outcome
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_message(OutcomeStatus::Error, message)
    }

    /// Documents carried by this outcome
    pub fn document_count(&self) -> usize {
        self.matches.len() + self.results.len()
    }
}

/// Turn one executor call result into exactly one outcome
pub fn normalize(result: Result<ExecutorResponse, ExecutorError>) -> QueryOutcome {
    match result {
        Ok(response) => normalize_response(response),
        Err(err) => normalize_error(err),
    }
}

fn normalize_response(response: ExecutorResponse) -> QueryOutcome {
    let Some(mut status) = OutcomeStatus::parse(&response.status) else {
        warn!(target: "query", "Unrecognized executor status '{}'", response.status);
        return QueryOutcome::error(UNEXPECTED_RESPONSE);
    };

    // Structured error code refines a generic error status
    if status == OutcomeStatus::Error {
        if let Some(code) = response.code.as_deref().and_then(OutcomeStatus::parse) {
            status = code;
        }
    }

    let matches = response.matches.unwrap_or_default();
    let results = response.results.unwrap_or_default();

    // found/ok promise at least one document
    if matches!(status, OutcomeStatus::Found | OutcomeStatus::Ok) && matches.is_empty() && results.is_empty() {
        status = OutcomeStatus::NotFound;
    }

    let size = if status == OutcomeStatus::TooLarge {
        Some(SizeReport {
            approx_size_bytes: response.approx_size_bytes.unwrap_or(0),
            max_size_bytes: response.max_size_bytes.unwrap_or(0),
            matches_metadata: response.matches_metadata,
        })
    } else {
        None
    };

    let keep_documents = matches!(status, OutcomeStatus::Found | OutcomeStatus::Ok);
    QueryOutcome {
        status,
        matches: if keep_documents { matches } else { Vec::new() },
        results: if keep_documents { results } else { Vec::new() },
        message: response.message,
        collections: response.collections,
        read_only: response.read_only,
        size,
    }
}

fn normalize_error(err: ExecutorError) -> QueryOutcome {
    match err {
        ExecutorError::Failed {
            exit_code,
            stdout,
            stderr,
        } => {
            if let Some(outcome) = structured_failure(&stderr).or_else(|| structured_failure(&stdout)) {
                return outcome;
            }

            let status = classify_failure_text(&stderr);
            let message = if !stderr.is_empty() {
                stderr
            } else {
                match exit_code {
                    Some(code) => format!("Lookup script failed with exit code {}.", code),
                    None => "Lookup script failed.".to_string(),
                }
            };
            QueryOutcome::with_message(status, message)
        }
        ExecutorError::Spawn { program, source } if source.kind() == ErrorKind::NotFound => {
            QueryOutcome::with_message(
                OutcomeStatus::DependencyMissing,
                format!(
                    "Missing dependency: '{}' was not found. Install it or set executor.node_path in the config file.",
                    program
                ),
            )
        }
        ExecutorError::Timeout(after) => {
            QueryOutcome::error(format!("Query timed out after {}s.", after.as_secs()))
        }
        ExecutorError::UnexpectedOutput(output) => {
            warn!(target: "query", "Unexpected executor output: {}", output);
            QueryOutcome::error(UNEXPECTED_RESPONSE)
        }
        other => QueryOutcome::error(other.to_string()),
    }
}

/// A failure reported as a JSON line carrying a `code`
fn structured_failure(text: &str) -> Option<QueryOutcome> {
    text.lines()
        .filter_map(|line| serde_json::from_str::<Value>(line.trim()).ok())
        .find_map(|value| {
            let code = value.get("code").and_then(Value::as_str)?;
            let status = OutcomeStatus::parse(code)?;
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Lookup failed: {}", code));
            Some(QueryOutcome::with_message(status, message))
        })
}

/// Legacy classification of plain-text stderr
pub fn classify_failure_text(stderr: &str) -> OutcomeStatus {
    let lower = stderr.to_ascii_lowercase();
    if stderr.contains("Missing dependency") {
        OutcomeStatus::DependencyMissing
    } else if stderr.contains("Invalid ObjectId") || lower.contains("invalid json") {
        OutcomeStatus::Invalid
    } else if lower.contains("limit") {
        OutcomeStatus::InvalidLimit
    } else {
        OutcomeStatus::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn failed(stderr: &str) -> Result<ExecutorResponse, ExecutorError> {
        Err(ExecutorError::Failed {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: stderr.to_string(),
        })
    }

    #[test]
    fn test_found_keeps_matches() {
        let response = ExecutorResponse::found(vec![DocumentMatch {
            collection: "users".into(),
            document: json!({"_id": "507f1f77bcf86cd799439011"}),
        }]);
        let outcome = normalize(Ok(response));
        assert_eq!(outcome.status, OutcomeStatus::Found);
        assert_eq!(outcome.document_count(), 1);
    }

    #[test]
    fn test_empty_ok_becomes_not_found() {
        let outcome = normalize(Ok(ExecutorResponse::ok(vec![])));
        assert_eq!(outcome.status, OutcomeStatus::NotFound);
    }

    #[test]
    fn test_unknown_status_is_error() {
        let outcome = normalize(Ok(ExecutorResponse::with_status("maybe")));
        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert_eq!(outcome.message.as_deref(), Some(UNEXPECTED_RESPONSE));
    }

    #[test]
    fn test_structured_code_on_error_status() {
        let mut response = ExecutorResponse::with_status("error");
        response.code = Some("invalid_limit".into());
        response.message = Some("limit too big".into());
        let outcome = normalize(Ok(response));
        assert_eq!(outcome.status, OutcomeStatus::InvalidLimit);
        assert_eq!(outcome.message.as_deref(), Some("limit too big"));
    }

    #[test]
    fn test_structured_code_on_stderr_wins_over_text() {
        let outcome = normalize(failed(
            r#"{"status":"error","code":"dependency_missing","message":"driver absent"}"#,
        ));
        assert_eq!(outcome.status, OutcomeStatus::DependencyMissing);
        assert_eq!(outcome.message.as_deref(), Some("driver absent"));
    }

    #[test]
    fn test_legacy_substring_classification() {
        assert_eq!(
            normalize(failed("Missing dependency: the \"mongodb\" Node.js driver is not installed.")).status,
            OutcomeStatus::DependencyMissing
        );
        assert_eq!(
            normalize(failed("Invalid ObjectId string: xyz")).status,
            OutcomeStatus::Invalid
        );
        assert_eq!(
            normalize(failed("Invalid JSON input: Unexpected token")).status,
            OutcomeStatus::Invalid
        );
        assert_eq!(
            normalize(failed("Result limit must be a positive integer.")).status,
            OutcomeStatus::InvalidLimit
        );
        let other = normalize(failed("MongoServerSelectionError: connect ECONNREFUSED"));
        assert_eq!(other.status, OutcomeStatus::Error);
        assert!(other.message.unwrap().contains("ECONNREFUSED"));
    }

    #[test]
    fn test_silent_failure_mentions_exit_code() {
        let outcome = normalize(Err(ExecutorError::Failed {
            exit_code: Some(9),
            stdout: String::new(),
            stderr: String::new(),
        }));
        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert!(outcome.message.unwrap().contains('9'));
    }

    #[test]
    fn test_transport_failures_become_errors() {
        let timeout = normalize(Err(ExecutorError::Timeout(Duration::from_secs(30))));
        assert_eq!(timeout.status, OutcomeStatus::Error);
        assert_eq!(timeout.message.as_deref(), Some("Query timed out after 30s."));

        let garbage = normalize(Err(ExecutorError::UnexpectedOutput("<html>".into())));
        assert_eq!(garbage.status, OutcomeStatus::Error);
    }

    #[test]
    fn test_missing_interpreter_is_dependency_missing() {
        let outcome = normalize(Err(ExecutorError::Spawn {
            program: "node".into(),
            source: std::io::Error::new(ErrorKind::NotFound, "not found"),
        }));
        assert_eq!(outcome.status, OutcomeStatus::DependencyMissing);
    }

    #[test]
    fn test_too_large_carries_size() {
        let mut response = ExecutorResponse::with_status("too_large");
        response.approx_size_bytes = Some(734_003);
        response.max_size_bytes = Some(512_000);
        response.matches_metadata = Some(json!({"resultCount": 200}));
        let outcome = normalize(Ok(response));
        assert_eq!(outcome.status, OutcomeStatus::TooLarge);
        let size = outcome.size.as_ref().unwrap();
        assert_eq!(size.approx_size_bytes, 734_003);
        assert_eq!(size.max_size_bytes, 512_000);
        assert_eq!(outcome.document_count(), 0);
    }
}
