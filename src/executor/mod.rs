//! External query executor
//!
//! The document store is opaque to the lookup core: every query crosses
//! this boundary as a [`QueryRequest`] and comes back as exactly one
//! [`ExecutorResponse`] or [`ExecutorError`].

pub mod process;
pub mod protocol;

use async_trait::async_trait;
use std::time::Duration;

pub use process::ProcessExecutor;
pub use protocol::{
    CollectionsListing, ConnectionTestReport, DocumentMatch, ExecutorResponse, Operation,
    QueryRequest,
};

/// Failure to obtain a response from the executor
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Failed to start executor '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Executor I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Executor timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Executor exited with code {exit_code:?}: {stderr}")]
    Failed {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Executor returned an unexpected response: {0}")]
    UnexpectedOutput(String),
}

/// Anything that can answer lookup requests for a connection URI
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run one lookup
    async fn execute(&self, request: &QueryRequest) -> Result<ExecutorResponse, ExecutorError>;

    /// List the queryable collections of a connection
    async fn list_collections(&self, connection_uri: &str) -> Result<CollectionsListing, ExecutorError>;

    /// Check that a connection can be opened
    async fn test_connection(&self, connection_uri: &str) -> Result<ConnectionTestReport, ExecutorError> {
        let listing = self.list_collections(connection_uri).await?;
        Ok(ConnectionTestReport {
            ok: listing.ok,
            read_only: listing.read_only,
            summary: None,
        })
    }
}
