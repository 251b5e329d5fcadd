#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use candygram::clipboard::ClipboardSource;
use candygram::connection::Connection;
use candygram::executor::{
    CollectionsListing, DocumentMatch, ExecutorError, ExecutorResponse, QueryExecutor, QueryRequest,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

pub const OID: &str = "507f1f77bcf86cd799439011";

/// Executor that answers from a queue and records every request
#[derive(Default)]
pub struct ScriptedExecutor {
    responses: Mutex<VecDeque<Result<ExecutorResponse, ExecutorError>>>,
    listings: Mutex<VecDeque<Result<CollectionsListing, ExecutorError>>>,
    requests: Mutex<Vec<QueryRequest>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: ExecutorResponse) -> Self {
        self.push(Ok(response));
        self
    }

    pub fn fail(self, error: ExecutorError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn list(self, names: &[&str], read_only: Option<bool>) -> Self {
        let listing = CollectionsListing::new(names.iter().map(|n| n.to_string()).collect(), read_only);
        self.listings.lock().unwrap().push_back(Ok(listing));
        self
    }

    pub fn push(&self, response: Result<ExecutorResponse, ExecutorError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn requests(&self) -> Vec<QueryRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for ScriptedExecutor {
    async fn execute(&self, request: &QueryRequest) -> Result<ExecutorResponse, ExecutorError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ExecutorError::UnexpectedOutput("no scripted response".into())))
    }

    async fn list_collections(&self, _connection_uri: &str) -> Result<CollectionsListing, ExecutorError> {
        self.listings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(CollectionsListing::new(Vec::new(), None)))
    }
}

/// In-memory clipboard
#[derive(Default)]
pub struct FakeClipboard {
    pub text: String,
    pub fail_reads: bool,
    pub reads: usize,
}

impl FakeClipboard {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }
}

impl ClipboardSource for FakeClipboard {
    fn read_text(&mut self) -> Result<String> {
        self.reads += 1;
        if self.fail_reads {
            return Err(anyhow!("clipboard locked by another process"));
        }
        Ok(self.text.clone())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        self.text = text.to_string();
        Ok(())
    }
}

pub fn local_connection() -> Connection {
    let mut connection = Connection::new("1", "local", "mongodb://localhost:27017/app");
    connection.is_active = true;
    connection
}

pub fn other_connection() -> Connection {
    let mut connection = Connection::new("2", "staging", "mongodb://staging.example.com/app");
    connection.is_active = true;
    connection
}

pub fn documents(count: usize) -> Vec<Value> {
    (0..count).map(|i| json!({"_id": i, "status": "open"})).collect()
}

pub fn one_match(collection: &str) -> ExecutorResponse {
    ExecutorResponse::found(vec![DocumentMatch {
        collection: collection.to_string(),
        document: json!({"_id": {"$oid": OID}, "name": "Ada"}),
    }])
}
