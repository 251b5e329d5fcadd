use crate::connection::Connection;
use crate::executor::{Operation, QueryExecutor, QueryRequest};
use crate::services::response_normalizer::{normalize, QueryOutcome};
use crate::services::stale_guard::ResponseGuard;
use crate::state::mode::{LookupMode, ModeState, ParsedValue};
use std::time::Instant;
use tracing::{debug, info};

/// Builds requests from mode snapshots and decides which responses still count
#[derive(Debug, Default)]
pub struct QueryDispatcher {
    guard: ResponseGuard,
}

impl QueryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot `state` into a request carrying a fresh token.
    ///
    /// Callers check `ModeState::blocker` first; missing parts are sent empty
    /// and rejected by the executor.
    pub fn issue(&mut self, state: &ModeState, connection: &Connection) -> QueryRequest {
        let mode = state.mode;
        let token = self.guard.issue(mode);

        let mut request = QueryRequest {
            mode,
            token,
            operation: mode.operation(),
            connection_uri: connection.uri.clone(),
            object_id: None,
            collection: None,
            filter: None,
            pipeline: None,
            limit: None,
        };

        match &state.parsed_value {
            Some(ParsedValue::ObjectId(id)) => request.object_id = Some(id.clone()),
            Some(ParsedValue::Filter(filter)) => request.filter = Some(filter.clone()),
            Some(ParsedValue::Pipeline(pipeline)) => request.pipeline = Some(pipeline.clone()),
            None => {}
        }

        if request.operation != Operation::FindById {
            request.collection = state.selected_collection.clone();
            request.limit = Some(state.limit);
        }

        info!(
            target: "query",
            "Issuing {} request #{} against {}",
            mode,
            token,
            connection.target_label()
        );
        request
    }

    /// Object-id request built straight from a detected id
    pub fn issue_object_id(&mut self, object_id: &str, connection: &Connection) -> QueryRequest {
        let token = self.guard.issue(LookupMode::ObjectId);
        info!(target: "query", "Issuing objectid request #{} for {}", token, object_id);
        QueryRequest {
            mode: LookupMode::ObjectId,
            token,
            operation: Operation::FindById,
            connection_uri: connection.uri.clone(),
            object_id: Some(object_id.to_string()),
            collection: None,
            filter: None,
            pipeline: None,
            limit: None,
        }
    }

    pub fn is_current(&self, mode: LookupMode, token: u64) -> bool {
        self.guard.is_current(mode, token)
    }

    pub fn last_issued(&self, mode: LookupMode) -> u64 {
        self.guard.last_issued(mode)
    }

    pub fn invalidate(&mut self, mode: LookupMode) {
        self.guard.invalidate(mode);
    }

    pub fn invalidate_all(&mut self) {
        self.guard.invalidate_all();
    }

    /// Send one request and normalize whatever comes back
    pub async fn dispatch(executor: &dyn QueryExecutor, request: &QueryRequest) -> QueryOutcome {
        let start = Instant::now();
        let outcome = normalize(executor.execute(request).await);
        debug!(
            target: "query",
            "{} request #{} settled as {} in {}ms",
            request.mode,
            request.token,
            outcome.status,
            start.elapsed().as_millis()
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn connection() -> Connection {
        Connection::new("1", "local", "mongodb://localhost:27017/app")
    }

    #[test]
    fn test_find_request_carries_collection_and_limit() {
        let mut state = ModeState::new(LookupMode::Find, 20);
        state.set_input(r#"{"status":"open"}"#);
        state.set_limit("5");
        state.select_collection(Some("tickets".into()));

        let mut dispatcher = QueryDispatcher::new();
        let request = dispatcher.issue(&state, &connection());
        assert_eq!(request.token, 1);
        assert_eq!(request.operation, Operation::Find);
        assert_eq!(request.collection.as_deref(), Some("tickets"));
        assert_eq!(request.filter, Some(json!({"status": "open"})));
        assert_eq!(request.limit, Some(5));
        assert!(request.pipeline.is_none());
    }

    #[test]
    fn test_objectid_request_has_no_limit() {
        let mut state = ModeState::new(LookupMode::ObjectId, 20);
        state.set_input("507f1f77bcf86cd799439011");
        state.select_collection(Some("ignored".into()));

        let mut dispatcher = QueryDispatcher::new();
        let request = dispatcher.issue(&state, &connection());
        assert_eq!(request.object_id.as_deref(), Some("507f1f77bcf86cd799439011"));
        assert!(request.limit.is_none());
        assert!(request.collection.is_none());
    }

    #[test]
    fn test_newer_request_supersedes_older() {
        let mut dispatcher = QueryDispatcher::new();
        let first = dispatcher.issue_object_id("507f1f77bcf86cd799439011", &connection());
        let second = dispatcher.issue_object_id("507f191e810c19729de860ea", &connection());
        assert!(!dispatcher.is_current(LookupMode::ObjectId, first.token));
        assert!(dispatcher.is_current(LookupMode::ObjectId, second.token));

        dispatcher.invalidate_all();
        assert!(!dispatcher.is_current(LookupMode::ObjectId, second.token));
    }
}
