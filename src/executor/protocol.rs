//! Request/response contract with the external query executor

use crate::state::mode::LookupMode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Operation names understood by the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    FindById,
    Find,
    Aggregate,
}

/// One issued lookup. Immutable once built; `token` orders requests of
/// the same mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(skip)]
    pub mode: LookupMode,
    #[serde(skip)]
    pub token: u64,
    pub operation: Operation,
    pub connection_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl QueryRequest {
    /// Wire form sent to executors that speak JSON
    pub fn to_wire(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A document found by an ObjectId lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMatch {
    pub collection: String,
    pub document: Value,
}

/// Response body as produced by the executor.
///
/// `status` stays a string so that unknown values can be reported instead
/// of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<DocumentMatch>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approx_size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches_metadata: Option<Value>,
}

impl ExecutorResponse {
    pub fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            ..Default::default()
        }
    }

    pub fn found(matches: Vec<DocumentMatch>) -> Self {
        Self {
            status: "found".to_string(),
            matches: Some(matches),
            ..Default::default()
        }
    }

    pub fn ok(results: Vec<Value>) -> Self {
        Self {
            status: "ok".to_string(),
            results: Some(results),
            ..Default::default()
        }
    }

    /// `too_large` for output that was cut off before it could be parsed
    pub fn oversized(observed_bytes: usize, max_bytes: usize) -> Self {
        Self {
            status: "too_large".to_string(),
            approx_size_bytes: Some(observed_bytes as u64),
            max_size_bytes: Some(max_bytes as u64),
            matches_metadata: Some(Value::Null),
            ..Default::default()
        }
    }
}

/// Result of the collection listing call
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionsListing {
    #[serde(default)]
    pub ok: Value,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default)]
    pub read_only: Option<bool>,
}

impl CollectionsListing {
    pub fn new(collections: Vec<String>, read_only: Option<bool>) -> Self {
        Self {
            ok: json!(1),
            collections,
            read_only,
        }
    }

    /// The executor reports success as `1` or `true`
    pub fn is_ok(&self) -> bool {
        is_truthy(&self.ok)
    }
}

/// Result of probing a connection
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestReport {
    #[serde(default)]
    pub ok: Value,
    #[serde(default)]
    pub read_only: Option<bool>,
    /// One-line failure summary, filled in by the caller
    #[serde(skip)]
    pub summary: Option<String>,
}

impl ConnectionTestReport {
    pub fn is_ok(&self) -> bool {
        is_truthy(&self.ok)
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}

/// Replace a response whose serialized form exceeds `max_bytes` with a
/// `too_large` summary carrying only size metadata.
pub fn enforce_size_cap(response: ExecutorResponse, max_bytes: usize) -> ExecutorResponse {
    if response.status == "too_large" {
        return response;
    }

    let size = serde_json::to_vec(&response).map(|v| v.len()).unwrap_or(0);
    if size <= max_bytes {
        return response;
    }

    let matches_metadata = match (&response.matches, &response.results) {
        (Some(matches), _) => Value::Array(
            matches
                .iter()
                .map(|m| {
                    let doc_size = serde_json::to_vec(&m.document).map(|v| v.len()).unwrap_or(0);
                    json!({ "collection": m.collection, "approxSizeBytes": doc_size })
                })
                .collect(),
        ),
        (None, Some(results)) => json!({ "resultCount": results.len() }),
        (None, None) => Value::Null,
    };

    ExecutorResponse {
        status: "too_large".to_string(),
        approx_size_bytes: Some(size as u64),
        max_size_bytes: Some(max_bytes as u64),
        matches_metadata: Some(matches_metadata),
        collections: response.collections,
        read_only: response.read_only,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> QueryRequest {
        QueryRequest {
            mode: LookupMode::Find,
            token: 7,
            operation: Operation::Find,
            connection_uri: "mongodb://localhost/test".into(),
            object_id: None,
            collection: Some("tickets".into()),
            filter: Some(json!({"status": "open"})),
            pipeline: None,
            limit: Some(20),
        }
    }

    #[test]
    fn test_wire_request_shape() {
        let wire = request().to_wire();
        assert_eq!(wire["operation"], "find");
        assert_eq!(wire["connectionUri"], "mongodb://localhost/test");
        assert_eq!(wire["limit"], 20);
        assert!(wire.get("pipeline").is_none());
        assert!(wire.get("token").is_none());
    }

    #[test]
    fn test_findbyid_operation_name() {
        assert_eq!(serde_json::to_value(Operation::FindById).unwrap(), "findById");
    }

    #[test]
    fn test_response_parses_found() {
        let raw = r#"{"status":"found","matches":[{"collection":"users","document":{"_id":"x"}}],"collections":["users"],"readOnly":true}"#;
        let parsed: ExecutorResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.status, "found");
        assert_eq!(parsed.matches.as_ref().map(|m| m.len()), Some(1));
        assert_eq!(parsed.read_only, Some(true));
    }

    #[test]
    fn test_size_cap_passes_small_responses() {
        let response = ExecutorResponse::ok(vec![json!({"a": 1})]);
        assert_eq!(enforce_size_cap(response.clone(), 1024), response);
    }

    #[test]
    fn test_size_cap_replaces_large_matches() {
        let big = "x".repeat(2048);
        let response = ExecutorResponse::found(vec![DocumentMatch {
            collection: "blobs".into(),
            document: json!({ "data": big }),
        }]);
        let capped = enforce_size_cap(response, 1024);
        assert_eq!(capped.status, "too_large");
        assert!(capped.matches.is_none());
        assert!(capped.approx_size_bytes.unwrap() > 1024);
        assert_eq!(capped.max_size_bytes, Some(1024));
        let meta = capped.matches_metadata.unwrap();
        assert_eq!(meta[0]["collection"], "blobs");
    }

    #[test]
    fn test_size_cap_summarizes_results() {
        let results: Vec<Value> = (0..100).map(|i| json!({ "i": i, "pad": "yyyyyyyy" })).collect();
        let capped = enforce_size_cap(ExecutorResponse::ok(results), 256);
        assert_eq!(capped.status, "too_large");
        assert_eq!(capped.matches_metadata, Some(json!({ "resultCount": 100 })));
    }

    #[test]
    fn test_listing_ok_flag() {
        let listing: CollectionsListing =
            serde_json::from_str(r#"{"ok":1,"collections":["a"],"readOnly":null}"#).unwrap();
        assert!(listing.is_ok());
        let listing: CollectionsListing = serde_json::from_str(r#"{"ok":false}"#).unwrap();
        assert!(!listing.is_ok());
    }
}
