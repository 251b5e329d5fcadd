//! Lookup coordinator
//!
//! Owns the [`AppStateContainer`] and is the only place that mutates it.
//! Every run is split in two so responses can arrive in any order:
//!
//! ```text
//! begin_run(mode) ──► QueryRequest{token} ──► executor ──► QueryOutcome
//!                                                              │
//! apply_outcome(mode, token, outcome) ◄────────────────────────┘
//!     token == last issued for mode  → view updated, mode settled
//!     otherwise                      → dropped
//! ```
//!
//! The clipboard poll is a plain method (`clipboard_tick`) so it can be
//! driven by any timer, or directly from tests.

use crate::app_state_container::AppStateContainer;
use crate::clipboard::ClipboardSource;
use crate::collections_cache::{CollectionsFetch, CollectionsStatus};
use crate::config::Config;
use crate::connection::Connection;
use crate::executor::{CollectionsListing, QueryExecutor, QueryRequest};
use crate::input::{extract_object_id, first_line_preview};
use crate::services::{normalize, OutcomeStatus, QueryDispatcher, QueryOutcome, SizeReport};
use crate::state::{LookupEvent, LookupMode, ModeView, OutputView, RunBlocker, Tone};
use anyhow::Result;
use tracing::{debug, info, warn};

const OBJECT_ID_FAILED: &str = "Failed to search for the clipboard ObjectId.";
const QUERY_FAILED: &str = "Query failed.";

/// Rejected user actions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("ObjectId input follows the clipboard while watching is on. Turn watching off to type one.")]
    InputLocked,

    #[error("Collection '{0}' is not available on the active connection.")]
    UnknownCollection(String),
}

/// Follow-up work produced by a connection switch
#[derive(Debug, Default)]
pub struct ConnectionSwitch {
    pub collections_fetch: Option<CollectionsFetch>,
    /// ObjectId lookup for the last clipboard value
    pub lookup: Option<QueryRequest>,
}

pub struct LookupCoordinator {
    state: AppStateContainer,
    dispatcher: QueryDispatcher,
}

impl LookupCoordinator {
    pub fn new(initial_mode: LookupMode, default_limit: u32, clipboard_enabled: bool) -> Self {
        Self {
            state: AppStateContainer::new(initial_mode, default_limit, clipboard_enabled),
            dispatcher: QueryDispatcher::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.behavior.initial_mode(),
            config.behavior.initial_limit(),
            config.clipboard.enabled,
        )
    }

    pub fn state(&self) -> &AppStateContainer {
        &self.state
    }

    // ---- Editing ------------------------------------------------------

    /// Make `mode` the active one. Other modes keep their state.
    pub fn set_active_mode(&mut self, mode: LookupMode) {
        let from = self.state.active_mode();
        if from == mode {
            return;
        }
        self.state.set_active_mode(mode);
        self.state.record(LookupEvent::ModeSwitched { from, to: mode });
    }

    pub fn edit_input(&mut self, mode: LookupMode, raw: &str) -> Result<(), ActionError> {
        if mode == LookupMode::ObjectId && self.state.is_object_id_input_locked() {
            return Err(ActionError::InputLocked);
        }
        let state = self.state.mode_mut(mode);
        state.set_input(raw);
        let valid = state.is_valid;
        self.state.record(LookupEvent::InputChanged { mode, valid });
        Ok(())
    }

    pub fn set_limit(&mut self, mode: LookupMode, raw: &str) {
        let state = self.state.mode_mut(mode);
        state.set_limit(raw);
        let valid = state.is_limit_valid;
        self.state.record(LookupEvent::LimitChanged { mode, valid });
    }

    pub fn select_collection(&mut self, mode: LookupMode, collection: Option<String>) -> Result<(), ActionError> {
        if let Some(name) = &collection {
            let snapshot = self.state.collections();
            if snapshot.status == CollectionsStatus::Loaded && !snapshot.contains(name) {
                return Err(ActionError::UnknownCollection(name.clone()));
            }
        }
        self.state.mode_mut(mode).select_collection(collection);
        let collection = self.state.mode(mode).selected_collection.clone();
        self.state.record(LookupEvent::CollectionSelected { mode, collection });
        Ok(())
    }

    // ---- Clipboard ----------------------------------------------------

    pub fn set_clipboard_watch(&mut self, enabled: bool) {
        let watch = self.state.clipboard_mut();
        watch.enabled = enabled;
        if !enabled {
            // Re-enabling evaluates the clipboard afresh
            watch.last_content = None;
        }
        info!(target: "clipboard", "Clipboard watching {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn set_editor_focused(&mut self, focused: bool) {
        self.state.clipboard_mut().editor_focused = focused;
    }

    /// One poll of the clipboard. Returns the lookup to dispatch, if any.
    pub fn clipboard_tick(&mut self, clipboard: &mut dyn ClipboardSource) -> Option<QueryRequest> {
        if !self.state.clipboard().should_poll() || self.state.active_mode() != LookupMode::ObjectId {
            return None;
        }

        let text = match clipboard.read_text() {
            Ok(text) => text,
            Err(e) => {
                warn!(target: "clipboard", "Failed to read clipboard: {:#}", e);
                return None;
            }
        };

        if self.state.clipboard().last_content.as_deref() == Some(text.as_str()) {
            return None;
        }
        self.state.clipboard_mut().last_content = Some(text.clone());
        self.process_clipboard(&text)
    }

    /// Evaluate clipboard text against the active connection
    pub fn process_clipboard(&mut self, text: &str) -> Option<QueryRequest> {
        let mode = LookupMode::ObjectId;
        // Whatever was in flight belongs to older clipboard content
        self.dispatcher.invalidate(mode);
        self.state.set_in_flight(mode, None);

        let trimmed = text.trim();
        {
            let state = self.state.mode_mut(mode);
            state.set_input(trimmed);
            if state.is_running {
                state.settle();
            }
        }

        if trimmed.is_empty() {
            self.set_view(mode, ModeView::idle(mode));
            return None;
        }

        let Some(object_id) = extract_object_id(trimmed) else {
            let preview = first_line_preview(text);
            let preview = if preview.is_empty() { "(empty)".to_string() } else { preview };
            self.set_view(
                mode,
                ModeView::message(
                    format!("Clipboard is not a valid ObjectId. First line: {}", preview),
                    Tone::Error,
                ),
            );
            self.state.record(LookupEvent::ClipboardIgnored {
                reason: "not an ObjectId".to_string(),
            });
            return None;
        };

        let Some(connection) = self.state.active_connection().cloned() else {
            self.set_view(
                mode,
                ModeView::message(
                    format!(
                        "Ready to search for ObjectId({}). Select an active connection first.",
                        object_id
                    ),
                    Tone::Warning,
                ),
            );
            self.state.record(LookupEvent::RunBlocked {
                mode,
                reason: RunBlocker::NoActiveConnection.to_string(),
            });
            return None;
        };

        debug!(target: "clipboard", "Clipboard holds ObjectId {}", object_id);
        let request = self.dispatcher.issue_object_id(&object_id, &connection);
        Some(self.start_request(request))
    }

    /// Write to the clipboard without triggering a lookup of our own text
    pub fn copy_to_clipboard(&mut self, clipboard: &mut dyn ClipboardSource, text: &str) -> Result<()> {
        clipboard.write_text(text)?;
        self.state.clipboard_mut().last_content = Some(text.to_string());
        info!(target: "clipboard", "Copied {} bytes to the clipboard", text.len());
        Ok(())
    }

    /// Pretty JSON of the documents currently shown for `mode`
    pub fn output_text(&self, mode: LookupMode) -> Option<String> {
        let documents: Vec<serde_json::Value> = match &self.state.mode(mode).view.output {
            OutputView::Matches(matches) => matches.iter().map(|m| m.document.clone()).collect(),
            OutputView::Results(results) => results.clone(),
            _ => return None,
        };
        let value = match documents.len() {
            1 => documents.into_iter().next()?,
            _ => serde_json::Value::Array(documents),
        };
        serde_json::to_string_pretty(&value).ok()
    }

    // ---- Running ------------------------------------------------------

    /// Validate `mode` and issue its request. The caller dispatches it and
    /// hands the outcome to [`apply_outcome`](Self::apply_outcome).
    pub fn begin_run(&mut self, mode: LookupMode) -> Result<QueryRequest, RunBlocker> {
        let has_connection = self.state.has_connection();
        if let Some(blocker) = self.state.mode(mode).blocker(has_connection) {
            info!(target: "query", "{} run blocked: {}", mode, blocker);
            self.state.record(LookupEvent::RunBlocked {
                mode,
                reason: blocker.to_string(),
            });
            return Err(blocker);
        }

        let connection = self
            .state
            .active_connection()
            .cloned()
            .ok_or(RunBlocker::NoActiveConnection)?;
        let request = self.dispatcher.issue(self.state.mode(mode), &connection);
        Ok(self.start_request(request))
    }

    fn start_request(&mut self, request: QueryRequest) -> QueryRequest {
        let mode = request.mode;
        self.state.mode_mut(mode).mark_running();
        self.set_view(mode, loading_view(&request));
        self.state.set_in_flight(mode, Some(request.clone()));
        self.state.record(LookupEvent::RequestIssued {
            mode,
            token: request.token,
        });
        request
    }

    /// Apply an outcome if it answers the latest request of `mode`.
    /// Returns false when it was stale and dropped.
    pub fn apply_outcome(&mut self, mode: LookupMode, token: u64, outcome: QueryOutcome) -> bool {
        if !self.dispatcher.is_current(mode, token) {
            let current = self.dispatcher.last_issued(mode);
            debug!(
                target: "query",
                "Dropping stale {} response #{} (current #{})",
                mode,
                token,
                current
            );
            self.state.record(LookupEvent::OutcomeDiscarded { mode, token, current });
            return false;
        }

        // One accepted outcome per token
        self.dispatcher.invalidate(mode);
        let request = self.state.in_flight(mode).cloned();
        self.state.set_in_flight(mode, None);
        self.state.mode_mut(mode).settle();

        match outcome.status {
            OutcomeStatus::DependencyMissing => {
                let banner = outcome
                    .message
                    .clone()
                    .unwrap_or_else(|| "A required executor dependency is missing.".to_string());
                self.state.set_dependency_banner(Some(banner));
            }
            _ => self.state.set_dependency_banner(None),
        }

        info!(
            target: "query",
            "{} request #{} completed: {} ({} documents)",
            mode,
            token,
            outcome.status,
            outcome.document_count()
        );
        self.state.record(LookupEvent::OutcomeAccepted {
            mode,
            token,
            status: outcome.status.to_string(),
        });
        self.set_view(mode, outcome_view(mode, request.as_ref(), outcome));
        true
    }

    /// Validate, dispatch and apply in one go
    pub async fn run(&mut self, mode: LookupMode, executor: &dyn QueryExecutor) -> Result<bool, RunBlocker> {
        let request = self.begin_run(mode)?;
        let outcome = QueryDispatcher::dispatch(executor, &request).await;
        Ok(self.apply_outcome(mode, request.token, outcome))
    }

    // ---- Connection ---------------------------------------------------

    /// Replace the active connection. A change of identity drops every
    /// in-flight response, clears all outputs and restarts the
    /// collections fetch.
    pub fn switch_connection(&mut self, connection: Option<Connection>) -> ConnectionSwitch {
        let old_key = self.state.active_connection().map(Connection::identity);
        let new_key = connection.as_ref().map(Connection::identity);
        if old_key == new_key {
            self.state.set_active_connection(connection);
            return ConnectionSwitch::default();
        }

        info!(
            target: "query",
            "Switching active connection to {}",
            connection
                .as_ref()
                .map(Connection::target_label)
                .unwrap_or_else(|| "[none]".to_string())
        );
        self.state.set_active_connection(connection);

        self.dispatcher.invalidate_all();
        self.state.clear_in_flight();
        for state in self.state.modes_mut() {
            if state.is_running {
                state.settle();
            }
            state.view = ModeView::idle(state.mode);
        }

        let connection_id = self.state.active_connection().map(|c| c.id.clone());
        self.state.record(LookupEvent::ConnectionChanged { connection_id });

        let active = self.state.active_connection().cloned();
        let collections_fetch = self
            .state
            .collections_cache_mut()
            .on_connection_changed(active.as_ref());

        let lookup = if self.state.active_mode() == LookupMode::ObjectId && self.state.clipboard().enabled {
            self.state
                .clipboard()
                .last_content
                .clone()
                .and_then(|text| self.process_clipboard(&text))
        } else {
            None
        };

        ConnectionSwitch {
            collections_fetch,
            lookup,
        }
    }

    /// Apply a finished collections fetch
    pub fn apply_collections(&mut self, fetch: &CollectionsFetch, result: Result<CollectionsListing, String>) -> bool {
        let key = &fetch.key;
        let applied = self.state.collections_cache_mut().complete(fetch, result);
        if !applied {
            self.state.record(LookupEvent::CollectionsDiscarded {
                connection_id: key.id.clone(),
            });
            return false;
        }

        let loaded = self.state.collections().status == CollectionsStatus::Loaded;
        if loaded {
            let names = self.state.collections().names.clone();
            for state in self.state.modes_mut() {
                let missing = state
                    .selected_collection
                    .as_ref()
                    .is_some_and(|c| names.binary_search(c).is_err());
                if missing {
                    debug!(target: "collections", "Clearing {} selection, collection no longer listed", state.mode);
                    state.selected_collection = None;
                }
            }
        }
        self.state.record(LookupEvent::CollectionsApplied {
            connection_id: key.id.clone(),
            loaded,
        });
        true
    }

    /// Ask for a fresh listing of the active connection's collections
    pub fn refresh_collections(&mut self) -> Option<CollectionsFetch> {
        let active = self.state.active_connection()?.clone();
        self.state.collections_cache_mut().refresh(&active)
    }

    /// Run a listing fetch. Failures become a one-line message.
    pub async fn fetch_collections(
        executor: &dyn QueryExecutor,
        fetch: &CollectionsFetch,
    ) -> Result<CollectionsListing, String> {
        executor
            .list_collections(&fetch.connection_uri)
            .await
            .map_err(|e| {
                normalize(Err(e))
                    .message
                    .unwrap_or_else(|| "Failed to list collections.".to_string())
            })
    }

    /// Fetch and apply in one go
    pub async fn load_collections(&mut self, executor: &dyn QueryExecutor, fetch: CollectionsFetch) -> bool {
        let result = Self::fetch_collections(executor, &fetch).await;
        self.apply_collections(&fetch, result)
    }

    fn set_view(&mut self, mode: LookupMode, view: ModeView) {
        self.state.mode_mut(mode).view = view;
    }
}

fn loading_view(request: &QueryRequest) -> ModeView {
    let collection = request.collection.as_deref().unwrap_or("?");
    let (message, loading) = match request.mode {
        LookupMode::ObjectId => {
            let id = request.object_id.as_deref().unwrap_or_default();
            (
                format!("Searching for ObjectId({})...", id),
                format!("Running ObjectId lookup for ObjectId({})...", id),
            )
        }
        LookupMode::Find => (
            format!("Running find on {}...", collection),
            format!("Running find on {} (limit {})...", collection, request.limit.unwrap_or_default()),
        ),
        LookupMode::Aggregate => (
            format!("Running aggregation on {}...", collection),
            format!(
                "Running aggregation on {} (limit {})...",
                collection,
                request.limit.unwrap_or_default()
            ),
        ),
    };
    ModeView::message(message, Tone::Info).with_output(OutputView::Loading(loading))
}

fn outcome_view(mode: LookupMode, request: Option<&QueryRequest>, outcome: QueryOutcome) -> ModeView {
    let object_id = request.and_then(|r| r.object_id.as_deref()).unwrap_or_default();
    let collection = request.and_then(|r| r.collection.as_deref()).unwrap_or("the collection");

    match outcome.status {
        OutcomeStatus::Found | OutcomeStatus::Ok => {
            let count = outcome.document_count();
            if mode == LookupMode::ObjectId {
                ModeView::message(
                    format!("Found {} document(s) matching ObjectId({}).", count, object_id),
                    Tone::Success,
                )
                .with_output(OutputView::Matches(outcome.matches))
            } else {
                ModeView::message(format!("Found {} document(s) in {}.", count, collection), Tone::Success)
                    .with_output(OutputView::Results(outcome.results))
            }
        }
        OutcomeStatus::NotFound | OutcomeStatus::NoCollections => match mode {
            LookupMode::ObjectId => {
                ModeView::message(format!("ObjectId({}) Object not found.", object_id), Tone::Error)
            }
            _ => ModeView::message(format!("No documents matched in {}.", collection), Tone::Warning),
        },
        OutcomeStatus::TooLarge => too_large_view(mode, outcome.size),
        OutcomeStatus::Invalid
        | OutcomeStatus::InvalidLimit
        | OutcomeStatus::DependencyMissing
        | OutcomeStatus::Error => {
            let fallback = if mode == LookupMode::ObjectId {
                OBJECT_ID_FAILED
            } else {
                QUERY_FAILED
            };
            ModeView::message(outcome.message.unwrap_or_else(|| fallback.to_string()), Tone::Error)
        }
    }
}

fn too_large_view(mode: LookupMode, size: Option<SizeReport>) -> ModeView {
    let size = size.unwrap_or(SizeReport {
        approx_size_bytes: 0,
        max_size_bytes: 0,
        matches_metadata: None,
    });
    let guidance = match mode {
        LookupMode::ObjectId => "The matching document is too large to display. Inspect it with a projection in Find mode.",
        LookupMode::Find => "The result is too large to display. Add a narrower filter or lower the limit.",
        LookupMode::Aggregate => "The result is too large to display. Add a $project stage or lower the limit.",
    };
    ModeView::message(
        format!(
            "Result too large to display (about {} KB, maximum {} KB).",
            size.approx_size_bytes.div_ceil(1024),
            size.max_size_bytes / 1024
        ),
        Tone::Warning,
    )
    .with_output(OutputView::TooLarge {
        guidance: guidance.to_string(),
        approx_size_bytes: size.approx_size_bytes,
        max_size_bytes: size.max_size_bytes,
        matches_metadata: size.matches_metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::DocumentMatch;
    use serde_json::json;

    const OID: &str = "507f1f77bcf86cd799439011";

    struct StaticClipboard(String);

    impl ClipboardSource for StaticClipboard {
        fn read_text(&mut self) -> Result<String> {
            Ok(self.0.clone())
        }

        fn write_text(&mut self, text: &str) -> Result<()> {
            self.0 = text.to_string();
            Ok(())
        }
    }

    fn connected() -> LookupCoordinator {
        let mut coordinator = LookupCoordinator::new(LookupMode::ObjectId, 20, true);
        coordinator.switch_connection(Some(Connection::new("1", "local", "mongodb://localhost/app")));
        coordinator
    }

    fn found(count: usize) -> QueryOutcome {
        let mut outcome = QueryOutcome::new(OutcomeStatus::Found);
        outcome.matches = (0..count)
            .map(|i| DocumentMatch {
                collection: format!("c{}", i),
                document: json!({"_id": OID}),
            })
            .collect();
        outcome
    }

    #[test]
    fn test_clipboard_tick_issues_lookup_once() {
        let mut coordinator = connected();
        let mut clipboard = StaticClipboard(OID.to_string());

        let request = coordinator.clipboard_tick(&mut clipboard).unwrap();
        assert_eq!(request.object_id.as_deref(), Some(OID));
        assert!(coordinator.state().mode(LookupMode::ObjectId).is_running);
        assert!(coordinator.state().mode(LookupMode::ObjectId).view.is_loading());

        // Unchanged clipboard is not looked up again
        assert!(coordinator.clipboard_tick(&mut clipboard).is_none());
    }

    #[test]
    fn test_tick_paused_while_editor_focused() {
        let mut coordinator = connected();
        coordinator.set_editor_focused(true);
        let mut clipboard = StaticClipboard(OID.to_string());
        assert!(coordinator.clipboard_tick(&mut clipboard).is_none());
        assert!(coordinator.state().clipboard().last_content.is_none());
    }

    #[test]
    fn test_copy_does_not_trigger_lookup() {
        let mut coordinator = connected();
        let mut clipboard = StaticClipboard(String::new());
        coordinator.copy_to_clipboard(&mut clipboard, OID).unwrap();
        assert!(coordinator.clipboard_tick(&mut clipboard).is_none());
    }

    #[test]
    fn test_non_identifier_clipboard_message() {
        let mut coordinator = connected();
        coordinator.process_clipboard("hello world\nsecond line");
        let view = &coordinator.state().mode(LookupMode::ObjectId).view;
        assert_eq!(view.message, "Clipboard is not a valid ObjectId. First line: hello world");
        assert_eq!(view.tone, Tone::Error);
        assert_eq!(view.output, OutputView::Hidden);
    }

    #[test]
    fn test_found_and_not_found_messages() {
        let mut coordinator = connected();
        let request = coordinator.process_clipboard(OID).unwrap();
        assert!(coordinator.apply_outcome(LookupMode::ObjectId, request.token, found(2)));
        let view = &coordinator.state().mode(LookupMode::ObjectId).view;
        assert_eq!(view.message, format!("Found 2 document(s) matching ObjectId({}).", OID));
        assert_eq!(view.rendered_count(), 2);

        let request = coordinator.process_clipboard(&format!("ObjectId(\"{}\")", OID)).unwrap();
        coordinator.apply_outcome(
            LookupMode::ObjectId,
            request.token,
            QueryOutcome::new(OutcomeStatus::NotFound),
        );
        let view = &coordinator.state().mode(LookupMode::ObjectId).view;
        assert_eq!(view.message, format!("ObjectId({}) Object not found.", OID));
        assert_eq!(view.output, OutputView::Hidden);
    }

    #[test]
    fn test_outcome_accepted_once() {
        let mut coordinator = connected();
        let request = coordinator.process_clipboard(OID).unwrap();
        assert!(coordinator.apply_outcome(LookupMode::ObjectId, request.token, found(1)));
        assert!(!coordinator.apply_outcome(LookupMode::ObjectId, request.token, found(3)));
        assert_eq!(coordinator.state().mode(LookupMode::ObjectId).view.rendered_count(), 1);
    }

    #[test]
    fn test_dependency_banner_persists_until_other_outcome() {
        let mut coordinator = connected();
        let request = coordinator.process_clipboard(OID).unwrap();
        coordinator.apply_outcome(
            LookupMode::ObjectId,
            request.token,
            QueryOutcome::with_message(OutcomeStatus::DependencyMissing, "Missing dependency: mongodb"),
        );
        assert_eq!(coordinator.state().dependency_banner(), Some("Missing dependency: mongodb"));

        coordinator.switch_connection(Some(Connection::new("2", "other", "mongodb://other/app")));
        assert!(coordinator.state().dependency_banner().is_some());

        let request = coordinator.process_clipboard("507f191e810c19729de860ea").unwrap();
        coordinator.apply_outcome(LookupMode::ObjectId, request.token, found(1));
        assert!(coordinator.state().dependency_banner().is_none());
    }

    #[test]
    fn test_object_id_input_locked_while_watching() {
        let mut coordinator = connected();
        assert_eq!(
            coordinator.edit_input(LookupMode::ObjectId, OID),
            Err(ActionError::InputLocked)
        );
        coordinator.set_clipboard_watch(false);
        assert!(coordinator.edit_input(LookupMode::ObjectId, OID).is_ok());
        assert!(coordinator.state().mode(LookupMode::ObjectId).is_valid);
    }

    #[test]
    fn test_mode_switch_preserves_other_modes() {
        let mut coordinator = connected();
        coordinator.edit_input(LookupMode::Find, r#"{"a":1}"#).unwrap();
        coordinator.set_active_mode(LookupMode::Aggregate);
        coordinator.edit_input(LookupMode::Aggregate, "[]").unwrap();
        coordinator.set_active_mode(LookupMode::Find);
        assert_eq!(coordinator.state().mode(LookupMode::Find).raw_input, r#"{"a":1}"#);
        assert!(coordinator.state().mode(LookupMode::Aggregate).is_valid);
    }

    #[test]
    fn test_unknown_collection_rejected_once_loaded() {
        let mut coordinator = LookupCoordinator::new(LookupMode::ObjectId, 20, true);
        let fetch = coordinator
            .switch_connection(Some(Connection::new("1", "local", "mongodb://localhost/app")))
            .collections_fetch
            .unwrap();
        coordinator.apply_collections(&fetch, Ok(CollectionsListing::new(vec!["tickets".into()], None)));

        assert!(coordinator.select_collection(LookupMode::Find, Some("tickets".into())).is_ok());
        assert_eq!(
            coordinator.select_collection(LookupMode::Find, Some("nope".into())),
            Err(ActionError::UnknownCollection("nope".into()))
        );
    }

    #[test]
    fn test_output_text_single_document() {
        let mut coordinator = connected();
        let request = coordinator.process_clipboard(OID).unwrap();
        coordinator.apply_outcome(LookupMode::ObjectId, request.token, found(1));
        let text = coordinator.output_text(LookupMode::ObjectId).unwrap();
        assert!(text.starts_with('{'));
        assert!(text.contains(OID));
    }
}
