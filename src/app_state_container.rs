use crate::collections_cache::{CollectionsCache, CollectionsSnapshot};
use crate::connection::Connection;
use crate::executor::QueryRequest;
use crate::state::{EventLog, LookupEvent, LookupMode, ModeState};
use std::fmt;

/// Clipboard watcher state
#[derive(Debug, Clone, Default)]
pub struct ClipboardWatch {
    pub enabled: bool,
    /// Polling pauses while the user is typing into a text field
    pub editor_focused: bool,
    /// Last clipboard text seen (or written by us)
    pub last_content: Option<String>,
}

impl ClipboardWatch {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }

    pub fn should_poll(&self) -> bool {
        self.enabled && !self.editor_focused
    }
}

/// Explicit state of the lookup core. All mutation goes through the
/// coordinator's action functions.
pub struct AppStateContainer {
    // Modes
    active_mode: LookupMode,
    modes: [ModeState; 3],
    in_flight: [Option<QueryRequest>; 3],

    // Connection
    active_connection: Option<Connection>,
    collections: CollectionsCache,

    // Clipboard
    clipboard: ClipboardWatch,

    // Environment problems that outlive one outcome
    dependency_banner: Option<String>,

    events: EventLog,
}

impl AppStateContainer {
    pub fn new(initial_mode: LookupMode, default_limit: u32, clipboard_enabled: bool) -> Self {
        Self {
            active_mode: initial_mode,
            modes: LookupMode::ALL.map(|mode| ModeState::new(mode, default_limit)),
            in_flight: [None, None, None],
            active_connection: None,
            collections: CollectionsCache::new(),
            clipboard: ClipboardWatch::new(clipboard_enabled),
            dependency_banner: None,
            events: EventLog::default(),
        }
    }

    // Modes
    pub fn active_mode(&self) -> LookupMode {
        self.active_mode
    }

    pub(crate) fn set_active_mode(&mut self, mode: LookupMode) {
        self.active_mode = mode;
    }

    pub fn mode(&self, mode: LookupMode) -> &ModeState {
        &self.modes[mode.index()]
    }

    pub(crate) fn mode_mut(&mut self, mode: LookupMode) -> &mut ModeState {
        &mut self.modes[mode.index()]
    }

    pub(crate) fn modes_mut(&mut self) -> impl Iterator<Item = &mut ModeState> {
        self.modes.iter_mut()
    }

    /// Request currently awaited for `mode`
    pub fn in_flight(&self, mode: LookupMode) -> Option<&QueryRequest> {
        self.in_flight[mode.index()].as_ref()
    }

    pub(crate) fn set_in_flight(&mut self, mode: LookupMode, request: Option<QueryRequest>) {
        self.in_flight[mode.index()] = request;
    }

    pub(crate) fn clear_in_flight(&mut self) {
        self.in_flight = [None, None, None];
    }

    // Connection
    pub fn active_connection(&self) -> Option<&Connection> {
        self.active_connection.as_ref()
    }

    pub fn has_connection(&self) -> bool {
        self.active_connection.is_some()
    }

    pub(crate) fn set_active_connection(&mut self, connection: Option<Connection>) {
        self.active_connection = connection;
    }

    pub fn collections(&self) -> &CollectionsSnapshot {
        self.collections.snapshot()
    }

    pub(crate) fn collections_cache_mut(&mut self) -> &mut CollectionsCache {
        &mut self.collections
    }

    // Clipboard
    pub fn clipboard(&self) -> &ClipboardWatch {
        &self.clipboard
    }

    pub(crate) fn clipboard_mut(&mut self) -> &mut ClipboardWatch {
        &mut self.clipboard
    }

    /// ObjectId input follows the clipboard while the watcher is on
    pub fn is_object_id_input_locked(&self) -> bool {
        self.clipboard.enabled
    }

    // Banner
    pub fn dependency_banner(&self) -> Option<&str> {
        self.dependency_banner.as_deref()
    }

    pub(crate) fn set_dependency_banner(&mut self, banner: Option<String>) {
        self.dependency_banner = banner;
    }

    // Events
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub(crate) fn record(&mut self, event: LookupEvent) {
        self.events.record(event);
    }

    /// Multi-line state summary for the `\state` command
    pub fn debug_dump(&self) -> String {
        let mut dump = String::new();

        dump.push_str("=== LOOKUP STATE ===\n\n");
        dump.push_str(&format!("Active mode: {}\n", self.active_mode));
        match &self.active_connection {
            Some(conn) => dump.push_str(&format!(
                "Connection: {} ({})\n",
                conn.display_name,
                conn.target_label()
            )),
            None => dump.push_str("Connection: [none]\n"),
        }
        dump.push('\n');

        dump.push_str("MODES:\n");
        for state in &self.modes {
            dump.push_str(&format!(
                "  {:<10} input={:?} run={:?} limit={}{} collection={} view='{}'\n",
                state.mode.to_string(),
                state.input_phase,
                state.run_phase,
                state.limit,
                if state.is_limit_valid { "" } else { " (invalid)" },
                state.selected_collection.as_deref().unwrap_or("-"),
                state.view.message
            ));
            if let Some(request) = self.in_flight(state.mode) {
                dump.push_str(&format!("             awaiting #{}\n", request.token));
            }
        }
        dump.push('\n');

        let snapshot = self.collections();
        dump.push_str("COLLECTIONS:\n");
        dump.push_str(&format!("  Status: {:?}\n", snapshot.status));
        dump.push_str(&format!("  Names: {}\n", snapshot.names.len()));
        if let Some(read_only) = snapshot.read_only {
            dump.push_str(&format!("  Read-only: {}\n", read_only));
        }
        if let Some(error) = &snapshot.error {
            dump.push_str(&format!("  Error: {}\n", error));
        }
        dump.push('\n');

        dump.push_str("CLIPBOARD:\n");
        dump.push_str(&format!("  Watching: {}\n", self.clipboard.enabled));
        dump.push_str(&format!("  Editor focused: {}\n", self.clipboard.editor_focused));

        if let Some(banner) = &self.dependency_banner {
            dump.push_str(&format!("\nBANNER: {}\n", banner));
        }
        dump
    }
}

impl fmt::Debug for AppStateContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppStateContainer")
            .field("active_mode", &self.active_mode)
            .field(
                "active_connection",
                &self.active_connection.as_ref().map(|c| c.id.as_str()),
            )
            .field("collections_status", &self.collections().status)
            .field("clipboard", &self.clipboard)
            .field("dependency_banner", &self.dependency_banner)
            .field("events", &self.events.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_container_has_one_state_per_mode() {
        let container = AppStateContainer::new(LookupMode::Find, 50, true);
        assert_eq!(container.active_mode(), LookupMode::Find);
        for mode in LookupMode::ALL {
            assert_eq!(container.mode(mode).mode, mode);
            assert_eq!(container.mode(mode).limit, 50);
        }
        assert!(!container.has_connection());
        assert!(container.is_object_id_input_locked());
    }

    #[test]
    fn test_clipboard_poll_pauses_while_editing() {
        let mut watch = ClipboardWatch::new(true);
        assert!(watch.should_poll());
        watch.editor_focused = true;
        assert!(!watch.should_poll());
    }

    #[test]
    fn test_debug_dump_mentions_modes() {
        let container = AppStateContainer::new(LookupMode::ObjectId, 20, false);
        let dump = container.debug_dump();
        assert!(dump.contains("aggregate"));
        assert!(dump.contains("Connection: [none]"));
    }
}
