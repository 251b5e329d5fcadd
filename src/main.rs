use anyhow::{Context, Result};
use candygram::clipboard::SystemClipboard;
use candygram::collections_cache::{CollectionsFetch, CollectionsStatus};
use candygram::config::Config;
use candygram::connection::{Connection, ConnectionStore};
use candygram::executor::{ProcessExecutor, QueryExecutor, QueryRequest};
use candygram::lookup_coordinator::{ConnectionSwitch, LookupCoordinator};
use candygram::services::{normalize, QueryDispatcher, QueryOutcome};
use candygram::state::{LookupMode, Tone};
use candygram::utils::app_paths::AppPaths;
use crossterm::style::Stylize;
use reedline::{
    default_emacs_keybindings, ColumnarMenu, Emacs, FileBackedHistory, KeyCode, KeyModifiers,
    MenuBuilder, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, Reedline,
    ReedlineEvent, ReedlineMenu, Signal, ValidationResult, Validator,
};
use std::borrow::Cow;
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{info, warn};

mod completer;
mod table_display;

use completer::CommandCompleter;
use table_display::{display_collections, display_connections, display_view, print_message};

/// Keeps reading while a `{...}` or `[...]` document is unbalanced
struct JsonValidator;

impl Validator for JsonValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        let trimmed = line.trim_start();
        if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
            return ValidationResult::Complete;
        }

        let mut depth: i32 = 0;
        let mut in_string = false;
        let mut escaped = false;
        for c in trimmed.chars() {
            if in_string {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match c {
                '"' => in_string = true,
                '{' | '[' => depth += 1,
                '}' | ']' => depth -= 1,
                _ => {}
            }
        }

        if depth > 0 {
            ValidationResult::Incomplete
        } else {
            ValidationResult::Complete
        }
    }
}

struct LookupPrompt {
    mode: LookupMode,
}

impl Prompt for LookupPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Owned(self.mode.to_string())
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<'_, str> {
        match edit_mode {
            PromptEditMode::Default | PromptEditMode::Emacs => "> ".into(),
            PromptEditMode::Vi(vi_mode) => match vi_mode {
                reedline::PromptViMode::Normal => " N> ".into(),
                reedline::PromptViMode::Insert => " I> ".into(),
            },
            PromptEditMode::Custom(str) => format!("{str}> ").into(),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse search: {})",
            prefix, history_search.term
        ))
    }
}

fn print_help() {
    println!("{}", "Candygram - MongoDB document lookup".blue().bold());
    println!();
    println!("{}", "Usage:".yellow());
    println!("  candygram [OPTIONS]");
    println!("  candygram watch [--connection <id>]");
    println!();
    println!("{}", "Options:".yellow());
    println!(
        "  {} - Generate config file with defaults",
        "--generate-config".green()
    );
    println!("  {}            - Show this help", "--help".green());
    println!();
    println!("{}", "Commands:".yellow());
    println!("  {}  - objectid, find or aggregate", "\\mode <name>".green());
    println!("  {} - Select a collection (no name clears)", "\\collection [name]".green());
    println!("  {} - List or reload collections", "\\collections [refresh]".green());
    println!("  {}      - Result limit (1-200)", "\\limit <n>".green());
    println!("  {}           - Run the active mode", "\\run".green());
    println!("  {}   - List saved connections", "\\connections".green());
    println!("  {}  - Activate a connection", "\\use <id|none>".green());
    println!("  {} - Save a connection", "\\add <name> <uri>".green());
    println!("  {}   - Delete a connection", "\\delete <id>".green());
    println!("  {}     - Test a connection", "\\test [id]".green());
    println!("  {}  - Clipboard watching", "\\watch on|off".green());
    println!("  {}          - Copy the shown documents", "\\copy".green());
    println!("  {}         - Show lookup state", "\\state".green());
    println!("  {}       - Show recent log lines", "\\log [n]".green());
    println!("  {}          - Exit", "\\quit".green());
    println!();
    println!("Any other line is input for the active mode: an ObjectId, a filter");
    println!("object such as {{\"status\":\"open\"}} or a pipeline array.");
    println!("Press Enter on an empty line to check the clipboard.");
    println!();
}

/// Everything the REPL works with
struct Session {
    coordinator: LookupCoordinator,
    store: ConnectionStore,
    executor: Arc<ProcessExecutor>,
    clipboard: SystemClipboard,
    runtime: Runtime,
    collection_names: Arc<Mutex<Vec<String>>>,
}

impl Session {
    fn new(config: &Config, store: ConnectionStore) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;

        Ok(Self {
            coordinator: LookupCoordinator::from_config(config),
            store,
            executor: Arc::new(ProcessExecutor::new(config.executor.clone())),
            clipboard: SystemClipboard::new(),
            runtime,
            collection_names: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn active_mode(&self) -> LookupMode {
        self.coordinator.state().active_mode()
    }

    fn activate(&mut self, connection: Option<Connection>) {
        let switch = self.coordinator.switch_connection(connection);
        self.follow_switch(switch);
    }

    fn follow_switch(&mut self, switch: ConnectionSwitch) {
        if let Some(fetch) = switch.collections_fetch {
            self.load_collections(fetch);
        }
        if let Some(request) = switch.lookup {
            self.dispatch(request);
        }
    }

    fn load_collections(&mut self, fetch: CollectionsFetch) {
        println!("{}", "Loading collections...".dark_grey());
        let executor = self.executor.clone();
        let applied = self
            .runtime
            .block_on(self.coordinator.load_collections(executor.as_ref(), fetch));
        if applied {
            self.sync_collection_names();
            let snapshot = self.coordinator.state().collections();
            if snapshot.status == CollectionsStatus::Error {
                display_collections(snapshot);
            } else {
                println!("{}", format!("{} collections available.", snapshot.names.len()).dark_grey());
            }
        }
    }

    fn sync_collection_names(&self) {
        if let Ok(mut names) = self.collection_names.lock() {
            *names = self.coordinator.state().collections().names.clone();
        }
    }

    /// Send an issued request and show the result
    fn dispatch(&mut self, request: QueryRequest) {
        let mode = request.mode;
        display_view(&self.coordinator.state().mode(mode).view);

        let executor = self.executor.clone();
        let outcome: QueryOutcome = self
            .runtime
            .block_on(QueryDispatcher::dispatch(executor.as_ref(), &request));
        let read_only = outcome.read_only;
        let searched = outcome.collections.as_ref().map(Vec::len);

        if self.coordinator.apply_outcome(mode, request.token, outcome) {
            if let Some(banner) = self.coordinator.state().dependency_banner() {
                println!("{}", format!("!! {}", banner).red().bold());
            }
            display_view(&self.coordinator.state().mode(mode).view);
            if let Some(count) = searched {
                println!("{}", format!("Searched {} collection(s).", count).dark_grey());
            }
            if read_only == Some(true) {
                println!("{}", "Connection has read-only privileges.".dark_grey());
            }
        }
    }

    fn run_active(&mut self) {
        let mode = self.active_mode();
        match self.coordinator.begin_run(mode) {
            Ok(request) => self.dispatch(request),
            Err(blocker) => print_message(&blocker.to_string(), Tone::Warning),
        }
    }

    fn clipboard_tick(&mut self) {
        if let Some(request) = self.coordinator.clipboard_tick(&mut self.clipboard) {
            self.dispatch(request);
        } else if self.active_mode() == LookupMode::ObjectId {
            let state = self.coordinator.state().mode(LookupMode::ObjectId);
            if !state.is_running {
                print_message(&state.view.message, state.view.tone);
            }
        }
    }

    fn save_store(&self) {
        if let Err(e) = self.store.save() {
            print_message(&format!("Failed to save connections: {:#}", e), Tone::Error);
        }
    }

    fn test_connection(&mut self, id: Option<&str>) {
        let connection = match id {
            Some(id) => self.store.get(id).cloned(),
            None => self.store.active().cloned(),
        };
        let Some(connection) = connection else {
            print_message("No such connection.", Tone::Error);
            return;
        };

        println!("{}", format!("Testing {}...", connection.target_label()).dark_grey());
        let executor = self.executor.clone();
        let result = self
            .runtime
            .block_on(executor.test_connection(&connection.uri));
        match result {
            Ok(report) if report.is_ok() => {
                let access = match report.read_only {
                    Some(true) => " (read-only)",
                    _ => "",
                };
                print_message(&format!("Connection OK{}.", access), Tone::Success);
            }
            Ok(report) => print_message(
                &format!(
                    "Connection failed: {}",
                    report.summary.as_deref().unwrap_or("no details")
                ),
                Tone::Error,
            ),
            Err(e) => {
                let message = normalize(Err(e)).message.unwrap_or_default();
                print_message(&format!("Connection failed: {}", message), Tone::Error);
            }
        }
    }

    /// Handle one line. Returns false to quit.
    fn handle_line(&mut self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            self.clipboard_tick();
            return true;
        }

        if !trimmed.starts_with('\\') {
            self.handle_input(trimmed);
            return true;
        }

        let (command, arg) = match trimmed.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (trimmed, ""),
        };

        match command {
            "\\quit" | "\\q" => return false,
            "\\help" => print_help(),
            "\\mode" => match arg.parse::<LookupMode>() {
                Ok(mode) => {
                    self.coordinator.set_active_mode(mode);
                    display_view(&self.coordinator.state().mode(mode).view);
                }
                Err(e) => print_message(&e, Tone::Error),
            },
            "\\collection" => {
                let mode = self.active_mode();
                let name = (!arg.is_empty()).then(|| arg.to_string());
                match self.coordinator.select_collection(mode, name) {
                    Ok(()) => {
                        let selected = self.coordinator.state().mode(mode).selected_collection.clone();
                        print_message(
                            &format!("Collection: {}", selected.as_deref().unwrap_or("(none)")),
                            Tone::Info,
                        );
                    }
                    Err(e) => print_message(&e.to_string(), Tone::Error),
                }
            }
            "\\collections" => {
                if arg == "refresh" {
                    match self.coordinator.refresh_collections() {
                        Some(fetch) => self.load_collections(fetch),
                        None => print_message("Select an active connection first.", Tone::Warning),
                    }
                }
                display_collections(self.coordinator.state().collections());
            }
            "\\limit" => {
                let mode = self.active_mode();
                self.coordinator.set_limit(mode, arg);
                let state = self.coordinator.state().mode(mode);
                match &state.limit_error {
                    Some(error) => print_message(error, Tone::Error),
                    None => print_message(&format!("Limit: {}", state.limit), Tone::Info),
                }
            }
            "\\run" => self.run_active(),
            "\\connections" => display_connections(self.store.connections()),
            "\\use" => {
                let id = (arg != "none" && !arg.is_empty()).then_some(arg);
                if let Some(id) = id {
                    if self.store.get(id).is_none() {
                        print_message(&format!("Unknown connection '{}'.", id), Tone::Error);
                        return true;
                    }
                }
                let active = self.store.set_active(id).cloned();
                self.save_store();
                self.activate(active);
            }
            "\\add" => {
                let Some((name, uri)) = arg.split_once(char::is_whitespace) else {
                    print_message("Usage: \\add <name> <uri>", Tone::Error);
                    return true;
                };
                let mut connection = Connection::new(self.store.next_id(), name, uri.trim());
                connection.is_active = self.store.active().is_none();
                let becomes_active = connection.is_active.then(|| connection.clone());
                print_message(
                    &format!("Added connection {} ({}).", connection.id, connection.target_label()),
                    Tone::Success,
                );
                self.store.add(connection);
                self.save_store();
                if becomes_active.is_some() {
                    self.activate(becomes_active);
                }
            }
            "\\delete" => match self.store.delete(arg) {
                Some(removed) => {
                    print_message(&format!("Deleted connection {}.", removed.id), Tone::Success);
                    self.save_store();
                    if removed.is_active {
                        self.activate(None);
                    }
                }
                None => print_message(&format!("Unknown connection '{}'.", arg), Tone::Error),
            },
            "\\test" => self.test_connection((!arg.is_empty()).then_some(arg)),
            "\\watch" => match arg {
                "on" => {
                    self.coordinator.set_clipboard_watch(true);
                    self.clipboard_tick();
                }
                "off" => {
                    self.coordinator.set_clipboard_watch(false);
                    print_message("Clipboard watching off.", Tone::Info);
                }
                _ => print_message("Usage: \\watch on|off", Tone::Error),
            },
            "\\copy" => match self.coordinator.output_text(self.active_mode()) {
                Some(text) => {
                    match self.coordinator.copy_to_clipboard(&mut self.clipboard, &text) {
                        Ok(()) => print_message("Copied to clipboard.", Tone::Success),
                        Err(e) => {
                            warn!(target: "clipboard", "Copy failed: {:#}", e);
                            print_message("Failed to copy to the clipboard.", Tone::Error);
                        }
                    }
                }
                None => print_message("Nothing to copy.", Tone::Warning),
            },
            "\\state" => println!("{}", self.coordinator.state().debug_dump()),
            "\\log" => {
                let count = arg.parse().unwrap_or(20);
                match candygram::utils::logging::get_log_buffer() {
                    Some(buffer) => {
                        for entry in buffer.get_recent(count) {
                            println!("{}", entry.format_for_display());
                        }
                    }
                    None => print_message("Logging is not initialized.", Tone::Warning),
                }
            }
            other => print_message(&format!("Unknown command '{}'. Try \\help.", other), Tone::Error),
        }
        true
    }

    fn handle_input(&mut self, text: &str) {
        let mode = self.active_mode();
        if let Err(e) = self.coordinator.edit_input(mode, text) {
            print_message(&e.to_string(), Tone::Warning);
            return;
        }

        let state = self.coordinator.state().mode(mode);
        if let Some(error) = &state.input_error {
            print_message(error, Tone::Error);
            return;
        }
        self.run_active();
    }
}

fn run_repl(config: Config, store: ConnectionStore) -> Result<()> {
    print_help();

    let mut session = Session::new(&config, store)?;
    let active = session.store.active().cloned();
    match &active {
        Some(conn) => println!(
            "{}",
            format!("Active connection: {} ({})", conn.display_name, conn.target_label()).cyan()
        ),
        None => println!("{}", "No active connection. Use \\connections and \\use <id>.".yellow()),
    }
    session.activate(active);

    let history_file = AppPaths::history_file()?;
    let history = Box::new(
        FileBackedHistory::with_file(200, history_file).context("Error configuring history")?,
    );

    let completer = Box::new(CommandCompleter::new(session.collection_names.clone()));
    let completion_menu = Box::new(
        ColumnarMenu::default()
            .with_name("command_completion")
            .with_columns(1)
            .with_column_width(None)
            .with_column_padding(2),
    );

    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::Menu("command_completion".to_string()),
    );

    let mut line_editor = Reedline::create()
        .with_completer(completer)
        .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
        .with_validator(Box::new(JsonValidator))
        .with_history(history)
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    loop {
        let prompt = LookupPrompt {
            mode: session.active_mode(),
        };

        session.coordinator.set_editor_focused(true);
        let sig = line_editor.read_line(&prompt)?;
        session.coordinator.set_editor_focused(false);

        match sig {
            Signal::Success(buffer) => {
                if !session.handle_line(&buffer) {
                    break;
                }
            }
            Signal::CtrlD | Signal::CtrlC => break,
        }
    }

    println!("\nGoodbye!");
    Ok(())
}

/// Completion delivered back to the watch loop
enum Completion {
    Lookup {
        mode: LookupMode,
        token: u64,
        outcome: QueryOutcome,
    },
    Collections {
        fetch: CollectionsFetch,
        result: std::result::Result<candygram::executor::CollectionsListing, String>,
    },
}

fn spawn_lookup(executor: Arc<dyn QueryExecutor>, request: QueryRequest, tx: mpsc::UnboundedSender<Completion>) {
    tokio::spawn(async move {
        let outcome = QueryDispatcher::dispatch(executor.as_ref(), &request).await;
        let _ = tx.send(Completion::Lookup {
            mode: request.mode,
            token: request.token,
            outcome,
        });
    });
}

fn spawn_collections(executor: Arc<dyn QueryExecutor>, fetch: CollectionsFetch, tx: mpsc::UnboundedSender<Completion>) {
    tokio::spawn(async move {
        let result = LookupCoordinator::fetch_collections(executor.as_ref(), &fetch).await;
        let _ = tx.send(Completion::Collections { fetch, result });
    });
}

/// Poll the clipboard on a timer and look up every ObjectId copied
async fn watch_loop(config: Config, active: Option<Connection>) -> Result<()> {
    let executor: Arc<dyn QueryExecutor> = Arc::new(ProcessExecutor::new(config.executor.clone()));
    let mut coordinator = LookupCoordinator::from_config(&config);
    coordinator.set_active_mode(LookupMode::ObjectId);
    coordinator.set_clipboard_watch(true);
    let mut clipboard = SystemClipboard::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    match &active {
        Some(conn) => println!(
            "{}",
            format!("Watching the clipboard for ObjectIds on {}", conn.target_label()).cyan()
        ),
        None => println!("{}", "Watching the clipboard (no active connection).".yellow()),
    }
    println!("{}", "Press Ctrl+C to stop.".dark_grey());

    let switch = coordinator.switch_connection(active);
    if let Some(fetch) = switch.collections_fetch {
        spawn_collections(executor.clone(), fetch, tx.clone());
    }
    if let Some(request) = switch.lookup {
        spawn_lookup(executor.clone(), request, tx.clone());
    }

    let mut ticker = tokio::time::interval(config.clipboard.poll_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let seen = coordinator.state().clipboard().last_content.clone();
                let request = coordinator.clipboard_tick(&mut clipboard);
                // Report each new clipboard value once
                if request.is_some() || coordinator.state().clipboard().last_content != seen {
                    display_view(&coordinator.state().mode(LookupMode::ObjectId).view);
                }
                if let Some(request) = request {
                    spawn_lookup(executor.clone(), request, tx.clone());
                }
            }
            Some(done) = rx.recv() => match done {
                Completion::Lookup { mode, token, outcome } => {
                    if coordinator.apply_outcome(mode, token, outcome) {
                        if let Some(banner) = coordinator.state().dependency_banner() {
                            println!("{}", format!("!! {}", banner).red().bold());
                        }
                        display_view(&coordinator.state().mode(mode).view);
                    }
                }
                Completion::Collections { fetch, result } => {
                    if coordinator.apply_collections(&fetch, result) {
                        display_collections(coordinator.state().collections());
                    }
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("\nStopped watching.");
    Ok(())
}

fn main() -> Result<()> {
    let dual_logger = candygram::utils::logging::init_tracing_with_dual_logging();
    eprintln!("Logs: {}", dual_logger.log_path().display());

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    if args.contains(&"--generate-config".to_string()) {
        let path = Config::get_config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Error creating config directory {}", parent.display()))?;
        }
        std::fs::write(&path, Config::create_default_with_comments())
            .with_context(|| format!("Error writing config file {}", path.display()))?;
        println!("Configuration file created at: {}", path.display());
        return Ok(());
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Using default configuration: {:#}", e);
            eprintln!("{}", format!("Config error, using defaults: {:#}", e).yellow());
            Config::default()
        }
    };

    let store = ConnectionStore::load(config.connections_path()?)?;
    info!(
        "Loaded {} connection(s) from {}",
        store.connections().len(),
        config.connections_path()?.display()
    );

    if args.get(1).map(String::as_str) == Some("watch") {
        let chosen = args
            .iter()
            .position(|a| a == "--connection")
            .and_then(|pos| args.get(pos + 1));
        let active = match chosen {
            Some(id) => Some(
                store
                    .get(id)
                    .cloned()
                    .with_context(|| format!("Unknown connection '{}'", id))?,
            ),
            None => store.active().cloned(),
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;
        return runtime.block_on(watch_loop(config, active));
    }

    run_repl(config, store)
}
