use crate::executor::protocol::Operation;
use crate::input::{extract_object_id, parse_filter, parse_limit, parse_pipeline, ParsedJson};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::view::ModeView;

/// The three ways of looking documents up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupMode {
    ObjectId,
    Find,
    Aggregate,
}

impl LookupMode {
    pub const ALL: [LookupMode; 3] = [LookupMode::ObjectId, LookupMode::Find, LookupMode::Aggregate];

    /// Stable index for per-mode arrays
    pub fn index(self) -> usize {
        match self {
            LookupMode::ObjectId => 0,
            LookupMode::Find => 1,
            LookupMode::Aggregate => 2,
        }
    }

    pub fn operation(self) -> Operation {
        match self {
            LookupMode::ObjectId => Operation::FindById,
            LookupMode::Find => Operation::Find,
            LookupMode::Aggregate => Operation::Aggregate,
        }
    }

    /// Find and Aggregate run against one selected collection
    pub fn requires_collection(self) -> bool {
        !matches!(self, LookupMode::ObjectId)
    }

    /// ObjectId lookups return at most one document per collection
    pub fn uses_limit(self) -> bool {
        !matches!(self, LookupMode::ObjectId)
    }
}

impl fmt::Display for LookupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LookupMode::ObjectId => "objectid",
            LookupMode::Find => "find",
            LookupMode::Aggregate => "aggregate",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for LookupMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "objectid" | "oid" | "id" => Ok(LookupMode::ObjectId),
            "find" => Ok(LookupMode::Find),
            "aggregate" | "agg" => Ok(LookupMode::Aggregate),
            other => Err(format!("Unknown lookup mode '{}'", other)),
        }
    }
}

/// A validated query parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    ObjectId(String),
    Filter(Value),
    Pipeline(Value),
}

/// Validity of the raw input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPhase {
    /// Never touched
    Idle,
    /// Edited but currently blank
    Editing,
    Valid,
    Invalid,
}

/// Execution lifecycle of a mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
    Settled,
}

/// Why a mode cannot run right now
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunBlocker {
    #[error("Enter a value to search for.")]
    MissingInput,

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    InvalidLimit(String),

    #[error("Select a collection first.")]
    MissingCollection,

    #[error("Select an active connection first.")]
    NoActiveConnection,

    #[error("A query is already running.")]
    AlreadyRunning,
}

/// Editable and displayed state of one lookup mode
#[derive(Debug, Clone)]
pub struct ModeState {
    pub mode: LookupMode,
    pub raw_input: String,
    pub parsed_value: Option<ParsedValue>,
    pub input_error: Option<String>,
    pub is_valid: bool,
    pub input_phase: InputPhase,
    pub raw_limit: String,
    pub limit: u32,
    pub is_limit_valid: bool,
    pub limit_error: Option<String>,
    pub is_running: bool,
    pub run_phase: RunPhase,
    pub selected_collection: Option<String>,
    pub view: ModeView,
}

impl ModeState {
    pub fn new(mode: LookupMode, default_limit: u32) -> Self {
        Self {
            mode,
            raw_input: String::new(),
            parsed_value: None,
            input_error: None,
            is_valid: false,
            input_phase: InputPhase::Idle,
            raw_limit: default_limit.to_string(),
            limit: default_limit,
            is_limit_valid: true,
            limit_error: None,
            is_running: false,
            run_phase: RunPhase::Idle,
            selected_collection: None,
            view: ModeView::idle(mode),
        }
    }

    /// Replace the raw input and re-validate it for this mode
    pub fn set_input(&mut self, raw: &str) {
        self.raw_input = raw.to_string();
        self.parsed_value = None;
        self.input_error = None;
        self.is_valid = false;

        if raw.trim().is_empty() {
            self.input_phase = InputPhase::Editing;
            return;
        }

        let parsed = match self.mode {
            LookupMode::ObjectId => match extract_object_id(raw) {
                Some(id) => Ok(ParsedValue::ObjectId(id)),
                None => Err("Not a valid ObjectId.".to_string()),
            },
            LookupMode::Find => Self::from_json(parse_filter(raw), ParsedValue::Filter),
            LookupMode::Aggregate => Self::from_json(parse_pipeline(raw), ParsedValue::Pipeline),
        };

        match parsed {
            Ok(value) => {
                self.parsed_value = Some(value);
                self.is_valid = true;
                self.input_phase = InputPhase::Valid;
            }
            Err(message) => {
                self.input_error = Some(message);
                self.input_phase = InputPhase::Invalid;
            }
        }
    }

    fn from_json(parsed: ParsedJson, wrap: fn(Value) -> ParsedValue) -> Result<ParsedValue, String> {
        match parsed {
            ParsedJson::Valid(v) => Ok(wrap(v)),
            ParsedJson::Invalid(e) => Err(e.to_string()),
            // set_input returns early on blank input
            ParsedJson::Empty => Err(String::new()),
        }
    }

    /// Replace the raw limit text and re-validate it
    pub fn set_limit(&mut self, raw: &str) {
        self.raw_limit = raw.to_string();
        match parse_limit(raw) {
            Ok(limit) => {
                self.limit = limit;
                self.is_limit_valid = true;
                self.limit_error = None;
            }
            Err(e) => {
                self.is_limit_valid = false;
                self.limit_error = Some(e.to_string());
            }
        }
    }

    pub fn select_collection(&mut self, collection: Option<String>) {
        self.selected_collection = collection.filter(|c| !c.trim().is_empty());
    }

    pub fn object_id(&self) -> Option<&str> {
        match &self.parsed_value {
            Some(ParsedValue::ObjectId(id)) => Some(id),
            _ => None,
        }
    }

    /// First condition that prevents this mode from running, if any
    pub fn blocker(&self, has_connection: bool) -> Option<RunBlocker> {
        if self.parsed_value.is_none() {
            return Some(match &self.input_error {
                Some(message) if !message.is_empty() => RunBlocker::InvalidInput(message.clone()),
                _ => RunBlocker::MissingInput,
            });
        }
        if self.mode.uses_limit() && !self.is_limit_valid {
            let message = self
                .limit_error
                .clone()
                .unwrap_or_else(|| "Invalid limit.".to_string());
            return Some(RunBlocker::InvalidLimit(message));
        }
        if self.mode.requires_collection() && self.selected_collection.is_none() {
            return Some(RunBlocker::MissingCollection);
        }
        if !has_connection {
            return Some(RunBlocker::NoActiveConnection);
        }
        if self.is_running {
            return Some(RunBlocker::AlreadyRunning);
        }
        None
    }

    pub fn is_runnable(&self, has_connection: bool) -> bool {
        self.blocker(has_connection).is_none()
    }

    pub fn mark_running(&mut self) {
        self.is_running = true;
        self.run_phase = RunPhase::Running;
    }

    pub fn settle(&mut self) {
        self.is_running = false;
        self.run_phase = RunPhase::Settled;
    }
}
