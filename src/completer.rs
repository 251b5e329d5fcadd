use reedline::{Completer, Span, Suggestion};
use std::sync::{Arc, Mutex};

const COMMANDS: &[(&str, &str)] = &[
    ("\\mode", "switch lookup mode"),
    ("\\collection", "select a collection"),
    ("\\collections", "list collections"),
    ("\\limit", "set the result limit"),
    ("\\run", "run the active mode"),
    ("\\connections", "list connections"),
    ("\\use", "activate a connection"),
    ("\\add", "add a connection"),
    ("\\delete", "delete a connection"),
    ("\\test", "test a connection"),
    ("\\watch", "clipboard watching on/off"),
    ("\\copy", "copy the shown documents"),
    ("\\state", "show lookup state"),
    ("\\log", "show recent log lines"),
    ("\\help", "show help"),
    ("\\quit", "exit"),
];

const MODES: &[&str] = &["objectid", "find", "aggregate"];

/// Completes commands, mode names and collection names
pub struct CommandCompleter {
    collections: Arc<Mutex<Vec<String>>>,
}

impl CommandCompleter {
    pub fn new(collections: Arc<Mutex<Vec<String>>>) -> Self {
        Self { collections }
    }
}

impl Completer for CommandCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let input = &line[..pos];
        let word_start = input.rfind(char::is_whitespace).map(|i| i + 1).unwrap_or(0);
        let partial = &input[word_start..];
        let span = Span {
            start: word_start,
            end: pos,
        };

        let candidates: Vec<(String, Option<String>)> = if word_start == 0 {
            COMMANDS
                .iter()
                .map(|(cmd, desc)| (cmd.to_string(), Some(desc.to_string())))
                .collect()
        } else if input.starts_with("\\mode ") {
            MODES.iter().map(|m| (m.to_string(), None)).collect()
        } else if input.starts_with("\\collection ") {
            self.collections
                .lock()
                .map(|names| names.iter().map(|n| (n.clone(), Some("collection".to_string()))).collect())
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        candidates
            .into_iter()
            .filter(|(value, _)| value.starts_with(partial))
            .map(|(value, description)| Suggestion {
                value,
                description,
                extra: None,
                span,
                style: None,
                append_whitespace: true,
            })
            .collect()
    }
}
