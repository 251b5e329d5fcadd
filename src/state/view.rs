use crate::executor::protocol::DocumentMatch;
use serde_json::Value;

use super::mode::LookupMode;

/// Severity of the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Error,
}

/// Content of a mode's output area
#[derive(Debug, Clone, PartialEq)]
pub enum OutputView {
    Hidden,
    Loading(String),
    /// ObjectId hits, one per collection
    Matches(Vec<DocumentMatch>),
    /// Find / aggregate documents
    Results(Vec<Value>),
    /// Response exceeded the output cap; only its size is shown
    TooLarge {
        guidance: String,
        approx_size_bytes: u64,
        max_size_bytes: u64,
        matches_metadata: Option<Value>,
    },
}

/// What the user currently sees for one mode
#[derive(Debug, Clone, PartialEq)]
pub struct ModeView {
    pub message: String,
    pub tone: Tone,
    pub output: OutputView,
}

impl ModeView {
    pub fn idle(mode: LookupMode) -> Self {
        let message = match mode {
            LookupMode::ObjectId => "Copy a MongoDB ObjectId to search the active connection.",
            LookupMode::Find => "Enter a filter and pick a collection to run a find query.",
            LookupMode::Aggregate => "Enter a pipeline and pick a collection to run an aggregation.",
        };
        Self::message(message, Tone::Info)
    }

    /// Status line with an empty output area
    pub fn message(message: impl Into<String>, tone: Tone) -> Self {
        Self {
            message: message.into(),
            tone,
            output: OutputView::Hidden,
        }
    }

    pub fn with_output(mut self, output: OutputView) -> Self {
        self.output = output;
        self
    }

    /// Number of documents rendered in the output area
    pub fn rendered_count(&self) -> usize {
        match &self.output {
            OutputView::Matches(matches) => matches.len(),
            OutputView::Results(results) => results.len(),
            _ => 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.output, OutputView::Loading(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rendered_count() {
        let view = ModeView::message("ok", Tone::Success)
            .with_output(OutputView::Results(vec![json!({"a": 1}), json!({"a": 2})]));
        assert_eq!(view.rendered_count(), 2);

        let too_large = ModeView::message("big", Tone::Warning).with_output(OutputView::TooLarge {
            guidance: "narrow it".into(),
            approx_size_bytes: 900_000,
            max_size_bytes: 512_000,
            matches_metadata: None,
        });
        assert_eq!(too_large.rendered_count(), 0);
    }

    #[test]
    fn test_idle_view_is_hidden() {
        let view = ModeView::idle(LookupMode::ObjectId);
        assert_eq!(view.output, OutputView::Hidden);
        assert_eq!(view.tone, Tone::Info);
    }
}
