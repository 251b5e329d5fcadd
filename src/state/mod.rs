//! Lookup state
//!
//! Per-mode editable state, the displayed view for each mode and the
//! events recorded while the coordinator mutates them.

pub mod events;
pub mod mode;
pub mod view;

pub use events::{EventLog, LookupEvent};
pub use mode::{InputPhase, LookupMode, ModeState, ParsedValue, RunBlocker, RunPhase};
pub use view::{ModeView, OutputView, Tone};
