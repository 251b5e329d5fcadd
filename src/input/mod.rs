//! Input parsers
//!
//! Pure functions that turn raw text (typed by the user or read from the
//! clipboard) into validated query parameters.

pub mod identifier;
pub mod json_input;
pub mod limit;

pub use identifier::{extract_object_id, first_line_preview};
pub use json_input::{parse_filter, parse_pipeline, InputError, JsonShape, ParsedJson};
pub use limit::{parse_limit, LimitError, DEFAULT_LIMIT, MAX_LIMIT, MIN_LIMIT};
