use serde_json::Value;
use std::fmt;

/// The top-level JSON shape a field requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    /// A `find` filter
    Object,
    /// An aggregation pipeline
    Array,
}

impl JsonShape {
    fn matches(&self, value: &Value) -> bool {
        match self {
            JsonShape::Object => value.is_object(),
            JsonShape::Array => value.is_array(),
        }
    }
}

/// Validation failure for a structured JSON field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Invalid JSON: {0}")]
    Syntax(String),

    #[error("Filter must be a JSON object.")]
    ExpectedObject,

    #[error("Pipeline must be a JSON array.")]
    ExpectedArray,
}

/// Result of parsing a structured JSON field
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedJson {
    /// Blank input: nothing to validate yet and nothing to report
    Empty,
    Valid(Value),
    Invalid(InputError),
}

impl ParsedJson {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParsedJson::Valid(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            ParsedJson::Valid(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&InputError> {
        match self {
            ParsedJson::Invalid(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ParsedJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedJson::Empty => write!(f, ""),
            ParsedJson::Valid(v) => write!(f, "{}", v),
            ParsedJson::Invalid(e) => write!(f, "{}", e),
        }
    }
}

/// Parse `raw` as JSON and check its top-level shape
pub fn parse_structured(raw: &str, shape: JsonShape) -> ParsedJson {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ParsedJson::Empty;
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(e) => return ParsedJson::Invalid(InputError::Syntax(e.to_string())),
    };

    if !shape.matches(&value) {
        return ParsedJson::Invalid(match shape {
            JsonShape::Object => InputError::ExpectedObject,
            JsonShape::Array => InputError::ExpectedArray,
        });
    }

    ParsedJson::Valid(value)
}

pub fn parse_filter(raw: &str) -> ParsedJson {
    parse_structured(raw, JsonShape::Object)
}

pub fn parse_pipeline(raw: &str) -> ParsedJson {
    parse_structured(raw, JsonShape::Array)
}
