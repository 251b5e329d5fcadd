/// Smallest accepted result limit
pub const MIN_LIMIT: u32 = 1;
/// Largest accepted result limit
pub const MAX_LIMIT: u32 = 200;
/// Limit used when nothing else is configured
pub const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LimitError {
    #[error("Limit must be a whole number (got '{0}').")]
    NotAnInteger(String),

    #[error("Limit must be at least 1.")]
    TooSmall,

    #[error("Limit must be at most 200.")]
    TooLarge,
}

/// Parse a result limit, accepting only integers in `MIN_LIMIT..=MAX_LIMIT`
pub fn parse_limit(raw: &str) -> Result<u32, LimitError> {
    let trimmed = raw.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| LimitError::NotAnInteger(trimmed.to_string()))?;

    if value < i64::from(MIN_LIMIT) {
        return Err(LimitError::TooSmall);
    }
    if value > i64::from(MAX_LIMIT) {
        return Err(LimitError::TooLarge);
    }

    Ok(value as u32)
}
