#[derive(Debug, thiserror::Error)]
pub enum HunterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid rules file: {0}")]
    Rules(#[from] toml::de::Error),

    #[error("Invalid match pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Input file is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Result sink is closed")]
    SinkClosed,
}

/// Failure of a single page fetch. Carries only the first line of the
/// underlying message so it can be written to a CSV cell as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FetchError(String);

impl FetchError {
    pub fn new(message: impl std::fmt::Display) -> Self {
        let message = message.to_string();
        let first = message.lines().next().unwrap_or_default().trim();
        Self(first.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_keeps_first_line() {
        let err = FetchError::new("Timeout 60000ms exceeded.\n=== logs ===\nnavigating");
        assert_eq!(err.to_string(), "Timeout 60000ms exceeded.");
    }
}
