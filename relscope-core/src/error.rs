//! Error types for relscope-core

use thiserror::Error;

/// Which side of the timeline a malformed date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineItemKind {
    Event,
    Phase,
}

impl TimelineItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineItemKind::Event => "event",
            TimelineItemKind::Phase => "phase",
        }
    }
}

impl std::fmt::Display for TimelineItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the relscope-core library
#[derive(Error, Debug)]
pub enum Error {
    /// The analyzer call could not complete (network, availability, HTTP status)
    #[error("transport error: {0}")]
    Transport(String),

    /// The analyzer answered but produced nothing usable
    #[error("analyzer returned no usable content: {0}")]
    Content(String),

    /// The analyzer output does not satisfy the report schema
    #[error("analysis output failed schema validation: {0}")]
    SchemaValidation(String),

    /// A timeline item carries a date that cannot be parsed
    #[error("invalid date on timeline {kind} #{index}: {value:?}")]
    InvalidDate {
        kind: TimelineItemKind,
        index: usize,
        value: String,
    },

    /// Nothing to analyze
    #[error("transcript is empty")]
    EmptyTranscript,

    /// Report not found in history
    #[error("report not found: {0}")]
    ReportNotFound(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Short, user-facing diagnostic. Internal details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Error::Transport(_) | Error::Content(_) => {
                "An error occurred during analysis. The analyzer may be experiencing high demand. Please try again later.".to_string()
            }
            Error::SchemaValidation(_) => {
                "The analyzer returned an invalid analysis format. This can happen with very complex conversations. Please try a shorter or simpler chat excerpt.".to_string()
            }
            Error::EmptyTranscript => "The transcript is empty. Paste or upload a chat first.".to_string(),
            other => other.to_string(),
        }
    }

    /// True for the three analyzer failure classes.
    pub fn is_analysis_failure(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Content(_) | Error::SchemaValidation(_)
        )
    }
}

/// Result type alias for relscope-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_content_share_retry_message() {
        let transport = Error::Transport("connection reset".to_string());
        let content = Error::Content("empty response".to_string());
        assert_eq!(transport.user_message(), content.user_message());
        assert!(!transport.user_message().contains("connection reset"));
    }

    #[test]
    fn schema_message_suggests_shorter_input() {
        let err = Error::SchemaValidation("missing field `verdict`".to_string());
        assert!(err.user_message().contains("shorter"));
        assert!(err.is_analysis_failure());
    }

    #[test]
    fn invalid_date_display_names_item() {
        let err = Error::InvalidDate {
            kind: TimelineItemKind::Phase,
            index: 2,
            value: "sometime".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid date on timeline phase #2: \"sometime\""
        );
        assert!(!err.is_analysis_failure());
    }
}
