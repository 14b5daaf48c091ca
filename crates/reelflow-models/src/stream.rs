//! Log stream message types.
//!
//! Each message renders to the single line the dashboard shows, so the SSE
//! layer only has to forward `text()`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Message pushed to a log stream subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Stream opened, waiting for output
    Connected,

    /// One line of task output, without its line terminator
    Line { line: String },

    /// Task left the process table
    Finished,

    /// Task was not running when the stream was requested
    NotFound,

    /// Log file disappeared or was never created
    LogFileMissing { file: String },

    /// Any other I/O failure while tailing
    Error { message: String },
}

impl StreamMessage {
    pub fn line(line: impl Into<String>) -> Self {
        StreamMessage::Line { line: line.into() }
    }

    pub fn log_file_missing(file: impl Into<String>) -> Self {
        StreamMessage::LogFileMissing { file: file.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamMessage::Error {
            message: message.into(),
        }
    }

    /// Text shown to the user.
    pub fn text(&self) -> String {
        match self {
            StreamMessage::Connected => {
                "--- Connected to log stream. Waiting for output... ---".to_string()
            }
            StreamMessage::Line { line } => line.clone(),
            StreamMessage::Finished => "--- TASK FINISHED OR STOPPED ---".to_string(),
            StreamMessage::NotFound => "--- TASK NOT FOUND OR ALREADY FINISHED ---".to_string(),
            StreamMessage::LogFileMissing { file } => format!("--- LOG FILE NOT FOUND: {} ---", file),
            StreamMessage::Error { message } => format!("--- LOG STREAMING ERROR: {} ---", message),
        }
    }

    /// Whether this message ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamMessage::Connected | StreamMessage::Line { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_message_text() {
        assert_eq!(StreamMessage::line("frame 10").text(), "frame 10");
        assert_eq!(
            StreamMessage::log_file_missing("Build.log").text(),
            "--- LOG FILE NOT FOUND: Build.log ---"
        );
        assert_eq!(
            StreamMessage::NotFound.text(),
            "--- TASK NOT FOUND OR ALREADY FINISHED ---"
        );
    }

    #[test]
    fn test_terminal_messages() {
        assert!(!StreamMessage::Connected.is_terminal());
        assert!(!StreamMessage::line("x").is_terminal());
        assert!(StreamMessage::Finished.is_terminal());
        assert!(StreamMessage::NotFound.is_terminal());
        assert!(StreamMessage::error("boom").is_terminal());
    }

    #[test]
    fn test_stream_message_serialization() {
        let json = serde_json::to_string(&StreamMessage::line("hello")).unwrap();
        assert!(json.contains("\"type\":\"line\""));
        assert!(json.contains("\"line\":\"hello\""));
    }
}
