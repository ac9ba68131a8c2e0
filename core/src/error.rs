use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Failure raised by the transport or push-channel layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("server responded with {status}: {message}")]
    Status { status: u16, message: String },
    #[error("request failed: {0}")]
    Network(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    /// Message supplied by the server, when the failure carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            TransportError::Status { message, .. } if !message.trim().is_empty() => {
                Some(message.as_str())
            }
            _ => None,
        }
    }

    /// Text suitable for the status slot: the server message when present,
    /// otherwise the error itself.
    pub fn user_message(&self) -> String {
        self.server_message()
            .map(str::to_string)
            .unwrap_or_else(|| self.to_string())
    }

    pub(crate) fn from_response_body(status: u16, reason: Option<&str>, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            message: Option<String>,
            error: Option<String>,
        }

        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.message.or(parsed.error))
            .filter(|value| !value.trim().is_empty())
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .or_else(|| reason.map(str::to_string))
            .unwrap_or_else(|| "unknown error".to_string());

        TransportError::Status { status, message }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            TransportError::Decode(error.to_string())
        } else if let Some(status) = error.status() {
            TransportError::Status {
                status: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            TransportError::Network(error.to_string())
        }
    }
}

/// Why a file never reached a terminal push event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HangReason {
    /// The push channel closed before `complete` or `error` arrived.
    Disconnected,
    /// The configured deadline elapsed while waiting.
    DeadlineElapsed(Duration),
}

impl fmt::Display for HangReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HangReason::Disconnected => write!(f, "progress channel closed early"),
            HangReason::DeadlineElapsed(limit) => {
                write!(f, "no completion event within {}s", limit.as_secs())
            }
        }
    }
}

/// Batch-level failures. These never escape the orchestrator's entry point;
/// they are written to the status slot and returned inside the outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("Select at least one file to translate.")]
    NoSelection,
    #[error(
        "All selected files are outlined (text converted to paths) and cannot be translated: {}",
        .0.join(", ")
    )]
    AllOutlined(Vec<String>),
    #[error("translation of {file} failed: {source}")]
    Transport {
        file: String,
        #[source]
        source: TransportError,
    },
    #[error("translation of {file} failed: {message}")]
    ChannelReported { file: String, message: String },
    #[error("translation of {file} stalled: {reason}")]
    ChannelHang { file: String, reason: HangReason },
    #[error("Failed to load the file list: {0}")]
    MetadataLoad(#[source] TransportError),
}

impl BatchError {
    /// File whose attempt produced this error, if any.
    pub fn file(&self) -> Option<&str> {
        match self {
            BatchError::Transport { file, .. }
            | BatchError::ChannelReported { file, .. }
            | BatchError::ChannelHang { file, .. } => Some(file.as_str()),
            _ => None,
        }
    }

    /// Human-readable text written to the status slot.
    pub fn user_message(&self) -> String {
        match self {
            BatchError::Transport { source, .. } => {
                format!("Batch translation failed: {}", source.user_message())
            }
            BatchError::ChannelReported { message, .. } => {
                format!("Batch translation failed: {message}")
            }
            BatchError::ChannelHang { file, reason } => {
                format!("Batch translation failed: {file}: {reason}")
            }
            other => other.to_string(),
        }
    }
}

/// Non-fatal notice raised before a batch starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// Some selected files are outlined and were left out of the batch.
    PartialOutlined(Vec<String>),
    /// Freshly uploaded files that can never be translated.
    UploadedOutlined(Vec<String>),
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::PartialOutlined(names) => write!(
                f,
                "The following outlined files are excluded from translation: {}",
                names.join(", ")
            ),
            Advisory::UploadedOutlined(names) => write!(
                f,
                "The following uploaded files are outlined (text converted to paths) and cannot be translated: {}",
                names.join(", ")
            ),
        }
    }
}
