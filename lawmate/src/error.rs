//! Error types for exchanges with the answering service.

use thiserror::Error;

use crate::models::MessageId;

/// Errors raised while driving a conversation.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The question was empty after trimming whitespace.
    #[error("question is empty")]
    EmptyQuestion,

    /// Another exchange has not finished yet.
    #[error("an answer is already streaming")]
    ExchangeInFlight,

    /// No exchange is active for the operation.
    #[error("no exchange is in flight")]
    NoExchange,

    /// A message id was not present in the conversation.
    #[error("message {0} not found")]
    MessageNotFound(MessageId),

    /// The request could not be sent or the body could not be read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("service returned {status}{}", with_detail(.detail))]
    Status {
        status: reqwest::StatusCode,
        detail: Option<String>,
    },

    /// The service reported a failure inside the stream.
    #[error("service error: {0}")]
    Service(String),

    /// No bytes arrived within the configured idle timeout.
    #[error("no data received for {0:?}")]
    IdleTimeout(std::time::Duration),

    /// The exchange was aborted before the stream completed.
    #[error("exchange aborted")]
    Aborted,

    /// Writing an exported transcript failed.
    #[error("failed to write transcript: {0}")]
    Io(#[from] std::io::Error),
}

#[allow(clippy::ref_option)]
fn with_detail(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default()
}

pub type Result<T, E = ChatError> = std::result::Result<T, E>;
