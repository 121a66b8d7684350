//! State of a single question/answer exchange.

use serde::Serialize;

use crate::error::ChatError;
use crate::models::MessageId;

/// Lifecycle of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeState {
    /// No exchange has run yet.
    Idle,
    /// The request is out, no event has arrived.
    AwaitingFirstByte,
    /// At least one event has been applied.
    Streaming,
    /// The stream completed; the answer is final.
    Finished,
    /// The exchange failed; the answer holds the error marker.
    Failed,
}

impl ExchangeState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingFirstByte => "awaiting_first_byte",
            Self::Streaming => "streaming",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }

    /// Whether an exchange in this state still accepts events.
    pub const fn is_in_flight(self) -> bool {
        matches!(self, Self::AwaitingFirstByte | Self::Streaming)
    }
}

impl std::fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bookkeeping for the exchange currently in flight.
#[derive(Debug, Clone)]
pub(super) struct Exchange {
    /// Assistant message being filled.
    pub placeholder: MessageId,
    pub state: ExchangeState,
    /// Number of events applied so far.
    pub events: usize,
}

impl Exchange {
    pub const fn new(placeholder: MessageId) -> Self {
        Self {
            placeholder,
            state: ExchangeState::AwaitingFirstByte,
            events: 0,
        }
    }
}

/// Result of a completed or failed exchange.
#[derive(Debug)]
pub struct ExchangeReport {
    /// The assistant message that was filled.
    pub message_id: MessageId,
    /// [`ExchangeState::Finished`] or [`ExchangeState::Failed`].
    pub state: ExchangeState,
    /// Number of events applied before the exchange ended.
    pub events: usize,
    /// Why the exchange failed.
    pub error: Option<ChatError>,
}

impl ExchangeReport {
    pub const fn succeeded(&self) -> bool {
        matches!(self.state, ExchangeState::Finished)
    }
}
