//! Question/answer exchanges and the chat session that runs them.

mod chat;
mod exchange;

pub use chat::ChatSession;
pub use exchange::{ExchangeReport, ExchangeState};
