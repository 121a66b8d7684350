//! Data models for conversation entities.

mod message;
mod source;

pub use message::{Message, MessageId, MessageRole};
pub use source::Source;
