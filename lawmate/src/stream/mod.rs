//! Streaming answer protocol.
//!
//! The answering service replies with a single HTTP body made of
//! newline-separated frames, each `data: <json>`. This module turns the raw
//! body chunks into [`StreamEvent`]s.

mod decoder;
mod events;

pub use decoder::{decode_stream, FrameDecoder};
pub use events::{StreamEvent, FRAME_PREFIX};
