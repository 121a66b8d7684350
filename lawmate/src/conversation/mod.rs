//! Conversation state: message history, citation disclosure and export.

mod disclosure;
mod store;
mod transcript;

pub use disclosure::{DisclosureMap, PreviewEntry, PREVIEW_LIMIT};
pub use store::{Conversation, ERROR_MARKER, GREETING};
pub use transcript::{render_transcript, render_transcript_in, transcript_file_name, TIMESTAMP_FORMAT};
