//! Plain-text transcript export.

use chrono::{DateTime, Local, NaiveDate, TimeZone};

use crate::models::Message;

/// Timestamp layout of transcript records (`10/19/2026, 3:04:05 PM`).
pub const TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Render the transcript with timestamps in the local time zone.
pub fn render_transcript(messages: &[Message]) -> String {
    render_transcript_in(messages, &Local)
}

/// Render the transcript with timestamps in `tz`.
///
/// Each message becomes `[timestamp] ROLE: content`; records are separated
/// by a blank line. Sources are not included.
pub fn render_transcript_in<Tz>(messages: &[Message], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    messages
        .iter()
        .map(|msg| {
            let at: DateTime<Tz> = msg.timestamp.with_timezone(tz);
            format!(
                "[{}] {}: {}",
                at.format(TIMESTAMP_FORMAT),
                msg.role.label(),
                msg.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// File name for a transcript exported on `date`.
pub fn transcript_file_name(date: NaiveDate) -> String {
    format!("lawmate-chat-{}.txt", date.format("%Y-%m-%d"))
}
