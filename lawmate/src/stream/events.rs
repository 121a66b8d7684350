//! Frame payload parsing.

use serde::Deserialize;

use crate::models::Source;

/// Literal marker that starts every meaningful frame line.
pub const FRAME_PREFIX: &str = "data: ";

/// A decoded protocol event.
///
/// End of stream is not an event: the event sequence simply ends when the
/// response body closes.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Text fragment to append to the answer in progress.
    Token(String),
    /// Full replacement list of citations for the answer.
    Sources(Vec<Source>),
    /// The service reported a failure and will close the stream.
    ///
    /// An extension to the `token`/`sources` protocol; it ends the exchange
    /// as failed.
    ServiceError(String),
}

/// Raw JSON payload of a frame. Every field is optional; a payload with
/// none of them is a no-op frame.
#[derive(Debug, Deserialize)]
struct FramePayload {
    token: Option<String>,
    sources: Option<Vec<Source>>,
    error: Option<String>,
}

/// Outcome of inspecting one line.
#[derive(Debug)]
pub(super) enum LineOutcome {
    /// The line has no frame prefix.
    Ignored,
    /// The line is a frame; it may carry zero or more events.
    Frame(Vec<StreamEvent>),
    /// The line is a frame whose payload could not be decoded.
    Malformed(serde_json::Error),
}

/// Parse one terminated line (without its `\n`).
pub(super) fn parse_line(line: &str) -> LineOutcome {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let Some(body) = line.strip_prefix(FRAME_PREFIX) else {
        return LineOutcome::Ignored;
    };

    let payload: FramePayload = match serde_json::from_str(body) {
        Ok(payload) => payload,
        Err(e) => return LineOutcome::Malformed(e),
    };

    // Token before sources: a frame carrying both applies in that order.
    let mut events = Vec::new();
    if let Some(token) = payload.token.filter(|t| !t.is_empty()) {
        events.push(StreamEvent::Token(token));
    }
    if let Some(sources) = payload.sources {
        events.push(StreamEvent::Sources(sources));
    }
    if let Some(error) = payload.error {
        events.push(StreamEvent::ServiceError(error));
    }
    LineOutcome::Frame(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(line: &str) -> Vec<StreamEvent> {
        match parse_line(line) {
            LineOutcome::Frame(events) => events,
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[test]
    fn parse_token() {
        assert_eq!(
            events(r#"data: {"token":"Bail "}"#),
            vec![StreamEvent::Token("Bail ".to_string())]
        );
    }

    #[test]
    fn parse_sources() {
        let parsed = events(r#"data: {"sources":[{"page_content":"Section 436 CrPC","metadata":{}}]}"#);
        assert_eq!(
            parsed,
            vec![StreamEvent::Sources(vec![Source::new("Section 436 CrPC")])]
        );
    }

    #[test]
    fn parse_service_error() {
        assert_eq!(
            events(r#"data: {"error":"pipeline not ready"}"#),
            vec![StreamEvent::ServiceError("pipeline not ready".to_string())]
        );
    }

    #[test]
    fn empty_payload_is_noop_frame() {
        assert!(events("data: {}").is_empty());
        assert!(events(r#"data: {"token":""}"#).is_empty());
        assert!(events(r#"data: {"unrelated":1}"#).is_empty());
    }

    #[test]
    fn token_and_sources_in_one_frame_keep_order() {
        let parsed = events(r#"data: {"sources":[],"token":"x"}"#);
        assert_eq!(
            parsed,
            vec![
                StreamEvent::Token("x".to_string()),
                StreamEvent::Sources(Vec::new())
            ]
        );
    }

    #[test]
    fn unprefixed_lines_are_ignored() {
        assert!(matches!(parse_line(""), LineOutcome::Ignored));
        assert!(matches!(parse_line(": keep-alive"), LineOutcome::Ignored));
        assert!(matches!(parse_line(r#"{"token":"x"}"#), LineOutcome::Ignored));
        assert!(matches!(parse_line("data:{}"), LineOutcome::Ignored));
    }

    #[test]
    fn carriage_return_is_tolerated() {
        assert_eq!(
            events("data: {\"token\":\"a\"}\r"),
            vec![StreamEvent::Token("a".to_string())]
        );
    }

    #[test]
    fn malformed_payload() {
        assert!(matches!(parse_line("data: {not json"), LineOutcome::Malformed(_)));
        assert!(matches!(parse_line(r#"data: "just a string""#), LineOutcome::Malformed(_)));
    }
}
