//! Chunk-boundary independent frame decoding.
//!
//! Body chunks arrive at arbitrary boundaries: one chunk may hold several
//! frames, or end halfway through a frame or even halfway through a UTF-8
//! sequence. The decoder keeps the unterminated tail in a carry-over buffer
//! and only parses lines once their `\n` has arrived.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::{stream, Stream, StreamExt};
use tracing::{debug, warn};

use super::events::{parse_line, LineOutcome, StreamEvent};
use crate::error::Result;

/// Incremental decoder for one response body.
///
/// A decoder belongs to a single exchange; [`FrameDecoder::finish`] consumes
/// it so it cannot be fed again.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Bytes received after the last `\n`.
    carry: Vec<u8>,
    /// Prefix of `carry` already searched for `\n`.
    scanned: usize,
    /// Number of frame lines decoded successfully.
    frames: usize,
    /// Number of frame lines skipped because their payload was malformed.
    skipped: usize,
}

impl FrameDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the events of every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.carry.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.carry[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            let line = String::from_utf8_lossy(&self.carry[start..end]);
            Self::decode_line(&line, &mut events, &mut self.frames, &mut self.skipped);
            start = end + 1;
            from = start;
        }
        self.carry.drain(..start);
        self.scanned = self.carry.len();

        events
    }

    /// Flush a trailing line that was never terminated.
    pub fn finish(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if !self.carry.is_empty() {
            let line = String::from_utf8_lossy(&self.carry).into_owned();
            Self::decode_line(&line, &mut events, &mut self.frames, &mut self.skipped);
        }
        debug!(
            frames = self.frames,
            skipped = self.skipped,
            "frame stream finished"
        );
        events
    }

    /// Number of bytes waiting for a line terminator.
    pub fn pending_bytes(&self) -> usize {
        self.carry.len()
    }

    /// Number of malformed frames skipped so far.
    pub const fn skipped(&self) -> usize {
        self.skipped
    }

    fn decode_line(
        line: &str,
        events: &mut Vec<StreamEvent>,
        frames: &mut usize,
        skipped: &mut usize,
    ) {
        match parse_line(line) {
            LineOutcome::Ignored => {}
            LineOutcome::Frame(decoded) => {
                *frames += 1;
                events.extend(decoded);
            }
            LineOutcome::Malformed(e) => {
                *skipped += 1;
                warn!(error = %e, line = %line, "skipping malformed frame");
            }
        }
    }
}

struct DecodeState<'a, B> {
    bytes: Pin<Box<dyn Stream<Item = Result<B>> + Send + 'a>>,
    decoder: Option<FrameDecoder>,
    pending: VecDeque<StreamEvent>,
}

/// Lazily decode a stream of body chunks into protocol events.
///
/// The returned stream ends when the byte stream ends. A byte stream error is
/// yielded once and ends the event stream; events already decoded from
/// earlier chunks are delivered before it.
pub fn decode_stream<'a, S, B>(bytes: S) -> impl Stream<Item = Result<StreamEvent>> + Send + 'a
where
    S: Stream<Item = Result<B>> + Send + 'a,
    B: AsRef<[u8]> + Send + 'a,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        decoder: Some(FrameDecoder::new()),
        pending: VecDeque::new(),
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.decoder.is_none() {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    if let Some(decoder) = state.decoder.as_mut() {
                        state.pending.extend(decoder.push(chunk.as_ref()));
                    }
                }
                Some(Err(e)) => {
                    state.decoder = None;
                    return Some((Err(e), state));
                }
                None => {
                    if let Some(decoder) = state.decoder.take() {
                        state.pending.extend(decoder.finish());
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use crate::models::Source;

    const BODY: &str = concat!(
        "data: {\"token\":\"Bail \"}\n\n",
        ": comment line\n",
        "data: {\"token\":\"is…\"}\n\n",
        "data: {broken\n\n",
        "data: {\"sources\":[{\"page_content\":\"Section 436 CrPC\",\"metadata\":{\"page\":3}}]}\n\n",
    );

    fn decode_chunks(chunks: &[&[u8]]) -> Vec<StreamEvent> {
        let mut decoder = FrameDecoder::new();
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(decoder.push(chunk));
        }
        events.extend(decoder.finish());
        events
    }

    #[test]
    fn decode_single_chunk() {
        let events = decode_chunks(&[BODY.as_bytes()]);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], StreamEvent::Token("Bail ".to_string()));
        assert_eq!(events[1], StreamEvent::Token("is…".to_string()));
        match &events[2] {
            StreamEvent::Sources(sources) => {
                assert_eq!(sources.len(), 1);
                assert_eq!(sources[0].excerpt, "Section 436 CrPC");
            }
            other => panic!("expected sources, got {other:?}"),
        }
    }

    #[test]
    fn every_two_way_split_matches_single_chunk() {
        let bytes = BODY.as_bytes();
        let expected = decode_chunks(&[bytes]);
        // Includes splits inside the multi-byte ellipsis.
        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(decode_chunks(&[a, b]), expected, "split at {split}");
        }
    }

    #[test]
    fn byte_at_a_time_matches_single_chunk() {
        let bytes = BODY.as_bytes();
        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(decode_chunks(&chunks), decode_chunks(&[bytes]));
    }

    #[test]
    fn partial_line_is_buffered() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: {\"tok").is_empty());
        assert_eq!(decoder.pending_bytes(), 11);
        assert_eq!(
            decoder.push(b"en\":\"hi\"}\n"),
            vec![StreamEvent::Token("hi".to_string())]
        );
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn long_frame_is_not_rescanned() {
        let frame = format!("data: {{\"token\":\"{}\"}}\n", "x".repeat(4096));
        let mut decoder = FrameDecoder::new();
        let mut events = Vec::new();
        for chunk in frame.as_bytes().chunks(16) {
            events.extend(decoder.push(chunk));
            // Everything still buffered has been searched once already.
            assert_eq!(decoder.scanned, decoder.pending_bytes());
        }
        assert_eq!(events, vec![StreamEvent::Token("x".repeat(4096))]);
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn unterminated_final_frame_is_flushed() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: {\"token\":\"end\"}").is_empty());
        assert_eq!(decoder.finish(), vec![StreamEvent::Token("end".to_string())]);
    }

    #[test]
    fn malformed_frame_does_not_stop_decoding() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push(b"data: nope\ndata: {\"token\":\"ok\"}\n");
        assert_eq!(events, vec![StreamEvent::Token("ok".to_string())]);
        assert_eq!(decoder.skipped(), 1);
    }

    #[tokio::test]
    async fn decode_stream_yields_events_lazily() {
        let chunks: Vec<Result<&'static [u8]>> = vec![
            Ok(b"data: {\"tok".as_slice()),
            Ok(b"en\":\"a\"}\n\ndata: {\"token\":\"b\"}\n".as_slice()),
            Ok(b"\ndata: {\"sources\":[]}".as_slice()),
        ];
        let events: Vec<_> = decode_stream(stream::iter(chunks)).collect().await;
        let events: Vec<StreamEvent> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(
            events,
            vec![
                StreamEvent::Token("a".to_string()),
                StreamEvent::Token("b".to_string()),
                StreamEvent::Sources(Vec::<Source>::new()),
            ]
        );
    }

    #[tokio::test]
    async fn decode_stream_stops_after_error() {
        let chunks: Vec<Result<&'static [u8]>> = vec![
            Ok(b"data: {\"token\":\"a\"}\n".as_slice()),
            Err(ChatError::Aborted),
            Ok(b"data: {\"token\":\"never\"}\n".as_slice()),
        ];
        let mut events = Box::pin(decode_stream(stream::iter(chunks)));
        assert_eq!(
            events.next().await.unwrap().unwrap(),
            StreamEvent::Token("a".to_string())
        );
        assert!(matches!(events.next().await, Some(Err(ChatError::Aborted))));
        assert!(events.next().await.is_none());
    }
}
