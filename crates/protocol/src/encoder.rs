//! Server-side encoder.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

use answer_engine_core::{Error, Result};

use crate::frame::{ErrorPayload, StreamFrame, StreamStatus};
use crate::wire::{put_frame, FrameKind, DEFAULT_MAX_FRAME_BYTES, RECORD_SEPARATOR};

/// Serializes frames into the outbound byte stream, in emission order.
///
/// Encoding is append-only: the encoder keeps just enough state to refuse
/// frames that would break the stream's ordering rules (a status pill going
/// backwards, anything after a terminal frame).
///
/// No control frame payload exceeds `max_frame_bytes`. Long `text` content
/// is split over several frames and error messages are shortened; other
/// frames that do not fit are not written.
#[derive(Debug)]
pub struct StreamEncoder {
    last_status: Option<StreamStatus>,
    terminated: bool,
    frames_written: u64,
    content_bytes: u64,
    dropped_frames: u64,
    max_frame_bytes: usize,
}

impl Default for StreamEncoder {
    fn default() -> Self {
        Self::with_max_frame_bytes(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl StreamEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an encoder whose control frames stay within `max_frame_bytes`.
    pub fn with_max_frame_bytes(max_frame_bytes: usize) -> Self {
        Self {
            last_status: None,
            terminated: false,
            frames_written: 0,
            content_bytes: 0,
            dropped_frames: 0,
            max_frame_bytes,
        }
    }

    /// Encode one frame.
    ///
    /// A frame too large to write yields an empty chunk.
    pub fn encode(&mut self, frame: &StreamFrame) -> Result<Bytes> {
        if self.terminated {
            return Err(Error::protocol("frame emitted after terminal frame"));
        }

        let mut buf = BytesMut::new();
        match frame {
            StreamFrame::Content(text) => {
                if text.is_empty() {
                    return Ok(Bytes::new());
                }
                if text.as_bytes().contains(&RECORD_SEPARATOR) {
                    for piece in split_at_char_boundaries(text, self.max_frame_bytes) {
                        put_frame(&mut buf, FrameKind::Text, piece.as_bytes());
                    }
                } else {
                    buf.extend_from_slice(text.as_bytes());
                }
                self.content_bytes += text.len() as u64;
            }
            StreamFrame::Status(pill) => {
                if let Some(last) = self.last_status {
                    if pill.status < last {
                        return Err(Error::protocol(format!(
                            "status regressed from {:?} to {:?}",
                            last, pill.status
                        )));
                    }
                }
                let payload = serde_json::to_vec(pill)?;
                if !self.fits(FrameKind::Status, &payload) {
                    return Ok(Bytes::new());
                }
                self.last_status = Some(pill.status);
                put_frame(&mut buf, FrameKind::Status, &payload);
            }
            StreamFrame::SearchResults(results) => {
                let payload = serde_json::to_vec(results)?;
                if !self.fits(FrameKind::Search, &payload) {
                    return Ok(Bytes::new());
                }
                put_frame(&mut buf, FrameKind::Search, &payload);
            }
            StreamFrame::ContextCards(cards) => {
                let payload = serde_json::to_vec(cards)?;
                if !self.fits(FrameKind::Cards, &payload) {
                    return Ok(Bytes::new());
                }
                put_frame(&mut buf, FrameKind::Cards, &payload);
            }
            StreamFrame::Error(error) => {
                let payload = self.error_payload(error)?;
                if !self.fits(FrameKind::Error, &payload) {
                    return Ok(Bytes::new());
                }
                put_frame(&mut buf, FrameKind::Error, &payload);
            }
        }

        self.terminated = frame.is_terminal();
        self.frames_written += 1;
        Ok(buf.freeze())
    }

    fn fits(&mut self, kind: FrameKind, payload: &[u8]) -> bool {
        if payload.len() <= self.max_frame_bytes {
            return true;
        }
        self.dropped_frames += 1;
        tracing::warn!(
            kind = kind.as_str(),
            length = payload.len(),
            limit = self.max_frame_bytes,
            "Oversized frame not written"
        );
        false
    }

    /// Serialize an error, halving its message until it fits.
    fn error_payload(&self, error: &ErrorPayload) -> Result<Vec<u8>> {
        let mut error = error.clone();
        loop {
            let payload = serde_json::to_vec(&error)?;
            if payload.len() <= self.max_frame_bytes || error.message.is_empty() {
                return Ok(payload);
            }
            let keep = error.message.chars().count() / 2;
            error.message = error.message.chars().take(keep).collect();
        }
    }

    /// Whether a terminal frame has been written.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Content bytes written so far.
    pub fn content_bytes(&self) -> u64 {
        self.content_bytes
    }

    /// Control frames left out for exceeding the size limit.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Encode a frame stream lazily, one chunk per frame.
    ///
    /// Empty content frames produce no chunk.
    pub fn encode_stream<S>(mut self, frames: S) -> impl Stream<Item = Result<Bytes>>
    where
        S: Stream<Item = StreamFrame>,
    {
        frames
            .map(move |frame| self.encode(&frame))
            .filter(|chunk| futures::future::ready(!matches!(chunk, Ok(b) if b.is_empty())))
    }
}

/// Split `text` into pieces of at most `max_bytes`, never inside a character.
fn split_at_char_boundaries(text: &str, max_bytes: usize) -> Vec<&str> {
    let max_bytes = max_bytes.max(4);
    let mut pieces = Vec::new();
    let mut rest = text;
    while rest.len() > max_bytes {
        let mut cut = max_bytes;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (head, tail) = rest.split_at(cut);
        pieces.push(head);
        rest = tail;
    }
    if !rest.is_empty() {
        pieces.push(rest);
    }
    pieces
}

/// Encode a complete frame sequence into one buffer.
pub fn encode_all<'a>(frames: impl IntoIterator<Item = &'a StreamFrame>) -> Result<Bytes> {
    let mut encoder = StreamEncoder::new();
    let mut buf = BytesMut::new();
    for frame in frames {
        buf.extend_from_slice(&encoder.encode(frame)?);
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::StreamDecoder;
    use crate::frame::{SearchResultsPayload, StatusPill};

    #[test]
    fn test_content_is_raw() {
        let mut encoder = StreamEncoder::new();
        let bytes = encoder.encode(&StreamFrame::content("Hello, world")).unwrap();
        assert_eq!(&bytes[..], b"Hello, world");
        assert_eq!(encoder.content_bytes(), 12);
    }

    #[test]
    fn test_content_with_separator_is_framed() {
        let mut encoder = StreamEncoder::new();
        let bytes = encoder.encode(&StreamFrame::content("a\u{1e}b")).unwrap();
        assert_eq!(&bytes[..], b"\x1e[AF1:text]3\na\x1eb");
    }

    #[test]
    fn test_status_regression_rejected() {
        let mut encoder = StreamEncoder::new();
        encoder
            .encode(&StreamFrame::status(StreamStatus::Searching, "Searching"))
            .unwrap();
        encoder
            .encode(&StreamFrame::status(StreamStatus::Searching, "Still searching"))
            .unwrap();
        let err = encoder
            .encode(&StreamFrame::status(StreamStatus::Planning, "Planning"))
            .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn test_nothing_after_terminal() {
        let mut encoder = StreamEncoder::new();
        encoder.encode(&StreamFrame::Status(StatusPill::complete())).unwrap();
        assert!(encoder.is_terminated());
        assert!(encoder.encode(&StreamFrame::content("late")).is_err());

        let mut encoder = StreamEncoder::new();
        encoder.encode(&StreamFrame::error("GENERATION_ERROR", "boom")).unwrap();
        assert!(encoder.encode(&StreamFrame::Status(StatusPill::complete())).is_err());
    }

    #[test]
    fn test_empty_content_writes_nothing() {
        let mut encoder = StreamEncoder::new();
        assert!(encoder.encode(&StreamFrame::content("")).unwrap().is_empty());
        assert_eq!(encoder.frames_written(), 0);
    }

    #[test]
    fn test_oversized_frame_not_written() {
        let mut encoder = StreamEncoder::with_max_frame_bytes(128);
        let results = SearchResultsPayload {
            query: "q".repeat(200),
            citations: Vec::new(),
            sources: Vec::new(),
        };
        let bytes = encoder.encode(&StreamFrame::SearchResults(results)).unwrap();
        assert!(bytes.is_empty());
        assert_eq!(encoder.dropped_frames(), 1);
        assert_eq!(encoder.frames_written(), 0);

        // The stream carries on.
        assert!(!encoder.encode(&StreamFrame::Status(StatusPill::complete())).unwrap().is_empty());
    }

    #[test]
    fn test_long_text_frame_is_split_within_limit() {
        let text = format!("ab\u{1e}{}☃☃", "c".repeat(20));
        let mut encoder = StreamEncoder::with_max_frame_bytes(8);
        let bytes = encoder.encode(&StreamFrame::content(text.clone())).unwrap();

        let mut decoder = StreamDecoder::with_max_frame_bytes(8);
        let mut events = decoder.feed(&bytes);
        events.extend(decoder.finish());
        let decoded: String = events
            .iter()
            .filter_map(|e| match e {
                StreamFrame::Content(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(decoded, text);
        assert_eq!(decoder.dropped_frames(), 0);
    }

    #[test]
    fn test_long_error_message_is_shortened() {
        let mut encoder = StreamEncoder::with_max_frame_bytes(64);
        let bytes = encoder
            .encode(&StreamFrame::error("generation_failed", "x".repeat(500)))
            .unwrap();
        assert!(encoder.is_terminated());

        let mut decoder = StreamDecoder::with_max_frame_bytes(64);
        let events = decoder.feed(&bytes);
        match events.as_slice() {
            [StreamFrame::Error(error)] => {
                assert_eq!(error.code, "generation_failed");
                assert!(!error.message.is_empty());
                assert!(error.message.len() < 500);
            }
            other => panic!("expected one error frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_encode_stream_skips_empty_chunks() {
        let frames = futures::stream::iter(vec![
            StreamFrame::content("a"),
            StreamFrame::content(""),
            StreamFrame::content("b"),
        ]);
        let chunks: Vec<_> = StreamEncoder::new().encode_stream(frames).collect().await;
        assert_eq!(chunks.len(), 2);
    }
}
