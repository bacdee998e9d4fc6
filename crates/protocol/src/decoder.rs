//! Client-side incremental decoder.
//!
//! The decoder is a byte-level state machine fed with transport chunks of
//! arbitrary size. A marker, a frame header or a UTF-8 sequence may be split
//! across any number of chunks, and one chunk may carry many frames.
//!
//! | State | Input | Next state | Action |
//! |---|---|---|---|
//! | `AccumulatingPlain` | RS | `AccumulatingMarkerCandidate` | |
//! | `AccumulatingPlain` | other | `AccumulatingPlain` | buffer as content |
//! | `AccumulatingMarkerCandidate` | next marker byte | same / `AccumulatingFramePayload` | |
//! | `AccumulatingMarkerCandidate` | mismatch | `AccumulatingPlain` | candidate bytes become content, byte is re-read |
//! | `AccumulatingFramePayload` | header/payload bytes | same | |
//! | `AccumulatingFramePayload` | last payload byte | `AccumulatingPlain` | emit frame, or warn and drop |
//! | `AccumulatingFramePayload` | malformed header | `AccumulatingPlain` | warn, byte is re-read |
//!
//! Content is flushed as a `Content` event before every decoded frame and at
//! the end of each `feed`, holding back only an incomplete trailing UTF-8
//! sequence.

use serde::de::DeserializeOwned;

use crate::frame::{ContextCard, ErrorPayload, SearchResultsPayload, StatusPill, StreamFrame, StreamStatus};
use crate::wire::{
    FrameKind, DEFAULT_MAX_FRAME_BYTES, MARKER, MAX_KIND_LEN, MAX_LENGTH_DIGITS, RECORD_SEPARATOR,
};

/// Coarse decoder state, exposed for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    AccumulatingPlain,
    AccumulatingMarkerCandidate,
    AccumulatingFramePayload,
}

/// Sub-phase of `AccumulatingFramePayload`.
#[derive(Debug)]
enum FramePhase {
    Kind(Vec<u8>),
    Length { kind: Vec<u8>, digits: Vec<u8> },
    Body { kind: FrameKind, remaining: usize, payload: Vec<u8> },
    Skip { remaining: usize },
}

#[derive(Debug)]
enum State {
    Plain,
    MarkerCandidate { matched: usize },
    FramePayload(FramePhase),
}

/// Incremental decoder for the answer stream.
#[derive(Debug)]
pub struct StreamDecoder {
    state: State,
    plain: Vec<u8>,
    max_frame_bytes: usize,
    saw_complete: bool,
    saw_error: bool,
    finished: bool,
    dropped_frames: u64,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder {
    /// Create a decoder with the default frame size limit.
    pub fn new() -> Self {
        Self::with_max_frame_bytes(DEFAULT_MAX_FRAME_BYTES)
    }

    /// Create a decoder that skips frames larger than `max_frame_bytes`.
    pub fn with_max_frame_bytes(max_frame_bytes: usize) -> Self {
        Self {
            state: State::Plain,
            plain: Vec::new(),
            max_frame_bytes,
            saw_complete: false,
            saw_error: false,
            finished: false,
            dropped_frames: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> DecoderState {
        match self.state {
            State::Plain => DecoderState::AccumulatingPlain,
            State::MarkerCandidate { .. } => DecoderState::AccumulatingMarkerCandidate,
            State::FramePayload(_) => DecoderState::AccumulatingFramePayload,
        }
    }

    /// Frames dropped as malformed, unknown or oversized.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Whether a terminal `complete` status has been decoded.
    pub fn saw_complete(&self) -> bool {
        self.saw_complete
    }

    /// Consume one transport chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        let mut events = Vec::new();
        if self.finished {
            tracing::warn!(bytes = chunk.len(), "Chunk fed after end of stream ignored");
            return events;
        }

        let mut i = 0;
        while i < chunk.len() {
            match &mut self.state {
                State::Plain => {
                    let rest = &chunk[i..];
                    match rest.iter().position(|b| *b == RECORD_SEPARATOR) {
                        Some(pos) => {
                            self.plain.extend_from_slice(&rest[..pos]);
                            self.state = State::MarkerCandidate { matched: 1 };
                            i += pos + 1;
                        }
                        None => {
                            self.plain.extend_from_slice(rest);
                            i = chunk.len();
                        }
                    }
                }
                State::MarkerCandidate { matched } => {
                    if chunk[i] == MARKER[*matched] {
                        *matched += 1;
                        i += 1;
                        if *matched == MARKER.len() {
                            // Anything buffered precedes the frame.
                            self.flush_plain(true, &mut events);
                            self.state = State::FramePayload(FramePhase::Kind(Vec::new()));
                        }
                    } else {
                        // Not a marker after all; the mismatching byte is re-read as plain.
                        let matched = *matched;
                        self.plain.extend_from_slice(&MARKER[..matched]);
                        self.state = State::Plain;
                    }
                }
                State::FramePayload(_) => {
                    i += self.step_frame(&chunk[i..], &mut events);
                }
            }
        }

        self.flush_plain(false, &mut events);
        events
    }

    /// Signal end of stream.
    ///
    /// Flushes buffered content and appends a `complete` status unless one
    /// (or an error frame) was already decoded. Calling it again yields
    /// nothing.
    pub fn finish(&mut self) -> Vec<StreamFrame> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }
        self.finished = true;

        match std::mem::replace(&mut self.state, State::Plain) {
            State::Plain => {}
            State::MarkerCandidate { matched } => {
                self.plain.extend_from_slice(&MARKER[..matched]);
            }
            State::FramePayload(phase) => {
                self.dropped_frames += 1;
                tracing::warn!(?phase, "Stream ended inside a frame; frame dropped");
            }
        }
        self.flush_plain(true, &mut events);

        if !self.saw_complete && !self.saw_error {
            self.saw_complete = true;
            events.push(StreamFrame::Status(StatusPill::complete()));
        }
        events
    }

    /// Advance inside a frame. Returns the number of bytes consumed.
    fn step_frame(&mut self, input: &[u8], events: &mut Vec<StreamFrame>) -> usize {
        let State::FramePayload(phase) = &mut self.state else {
            return 0;
        };

        match phase {
            FramePhase::Kind(kind) => {
                let b = input[0];
                if b == b']' && !kind.is_empty() {
                    let kind = std::mem::take(kind);
                    *phase = FramePhase::Length { kind, digits: Vec::new() };
                    1
                } else if FrameKind::is_token_byte(b) && kind.len() < MAX_KIND_LEN {
                    kind.push(b);
                    1
                } else {
                    self.malformed_header("invalid kind token");
                    0
                }
            }
            FramePhase::Length { kind, digits } => {
                let b = input[0];
                if b == b'\n' && !digits.is_empty() {
                    let length = std::str::from_utf8(digits)
                        .ok()
                        .and_then(|s| s.parse::<usize>().ok());
                    let Some(length) = length else {
                        self.malformed_header("unparsable length");
                        return 1;
                    };
                    let kind = std::mem::take(kind);
                    self.begin_body(&kind, length, events);
                    1
                } else if b.is_ascii_digit() && digits.len() < MAX_LENGTH_DIGITS {
                    digits.push(b);
                    1
                } else {
                    self.malformed_header("invalid length field");
                    0
                }
            }
            FramePhase::Body { kind, remaining, payload } => {
                let take = (*remaining).min(input.len());
                payload.extend_from_slice(&input[..take]);
                *remaining -= take;
                if *remaining == 0 {
                    let kind = *kind;
                    let payload = std::mem::take(payload);
                    self.state = State::Plain;
                    self.emit(kind, payload, events);
                }
                take
            }
            FramePhase::Skip { remaining } => {
                let take = (*remaining).min(input.len());
                *remaining -= take;
                if *remaining == 0 {
                    self.state = State::Plain;
                }
                take
            }
        }
    }

    fn begin_body(&mut self, kind: &[u8], length: usize, events: &mut Vec<StreamFrame>) {
        let parsed = FrameKind::parse(kind);
        let phase = match parsed {
            Some(_) if length > self.max_frame_bytes => {
                self.dropped_frames += 1;
                tracing::warn!(
                    length,
                    limit = self.max_frame_bytes,
                    "Oversized frame skipped"
                );
                FramePhase::Skip { remaining: length }
            }
            Some(kind) => FramePhase::Body {
                kind,
                remaining: length,
                payload: Vec::with_capacity(length),
            },
            None => {
                self.dropped_frames += 1;
                tracing::warn!(
                    kind = %String::from_utf8_lossy(kind),
                    length,
                    "Unknown frame kind skipped"
                );
                FramePhase::Skip { remaining: length }
            }
        };

        match phase {
            FramePhase::Body { kind, remaining: 0, payload } => {
                self.state = State::Plain;
                self.emit(kind, payload, events);
            }
            FramePhase::Skip { remaining: 0 } => self.state = State::Plain,
            phase => self.state = State::FramePayload(phase),
        }
    }

    fn malformed_header(&mut self, reason: &str) {
        self.dropped_frames += 1;
        tracing::warn!(reason, "Malformed frame header dropped");
        self.state = State::Plain;
    }

    fn emit(&mut self, kind: FrameKind, payload: Vec<u8>, events: &mut Vec<StreamFrame>) {
        let frame = match kind {
            FrameKind::Text if payload.is_empty() => return,
            FrameKind::Text => Some(StreamFrame::Content(
                String::from_utf8_lossy(&payload).into_owned(),
            )),
            FrameKind::Status => parse::<StatusPill>(kind, &payload).map(StreamFrame::Status),
            FrameKind::Search => {
                parse::<SearchResultsPayload>(kind, &payload).map(StreamFrame::SearchResults)
            }
            FrameKind::Cards => parse::<Vec<ContextCard>>(kind, &payload).map(StreamFrame::ContextCards),
            FrameKind::Error => parse::<ErrorPayload>(kind, &payload).map(StreamFrame::Error),
        };

        match frame {
            Some(frame) => {
                match &frame {
                    StreamFrame::Status(pill) if pill.status == StreamStatus::Complete => {
                        self.saw_complete = true;
                    }
                    StreamFrame::Error(_) => self.saw_error = true,
                    _ => {}
                }
                events.push(frame);
            }
            None => self.dropped_frames += 1,
        }
    }

    /// Move buffered plain bytes into a `Content` event.
    ///
    /// Without `force`, an incomplete UTF-8 sequence at the end stays
    /// buffered for the next chunk. Invalid bytes become U+FFFD.
    fn flush_plain(&mut self, force: bool, events: &mut Vec<StreamFrame>) {
        if self.plain.is_empty() {
            return;
        }

        let bytes = std::mem::take(&mut self.plain);
        let mut text = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&rest[..valid_up_to]));
                    match e.error_len() {
                        Some(bad) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid_up_to + bad..];
                        }
                        None if force => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &[];
                            break;
                        }
                        None => {
                            rest = &rest[valid_up_to..];
                            break;
                        }
                    }
                }
            }
        }

        self.plain = rest.to_vec();
        if !text.is_empty() {
            events.push(StreamFrame::Content(text));
        }
    }
}

fn parse<T: DeserializeOwned>(kind: FrameKind, payload: &[u8]) -> Option<T> {
    match serde_json::from_slice(payload) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(
                kind = kind.as_str(),
                bytes = payload.len(),
                error = %e,
                "Malformed frame payload dropped"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(events: &[StreamFrame]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                StreamFrame::Content(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_plain_text_passes_through() {
        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(b"Hello ");
        assert_eq!(events, vec![StreamFrame::content("Hello ")]);
        assert_eq!(decoder.state(), DecoderState::AccumulatingPlain);
    }

    #[test]
    fn test_marker_split_across_chunks() {
        let mut decoder = StreamDecoder::new();
        let mut events = decoder.feed(b"before\x1e[AF");
        assert_eq!(decoder.state(), DecoderState::AccumulatingMarkerCandidate);
        events.extend(decoder.feed(b"1:error]"));
        assert_eq!(decoder.state(), DecoderState::AccumulatingFramePayload);
        events.extend(decoder.feed(b"31\n{\"code\":\"X\",\"message\":\"broken\"}after"));

        assert_eq!(
            events,
            vec![
                StreamFrame::content("before"),
                StreamFrame::error("X", "broken"),
                StreamFrame::content("after"),
            ]
        );
    }

    #[test]
    fn test_failed_candidate_is_reclassified_as_content() {
        let mut decoder = StreamDecoder::new();
        let mut events = decoder.feed(b"a\x1e[AF");
        events.extend(decoder.feed(b"2 is not a marker"));
        events.extend(decoder.finish());

        assert_eq!(content(&events), "a\u{1e}[AF2 is not a marker");
        assert_eq!(decoder.dropped_frames(), 0);
    }

    #[test]
    fn test_candidate_followed_by_real_marker() {
        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(b"\x1e\x1e[AF1:text]2\nhi");
        assert_eq!(
            events,
            vec![StreamFrame::content("\u{1e}"), StreamFrame::content("hi")]
        );
    }

    #[test]
    fn test_malformed_payload_dropped_and_decoding_resumes() {
        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(b"x\x1e[AF1:status]5\n{oops}y");
        assert_eq!(events, vec![StreamFrame::content("x"), StreamFrame::content("}y")]);
        assert_eq!(decoder.dropped_frames(), 1);
        assert_eq!(decoder.state(), DecoderState::AccumulatingPlain);
    }

    #[test]
    fn test_malformed_header_resumes_plain() {
        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(b"\x1e[AF1:STATUS]2\n{}");
        assert_eq!(content(&events), "STATUS]2\n{}");
        assert_eq!(decoder.dropped_frames(), 1);
    }

    #[test]
    fn test_unknown_kind_skipped() {
        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(b"a\x1e[AF1:video]3\nxyzb");
        assert_eq!(content(&events), "ab");
        assert_eq!(decoder.dropped_frames(), 1);
    }

    #[test]
    fn test_oversized_frame_skipped_without_buffering() {
        let mut decoder = StreamDecoder::with_max_frame_bytes(4);
        let events = decoder.feed(b"\x1e[AF1:text]6\nabcdefOK");
        assert_eq!(content(&events), "OK");
        assert_eq!(decoder.dropped_frames(), 1);
    }

    #[test]
    fn test_empty_text_frame_emits_nothing() {
        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(b"a\x1e[AF1:text]0\nb");
        assert_eq!(events, vec![StreamFrame::content("a"), StreamFrame::content("b")]);
        assert_eq!(decoder.dropped_frames(), 0);
        assert_eq!(decoder.state(), DecoderState::AccumulatingPlain);
    }

    #[test]
    fn test_utf8_split_is_carried() {
        let snowman = "☃".as_bytes();
        let mut decoder = StreamDecoder::new();
        let mut events = decoder.feed(&snowman[..1]);
        assert!(events.is_empty());
        events.extend(decoder.feed(&snowman[1..]));
        assert_eq!(events, vec![StreamFrame::content("☃")]);
    }

    #[test]
    fn test_finish_adds_complete_once() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(b"text");
        let events = decoder.finish();
        assert!(matches!(
            events.last(),
            Some(StreamFrame::Status(p)) if p.status == StreamStatus::Complete
        ));
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_finish_drops_truncated_frame() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(b"ok\x1e[AF1:text]10\nabc");
        let events = decoder.finish();
        assert_eq!(events.len(), 1);
        assert_eq!(decoder.dropped_frames(), 1);
    }

    #[test]
    fn test_finish_flushes_dangling_candidate() {
        let mut decoder = StreamDecoder::new();
        let mut events = decoder.feed(b"end\x1e[A");
        events.extend(decoder.finish());
        assert_eq!(content(&events), "end\u{1e}[A");
    }

    #[test]
    fn test_no_synthetic_complete_after_error() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(b"\x1e[AF1:error]28\n{\"code\":\"E\",\"message\":\"bad\"}");
        assert!(decoder.finish().is_empty());
    }
}
