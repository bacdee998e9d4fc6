//! Wire format, version `af1`.
//!
//! Content is written as raw UTF-8. A control frame is
//!
//! ```text
//! RS "[AF1:" kind "]" length "\n" payload
//! ```
//!
//! where RS is the ASCII record separator (0x1E), `kind` is one of
//! [`FrameKind`], `length` is the decimal byte length of `payload`, and the
//! payload is JSON (raw UTF-8 for `text`). RS never occurs in content on the
//! wire: the encoder moves content containing it into a `text` frame, so
//! every RS opens a marker. RS is ASCII and cannot appear inside a multi-byte
//! UTF-8 sequence.

use bytes::{BufMut, BytesMut};

/// First byte of every marker.
pub const RECORD_SEPARATOR: u8 = 0x1E;

/// Full marker prefix.
pub const MARKER: &[u8] = b"\x1e[AF1:";

/// Protocol identifier announced in the `x-answer-protocol` header.
pub const PROTOCOL_VERSION: &str = "af1";

/// Default upper bound on a single frame payload.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Longest accepted kind token.
pub const MAX_KIND_LEN: usize = 16;

/// Longest accepted length field.
pub const MAX_LENGTH_DIGITS: usize = 10;

/// Kinds of control frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Status,
    Search,
    Cards,
    Error,
    /// Content that could not travel raw.
    Text,
}

impl FrameKind {
    /// Token written between `:` and `]`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Search => "search",
            Self::Cards => "cards",
            Self::Error => "error",
            Self::Text => "text",
        }
    }

    /// Parse a kind token; unknown kinds yield `None`.
    pub fn parse(token: &[u8]) -> Option<Self> {
        match token {
            b"status" => Some(Self::Status),
            b"search" => Some(Self::Search),
            b"cards" => Some(Self::Cards),
            b"error" => Some(Self::Error),
            b"text" => Some(Self::Text),
            _ => None,
        }
    }

    /// Whether `b` may appear in a kind token.
    pub fn is_token_byte(b: u8) -> bool {
        b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-'
    }
}

/// Append one control frame to `buf`.
pub fn put_frame(buf: &mut BytesMut, kind: FrameKind, payload: &[u8]) {
    let length = payload.len().to_string();
    buf.reserve(MARKER.len() + kind.as_str().len() + length.len() + 2 + payload.len());
    buf.put_slice(MARKER);
    buf.put_slice(kind.as_str().as_bytes());
    buf.put_u8(b']');
    buf.put_slice(length.as_bytes());
    buf.put_u8(b'\n');
    buf.put_slice(payload);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_frame_layout() {
        let mut buf = BytesMut::new();
        put_frame(&mut buf, FrameKind::Status, b"{}");
        assert_eq!(&buf[..], b"\x1e[AF1:status]2\n{}");
    }

    #[test]
    fn test_kind_tokens_round_trip() {
        for kind in [
            FrameKind::Status,
            FrameKind::Search,
            FrameKind::Cards,
            FrameKind::Error,
            FrameKind::Text,
        ] {
            assert_eq!(FrameKind::parse(kind.as_str().as_bytes()), Some(kind));
            assert!(kind.as_str().len() <= MAX_KIND_LEN);
        }
        assert_eq!(FrameKind::parse(b"video"), None);
    }
}
