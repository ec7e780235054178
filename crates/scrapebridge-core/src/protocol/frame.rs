//! Length-prefixed response frames (panic-free).
//!
//! A frame is `<decimal length>\n` followed by exactly `length` payload bytes.
//! The header carries at most [`MAX_HEADER_DIGITS`] digits and the length must
//! be at least 1.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{BridgeError, Result};

/// Longest accepted length header, newline excluded.
pub const MAX_HEADER_DIGITS: usize = 7;

/// Largest payload a frame may announce.
pub const MAX_FRAME_LEN: usize = 9_999_999;

/// Incremental length header decoder, fed one byte at a time.
///
/// Byte-at-a-time feeding lets the reader stop exactly at the newline, so no
/// payload bytes are consumed while looking for the end of the header.
#[derive(Debug, Default, Clone)]
pub struct LengthHeader {
    digits: [u8; MAX_HEADER_DIGITS],
    len: usize,
}

impl LengthHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of header bytes accumulated so far (newline excluded).
    pub fn consumed(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Feed one byte. Returns the payload length once the newline arrives.
    ///
    /// An eighth byte without a newline yields `FrameTooLarge`, whatever the
    /// bytes are; digit validation happens only once the header is complete.
    pub fn push(&mut self, byte: u8) -> Result<Option<usize>> {
        if byte == b'\n' {
            return parse_length(&self.digits[..self.len]).map(Some);
        }
        let slot = self
            .digits
            .get_mut(self.len)
            .ok_or(BridgeError::FrameTooLarge)?;
        *slot = byte;
        self.len += 1;
        Ok(None)
    }
}

/// Parse header digits (newline stripped) into a payload length.
pub fn parse_length(digits: &[u8]) -> Result<usize> {
    if digits.is_empty() {
        return Err(BridgeError::FrameMalformed("empty length header".into()));
    }
    if digits.len() > MAX_HEADER_DIGITS {
        return Err(BridgeError::FrameTooLarge);
    }
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(BridgeError::FrameMalformed(format!(
            "non-numeric length header {:?}",
            String::from_utf8_lossy(digits)
        )));
    }

    // At most 7 ASCII digits: cannot overflow.
    let len = digits
        .iter()
        .fold(0usize, |acc, d| acc * 10 + usize::from(d - b'0'));
    if len < 1 {
        return Err(BridgeError::FrameMalformed("zero length".into()));
    }
    Ok(len)
}

/// Decode one frame from the front of `buf`, advancing past it.
///
/// Bytes after the frame are left in `buf` for the caller to inspect.
pub fn decode_frame(buf: &mut Bytes) -> Result<Bytes> {
    let mut header = LengthHeader::new();
    let len = loop {
        if !buf.has_remaining() {
            return Err(BridgeError::ShortRead {
                expected: header.consumed() + 1,
                got: header.consumed(),
            });
        }
        if let Some(len) = header.push(buf.get_u8())? {
            break len;
        }
    };

    if buf.remaining() < len {
        return Err(BridgeError::ShortRead {
            expected: len,
            got: buf.remaining(),
        });
    }
    Ok(buf.split_to(len))
}

/// Encode `payload` as a single frame.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes> {
    if payload.is_empty() {
        return Err(BridgeError::FrameMalformed("empty payload".into()));
    }
    if payload.len() > MAX_FRAME_LEN {
        return Err(BridgeError::FrameTooLarge);
    }

    let header = format!("{}\n", payload.len());
    let mut out = BytesMut::with_capacity(header.len() + payload.len());
    out.put_slice(header.as_bytes());
    out.put_slice(payload);
    Ok(out.freeze())
}
