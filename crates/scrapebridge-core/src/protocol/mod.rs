//! Wire protocol spoken over a channel client's stdin/stdout.
//!
//! - Handshake: client writes `+\n`, remote answers `=\n`.
//! - Query: client writes `?\n`, remote answers one length-prefixed frame
//!   (`<decimal length>\n<payload>`).
//!
//! Everything here is pure: no I/O ownership, no runtime. Malformed input is
//! reported as `BridgeError` so the caller can tear the channel down.

pub mod frame;
pub mod tokens;

pub use frame::{decode_frame, encode_frame, parse_length, LengthHeader, MAX_FRAME_LEN, MAX_HEADER_DIGITS};
pub use tokens::{encode_handshake, encode_query_token, HANDSHAKE_REPLY, HANDSHAKE_REQUEST, QUERY_TOKEN};
