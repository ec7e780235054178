//! Fixed two-byte control tokens.

/// Sent by the client right after the channel client starts.
pub const HANDSHAKE_REQUEST: &[u8; 2] = b"+\n";

/// Expected reply confirming the remote accepted the channel.
pub const HANDSHAKE_REPLY: &[u8; 2] = b"=\n";

/// Asks the remote for one frame.
pub const QUERY_TOKEN: &[u8; 2] = b"?\n";

pub fn encode_handshake() -> &'static [u8] {
    HANDSHAKE_REQUEST
}

pub fn encode_query_token() -> &'static [u8] {
    QUERY_TOKEN
}
