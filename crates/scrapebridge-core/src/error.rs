//! Shared error type across scrapebridge crates.

use thiserror::Error;

use crate::protocol::frame::MAX_HEADER_DIGITS;

/// Client-facing error classes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid request parameters.
    BadRequest,
    /// The remote side refused the channel (policy rejection).
    Refused,
    /// Any other failure while talking to the remote exporter.
    Internal,
}

impl ClientCode {
    /// String representation used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::Refused => "REFUSED",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Subprocess could not be spawned or its pipes obtained.
    #[error("launch failed: {0}")]
    LaunchFailure(String),
    /// Handshake bytes missing or wrong.
    #[error("handshake failed: {0}")]
    HandshakeFailure(String),
    /// Remote closed the channel where the protocol expected it open.
    #[error("request refused")]
    RequestRefused,
    #[error("short write ({written} bytes)")]
    ShortWrite { written: usize },
    #[error("short read (expected {expected} bytes, got {got})")]
    ShortRead { expected: usize, got: usize },
    #[error("frame too large: length header exceeds {} digits", MAX_HEADER_DIGITS)]
    FrameTooLarge,
    #[error("malformed frame: {0}")]
    FrameMalformed(String),
    #[error("transport failure: {0}")]
    TransportFailure(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("timed out after {0} ms")]
    Timeout(u64),
    #[error("internal: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Map internal error to a stable client-facing class.
    pub fn client_code(&self) -> ClientCode {
        match self {
            BridgeError::RequestRefused => ClientCode::Refused,
            BridgeError::BadRequest(_) | BridgeError::UnsupportedVersion => ClientCode::BadRequest,
            _ => ClientCode::Internal,
        }
    }

    /// Stable kind name, finer grained than [`ClientCode`].
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::LaunchFailure(_) => "LAUNCH_FAILURE",
            BridgeError::HandshakeFailure(_) => "HANDSHAKE_FAILURE",
            BridgeError::RequestRefused => "REQUEST_REFUSED",
            BridgeError::ShortWrite { .. } => "SHORT_WRITE",
            BridgeError::ShortRead { .. } => "SHORT_READ",
            BridgeError::FrameTooLarge => "FRAME_TOO_LARGE",
            BridgeError::FrameMalformed(_) => "FRAME_MALFORMED",
            BridgeError::TransportFailure(_) => "TRANSPORT_FAILURE",
            BridgeError::BadRequest(_) => "BAD_REQUEST",
            BridgeError::UnsupportedVersion => "UNSUPPORTED_VERSION",
            BridgeError::Timeout(_) => "TIMEOUT",
            BridgeError::Internal(_) => "INTERNAL",
        }
    }
}
