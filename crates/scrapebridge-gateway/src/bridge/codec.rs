//! Async adapters from the core framing codec to a link's byte streams.
//!
//! - Tokens are written with a single `write` so short writes stay visible.
//! - The length header is read one byte at a time; the payload with exact
//!   reads. Nothing past the frame is consumed.
//! - I/O errors are classified into `BridgeError` kinds here, in one place.

use std::io;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use scrapebridge_core::error::{BridgeError, Result};
use scrapebridge_core::protocol::{LengthHeader, HANDSHAKE_REPLY};

/// Whether `e` means the remote end of the pipe is gone.
pub fn is_closed(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::WriteZero
            | io::ErrorKind::ConnectionReset
    )
}

pub fn transport(e: io::Error) -> BridgeError {
    BridgeError::TransportFailure(e.to_string())
}

/// Write a two-byte control token. Returns how many bytes the stream took.
pub async fn write_token<W>(w: &mut W, token: &[u8]) -> io::Result<usize>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let n = w.write(token).await?;
    w.flush().await?;
    Ok(n)
}

/// Read until `buf` is full or the stream ends. Returns bytes read.
pub async fn fill<R>(r: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut got = 0;
    while got < buf.len() {
        match r.read(&mut buf[got..]).await? {
            0 => break,
            n => got += n,
        }
    }
    Ok(got)
}

/// Read and check the remote's handshake reply.
///
/// End of stream before any byte means the remote refused the channel.
pub async fn read_handshake<R>(r: &mut R) -> Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut reply = [0u8; 2];
    let got = match fill(r, &mut reply).await {
        Ok(n) => n,
        Err(e) if is_closed(&e) => return Err(BridgeError::RequestRefused),
        Err(e) => return Err(BridgeError::HandshakeFailure(format!("read failed: {e}"))),
    };

    match got {
        0 => Err(BridgeError::RequestRefused),
        2 if &reply == HANDSHAKE_REPLY => Ok(()),
        2 => Err(BridgeError::HandshakeFailure(format!(
            "unexpected reply {:?}",
            String::from_utf8_lossy(&reply)
        ))),
        n => Err(BridgeError::HandshakeFailure(format!("short read of {n} bytes"))),
    }
}

/// Decode a frame's length header, stopping right after its newline.
pub async fn read_length_header<R>(r: &mut R) -> Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = LengthHeader::new();
    let mut byte = [0u8; 1];
    loop {
        let n = r.read(&mut byte).await.map_err(transport)?;
        if n == 0 {
            return Err(BridgeError::ShortRead {
                expected: header.consumed() + 1,
                got: header.consumed(),
            });
        }
        if let Some(len) = header.push(byte[0])? {
            return Ok(len);
        }
    }
}

/// Read exactly `len` payload bytes.
pub async fn read_payload<R>(r: &mut R, len: usize) -> Result<Bytes>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = BytesMut::zeroed(len);
    let got = fill(r, &mut buf).await.map_err(transport)?;
    if got < len {
        return Err(BridgeError::ShortRead { expected: len, got });
    }
    Ok(buf.freeze())
}

/// Header then payload: one whole response frame.
pub async fn read_frame<R>(r: &mut R) -> Result<Bytes>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let len = read_length_header(r).await?;
    read_payload(r, len).await
}
