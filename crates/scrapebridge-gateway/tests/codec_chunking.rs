#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

use scrapebridge_core::error::BridgeError;
use scrapebridge_core::protocol::encode_frame;
use scrapebridge_gateway::bridge::codec;

/// Hands out `data` at most `chunk` bytes per read, then EOF.
struct Chunked {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl Chunked {
    fn new(data: &[u8], chunk: usize) -> Self {
        Self {
            data: data.to_vec(),
            pos: 0,
            chunk,
        }
    }

    fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }
}

impl AsyncRead for Chunked {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let n = self.chunk.min(buf.remaining()).min(self.data.len() - self.pos);
        let start = self.pos;
        buf.put_slice(&self.data[start..start + n]);
        self.pos += n;
        Poll::Ready(Ok(()))
    }
}

const SAMPLE: &[u8] = b"28\narsnetinarsitoniarstarstarst";

#[tokio::test]
async fn sample_frame_survives_any_chunking() {
    for chunk in (1..=9).chain([64]) {
        let mut r = Chunked::new(SAMPLE, chunk);
        let payload = codec::read_frame(&mut r).await.unwrap();
        assert_eq!(&payload[..], &SAMPLE[3..], "chunk={chunk}");
        assert!(r.remaining().is_empty());
    }
}

#[tokio::test]
async fn header_read_stops_at_newline() {
    let mut r = Chunked::new(b"5\nhello?\n", 64);
    assert_eq!(codec::read_length_header(&mut r).await.unwrap(), 5);
    assert_eq!(r.remaining(), b"hello?\n");
}

#[tokio::test]
async fn back_to_back_frames_read_separately() {
    let mut wire = encode_frame(b"first").unwrap().to_vec();
    wire.extend_from_slice(&encode_frame(b"second").unwrap());
    let mut r = Chunked::new(&wire, 3);

    assert_eq!(&codec::read_frame(&mut r).await.unwrap()[..], b"first");
    assert_eq!(&codec::read_frame(&mut r).await.unwrap()[..], b"second");
}

#[tokio::test]
async fn large_payload_arrives_whole() {
    let payload: Vec<u8> = (0..500_000u32).map(|i| b"abcdefghij\n"[(i % 11) as usize]).collect();
    let wire = encode_frame(&payload).unwrap();
    let mut r = Chunked::new(&wire, 4096);

    let got = codec::read_frame(&mut r).await.unwrap();
    assert_eq!(got.len(), 500_000);
    assert_eq!(&got[..], &payload[..]);
}

#[tokio::test]
async fn header_errors() {
    let cases: [(&[u8], &str); 5] = [
        (b"12345678\n", "FRAME_TOO_LARGE"),
        (b"x\n", "FRAME_MALFORMED"),
        (b"-5\n", "FRAME_MALFORMED"),
        (b"000\n", "FRAME_MALFORMED"),
        (b"12", "SHORT_READ"),
    ];
    for (wire, kind) in cases {
        let mut r = Chunked::new(wire, 1);
        let err = codec::read_length_header(&mut r).await.unwrap_err();
        assert_eq!(err.kind(), kind, "wire={:?}", String::from_utf8_lossy(wire));
    }
}

#[tokio::test]
async fn oversized_header_stops_after_eight_bytes() {
    let mut r = Chunked::new(b"123456789012\n", 1);
    assert_eq!(
        codec::read_length_header(&mut r).await,
        Err(BridgeError::FrameTooLarge)
    );
    assert_eq!(r.remaining(), b"9012\n");
}

#[tokio::test]
async fn empty_stream_is_short_read_of_nothing() {
    let mut r = Chunked::new(b"", 8);
    assert_eq!(
        codec::read_frame(&mut r).await,
        Err(BridgeError::ShortRead { expected: 1, got: 0 })
    );
}

#[tokio::test]
async fn truncated_payload_counts_bytes() {
    let mut r = Chunked::new(b"10\nabc", 2);
    assert_eq!(
        codec::read_frame(&mut r).await,
        Err(BridgeError::ShortRead { expected: 10, got: 3 })
    );
}

#[tokio::test]
async fn handshake_reply_checks() {
    let mut ok = Chunked::new(b"=\n", 1);
    assert_eq!(codec::read_handshake(&mut ok).await, Ok(()));

    let mut refused = Chunked::new(b"", 1);
    assert_eq!(
        codec::read_handshake(&mut refused).await,
        Err(BridgeError::RequestRefused)
    );

    let mut wrong = Chunked::new(b"+\n", 2);
    assert_eq!(codec::read_handshake(&mut wrong).await.unwrap_err().kind(), "HANDSHAKE_FAILURE");

    let mut partial = Chunked::new(b"=", 2);
    assert_eq!(codec::read_handshake(&mut partial).await.unwrap_err().kind(), "HANDSHAKE_FAILURE");
}

#[tokio::test]
async fn token_write_reports_bytes_taken() {
    let mut sink: Vec<u8> = Vec::new();
    let n = codec::write_token(&mut sink, b"?\n").await.unwrap();
    assert_eq!(n, 2);
    assert_eq!(sink, b"?\n");
}
