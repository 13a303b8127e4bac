//! Media presence protocol codec.
//!
//! Request and response share one frame: a 4-byte ASCII magic `MTHS`, a
//! 2-byte version `{0x00, 0x01}`, then zero or more raw 20-byte SHA-1
//! digests. There is no digest count or length prefix; the payload is
//! delimited by end-of-body, and a trailing partial chunk is tolerated by
//! design (existing clients rely on this, so it must not be "fixed" into an
//! error).

use crate::digest::Digest;
use bytes::{BufMut, Bytes, BytesMut};

/// Frame magic, shared by request and response.
pub const MAGIC: [u8; 4] = *b"MTHS";

/// Protocol version 0.1, the only version this engine speaks.
pub const VERSION: [u8; 2] = [0x00, 0x01];

/// Frame header length: magic plus version.
pub const HEADER_LEN: usize = MAGIC.len() + VERSION.len();

/// A request frame that cannot be decoded. Never retried by the server; the
/// client has to be corrected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid magic in request header")]
    BadMagic,

    #[error("unsupported protocol version")]
    UnsupportedVersion,
}

/// Decode a fully-buffered request body into the digest list it carries.
///
/// Digests come back in wire order, duplicates preserved. A final partial
/// chunk of fewer than 20 bytes is discarded, not an error. A header-only
/// body yields an empty list.
pub fn decode_request(body: &[u8]) -> Result<Vec<Digest>, DecodeError> {
    if body.len() < MAGIC.len() || body[..MAGIC.len()] != MAGIC {
        return Err(DecodeError::BadMagic);
    }
    if body.len() < HEADER_LEN || body[MAGIC.len()..HEADER_LEN] != VERSION {
        return Err(DecodeError::UnsupportedVersion);
    }

    let payload = &body[HEADER_LEN..];
    let digests = payload
        .chunks_exact(Digest::LEN)
        .map(|chunk| {
            let mut raw = [0u8; Digest::LEN];
            raw.copy_from_slice(chunk);
            Digest::from_bytes(raw)
        })
        .collect();

    Ok(digests)
}

/// Encode a response frame carrying the given digests in the order given.
///
/// The returned buffer is always exactly `6 + 20 * n` bytes; the transport
/// declares that as Content-Length and the two must agree.
pub fn encode_response(digests: &[Digest]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + Digest::LEN * digests.len());
    buf.put_slice(&MAGIC);
    buf.put_slice(&VERSION);
    for digest in digests {
        buf.put_slice(digest.as_bytes());
    }
    buf.freeze()
}
