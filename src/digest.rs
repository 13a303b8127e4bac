//! Content digests.
//!
//! A [`Digest`] is the 20-byte SHA-1 hash of a media file's bytes. Two files
//! with identical content always produce the identical digest, which is what
//! lets the index and the wire protocol address media purely by content.
//! Digests exist in two representations: raw 20 bytes on the wire, and a
//! lowercase 40-character hex string used as the served filename.

use sha1::{Digest as _, Sha1};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// 20-byte SHA-1 content hash of one media file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; Digest::LEN]);

/// Error parsing a hex string into a [`Digest`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseDigestError {
    #[error("digest hex must be {expected} characters, got {0}", expected = 2 * Digest::LEN)]
    BadLength(usize),

    #[error("digest contains non-hex characters")]
    BadHex,
}

impl Digest {
    /// Raw digest length in bytes.
    pub const LEN: usize = 20;

    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Hash a byte stream to completion.
    pub fn from_reader<R: Read>(mut reader: R) -> std::io::Result<Self> {
        let mut hasher = Sha1::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self(hasher.finalize().into()))
    }

    /// Hash a file's contents.
    pub fn of_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Raw wire form.
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Lowercase 40-character hex form, used as the webroot filename.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse the hex form back into a digest.
    pub fn from_hex(s: &str) -> Result<Self, ParseDigestError> {
        if s.len() != 2 * Self::LEN {
            return Err(ParseDigestError::BadLength(s.len()));
        }
        let mut bytes = [0u8; Self::LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| ParseDigestError::BadHex)?;
        Ok(Self(bytes))
    }
}

impl FromStr for Digest {
    type Err = ParseDigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn known_sha1_vector() {
        let d = Digest::from_reader("abc".as_bytes()).unwrap();
        assert_eq!(d.to_hex(), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn empty_stream() {
        let d = Digest::from_reader(&[][..]).unwrap();
        assert_eq!(d.to_hex(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn hex_round_trip() {
        let raw = [0xABu8; Digest::LEN];
        let d = Digest::from_bytes(raw);
        let parsed = Digest::from_hex(&d.to_hex()).unwrap();
        assert_eq!(d, parsed);
        assert_eq!(parsed.as_bytes(), &raw);
    }

    #[test]
    fn from_str_matches_from_hex() {
        let s = "a9993e364706816aba3e25717850c26c9cd0d89d";
        let d: Digest = s.parse().unwrap();
        assert_eq!(d.to_hex(), s);
    }

    #[test]
    fn rejects_bad_hex() {
        assert_matches!(Digest::from_hex("abc"), Err(ParseDigestError::BadLength(3)));
        assert_matches!(
            Digest::from_hex(&"zz".repeat(Digest::LEN)),
            Err(ParseDigestError::BadHex)
        );
    }

    #[test]
    fn identical_content_identical_digest() {
        let a = Digest::from_reader(&b"same bytes"[..]).unwrap();
        let b = Digest::from_reader(&b"same bytes"[..]).unwrap();
        assert_eq!(a, b);
    }
}
