//! Digests and their fixed-width binary encoding
//!
//! A digest is the hex-encoded 128-bit content hash of a rendered image.
//! On disk a digest occupies 16 raw bytes instead of 32 hex characters;
//! the missing digest is stored as a single zero byte.
//!
//! Decoding never fails: corrupt or legacy cells degrade to
//! [`Digest::missing`] so that one bad cell cannot fail a tile read.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of raw bytes in a valid digest
pub const DIGEST_BYTES: usize = 16;

/// Stored representation of the missing digest
pub const MISSING_DIGEST_BYTES: [u8; 1] = [0];

/// Content hash identifying the pixels of a rendered image
///
/// The empty string is the missing sentinel: no image was produced for that
/// commit on that trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Create a digest from its hex representation
    pub fn new(hex: impl Into<String>) -> Self {
        Digest(hex.into())
    }

    /// The missing digest sentinel
    pub const fn missing() -> Self {
        Digest(String::new())
    }

    /// True if this is the missing sentinel
    #[inline]
    pub fn is_missing(&self) -> bool {
        self.0.is_empty()
    }

    /// True if this is a 32 character lowercase hex string
    pub fn is_valid(&self) -> bool {
        self.0.len() == DIGEST_BYTES * 2
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    /// Hex representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Digest {
    fn from(s: &str) -> Self {
        Digest(s.to_string())
    }
}

impl From<String> for Digest {
    fn from(s: String) -> Self {
        Digest(s)
    }
}

/// Encode a digest for storage
///
/// Returns [`MISSING_DIGEST_BYTES`] for the missing digest, and also for
/// anything that is not [`valid`](Digest::is_valid), so every stored digest
/// reads back unchanged.
pub fn digest_to_bytes(digest: &Digest) -> Vec<u8> {
    if digest.is_missing() {
        return MISSING_DIGEST_BYTES.to_vec();
    }
    if !digest.is_valid() {
        tracing::warn!(digest = %digest, "digest is not 32 lowercase hex characters, storing as missing");
        return MISSING_DIGEST_BYTES.to_vec();
    }
    match hex::decode(digest.as_str()) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(digest = %digest, error = %e, "digest is not valid hex, storing as missing");
            MISSING_DIGEST_BYTES.to_vec()
        }
    }
}

/// Decode a stored digest
///
/// Any input that is not exactly [`DIGEST_BYTES`] long maps to the missing
/// digest.
pub fn digest_from_bytes(bytes: &[u8]) -> Digest {
    if bytes.len() != DIGEST_BYTES {
        return Digest::missing();
    }
    Digest(hex::encode(bytes))
}
