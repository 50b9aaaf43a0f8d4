use std::fmt;

use sha2::{Digest, Sha256};
use thiserror::Error;

pub const CHECKSUM_LEN: usize = 32;

/// SHA-256 over the codec-encoded payload, before compression and encryption.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Checksum([u8; CHECKSUM_LEN]);

impl Checksum {
    pub fn compute(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }

    pub fn from_bytes(bytes: [u8; CHECKSUM_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CHECKSUM_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        to_hex_lower(&self.0)
    }

    pub fn verify(&self, bytes: &[u8]) -> Result<(), ChecksumMismatch> {
        let actual = Self::compute(bytes);
        if actual == *self {
            Ok(())
        } else {
            Err(ChecksumMismatch {
                expected: self.to_hex(),
                actual: actual.to_hex(),
            })
        }
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("checksum mismatch: header has {expected}, payload hashes to {actual}")]
pub struct ChecksumMismatch {
    pub expected: String,
    pub actual: String,
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
