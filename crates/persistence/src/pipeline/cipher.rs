use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("cipher key must not be empty")]
    EmptyKey,
    #[error("{cipher} failed to encrypt payload: {message}")]
    Encrypt {
        cipher: &'static str,
        message: String,
    },
    #[error("{cipher} failed to decrypt payload: {message}")]
    Decrypt {
        cipher: &'static str,
        message: String,
    },
}

/// Reversible byte transform applied last on save and first on load.
pub trait Cipher {
    fn name(&self) -> &'static str;
    fn encrypt(&self, bytes: &[u8]) -> Result<Vec<u8>, CipherError>;
    fn decrypt(&self, bytes: &[u8]) -> Result<Vec<u8>, CipherError>;
}

const BLOCK_LEN: usize = 32;

/// XOR with a SHA-256 counter-mode keystream derived from a caller key.
///
/// This keeps casual edits out of save files. It is not authenticated
/// encryption; tampering is caught by the checksum, not by this stage.
#[derive(Clone)]
pub struct KeystreamCipher {
    key: [u8; 32],
}

impl KeystreamCipher {
    pub fn new(key: &str) -> Result<Self, CipherError> {
        if key.is_empty() {
            return Err(CipherError::EmptyKey);
        }
        let mut hasher = Sha256::new();
        hasher.update(b"save-keystream-v1");
        hasher.update(key.as_bytes());
        Ok(Self {
            key: hasher.finalize().into(),
        })
    }

    fn apply(&self, bytes: &[u8]) -> Vec<u8> {
        let mut output = Vec::with_capacity(bytes.len());
        for (block_index, chunk) in bytes.chunks(BLOCK_LEN).enumerate() {
            let mut hasher = Sha256::new();
            hasher.update(self.key);
            hasher.update((block_index as u64).to_le_bytes());
            let pad: [u8; BLOCK_LEN] = hasher.finalize().into();
            output.extend(chunk.iter().zip(pad.iter()).map(|(byte, key)| byte ^ key));
        }
        output
    }
}

impl std::fmt::Debug for KeystreamCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeystreamCipher").finish_non_exhaustive()
    }
}

impl Cipher for KeystreamCipher {
    fn name(&self) -> &'static str {
        "keystream"
    }

    fn encrypt(&self, bytes: &[u8]) -> Result<Vec<u8>, CipherError> {
        Ok(self.apply(bytes))
    }

    fn decrypt(&self, bytes: &[u8]) -> Result<Vec<u8>, CipherError> {
        Ok(self.apply(bytes))
    }
}
