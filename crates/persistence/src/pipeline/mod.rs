//! Document <-> file bytes.
//!
//! Save: codec encode -> checksum -> compress -> encrypt -> container header.
//! Load runs the same stages in reverse and verifies the checksum over the
//! decompressed bytes before the codec sees them.

mod bytes;
mod cipher;
mod codec;
mod compressor;
mod container;
mod integrity;

use thiserror::Error;

use crate::document::SaveDocument;

pub use cipher::{Cipher, CipherError, KeystreamCipher};
pub use codec::{BinaryCodec, Codec, CodecError, CodecKind, JsonCodec};
pub use compressor::{CompressionError, Compressor, Lz4Compressor};
pub use container::{ContainerError, ContainerHeader};
pub use integrity::{Checksum, ChecksumMismatch};

use codec::builtin_codec;
use container::{read_container, write_container};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Compression(#[from] CompressionError),
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Integrity(#[from] ChecksumMismatch),
    #[error("header names unknown codec id {id}")]
    UnknownCodec { id: u8 },
    #[error("header schema version {header} does not match payload schema version {payload}")]
    SchemaVersionMismatch { header: u32, payload: u32 },
    #[error("file is encrypted but no cipher is configured")]
    CipherUnavailable,
}

impl PipelineError {
    /// True when the bytes on disk are damaged, as opposed to a configuration or
    /// encode-side problem. Corruption is what triggers backup fallback.
    pub fn is_corruption(&self) -> bool {
        match self {
            Self::Codec(CodecError::Decode { .. })
            | Self::Compression(CompressionError::Decompress { .. })
            | Self::Cipher(CipherError::Decrypt { .. })
            | Self::Container(ContainerError::Malformed(_))
            | Self::Integrity(_)
            | Self::SchemaVersionMismatch { .. } => true,
            Self::Codec(CodecError::Encode { .. })
            | Self::Compression(CompressionError::Compress { .. })
            | Self::Cipher(CipherError::Encrypt { .. } | CipherError::EmptyKey)
            | Self::Container(
                ContainerError::UnsupportedContainerVersion { .. }
                | ContainerError::PayloadTooLarge { .. },
            )
            | Self::UnknownCodec { .. }
            | Self::CipherUnavailable => false,
        }
    }

    /// The file was written by a build with a newer container layout or codec.
    /// Such files are left alone: no backup fallback, no overwrite.
    pub fn is_newer_format(&self) -> bool {
        matches!(
            self,
            Self::Container(ContainerError::UnsupportedContainerVersion { .. })
                | Self::UnknownCodec { .. }
        )
    }
}

/// Stage toggles only affect writing. Reading always follows the header flags.
pub struct SavePipeline {
    codec: Box<dyn Codec>,
    compressor: Box<dyn Compressor>,
    cipher: Option<Box<dyn Cipher>>,
    compress_on_write: bool,
    encrypt_on_write: bool,
}

impl SavePipeline {
    pub fn new(codec: Box<dyn Codec>) -> Self {
        Self {
            codec,
            compressor: Box::new(Lz4Compressor),
            cipher: None,
            compress_on_write: false,
            encrypt_on_write: false,
        }
    }

    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress_on_write = enabled;
        self
    }

    pub fn with_compressor(mut self, compressor: Box<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    /// Installs a cipher and turns on encryption for writes.
    pub fn with_cipher(mut self, cipher: Box<dyn Cipher>) -> Self {
        self.cipher = Some(cipher);
        self.encrypt_on_write = true;
        self
    }

    pub fn with_encryption(mut self, enabled: bool) -> Self {
        self.encrypt_on_write = enabled;
        self
    }

    pub fn codec_name(&self) -> &'static str {
        self.codec.name()
    }

    pub fn compresses(&self) -> bool {
        self.compress_on_write
    }

    pub fn encrypts(&self) -> bool {
        self.encrypt_on_write
    }

    pub fn has_cipher(&self) -> bool {
        self.cipher.is_some()
    }

    pub fn encode(&self, document: &SaveDocument) -> Result<Vec<u8>, PipelineError> {
        let encoded = self.codec.encode(document)?;
        let checksum = Checksum::compute(&encoded);

        let compressed = if self.compress_on_write {
            self.compressor.compress(&encoded)?
        } else {
            encoded
        };
        let payload = if self.encrypt_on_write {
            let cipher = self.cipher.as_ref().ok_or(PipelineError::CipherUnavailable)?;
            cipher.encrypt(&compressed)?
        } else {
            compressed
        };

        let header = ContainerHeader {
            compressed: self.compress_on_write,
            encrypted: self.encrypt_on_write,
            codec_id: self.codec.id(),
            schema_version: document.schema_version,
            checksum,
        };
        Ok(write_container(&header, &payload)?)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<SaveDocument, PipelineError> {
        let (header, payload) = read_container(bytes)?;

        let decrypted = if header.encrypted {
            let cipher = self.cipher.as_ref().ok_or(PipelineError::CipherUnavailable)?;
            cipher.decrypt(payload)?
        } else {
            payload.to_vec()
        };
        let encoded = if header.compressed {
            self.compressor.decompress(&decrypted)?
        } else {
            decrypted
        };
        header.checksum.verify(&encoded)?;

        let codec = self.decoder_for(header.codec_id)?;
        let document = codec.decode(&encoded)?;
        if document.schema_version != header.schema_version {
            return Err(PipelineError::SchemaVersionMismatch {
                header: header.schema_version,
                payload: document.schema_version,
            });
        }
        Ok(document)
    }

    /// Parses only the unencrypted header.
    pub fn read_header(&self, bytes: &[u8]) -> Result<ContainerHeader, PipelineError> {
        Ok(read_container(bytes)?.0)
    }

    fn decoder_for(&self, id: u8) -> Result<&dyn Codec, PipelineError> {
        if self.codec.id() == id {
            return Ok(self.codec.as_ref());
        }
        builtin_codec(id).ok_or(PipelineError::UnknownCodec { id })
    }
}
