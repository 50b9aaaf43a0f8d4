use thiserror::Error;

use super::bytes::{put_u16, put_u32, put_u8, ByteReader};
use super::integrity::{Checksum, CHECKSUM_LEN};

const MAGIC: &[u8; 4] = b"PGSV";
pub(crate) const CONTAINER_VERSION: u16 = 1;

const FLAG_COMPRESSED: u8 = 1 << 0;
const FLAG_ENCRYPTED: u8 = 1 << 1;
const KNOWN_FLAGS: u8 = FLAG_COMPRESSED | FLAG_ENCRYPTED;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    #[error("save container is malformed: {0}")]
    Malformed(&'static str),
    #[error("save container version {found} is not supported (expected {expected})")]
    UnsupportedContainerVersion { found: u16, expected: u16 },
    #[error("payload of {len} bytes does not fit the container length field")]
    PayloadTooLarge { len: usize },
}

/// Unencrypted header in front of every slot file.
///
/// `magic | container_version u16 | flags u8 | codec_id u8 | schema_version u32 |
/// checksum [32] | payload_len u32 | payload`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub compressed: bool,
    pub encrypted: bool,
    pub codec_id: u8,
    pub schema_version: u32,
    pub checksum: Checksum,
}

impl ContainerHeader {
    fn flags(&self) -> u8 {
        let mut flags = 0u8;
        if self.compressed {
            flags |= FLAG_COMPRESSED;
        }
        if self.encrypted {
            flags |= FLAG_ENCRYPTED;
        }
        flags
    }
}

pub(crate) fn write_container(
    header: &ContainerHeader,
    payload: &[u8],
) -> Result<Vec<u8>, ContainerError> {
    let payload_len = u32::try_from(payload.len())
        .map_err(|_| ContainerError::PayloadTooLarge { len: payload.len() })?;

    let mut bytes = Vec::<u8>::with_capacity(payload.len() + 48);
    bytes.extend_from_slice(MAGIC);
    put_u16(&mut bytes, CONTAINER_VERSION);
    put_u8(&mut bytes, header.flags());
    put_u8(&mut bytes, header.codec_id);
    put_u32(&mut bytes, header.schema_version);
    bytes.extend_from_slice(header.checksum.as_bytes());
    put_u32(&mut bytes, payload_len);
    bytes.extend_from_slice(payload);
    Ok(bytes)
}

pub(crate) fn read_container(bytes: &[u8]) -> Result<(ContainerHeader, &[u8]), ContainerError> {
    let mut reader = ByteReader::new(bytes);

    let magic = reader.read_exact(MAGIC.len()).map_err(ContainerError::Malformed)?;
    if magic != MAGIC {
        return Err(ContainerError::Malformed("invalid magic"));
    }
    let version = reader.read_u16().map_err(ContainerError::Malformed)?;
    if version == 0 {
        return Err(ContainerError::Malformed("container version 0"));
    }
    if version != CONTAINER_VERSION {
        return Err(ContainerError::UnsupportedContainerVersion {
            found: version,
            expected: CONTAINER_VERSION,
        });
    }
    let flags = reader.read_u8().map_err(ContainerError::Malformed)?;
    if flags & !KNOWN_FLAGS != 0 {
        return Err(ContainerError::Malformed("unknown header flags"));
    }
    let codec_id = reader.read_u8().map_err(ContainerError::Malformed)?;
    let schema_version = reader.read_u32().map_err(ContainerError::Malformed)?;
    let checksum = reader
        .read_array::<CHECKSUM_LEN>()
        .map_err(ContainerError::Malformed)?;
    let payload_len = reader.read_u32().map_err(ContainerError::Malformed)? as usize;
    let payload = reader
        .read_exact(payload_len)
        .map_err(ContainerError::Malformed)?;
    if !reader.is_exhausted() {
        return Err(ContainerError::Malformed("unexpected trailing bytes"));
    }

    Ok((
        ContainerHeader {
            compressed: flags & FLAG_COMPRESSED != 0,
            encrypted: flags & FLAG_ENCRYPTED != 0,
            codec_id,
            schema_version,
            checksum: Checksum::from_bytes(checksum),
        },
        payload,
    ))
}
