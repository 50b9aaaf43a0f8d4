use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::document::{ComponentBlobs, ComponentId, SaveDocument, SaveMetadata};

use super::bytes::{put_blob, put_f32, put_f64, put_i128, put_string, put_u32, ByteReader};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("{codec} codec failed to encode document: {message}")]
    Encode { codec: &'static str, message: String },
    #[error("{codec} codec failed to decode document: {message}")]
    Decode { codec: &'static str, message: String },
}

/// Structured document <-> bytes. The id is written to the file header so the
/// matching codec is picked on load.
pub trait Codec {
    fn id(&self) -> u8;
    fn name(&self) -> &'static str;
    fn encode(&self, document: &SaveDocument) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<SaveDocument, CodecError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    Json,
    #[default]
    Binary,
}

impl CodecKind {
    pub fn codec(self) -> Box<dyn Codec> {
        match self {
            Self::Json => Box::new(JsonCodec),
            Self::Binary => Box::new(BinaryCodec),
        }
    }
}

pub(crate) const JSON_CODEC_ID: u8 = 1;
pub(crate) const BINARY_CODEC_ID: u8 = 2;

pub(crate) fn builtin_codec(id: u8) -> Option<&'static dyn Codec> {
    match id {
        JSON_CODEC_ID => Some(&JsonCodec),
        BINARY_CODEC_ID => Some(&BinaryCodec),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn id(&self) -> u8 {
        JSON_CODEC_ID
    }

    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, document: &SaveDocument) -> Result<Vec<u8>, CodecError> {
        // serde_json writes NaN and infinities as `null`, which would not decode.
        let metadata = &document.metadata;
        if !metadata.playtime_seconds.is_finite() || !metadata.completion_percent.is_finite() {
            return Err(CodecError::Encode {
                codec: self.name(),
                message: format!(
                    "non-finite metadata (playtime_seconds = {}, completion_percent = {})",
                    metadata.playtime_seconds, metadata.completion_percent
                ),
            });
        }
        serde_json::to_vec(document).map_err(|error| CodecError::Encode {
            codec: self.name(),
            message: error.to_string(),
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<SaveDocument, CodecError> {
        let mut deserializer = serde_json::Deserializer::from_slice(bytes);
        let document = serde_path_to_error::deserialize::<_, SaveDocument>(&mut deserializer)
            .map_err(|error| {
                let path = error.path().to_string();
                let source = error.into_inner();
                let message = if path.is_empty() || path == "." {
                    source.to_string()
                } else {
                    format!("at {path}: {source}")
                };
                CodecError::Decode {
                    codec: self.name(),
                    message,
                }
            })?;
        deserializer.end().map_err(|error| CodecError::Decode {
            codec: self.name(),
            message: error.to_string(),
        })?;
        Ok(document)
    }
}

/// Length-prefixed little-endian layout:
/// `schema_version u32 | metadata | blob_count u32 | (id string, blob u32-len bytes)*`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl BinaryCodec {
    fn encode_error(message: &str) -> CodecError {
        CodecError::Encode {
            codec: "binary",
            message: message.to_string(),
        }
    }

    fn decode_error(message: &str) -> CodecError {
        CodecError::Decode {
            codec: "binary",
            message: message.to_string(),
        }
    }
}

impl Codec for BinaryCodec {
    fn id(&self) -> u8 {
        BINARY_CODEC_ID
    }

    fn name(&self) -> &'static str {
        "binary"
    }

    fn encode(&self, document: &SaveDocument) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::<u8>::new();
        put_u32(&mut out, document.schema_version);

        let metadata = &document.metadata;
        put_string(&mut out, &metadata.display_name).map_err(Self::encode_error)?;
        put_i128(&mut out, metadata.created_at.unix_timestamp_nanos());
        put_i128(&mut out, metadata.modified_at.unix_timestamp_nanos());
        put_f64(&mut out, metadata.playtime_seconds);
        put_string(&mut out, &metadata.location).map_err(Self::encode_error)?;
        put_f32(&mut out, metadata.completion_percent);
        put_u32(&mut out, metadata.death_count);

        let count = u32::try_from(document.component_blobs.len())
            .map_err(|_| Self::encode_error("too many component blobs"))?;
        put_u32(&mut out, count);
        for (id, blob) in &document.component_blobs {
            put_string(&mut out, id.as_str()).map_err(Self::encode_error)?;
            put_blob(&mut out, blob).map_err(Self::encode_error)?;
        }
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<SaveDocument, CodecError> {
        let mut reader = ByteReader::new(bytes);
        let schema_version = reader.read_u32().map_err(Self::decode_error)?;

        let display_name = reader.read_string().map_err(Self::decode_error)?;
        let created_at = read_timestamp(&mut reader)?;
        let modified_at = read_timestamp(&mut reader)?;
        let playtime_seconds = reader.read_f64().map_err(Self::decode_error)?;
        let location = reader.read_string().map_err(Self::decode_error)?;
        let completion_percent = reader.read_f32().map_err(Self::decode_error)?;
        let death_count = reader.read_u32().map_err(Self::decode_error)?;

        let count = reader.read_u32().map_err(Self::decode_error)?;
        let mut component_blobs = ComponentBlobs::new();
        for _ in 0..count {
            let id = reader.read_string().map_err(Self::decode_error)?;
            let blob = reader.read_blob().map_err(Self::decode_error)?;
            if component_blobs.insert(ComponentId::new(id), blob).is_some() {
                return Err(Self::decode_error("duplicate component id"));
            }
        }
        if !reader.is_exhausted() {
            return Err(Self::decode_error("unexpected trailing bytes"));
        }

        Ok(SaveDocument {
            schema_version,
            metadata: SaveMetadata {
                display_name,
                created_at,
                modified_at,
                playtime_seconds,
                location,
                completion_percent,
                death_count,
            },
            component_blobs,
        })
    }
}

fn read_timestamp(reader: &mut ByteReader<'_>) -> Result<OffsetDateTime, CodecError> {
    let nanos = reader.read_i128().map_err(BinaryCodec::decode_error)?;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|_| BinaryCodec::decode_error("timestamp out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> SaveDocument {
        let created = OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("created");
        let mut metadata = SaveMetadata::new("Harbor Run", created);
        metadata.modified_at = created + time::Duration::minutes(42);
        metadata.playtime_seconds = 2520.5;
        metadata.location = "harbor.docks".to_string();
        metadata.completion_percent = 37.5;
        metadata.death_count = 4;

        let mut component_blobs = ComponentBlobs::new();
        component_blobs.insert(ComponentId::from("inventory"), vec![9, 8, 7]);
        component_blobs.insert(ComponentId::from("settings"), Vec::new());
        SaveDocument {
            schema_version: 3,
            metadata,
            component_blobs,
        }
    }

    #[test]
    fn both_codecs_preserve_every_field() {
        let document = sample_document();
        for kind in [CodecKind::Json, CodecKind::Binary] {
            let codec = kind.codec();
            let bytes = codec.encode(&document).expect("encode");
            assert_eq!(codec.decode(&bytes).expect("decode"), document, "{kind:?}");
        }
    }

    #[test]
    fn json_refuses_numbers_it_cannot_read_back() {
        let mut document = sample_document();
        document.metadata.completion_percent = f32::NAN;
        assert!(matches!(
            JsonCodec.encode(&document),
            Err(CodecError::Encode { codec: "json", .. })
        ));

        document.metadata.completion_percent = 10.0;
        document.metadata.playtime_seconds = f64::INFINITY;
        assert!(JsonCodec.encode(&document).is_err());
    }

    #[test]
    fn long_component_ids_fit_the_binary_layout() {
        let mut document = sample_document();
        let id = "c".repeat(70_000);
        document
            .component_blobs
            .insert(ComponentId::from(id.as_str()), vec![1]);
        let bytes = BinaryCodec.encode(&document).expect("encode");
        assert_eq!(BinaryCodec.decode(&bytes).expect("decode"), document);
    }

    #[test]
    fn encoding_is_deterministic_for_identical_state() {
        let document = sample_document();
        assert_eq!(
            BinaryCodec.encode(&document).expect("a"),
            BinaryCodec.encode(&document.clone()).expect("b")
        );
    }

    #[test]
    fn json_decode_error_names_field_path() {
        let raw = br#"{"schema_version":"one","metadata":{},"component_blobs":{}}"#;
        let error = JsonCodec.decode(raw).expect_err("error");
        let CodecError::Decode { message, .. } = error else {
            panic!("expected decode error");
        };
        assert!(message.contains("schema_version"), "{message}");
    }

    #[test]
    fn binary_decode_rejects_trailing_bytes() {
        let mut bytes = BinaryCodec.encode(&sample_document()).expect("encode");
        bytes.push(0);
        assert!(matches!(
            BinaryCodec.decode(&bytes),
            Err(CodecError::Decode { .. })
        ));
    }

    #[test]
    fn builtin_lookup_matches_codec_ids() {
        assert_eq!(builtin_codec(JsonCodec.id()).map(|c| c.name()), Some("json"));
        assert_eq!(builtin_codec(BinaryCodec.id()).map(|c| c.name()), Some("binary"));
        assert!(builtin_codec(0).is_none());
    }
}
