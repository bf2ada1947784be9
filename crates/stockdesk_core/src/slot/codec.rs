//! Text codecs converting slot values to and from their stored form.
//!
//! # Invariants
//! - `decode(encode(v))` yields a value equal to `v` for every codec here.
//! - Decode failures are plain values; the caller decides the fallback.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

/// Encode/decode failure for one slot value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    Encode(String),
    Decode(String),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(message) => write!(f, "failed to encode slot value: {message}"),
            Self::Decode(message) => write!(f, "failed to decode stored slot text: {message}"),
        }
    }
}

impl Error for CodecError {}

/// Encode/decode pair for one slot value type.
pub trait Codec<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<String, CodecError>;
    fn decode(&self, text: &str) -> Result<T, CodecError>;
}

/// JSON text form for structured slots.
pub struct JsonCodec<T> {
    _value: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _value: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Codec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<String, CodecError> {
        serde_json::to_string(value).map_err(|err| CodecError::Encode(err.to_string()))
    }

    fn decode(&self, text: &str) -> Result<T, CodecError> {
        serde_json::from_str(text).map_err(|err| CodecError::Decode(err.to_string()))
    }
}

/// Raw text form for scalar string slots. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Codec<String> for TextCodec {
    fn encode(&self, value: &String) -> Result<String, CodecError> {
        Ok(value.clone())
    }

    fn decode(&self, text: &str) -> Result<String, CodecError> {
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{Codec, CodecError, JsonCodec, TextCodec};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Pick {
        id: i64,
        label: String,
    }

    #[test]
    fn json_codec_decodes_stored_object() {
        let codec = JsonCodec::<Pick>::new();
        let pick = codec
            .decode(r#"{"id":3,"label":"North"}"#)
            .expect("valid json should decode");
        assert_eq!(
            pick,
            Pick {
                id: 3,
                label: "North".to_string()
            }
        );
    }

    #[test]
    fn json_codec_reports_malformed_text_as_decode_error() {
        let codec = JsonCodec::<Pick>::new();
        let err = codec.decode("not-json").expect_err("garbage must not decode");
        assert!(matches!(err, CodecError::Decode(_)));

        let err = codec
            .decode(r#"{"id":"three"}"#)
            .expect_err("wrong shape must not decode");
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn text_codec_keeps_text_verbatim() {
        let codec = TextCodec;
        let text = " keep {spaces} ".to_string();
        assert_eq!(codec.encode(&text).expect("encode"), text);
        assert_eq!(codec.decode(&text).expect("decode"), text);
    }
}
