//! The codec layer: named encodings between application data and engine bytes.
//!
//! Encodings are pure and stateless. `Binary` and `Utf8` are passthrough
//! encodings that preserve the engine's native byte ordering, which range
//! scans rely on; `Json` serializes structured values and makes no ordering
//! promise. Mismatches between an encoding and the shape of a [`Datum`] are
//! rejected rather than coerced, so a malformed entry can never silently
//! corrupt an atomic batch.

use bytes::Bytes;

use crate::error::{Error, Result};

/// An application-level key or value before encoding / after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datum {
    /// Raw bytes.
    Bytes(Bytes),
    /// UTF-8 text.
    Text(String),
    /// A structured JSON value.
    Json(serde_json::Value),
}

impl Datum {
    /// Returns the text content, if this datum is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Datum::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the raw bytes, if this datum is bytes.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Datum::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the JSON value, if this datum is structured.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Datum::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for Datum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Datum::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            Datum::Text(s) => f.write_str(s),
            Datum::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Datum::Text(s.to_string())
    }
}

impl From<String> for Datum {
    fn from(s: String) -> Self {
        Datum::Text(s)
    }
}

impl From<Bytes> for Datum {
    fn from(b: Bytes) -> Self {
        Datum::Bytes(b)
    }
}

impl From<Vec<u8>> for Datum {
    fn from(b: Vec<u8>) -> Self {
        Datum::Bytes(Bytes::from(b))
    }
}

impl From<&[u8]> for Datum {
    fn from(b: &[u8]) -> Self {
        Datum::Bytes(Bytes::copy_from_slice(b))
    }
}

impl From<serde_json::Value> for Datum {
    fn from(v: serde_json::Value) -> Self {
        Datum::Json(v)
    }
}

/// A named encoding between [`Datum`] and engine bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Raw bytes, no transformation. Order-preserving.
    Binary,
    /// UTF-8 text, validated on both directions. Order-preserving.
    #[default]
    Utf8,
    /// JSON via serde_json.
    Json,
}

impl Encoding {
    /// Returns the encoding's name, as used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Binary => "binary",
            Encoding::Utf8 => "utf8",
            Encoding::Json => "json",
        }
    }

    /// Encodes a datum into engine bytes.
    ///
    /// Deterministic: the same datum always encodes to the same bytes.
    pub fn encode(&self, datum: &Datum) -> Result<Bytes> {
        match (self, datum) {
            (Encoding::Binary, Datum::Bytes(b)) => Ok(b.clone()),
            (Encoding::Binary, Datum::Text(s)) => Ok(Bytes::copy_from_slice(s.as_bytes())),
            (Encoding::Utf8, Datum::Text(s)) => Ok(Bytes::copy_from_slice(s.as_bytes())),
            (Encoding::Utf8, Datum::Bytes(b)) => {
                std::str::from_utf8(b).map_err(|e| {
                    Error::encoding(format!("bytes are not valid utf8: {}", e))
                })?;
                Ok(b.clone())
            }
            (Encoding::Json, Datum::Json(v)) => {
                let encoded = serde_json::to_vec(v)
                    .map_err(|e| Error::encoding(format!("failed to serialize json: {}", e)))?;
                Ok(Bytes::from(encoded))
            }
            (Encoding::Json, Datum::Text(s)) => {
                let encoded = serde_json::to_vec(s)
                    .map_err(|e| Error::encoding(format!("failed to serialize json: {}", e)))?;
                Ok(Bytes::from(encoded))
            }
            (encoding, datum) => Err(Error::encoding(format!(
                "{} encoding cannot represent this value: {}",
                encoding.name(),
                datum
            ))),
        }
    }

    /// Decodes engine bytes back into a datum.
    pub fn decode(&self, raw: Bytes) -> Result<Datum> {
        match self {
            Encoding::Binary => Ok(Datum::Bytes(raw)),
            Encoding::Utf8 => {
                let text = std::str::from_utf8(&raw)
                    .map_err(|e| Error::encoding(format!("stored value is not valid utf8: {}", e)))?
                    .to_string();
                Ok(Datum::Text(text))
            }
            Encoding::Json => {
                let value = serde_json::from_slice(&raw)
                    .map_err(|e| Error::encoding(format!("stored value is not valid json: {}", e)))?;
                Ok(Datum::Json(value))
            }
        }
    }
}
