//! Wire payloads carried inside share codes.
//!
//! Field names are single letters to keep codes short:
//! v1 `{v, s, n, i, t}` and v2 `{v, i, d}`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::catalog::ItemId;
use crate::error::DecodeError;

pub const LEGACY_VERSION: u64 = 1;
pub const PACKED_VERSION: u64 = 2;

/// v1: explicit id lists, plain base64 of the JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyPayload {
    pub v: u64,
    pub s: Vec<ItemId>,
    pub n: Vec<ItemId>,
    #[serde(default, deserialize_with = "index_or_zero")]
    pub i: usize,
    /// Creation time, unix milliseconds.
    #[serde(default)]
    pub t: i64,
}

/// v2: base64 of the packed 2-bit states, compressed as a whole.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedPayload {
    pub v: u64,
    #[serde(default, deserialize_with = "index_or_zero")]
    pub i: usize,
    pub d: String,
}

// Older encoders wrote `null` when the index was not a number.
fn index_or_zero<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<usize>::deserialize(deserializer)?.unwrap_or(0))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportPayload {
    Legacy(LegacyPayload),
    Packed(PackedPayload),
}

impl ExportPayload {
    /// Parse a payload, dispatching on its `v` field and validating the
    /// fields that version requires.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        if !value.is_object() {
            return Err(DecodeError::Malformed("payload is not an object".into()));
        }

        let version = value.get("v").and_then(Value::as_u64);
        match version {
            Some(PACKED_VERSION) => {
                let payload: PackedPayload =
                    serde_json::from_value(value).map_err(|_| DecodeError::InvalidShape("d"))?;
                if payload.d.is_empty() {
                    return Err(DecodeError::InvalidShape("d"));
                }
                Ok(ExportPayload::Packed(payload))
            }
            Some(LEGACY_VERSION) => {
                for field in ["s", "n"] {
                    if !value.get(field).is_some_and(Value::is_array) {
                        return Err(DecodeError::InvalidShape(field));
                    }
                }
                let payload: LegacyPayload = serde_json::from_value(value)
                    .map_err(|_| DecodeError::InvalidShape("s/n"))?;
                Ok(ExportPayload::Legacy(payload))
            }
            other => Err(DecodeError::UnsupportedVersion(other)),
        }
    }
}
