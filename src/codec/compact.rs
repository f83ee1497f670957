use std::collections::HashSet;
use std::sync::Arc;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::bitpack::{ItemState, PackedStates};
use super::payload::{ExportPayload, LegacyPayload, PackedPayload, LEGACY_VERSION, PACKED_VERSION};
use crate::catalog::{CatalogProvider, ItemId};
use crate::clock::{Clock, SystemClock};
use crate::error::{DecodeError, EncodeError};
use crate::record::ProgressRecord;

/// Longest share code accepted for decoding, in bytes.
const MAX_CODE_BYTES: usize = 64 * 1024;
/// Upper bound on a decompressed payload, in UTF-16 units.
const MAX_PAYLOAD_UNITS: usize = 1 << 20;

/// Accepts codes with or without trailing `=` padding, as pasted codes often lose it.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Compression pass turning the serialized v2 payload into the final code.
type Compress = fn(&str) -> Result<String, EncodeError>;

fn lz_compress(json: &str) -> Result<String, EncodeError> {
    let code = lz_str::compress_to_base64(json);
    if code.is_empty() {
        return Err(EncodeError::Compression("empty compressed output".into()));
    }
    Ok(code)
}

/// Converts progress records to short share codes and back.
///
/// Codes reference items by catalog position, so the same catalog order must
/// be used on both ends. Decoding tolerates catalogs that grew or shrank in
/// between: positions past either end read as unclassified.
pub struct CompactCodec<C> {
    catalog: C,
    clock: Arc<dyn Clock>,
    compress: Compress,
}

impl<C: CatalogProvider> CompactCodec<C> {
    pub fn new(catalog: C) -> Self {
        Self::with_clock(catalog, Arc::new(SystemClock))
    }

    pub fn with_clock(catalog: C, clock: Arc<dyn Clock>) -> Self {
        CompactCodec {
            catalog,
            clock,
            compress: lz_compress,
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Encode `record` as a packed v2 code, falling back to a legacy v1 code
    /// if packing fails. Always returns a usable code. History is not exported.
    pub fn encode(&self, record: &ProgressRecord) -> String {
        match self.encode_packed(record) {
            Ok(code) => code,
            Err(err) => {
                warn!(error = %err, "packed export failed, falling back to legacy format");
                self.encode_legacy(record)
            }
        }
    }

    /// v2: 2-bit state per catalog position, base64, wrapped in
    /// `{v:2, i, d}` and passed through LZ-String `compressToBase64`.
    pub fn encode_packed(&self, record: &ProgressRecord) -> Result<String, EncodeError> {
        let seen: HashSet<&ItemId> = record.seen.iter().collect();
        let not_seen: HashSet<&ItemId> = record.not_seen.iter().collect();

        let positions = self.catalog.len();
        let mut packed = PackedStates::with_positions(positions);
        for position in 0..positions {
            let Some(id) = self.catalog.identifier_at(position) else {
                continue;
            };
            let state = if seen.contains(id) {
                ItemState::Seen
            } else if not_seen.contains(id) {
                ItemState::NotSeen
            } else {
                continue;
            };
            packed.set(position, state);
        }

        let payload = PackedPayload {
            v: PACKED_VERSION,
            i: record.current_index,
            d: STANDARD.encode(packed.as_bytes()),
        };
        let json = serde_json::to_string(&payload)
            .map_err(|e| EncodeError::Serialization(e.to_string()))?;
        (self.compress)(&json)
    }

    /// v1: `{v:1, s, n, i, t}` as plain base64 of the JSON.
    pub fn encode_legacy(&self, record: &ProgressRecord) -> String {
        let payload = json!({
            "v": LEGACY_VERSION,
            "s": &record.seen,
            "n": &record.not_seen,
            "i": record.current_index,
            "t": self.clock.now().timestamp_millis(),
        });
        STANDARD.encode(payload.to_string())
    }

    /// Decode a share code. Returns `None` for anything that is not a valid
    /// v2 or v1 code; no partial state is ever returned.
    pub fn decode(&self, code: &str) -> Option<ProgressRecord> {
        match self.try_decode(code) {
            Ok(record) => Some(record),
            Err(err) => {
                debug!(error = %err, "rejected share code");
                None
            }
        }
    }

    /// Like [`decode`](Self::decode), with the reason for rejection.
    pub fn try_decode(&self, code: &str) -> Result<ProgressRecord, DecodeError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(DecodeError::Empty);
        }
        if code.len() > MAX_CODE_BYTES {
            return Err(DecodeError::Malformed(format!(
                "code is {} bytes, limit is {}",
                code.len(),
                MAX_CODE_BYTES
            )));
        }

        let value = read_payload(code)?;
        match ExportPayload::from_value(value)? {
            ExportPayload::Packed(payload) => self.unpack(payload),
            ExportPayload::Legacy(payload) => Ok(self.accept_legacy(payload)),
        }
    }

    fn unpack(&self, payload: PackedPayload) -> Result<ProgressRecord, DecodeError> {
        let bytes = LENIENT
            .decode(payload.d.as_bytes())
            .map_err(|e| DecodeError::PackedData(e.to_string()))?;
        let packed = PackedStates::from_bytes(bytes);

        let mut record = ProgressRecord {
            current_index: payload.i,
            ..ProgressRecord::default()
        };
        for position in 0..self.catalog.len() {
            let Some(id) = self.catalog.identifier_at(position) else {
                continue;
            };
            match packed.get(position) {
                ItemState::Seen => record.seen.push(id.clone()),
                ItemState::NotSeen => record.not_seen.push(id.clone()),
                ItemState::Unclassified => {}
            }
        }

        if packed.capacity() < self.catalog.len() {
            debug!(
                packed = packed.capacity(),
                catalog = self.catalog.len(),
                "share code predates catalog growth"
            );
        }
        Ok(record)
    }

    /// Legacy payloads carry no integrity check; ids unknown to the catalog
    /// are dropped and overlaps resolved.
    fn accept_legacy(&self, payload: LegacyPayload) -> ProgressRecord {
        let known: HashSet<&ItemId> = (0..self.catalog.len())
            .filter_map(|position| self.catalog.identifier_at(position))
            .collect();

        let offered = payload.s.len() + payload.n.len();
        let mut record = ProgressRecord {
            current_index: payload.i,
            seen: payload.s.into_iter().filter(|id| known.contains(id)).collect(),
            not_seen: payload.n.into_iter().filter(|id| known.contains(id)).collect(),
            ..ProgressRecord::default()
        };
        record.normalize();

        let dropped = offered - record.classified();
        if dropped > 0 {
            debug!(dropped, "ignored unknown or duplicate ids in legacy share code");
        }
        record
    }
}

/// Undo the outer layer of a code: LZ-String first, then plain base64.
fn read_payload(code: &str) -> Result<Value, DecodeError> {
    let inflated = decompress(code).and_then(|json| serde_json::from_str::<Value>(&json).ok());
    if let Some(value) = inflated {
        return Ok(value);
    }

    let bytes = LENIENT
        .decode(code.as_bytes())
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| DecodeError::Malformed(e.to_string()))
}

fn decompress(code: &str) -> Option<String> {
    let units = lz_str::decompress_from_base64(code)?;
    if units.is_empty() || units.len() > MAX_PAYLOAD_UNITS {
        return None;
    }
    String::from_utf16(&units).ok()
}
