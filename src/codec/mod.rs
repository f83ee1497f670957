//! Compact, versioned share codes for progress records.

mod bitpack;
mod compact;
mod payload;
mod share;

pub use bitpack::{ItemState, PackedStates};
pub use compact::CompactCodec;
pub use payload::{ExportPayload, LegacyPayload, PackedPayload, LEGACY_VERSION, PACKED_VERSION};
pub use share::{share_code, share_url, strip_share_code, Location, SHARE_PARAM};
