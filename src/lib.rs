mod catalog;
mod clock;
mod codec;
mod config;
mod error;
mod record;
mod storage;

pub use catalog::{Catalog, CatalogProvider, ItemId};
pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{
    share_code, share_url, strip_share_code, CompactCodec, ExportPayload, ItemState,
    LegacyPayload, Location, PackedPayload, PackedStates, LEGACY_VERSION, PACKED_VERSION,
    SHARE_PARAM,
};
pub use config::{
    StoreConfig, DEFAULT_QUOTA_HISTORY_LIMIT, DEFAULT_SAVE_DEBOUNCE, DEFAULT_STORAGE_KEY,
};
pub use error::{DecodeError, EncodeError, StorageError};
pub use record::{
    get_stats, parse_stored, upcast, Action, HistoryEntry, LoadedRecord, ProgressRecord,
    SchemaError, SchemaUpcaster, Stats, CURRENT_SCHEMA_VERSION, DEFAULT_HISTORY_LIMIT, UPCASTERS,
};
pub use storage::{
    DeferredTask, FileBackend, InMemoryBackend, PersistStats, PersistenceStore, StorageBackend,
};

// Re-export the url type used by the share link helpers
pub use url::Url;
