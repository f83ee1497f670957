mod progress;
mod schema;

pub use progress::{get_stats, Action, HistoryEntry, ProgressRecord, Stats, DEFAULT_HISTORY_LIMIT};
pub use schema::{
    parse_stored, upcast, LoadedRecord, SchemaError, SchemaUpcaster, CURRENT_SCHEMA_VERSION,
    UPCASTERS,
};
