//! Local persistence of the progress record.

mod backend;
mod deferred;
mod file;
mod in_memory;
mod store;

pub use backend::StorageBackend;
pub use deferred::DeferredTask;
pub use file::FileBackend;
pub use in_memory::InMemoryBackend;
pub use store::{PersistStats, PersistenceStore};
