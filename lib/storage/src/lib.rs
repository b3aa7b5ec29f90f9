pub mod store;
pub mod memory;
pub mod lmdb_storage;
pub mod checkpoint;

pub use store::RecordStore;
pub use memory::MemoryStore;
pub use lmdb_storage::LmdbStore;
pub use checkpoint::{Checkpoint, CheckpointFile};
