pub mod database;
pub mod file_index;
pub mod file_store;

pub use database::{Database, PoolConfig, SharedDatabase};
pub use file_index::{FileIndex, FileRecord};
pub use file_store::FileStore;
