pub mod record_store;
pub mod table_store;

pub use record_store::RecordStoreClient;
pub use table_store::{MemoryTableStore, TableStore};
