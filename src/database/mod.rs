pub mod db;
pub mod error;
pub mod memory;

pub use db::connect_to_mongo;
pub use error::StoreError;
pub use memory::MemoryStore;
