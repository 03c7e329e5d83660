pub mod memory;
pub mod mysql;

pub use linko_core::repository::{NewUrlRecord, Repository, UrlRecord};
pub use linko_core::StorageError;
pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
