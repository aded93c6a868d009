pub mod clock;
pub mod database;
pub mod error;
pub mod live;
pub mod sqlite;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use database::Database;
pub use error::{StoreError, StoreResult};
pub use live::Subscription;
pub use sqlite::SqliteStore;
pub use store::ChatStore;
