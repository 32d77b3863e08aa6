pub mod connection;
pub mod error;
pub mod repositories;
pub mod schema;
pub mod timestamp;

pub use connection::{Database, DatabaseTarget, DbConnection, DbPool};
pub use error::{StoreError, StoreResult};
