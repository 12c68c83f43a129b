// Service exports
pub mod memory;
pub mod postgres;
pub mod repository;

pub use memory::InMemoryStore;
pub use postgres::PostgresClient;
pub use repository::{Change, ChangeSet, CommitReport, DatingRepository, PendingMessage, RepositoryError};
