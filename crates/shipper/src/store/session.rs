//! Session trait — the storage operations the gateway needs.
//!
//! The gateway owns exactly one [`LogSession`] at a time and replaces it
//! wholesale through the [`SessionFactory`] on reconnect. Keeping the
//! trait this narrow lets tests drive the gateway with the in-memory
//! [`crate::store::fake::FakeStore`] instead of a running MySQL server.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::record::{AccessLogRecord, ErrorLogRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("database connection failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

/// One live database session. Each insert is its own transaction:
/// begin, execute, commit — rollback before the error surfaces.
pub trait LogSession: Send {
    fn insert_access<'a>(
        &'a mut self,
        record: &'a AccessLogRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;

    fn insert_error<'a>(
        &'a mut self,
        record: &'a ErrorLogRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;

    /// Release the session. Consumes it: a closed session cannot be
    /// half-reused.
    fn close(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send>>;
}

/// Builds fresh sessions — once at boot and again on every reconnect.
pub trait SessionFactory: Send + Sync {
    fn connect(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn LogSession>, StoreError>> + Send + '_>>;
}
