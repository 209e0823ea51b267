//! Persistence — session trait, MySQL implementation, reconnecting gateway.

pub mod fake;
pub mod gateway;
pub mod mysql;
pub mod session;

pub use gateway::Gateway;
pub use session::{LogSession, SessionFactory, StoreError};
