// Domain-driven module structure for the log shipper.

// Core infrastructure
pub mod config;
pub mod grammar;
pub mod record;

// Domain modules
pub mod runtime;
pub mod store;
pub mod tail;
