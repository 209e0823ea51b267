//! Line grammars — one fixed extraction pattern per nginx log kind.
//!
//! Both grammars capture fields by name and report non-matching lines as
//! `None`; a non-match is a skippable event for the caller, never a panic.
//! Sentinel handling (the `-` placeholder) belongs to the normalizer, not
//! to the grammar layer.

pub mod access;
pub mod error;

pub use access::AccessFields;
pub use error::ErrorFields;
