//! Tailing — per-file read cursors and the change-event dispatcher.

pub mod cursor;
pub mod dispatch;

pub use cursor::TailCursor;
pub use dispatch::{classify, Dispatcher, LogKind};
