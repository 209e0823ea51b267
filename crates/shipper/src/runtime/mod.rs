//! Runtime — process boot, the watch loop, and shutdown.

pub mod boot;
pub mod run;
pub mod stop;
