//! Configuration module
//!
//! Settings for the query executor, the clipboard watcher and general
//! lookup behavior, stored as TOML in the user's config directory.

pub mod config;

pub use config::{BehaviorConfig, ClipboardConfig, Config, ExecutorConfig};
