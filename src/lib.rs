pub mod app_state_container;
pub mod clipboard;
pub mod collections_cache;
pub mod config;
pub mod connection;
pub mod executor;
pub mod input;
pub mod lookup_coordinator;
pub mod services;
pub mod state;
pub mod utils;
