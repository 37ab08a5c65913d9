//! Persisted configuration for telefwd.
//!
//! A single flat JSON record (`telefwd.json`) holding the caption prefix,
//! the running counter, the selected source/destination chats, and the API
//! credentials. Loaded at startup, rewritten after every mutation that must
//! survive a restart.

pub mod paths;
pub mod schema;
pub mod store;

pub use {
    paths::{config_path, session_path, set_config_dir, set_data_dir},
    schema::{ForwarderConfig, env_credentials},
    store::ConfigStore,
};
