//! Forwarding engine: a one-time backfill over the source chat's history
//! followed by a live phase that mirrors new messages, plus the destructive
//! chat-clearing utility.

pub mod clear;
pub mod engine;
pub mod handle;

pub use {
    clear::{DELETE_BATCH, clear_chat},
    engine::{ForwardEngine, ForwardEvent, ForwardMode, ForwardOptions, ForwardReport},
    handle::ForwardHandle,
};
