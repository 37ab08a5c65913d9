//! Shared error and domain types for telefwd.

pub mod error;
pub mod types;

pub use {
    error::{Error, Result},
    types::{ChatDescriptor, ChatKind, MessageRef},
};
