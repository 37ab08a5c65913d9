//! Session-backed Telegram client for telefwd.
//!
//! The provider library is isolated behind the [`gateway::TelegramGateway`]
//! trait; the rest of the workspace only sees domain types. Interactive
//! login goes through the [`gateway::LoginPrompter`] capability interface so
//! a console prompter and a GUI dialog adapter can drive the same flow.

pub mod gateway;
pub mod grammers;
pub mod session;
pub mod testing;

pub use {
    gateway::{ConnectionState, LoginPrompter, NonInteractive, TelegramGateway},
    grammers::GrammersGateway,
    session::Session,
};
