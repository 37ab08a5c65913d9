use {
    async_trait::async_trait,
    telefwd_common::{ChatDescriptor, Error, MessageRef, Result},
};

/// Lifecycle of the single authenticated client handle per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// Interactive login in progress (phone, one-time code, optional
    /// two-factor password).
    AwaitingVerification,
    Authenticated,
}

/// Capability interface for interactive login, injected into the sign-in
/// flow. Implemented by the console prompter; a GUI front-end would
/// implement it with modal dialogs.
#[async_trait]
pub trait LoginPrompter: Send + Sync {
    async fn request_phone(&self) -> Result<String>;
    async fn request_code(&self) -> Result<String>;
    async fn request_password(&self) -> Result<String>;
}

/// A prompter that refuses every request.
///
/// Auto-login with a stored session uses this so that a session the provider
/// no longer accepts fails closed and the caller is routed back to
/// interactive login, instead of hanging on a prompt with no listener.
pub struct NonInteractive;

#[async_trait]
impl LoginPrompter for NonInteractive {
    async fn request_phone(&self) -> Result<String> {
        Err(Error::NotConnected)
    }

    async fn request_code(&self) -> Result<String> {
        Err(Error::NotConnected)
    }

    async fn request_password(&self) -> Result<String> {
        Err(Error::NotConnected)
    }
}

/// Everything the forwarding engine and front-ends need from the messaging
/// provider. One implementation talks MTProto ([`crate::GrammersGateway`]);
/// [`crate::testing::FakeGateway`] backs the tests.
///
/// All chat operations fail with [`Error::NotConnected`] before
/// authentication.
#[async_trait]
pub trait TelegramGateway: Send + Sync {
    /// Current lifecycle state.
    fn state(&self) -> ConnectionState;

    /// Ensure the session is authenticated, asking the prompter for
    /// phone/code/password if the provider requires interactive login.
    async fn sign_in(&self, prompter: &dyn LoginPrompter) -> Result<()>;

    /// Invalidate the remote session.
    async fn sign_out(&self) -> Result<()>;

    /// All chats visible to the account, as picker descriptors.
    async fn list_chats(&self) -> Result<Vec<ChatDescriptor>>;

    /// The source chat's full history in chronological (oldest-first) order.
    async fn history_oldest_first(&self, chat: i64) -> Result<Vec<MessageRef>>;

    /// Forward one message verbatim, preserving its content and caption.
    async fn forward_message(&self, source: i64, destination: i64, message: i32) -> Result<()>;

    /// Re-send the media of `message` to the destination under a new caption.
    async fn copy_media(
        &self,
        source: i64,
        destination: i64,
        message: i32,
        caption: &str,
    ) -> Result<()>;

    /// Wait for the next new message in `source`, the account's own
    /// messages included. Resolves in arrival order; cancellation is
    /// handled by the caller dropping the future.
    async fn next_message(&self, source: i64) -> Result<MessageRef>;

    /// Ids of every message in `chat` (order unspecified).
    async fn message_ids(&self, chat: i64) -> Result<Vec<i32>>;

    /// Delete the given messages for everyone. Callers batch ids to the
    /// provider's per-request limit. Returns how many were deleted.
    async fn delete_messages(&self, chat: i64, messages: &[i32]) -> Result<usize>;
}
