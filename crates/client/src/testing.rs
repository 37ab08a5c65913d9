//! In-memory gateway for tests and offline development.
//!
//! Records every provider call so tests can assert on exactly what the
//! engine did, and exposes a sender for injecting live messages.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, RwLock},
};

use {
    async_trait::async_trait,
    telefwd_common::{ChatDescriptor, Error, MessageRef, Result},
    tokio::sync::{Mutex as AsyncMutex, mpsc},
};

use crate::gateway::{ConnectionState, LoginPrompter, TelegramGateway};

/// One recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    Forwarded {
        source: i64,
        destination: i64,
        message: i32,
    },
    MediaCopied {
        destination: i64,
        message: i32,
        caption: String,
    },
    DeletedBatch {
        chat: i64,
        batch: usize,
    },
    SignedOut,
}

pub struct FakeGateway {
    state: RwLock<ConnectionState>,
    /// When true, `sign_in` needs the prompter (simulates a stale session).
    needs_interactive: bool,
    chats: Mutex<Vec<ChatDescriptor>>,
    history: Mutex<HashMap<i64, Vec<MessageRef>>>,
    fail_forward: Mutex<HashSet<i32>>,
    /// `Some(n)`: the first `n` deletion batches succeed, then every call fails.
    fail_delete_after: Mutex<Option<usize>>,
    calls: Mutex<Vec<FakeCall>>,
    live_tx: mpsc::UnboundedSender<MessageRef>,
    live_rx: AsyncMutex<mpsc::UnboundedReceiver<MessageRef>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGateway {
    /// An unauthenticated gateway that requires interactive login.
    #[must_use]
    pub fn new() -> Self {
        let (live_tx, live_rx) = mpsc::unbounded_channel();
        Self {
            state: RwLock::new(ConnectionState::Disconnected),
            needs_interactive: true,
            chats: Mutex::new(Vec::new()),
            history: Mutex::new(HashMap::new()),
            fail_forward: Mutex::new(HashSet::new()),
            fail_delete_after: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            live_tx,
            live_rx: AsyncMutex::new(live_rx),
        }
    }

    /// A gateway whose stored session is already valid.
    #[must_use]
    pub fn authorized() -> Self {
        let fake = Self::new();
        *fake.state.write().unwrap() = ConnectionState::Authenticated;
        fake
    }

    /// An unauthenticated gateway whose session validates without prompts
    /// (the auto-login path).
    #[must_use]
    pub fn auto_login() -> Self {
        let mut fake = Self::new();
        fake.needs_interactive = false;
        fake
    }

    #[must_use]
    pub fn with_chats(self, chats: Vec<ChatDescriptor>) -> Self {
        *self.chats.lock().unwrap() = chats;
        self
    }

    #[must_use]
    pub fn with_history(self, chat: i64, messages: Vec<MessageRef>) -> Self {
        self.history.lock().unwrap().insert(chat, messages);
        self
    }

    /// Make every forward/copy of the given message id fail.
    #[must_use]
    pub fn fail_forward_of(self, message: i32) -> Self {
        self.fail_forward.lock().unwrap().insert(message);
        self
    }

    /// Let the first `batches` deletion requests succeed and fail the rest.
    #[must_use]
    pub fn fail_delete_after(self, batches: usize) -> Self {
        *self.fail_delete_after.lock().unwrap() = Some(batches);
        self
    }

    /// Sender for injecting live messages into [`TelegramGateway::next_message`].
    #[must_use]
    pub fn live_sender(&self) -> mpsc::UnboundedSender<MessageRef> {
        self.live_tx.clone()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: FakeCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn ensure_authenticated(&self) -> Result<()> {
        if self.state() == ConnectionState::Authenticated {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }
}

#[async_trait]
impl TelegramGateway for FakeGateway {
    fn state(&self) -> ConnectionState {
        *self.state.read().unwrap()
    }

    async fn sign_in(&self, prompter: &dyn LoginPrompter) -> Result<()> {
        if self.state() == ConnectionState::Authenticated {
            return Ok(());
        }
        if self.needs_interactive {
            *self.state.write().unwrap() = ConnectionState::AwaitingVerification;
            let result = async {
                prompter.request_phone().await?;
                prompter.request_code().await?;
                Ok(())
            }
            .await;
            if let Err(e) = result {
                *self.state.write().unwrap() = ConnectionState::Disconnected;
                return Err(e);
            }
        }
        *self.state.write().unwrap() = ConnectionState::Authenticated;
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        *self.state.write().unwrap() = ConnectionState::Disconnected;
        self.record(FakeCall::SignedOut);
        Ok(())
    }

    async fn list_chats(&self) -> Result<Vec<ChatDescriptor>> {
        self.ensure_authenticated()?;
        Ok(self.chats.lock().unwrap().clone())
    }

    async fn history_oldest_first(&self, chat: i64) -> Result<Vec<MessageRef>> {
        self.ensure_authenticated()?;
        Ok(self
            .history
            .lock()
            .unwrap()
            .get(&chat)
            .cloned()
            .unwrap_or_default())
    }

    async fn forward_message(&self, source: i64, destination: i64, message: i32) -> Result<()> {
        self.ensure_authenticated()?;
        if self.fail_forward.lock().unwrap().contains(&message) {
            return Err(Error::message(format!("simulated failure for {message}")));
        }
        self.record(FakeCall::Forwarded {
            source,
            destination,
            message,
        });
        Ok(())
    }

    async fn copy_media(
        &self,
        _source: i64,
        destination: i64,
        message: i32,
        caption: &str,
    ) -> Result<()> {
        self.ensure_authenticated()?;
        if self.fail_forward.lock().unwrap().contains(&message) {
            return Err(Error::message(format!("simulated failure for {message}")));
        }
        self.record(FakeCall::MediaCopied {
            destination,
            message,
            caption: caption.to_owned(),
        });
        Ok(())
    }

    async fn next_message(&self, _source: i64) -> Result<MessageRef> {
        self.ensure_authenticated()?;
        let mut rx = self.live_rx.lock().await;
        match rx.recv().await {
            Some(message) => Ok(message),
            // All senders gone: behave like a quiet chat.
            None => std::future::pending().await,
        }
    }

    async fn message_ids(&self, chat: i64) -> Result<Vec<i32>> {
        self.ensure_authenticated()?;
        Ok(self
            .history
            .lock()
            .unwrap()
            .get(&chat)
            .map(|msgs| msgs.iter().map(|m| m.id).collect())
            .unwrap_or_default())
    }

    async fn delete_messages(&self, chat: i64, messages: &[i32]) -> Result<usize> {
        self.ensure_authenticated()?;
        if let Some(remaining) = self.fail_delete_after.lock().unwrap().as_mut() {
            if *remaining == 0 {
                return Err(Error::message("simulated deletion failure"));
            }
            *remaining -= 1;
        }
        self.record(FakeCall::DeletedBatch {
            chat,
            batch: messages.len(),
        });
        Ok(messages.len())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::gateway::NonInteractive};

    #[tokio::test]
    async fn chat_operations_require_authentication() {
        let fake = FakeGateway::new();
        assert!(matches!(
            fake.list_chats().await.unwrap_err(),
            Error::NotConnected
        ));
        assert!(matches!(
            fake.history_oldest_first(1).await.unwrap_err(),
            Error::NotConnected
        ));
        assert!(matches!(
            fake.forward_message(1, 2, 3).await.unwrap_err(),
            Error::NotConnected
        ));
    }

    #[tokio::test]
    async fn stale_session_fails_closed_without_a_prompter() {
        let fake = FakeGateway::new();
        let err = fake.sign_in(&NonInteractive).await.unwrap_err();
        assert!(err.is_not_connected());
        assert_eq!(fake.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn auto_login_needs_no_prompts() {
        let fake = FakeGateway::auto_login();
        fake.sign_in(&NonInteractive).await.unwrap();
        assert_eq!(fake.state(), ConnectionState::Authenticated);
    }
}
