//! MTProto gateway backed by grammers.
//!
//! Holds the one authenticated client handle for the process plus a cache of
//! packed chat handles keyed by chat id, filled from dialog enumeration —
//! send/forward/delete calls need the packed form, not the bare id.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Mutex, RwLock},
};

use {
    async_trait::async_trait,
    grammers_client::{Client, Config, InitParams, InputMessage, SignInError, Update, types::Chat},
    grammers_session::{PackedChat, Session},
    telefwd_common::{ChatDescriptor, ChatKind, Error, MessageRef, Result},
    tracing::{debug, info},
};

use crate::gateway::{ConnectionState, LoginPrompter, TelegramGateway};

pub struct GrammersGateway {
    client: Client,
    session_path: PathBuf,
    state: RwLock<ConnectionState>,
    /// Packed handles for every chat seen in the dialog list. Sync lock,
    /// never held across an await point.
    chats: Mutex<HashMap<i64, PackedChat>>,
}

impl GrammersGateway {
    /// Connect to Telegram, reusing the session artifact at `session_path`
    /// when one exists. The returned gateway is `Authenticated` if the
    /// stored session is still valid, `Disconnected` otherwise.
    pub async fn connect(api_id: i32, api_hash: &str, session_path: PathBuf) -> Result<Self> {
        if let Some(parent) = session_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let session = Session::load_file_or_create(&session_path)?;

        info!(session = %session_path.display(), "connecting to telegram");
        let client = Client::connect(Config {
            session,
            api_id,
            api_hash: api_hash.to_owned(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| Error::provider("connect to telegram", e))?;

        let authorized = client
            .is_authorized()
            .await
            .map_err(|e| Error::provider("check authorization", e))?;
        let state = if authorized {
            ConnectionState::Authenticated
        } else {
            ConnectionState::Disconnected
        };

        Ok(Self {
            client,
            session_path,
            state: RwLock::new(state),
            chats: Mutex::new(HashMap::new()),
        })
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn ensure_authenticated(&self) -> Result<()> {
        if self.state() == ConnectionState::Authenticated {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    fn save_session(&self) -> Result<()> {
        self.client.session().save_to_file(&self.session_path)?;
        debug!(session = %self.session_path.display(), "saved session artifact");
        Ok(())
    }

    fn cached_chat(&self, id: i64) -> Option<PackedChat> {
        self.chats.lock().unwrap_or_else(|e| e.into_inner()).get(&id).copied()
    }

    /// Look up the packed handle for a chat id, refreshing the dialog list
    /// once on a cache miss.
    async fn resolve_chat(&self, id: i64) -> Result<PackedChat> {
        self.ensure_authenticated()?;
        if let Some(packed) = self.cached_chat(id) {
            return Ok(packed);
        }
        self.refresh_dialogs().await?;
        self.cached_chat(id).ok_or(Error::UnknownChat(id))
    }

    async fn refresh_dialogs(&self) -> Result<Vec<ChatDescriptor>> {
        self.ensure_authenticated()?;

        let mut descriptors = Vec::new();
        let mut packed = Vec::new();
        let mut dialogs = self.client.iter_dialogs();
        while let Some(dialog) = dialogs
            .next()
            .await
            .map_err(|e| Error::provider("fetch dialogs", e))?
        {
            let chat = dialog.chat();
            descriptors.push(ChatDescriptor {
                id: chat.id(),
                display_name: chat.name().to_owned(),
                kind: chat_kind(chat),
            });
            packed.push((chat.id(), chat.pack()));
        }

        let mut cache = self.chats.lock().unwrap_or_else(|e| e.into_inner());
        cache.extend(packed);
        Ok(descriptors)
    }

    fn message_ref(message: &grammers_client::types::Message) -> MessageRef {
        MessageRef {
            id: message.id(),
            has_media: message.media().is_some(),
        }
    }
}

fn chat_kind(chat: &Chat) -> ChatKind {
    match chat {
        Chat::User(_) => ChatKind::Direct,
        Chat::Group(_) => ChatKind::Group,
        Chat::Channel(_) => ChatKind::Channel,
    }
}

#[async_trait]
impl TelegramGateway for GrammersGateway {
    fn state(&self) -> ConnectionState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    async fn sign_in(&self, prompter: &dyn LoginPrompter) -> Result<()> {
        let authorized = self
            .client
            .is_authorized()
            .await
            .map_err(|e| Error::provider("check authorization", e))?;
        if authorized {
            self.set_state(ConnectionState::Authenticated);
            return Ok(());
        }

        self.set_state(ConnectionState::AwaitingVerification);
        match self.interactive_sign_in(prompter).await {
            Ok(()) => {
                self.set_state(ConnectionState::Authenticated);
                self.save_session()?;
                Ok(())
            },
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            },
        }
    }

    async fn sign_out(&self) -> Result<()> {
        let result = self
            .client
            .sign_out()
            .await
            .map(|_| ())
            .map_err(|e| Error::provider("sign out", e));
        self.set_state(ConnectionState::Disconnected);
        result
    }

    async fn list_chats(&self) -> Result<Vec<ChatDescriptor>> {
        self.refresh_dialogs().await
    }

    async fn history_oldest_first(&self, chat: i64) -> Result<Vec<MessageRef>> {
        let packed = self.resolve_chat(chat).await?;

        let mut history = Vec::new();
        let mut messages = self.client.iter_messages(packed);
        while let Some(message) = messages
            .next()
            .await
            .map_err(|e| Error::provider("iterate history", e))?
        {
            history.push(Self::message_ref(&message));
        }
        // The provider yields newest first; backfill wants chronological.
        history.reverse();
        Ok(history)
    }

    async fn forward_message(&self, source: i64, destination: i64, message: i32) -> Result<()> {
        let src = self.resolve_chat(source).await?;
        let dst = self.resolve_chat(destination).await?;
        self.client
            .forward_messages(dst, &[message], src)
            .await
            .map_err(|e| Error::provider(format!("forward message {message}"), e))?;
        Ok(())
    }

    async fn copy_media(
        &self,
        source: i64,
        destination: i64,
        message: i32,
        caption: &str,
    ) -> Result<()> {
        let src = self.resolve_chat(source).await?;
        let dst = self.resolve_chat(destination).await?;

        let mut fetched = self
            .client
            .get_messages_by_id(src, &[message])
            .await
            .map_err(|e| Error::provider(format!("fetch message {message}"), e))?;
        let media = fetched
            .pop()
            .flatten()
            .and_then(|m| m.media())
            .ok_or_else(|| Error::message(format!("message {message} has no media")))?;

        self.client
            .send_message(dst, InputMessage::text(caption).copy_media(&media))
            .await
            .map_err(|e| Error::provider(format!("send media for message {message}"), e))?;
        Ok(())
    }

    async fn next_message(&self, source: i64) -> Result<MessageRef> {
        self.ensure_authenticated()?;
        loop {
            let update = self
                .client
                .next_update()
                .await
                .map_err(|e| Error::provider("receive updates", e))?;
            // Every new message in the source chat is mirrored, the
            // account's own included; the destination is a different chat,
            // so forwards cannot feed back into this stream.
            if let Update::NewMessage(message) = update
                && message.chat().id() == source
            {
                return Ok(Self::message_ref(&message));
            }
        }
    }

    async fn message_ids(&self, chat: i64) -> Result<Vec<i32>> {
        let packed = self.resolve_chat(chat).await?;

        let mut ids = Vec::new();
        let mut messages = self.client.iter_messages(packed);
        while let Some(message) = messages
            .next()
            .await
            .map_err(|e| Error::provider("enumerate messages", e))?
        {
            ids.push(message.id());
        }
        Ok(ids)
    }

    async fn delete_messages(&self, chat: i64, messages: &[i32]) -> Result<usize> {
        let packed = self.resolve_chat(chat).await?;
        self.client
            .delete_messages(packed, messages)
            .await
            .map_err(|e| Error::provider("delete messages", e))
    }
}

impl GrammersGateway {
    async fn interactive_sign_in(&self, prompter: &dyn LoginPrompter) -> Result<()> {
        let phone = prompter.request_phone().await?;
        let token = self
            .client
            .request_login_code(phone.trim())
            .await
            .map_err(|e| Error::provider("request login code", e))?;

        let code = prompter.request_code().await?;
        match self.client.sign_in(&token, code.trim()).await {
            Ok(_) => Ok(()),
            Err(SignInError::PasswordRequired(password_token)) => {
                let password = prompter.request_password().await?;
                self.client
                    .check_password(password_token, password.trim())
                    .await
                    .map_err(|e| Error::provider("check two-factor password", e))?;
                Ok(())
            },
            Err(e) => Err(Error::provider("sign in", e)),
        }
    }
}
