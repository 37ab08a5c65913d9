use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use {
    telefwd_common::{ChatDescriptor, Result},
    telefwd_config::ConfigStore,
    tracing::{info, warn},
};

use crate::gateway::{ConnectionState, LoginPrompter, NonInteractive, TelegramGateway};

/// The session context owned by the front-end controller.
///
/// One per process. Bundles the gateway, the configuration store, and the
/// session artifact path so operations don't reach for global state. The
/// store is behind a sync mutex shared with the forwarding task; the lock is
/// never held across an await point.
pub struct Session {
    gateway: Arc<dyn TelegramGateway>,
    store: Arc<Mutex<ConfigStore>>,
    session_path: PathBuf,
}

impl Session {
    pub fn new(
        gateway: Arc<dyn TelegramGateway>,
        store: Arc<Mutex<ConfigStore>>,
        session_path: PathBuf,
    ) -> Self {
        Self {
            gateway,
            store,
            session_path,
        }
    }

    #[must_use]
    pub fn gateway(&self) -> Arc<dyn TelegramGateway> {
        Arc::clone(&self.gateway)
    }

    #[must_use]
    pub fn store(&self) -> Arc<Mutex<ConfigStore>> {
        Arc::clone(&self.store)
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.gateway.state()
    }

    /// Authenticate, preferring the stored session. If the session cannot be
    /// validated non-interactively the prompter is asked for phone, code,
    /// and (when two-factor is enabled) password.
    pub async fn login(&self, prompter: &dyn LoginPrompter) -> Result<()> {
        match self.gateway.sign_in(&NonInteractive).await {
            Ok(()) => {
                info!("logged in with stored session");
                Ok(())
            },
            Err(e) => {
                info!(reason = %e, "stored session not usable, interactive login required");
                self.gateway.sign_in(prompter).await
            },
        }
    }

    /// Log out: invalidate the remote session, delete the session artifact,
    /// and clear the stored credentials. All three are attempted even when
    /// an earlier step fails, so the next start always requires a fresh
    /// interactive login.
    pub async fn logout(&self) -> Result<()> {
        if let Err(e) = self.gateway.sign_out().await {
            warn!(error = %e, "sign-out failed, clearing local state anyway");
        }

        match std::fs::remove_file(&self.session_path) {
            Ok(()) => info!(path = %self.session_path.display(), "removed session artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => warn!(error = %e, "failed to remove session artifact"),
        }

        self.store
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear_credentials()
    }

    /// All chats visible to the account. Fails with a connection-state error
    /// before authentication.
    pub async fn list_chats(&self) -> Result<Vec<ChatDescriptor>> {
        self.gateway.list_chats().await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use {
        async_trait::async_trait,
        telefwd_common::{ChatDescriptor, ChatKind, Error},
    };

    use {super::*, crate::testing::FakeGateway};

    /// Prompter that serves canned answers and counts how often it was asked.
    struct Recording {
        asked: AtomicUsize,
    }

    impl Recording {
        fn new() -> Self {
            Self {
                asked: AtomicUsize::new(0),
            }
        }

        fn asked(&self) -> usize {
            self.asked.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LoginPrompter for Recording {
        async fn request_phone(&self) -> Result<String> {
            self.asked.fetch_add(1, Ordering::SeqCst);
            Ok("+15550100".into())
        }

        async fn request_code(&self) -> Result<String> {
            self.asked.fetch_add(1, Ordering::SeqCst);
            Ok("12345".into())
        }

        async fn request_password(&self) -> Result<String> {
            self.asked.fetch_add(1, Ordering::SeqCst);
            Ok("hunter2".into())
        }
    }

    fn session_with(gateway: FakeGateway) -> (tempfile::TempDir, Session) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(dir.path().join("telefwd.json")).unwrap();
        let session = Session::new(
            Arc::new(gateway),
            Arc::new(Mutex::new(store)),
            dir.path().join("telefwd.session"),
        );
        (dir, session)
    }

    #[tokio::test]
    async fn login_with_valid_session_never_prompts() {
        let (_dir, session) = session_with(FakeGateway::auto_login());
        let prompter = Recording::new();
        session.login(&prompter).await.unwrap();
        assert_eq!(session.state(), ConnectionState::Authenticated);
        assert_eq!(prompter.asked(), 0);
    }

    #[tokio::test]
    async fn stale_session_falls_back_to_interactive_login() {
        let (_dir, session) = session_with(FakeGateway::new());
        let prompter = Recording::new();
        session.login(&prompter).await.unwrap();
        assert_eq!(session.state(), ConnectionState::Authenticated);
        // phone + code
        assert_eq!(prompter.asked(), 2);
    }

    #[tokio::test]
    async fn logout_clears_credentials_and_session_artifact() {
        let (dir, session) = session_with(FakeGateway::authorized());
        let artifact = dir.path().join("telefwd.session");
        std::fs::write(&artifact, b"opaque").unwrap();
        session
            .store()
            .lock()
            .unwrap()
            .set_credentials(7, "hash")
            .unwrap();

        session.logout().await.unwrap();

        assert!(!artifact.exists());
        assert!(session.store().lock().unwrap().config().credentials().is_none());
        assert_eq!(session.state(), ConnectionState::Disconnected);

        // A fresh start would have to log in interactively again.
        let reloaded = ConfigStore::load(dir.path().join("telefwd.json")).unwrap();
        assert!(reloaded.config().credentials().is_none());
    }

    #[tokio::test]
    async fn logout_with_missing_artifact_still_succeeds() {
        let (_dir, session) = session_with(FakeGateway::authorized());
        session.logout().await.unwrap();
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn list_chats_before_login_is_a_connection_error() {
        let (_dir, session) = session_with(FakeGateway::new());
        let err = session.list_chats().await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn list_chats_returns_descriptors() {
        let fake = FakeGateway::authorized().with_chats(vec![ChatDescriptor {
            id: -100,
            display_name: "Notes".into(),
            kind: ChatKind::Channel,
        }]);
        let (_dir, session) = session_with(fake);
        let chats = session.list_chats().await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].id, -100);
    }
}
