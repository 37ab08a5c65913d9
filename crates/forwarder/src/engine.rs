use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    telefwd_client::{ConnectionState, TelegramGateway},
    telefwd_common::{Error, MessageRef, Result},
    telefwd_config::ConfigStore,
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use crate::handle::ForwardHandle;

/// How incoming messages are transformed before reaching the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardMode {
    /// Forward every message verbatim, keeping its content and caption.
    Original,
    /// Forward only media, under a generated `"<prefix> <counter>"` caption.
    /// Text-only messages are skipped and tallied.
    Custom,
}

#[derive(Debug, Clone)]
pub struct ForwardOptions {
    pub mode: ForwardMode,
    pub source: i64,
    pub destination: i64,
    /// Pause after each backfilled message so the provider's rate limits are
    /// respected. One second unless overridden (tests use zero).
    pub message_delay: Duration,
}

impl ForwardOptions {
    #[must_use]
    pub fn new(mode: ForwardMode, source: i64, destination: i64) -> Self {
        Self {
            mode,
            source,
            destination,
            message_delay: Duration::from_secs(1),
        }
    }
}

/// Progress events handed off to the front-end over the event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardEvent {
    BackfillStarted,
    /// A message was forwarded verbatim.
    Forwarded { message: i32 },
    /// Media was re-sent under a generated caption.
    CaptionSent { message: i32, caption: String },
    /// A text-only message was skipped in custom caption mode.
    Skipped { message: i32 },
    /// A per-message failure; the loop continues.
    Failed { message: i32, error: String },
    BackfillComplete { forwarded: u64, skipped: u64 },
    /// Backfill done, now mirroring new messages as they arrive.
    Listening,
    Stopped,
}

/// Totals for one forwarding session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardReport {
    pub forwarded: u64,
    pub skipped: u64,
}

/// One forwarding session: backfill, then live mirroring until cancelled.
///
/// The engine is the only task that mutates the configuration record while
/// it runs (the counter, in custom caption mode); front-ends must not write
/// to the store until the session is joined.
pub struct ForwardEngine {
    gateway: Arc<dyn TelegramGateway>,
    store: Arc<Mutex<ConfigStore>>,
    opts: ForwardOptions,
    cancel: CancellationToken,
    events: mpsc::Sender<ForwardEvent>,
    report: ForwardReport,
}

impl ForwardEngine {
    /// Validate the options and spawn the forwarding task.
    ///
    /// Fails with [`Error::NotConnected`] before authentication and with an
    /// invalid-configuration error when source and destination coincide.
    pub fn spawn(
        gateway: Arc<dyn TelegramGateway>,
        store: Arc<Mutex<ConfigStore>>,
        opts: ForwardOptions,
    ) -> Result<(ForwardHandle, mpsc::Receiver<ForwardEvent>)> {
        if gateway.state() != ConnectionState::Authenticated {
            return Err(Error::NotConnected);
        }
        if opts.source == opts.destination {
            return Err(Error::InvalidConfig(
                "source and destination chat must differ".into(),
            ));
        }

        let cancel = CancellationToken::new();
        let (events, events_rx) = mpsc::channel(64);
        let engine = Self {
            gateway,
            store,
            opts,
            cancel: cancel.clone(),
            events,
            report: ForwardReport::default(),
        };
        let task = tokio::spawn(engine.run());
        Ok((ForwardHandle::new(cancel, task), events_rx))
    }

    async fn run(mut self) -> ForwardReport {
        self.backfill().await;
        if !self.cancel.is_cancelled() {
            info!(source = self.opts.source, "backfill done, listening for new messages");
            self.emit(ForwardEvent::Listening).await;
            self.live().await;
        }
        self.emit(ForwardEvent::Stopped).await;
        self.report
    }

    /// One pass over the existing history, oldest first, exactly once per
    /// message. Cancellation is observed between messages, never mid-send,
    /// so the persisted counter always matches the last processed message.
    async fn backfill(&mut self) {
        info!(source = self.opts.source, "starting backfill");
        self.emit(ForwardEvent::BackfillStarted).await;

        let history = match self.gateway.history_oldest_first(self.opts.source).await {
            Ok(history) => history,
            Err(e) => {
                warn!(source = self.opts.source, error = %e, "could not read source history");
                Vec::new()
            },
        };

        for message in history {
            self.apply(message).await;
            tokio::select! {
                () = self.cancel.cancelled() => return,
                () = tokio::time::sleep(self.opts.message_delay) => {},
            }
        }

        info!(
            forwarded = self.report.forwarded,
            skipped = self.report.skipped,
            "backfill complete"
        );
        self.emit(ForwardEvent::BackfillComplete {
            forwarded: self.report.forwarded,
            skipped: self.report.skipped,
        })
        .await;
    }

    async fn live(&mut self) {
        loop {
            let message = tokio::select! {
                () = self.cancel.cancelled() => return,
                next = self.gateway.next_message(self.opts.source) => match next {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(error = %e, "live subscription ended");
                        return;
                    },
                },
            };
            self.apply(message).await;
        }
    }

    /// The per-message transformation rule, shared by backfill and live.
    async fn apply(&mut self, message: MessageRef) {
        match self.opts.mode {
            ForwardMode::Original => {
                let result = self
                    .gateway
                    .forward_message(self.opts.source, self.opts.destination, message.id)
                    .await;
                match result {
                    Ok(()) => {
                        self.report.forwarded += 1;
                        info!(
                            message = message.id,
                            total = self.report.forwarded,
                            "forwarded message"
                        );
                        self.emit(ForwardEvent::Forwarded {
                            message: message.id,
                        })
                        .await;
                    },
                    Err(e) => self.fail(message.id, &e).await,
                }
            },
            ForwardMode::Custom if message.has_media => {
                let caption = self
                    .store
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .next_caption();
                let result = self
                    .gateway
                    .copy_media(self.opts.source, self.opts.destination, message.id, &caption)
                    .await;
                match result {
                    Ok(()) => {
                        // Persist right away so a restart resumes the count.
                        self.store
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .advance_counter();
                        self.report.forwarded += 1;
                        info!(message = message.id, caption, "forwarded media with caption");
                        self.emit(ForwardEvent::CaptionSent {
                            message: message.id,
                            caption,
                        })
                        .await;
                    },
                    Err(e) => self.fail(message.id, &e).await,
                }
            },
            ForwardMode::Custom => {
                self.report.skipped += 1;
                info!(
                    message = message.id,
                    skipped = self.report.skipped,
                    "skipped text-only message"
                );
                self.emit(ForwardEvent::Skipped {
                    message: message.id,
                })
                .await;
            },
        }
    }

    async fn fail(&self, message: i32, error: &Error) {
        warn!(message, error = %error, "failed to forward message");
        self.emit(ForwardEvent::Failed {
            message,
            error: error.to_string(),
        })
        .await;
    }

    async fn emit(&self, event: ForwardEvent) {
        // A closed channel just means the front-end stopped listening.
        let _ = self.events.send(event).await;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        telefwd_client::testing::{FakeCall, FakeGateway},
        telefwd_common::MessageRef,
    };

    use super::*;

    const SOURCE: i64 = 10;
    const DEST: i64 = 20;

    fn temp_store(dir: &tempfile::TempDir) -> Arc<Mutex<ConfigStore>> {
        let store = ConfigStore::load(dir.path().join("telefwd.json")).unwrap();
        Arc::new(Mutex::new(store))
    }

    fn opts(mode: ForwardMode) -> ForwardOptions {
        ForwardOptions {
            message_delay: Duration::ZERO,
            ..ForwardOptions::new(mode, SOURCE, DEST)
        }
    }

    async fn recv_until(
        events: &mut mpsc::Receiver<ForwardEvent>,
        wanted: fn(&ForwardEvent) -> bool,
    ) -> Vec<ForwardEvent> {
        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            let done = wanted(&event);
            seen.push(event);
            if done {
                return seen;
            }
        }
        panic!("event channel closed before expected event; saw {seen:?}");
    }

    #[tokio::test]
    async fn original_mode_backfills_every_message_once_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::authorized().with_history(
            SOURCE,
            vec![
                MessageRef::text(1),
                MessageRef::media(2),
                MessageRef::text(3),
            ],
        ));
        let (handle, mut events) =
            ForwardEngine::spawn(gateway.clone(), temp_store(&dir), opts(ForwardMode::Original))
                .unwrap();

        recv_until(&mut events, |e| {
            matches!(e, ForwardEvent::BackfillComplete { .. })
        })
        .await;
        let report = handle.stop_and_join().await.unwrap();

        assert_eq!(report.forwarded, 3);
        assert_eq!(report.skipped, 0);
        let forwarded: Vec<i32> = gateway
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                FakeCall::Forwarded { message, .. } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(forwarded, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn custom_mode_captions_media_and_skips_text() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::authorized().with_history(
            SOURCE,
            vec![
                MessageRef::text(1),
                MessageRef::media(2),
                MessageRef::text(3),
                MessageRef::media(4),
            ],
        ));
        let store = temp_store(&dir);
        let (handle, mut events) =
            ForwardEngine::spawn(gateway.clone(), store, opts(ForwardMode::Custom)).unwrap();

        recv_until(&mut events, |e| {
            matches!(e, ForwardEvent::BackfillComplete { .. })
        })
        .await;
        let report = handle.stop_and_join().await.unwrap();

        assert_eq!(report.forwarded, 2);
        assert_eq!(report.skipped, 2);
        let captions: Vec<String> = gateway
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                FakeCall::MediaCopied { caption, .. } => Some(caption),
                _ => None,
            })
            .collect();
        assert_eq!(captions, vec!["Caption 1", "Caption 2"]);

        // One persisted save per media message: the counter survives restart.
        let reloaded = ConfigStore::load(dir.path().join("telefwd.json")).unwrap();
        assert_eq!(reloaded.config().counter, 3);
    }

    #[tokio::test]
    async fn lesson_five_caption_then_persisted_six() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        {
            let mut guard = store.lock().unwrap();
            guard.set_caption_prefix("Lesson").unwrap();
            for _ in 0..4 {
                guard.advance_counter();
            }
            assert_eq!(guard.next_caption(), "Lesson 5");
        }
        let gateway = Arc::new(
            FakeGateway::authorized().with_history(SOURCE, vec![MessageRef::media(7)]),
        );
        let (handle, mut events) =
            ForwardEngine::spawn(gateway.clone(), store, opts(ForwardMode::Custom)).unwrap();

        let seen = recv_until(&mut events, |e| {
            matches!(e, ForwardEvent::BackfillComplete { .. })
        })
        .await;
        handle.stop_and_join().await.unwrap();

        assert!(seen.contains(&ForwardEvent::CaptionSent {
            message: 7,
            caption: "Lesson 5".into(),
        }));
        let reloaded = ConfigStore::load(dir.path().join("telefwd.json")).unwrap();
        assert_eq!(reloaded.config().counter, 6);
    }

    #[tokio::test]
    async fn per_message_failure_does_not_abort_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(
            FakeGateway::authorized()
                .with_history(
                    SOURCE,
                    vec![
                        MessageRef::text(1),
                        MessageRef::text(2),
                        MessageRef::text(3),
                    ],
                )
                .fail_forward_of(2),
        );
        let (handle, mut events) =
            ForwardEngine::spawn(gateway.clone(), temp_store(&dir), opts(ForwardMode::Original))
                .unwrap();

        let seen = recv_until(&mut events, |e| {
            matches!(e, ForwardEvent::BackfillComplete { .. })
        })
        .await;
        let report = handle.stop_and_join().await.unwrap();

        assert_eq!(report.forwarded, 2);
        assert!(
            seen.iter()
                .any(|e| matches!(e, ForwardEvent::Failed { message: 2, .. }))
        );
        let forwarded: Vec<i32> = gateway
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                FakeCall::Forwarded { message, .. } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(forwarded, vec![1, 3]);
    }

    #[tokio::test]
    async fn live_messages_follow_backfill_in_arrival_order() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(
            FakeGateway::authorized().with_history(SOURCE, vec![MessageRef::text(1)]),
        );
        let live = gateway.live_sender();
        let (handle, mut events) =
            ForwardEngine::spawn(gateway.clone(), temp_store(&dir), opts(ForwardMode::Original))
                .unwrap();

        recv_until(&mut events, |e| matches!(e, ForwardEvent::Listening)).await;
        live.send(MessageRef::media(8)).unwrap();
        recv_until(&mut events, |e| {
            matches!(e, ForwardEvent::Forwarded { message: 8 })
        })
        .await;
        let report = handle.stop_and_join().await.unwrap();

        assert_eq!(report.forwarded, 2);
        let forwarded: Vec<i32> = gateway
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                FakeCall::Forwarded { message, .. } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(forwarded, vec![1, 8]);
    }

    #[tokio::test]
    async fn cancelling_backfill_leaves_counter_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let history: Vec<MessageRef> = (1..=10).map(MessageRef::media).collect();
        let gateway = Arc::new(FakeGateway::authorized().with_history(SOURCE, history));
        let slow = ForwardOptions {
            message_delay: Duration::from_millis(25),
            ..ForwardOptions::new(ForwardMode::Custom, SOURCE, DEST)
        };
        let (handle, mut events) =
            ForwardEngine::spawn(gateway.clone(), temp_store(&dir), slow).unwrap();

        recv_until(&mut events, |e| {
            matches!(e, ForwardEvent::CaptionSent { .. })
        })
        .await;
        let report = handle.stop_and_join().await.unwrap();

        assert!(report.forwarded >= 1);
        assert!(report.forwarded < 10, "stop must interrupt the backfill");
        // The file reflects exactly the messages that were fully processed.
        let reloaded = ConfigStore::load(dir.path().join("telefwd.json")).unwrap();
        assert_eq!(reloaded.config().counter, 1 + report.forwarded);
    }

    #[tokio::test]
    async fn spawn_before_authentication_is_a_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::new());
        let err =
            ForwardEngine::spawn(gateway, temp_store(&dir), opts(ForwardMode::Original))
                .unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn spawn_rejects_identical_source_and_destination() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(FakeGateway::authorized());
        let same = ForwardOptions::new(ForwardMode::Original, SOURCE, SOURCE);
        let err = ForwardEngine::spawn(gateway, temp_store(&dir), same).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
