//! Site context: explicit lifecycle for one session
//!
//! `start` opens exactly one subscription per mirrored collection, each on
//! its own task. A task whose subscribe fails shows defaults and retries
//! with a capped backoff until the store answers. `shutdown` signals every
//! task, waits for it to finish and thereby drops every subscription.

use crate::auth::{AdminGate, ViewMode};
use crate::config::SiteConfig;
use crate::coordinator::{WriteCoordinator, WriteOutcome};
use crate::dump::LocalDump;
use crate::error::{SyncError, SyncResult, SystemError};
use crate::mirror::CollectionMirror;
use crate::remote::{RemoteStore, SnapshotStream};
use crate::seeder::{SeedOutcome, Seeder};
use crate::view::{AggregateView, ErrorState, SiteMirrors, ViewNotifier};
use futures::StreamExt;
use site_model::{ContactMessage, Entity};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A running site session
#[derive(Debug)]
pub struct SiteContext {
    config: SiteConfig,
    mirrors: Arc<SiteMirrors>,
    errors: ErrorState,
    notifier: ViewNotifier,
    seeder: Arc<Seeder>,
    coordinator: WriteCoordinator,
    gate: AdminGate,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SiteContext {
    /// Start a session against a store
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn start(store: Arc<dyn RemoteStore>, config: SiteConfig) -> Self {
        let notifier = ViewNotifier::new();
        let mirrors = Arc::new(SiteMirrors::new(&notifier));
        let errors = ErrorState::new(notifier.clone());
        let seeder = Arc::new(Seeder::new(Arc::clone(&store)));
        let coordinator = WriteCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&mirrors),
            errors.clone(),
            config.images.ingestor(),
        )
        .with_outbox_capacity(config.outbox_capacity);
        let gate = AdminGate::new(config.admin.clone());
        let (shutdown, _) = watch::channel(false);

        let driver = Driver {
            store,
            mirrors: Arc::clone(&mirrors),
            seeder: Arc::clone(&seeder),
            errors: errors.clone(),
            shutdown: shutdown.subscribe(),
        };
        let tasks = vec![
            driver.spawn(|m| &m.main, true),
            driver.spawn(|m| &m.secondary, true),
            driver.spawn(|m| &m.gallery, true),
            driver.spawn(|m| &m.settings, false),
        ];
        tracing::info!(subscriptions = tasks.len(), "site context started");

        Self {
            config,
            mirrors,
            errors,
            notifier,
            seeder,
            coordinator,
            gate,
            shutdown,
            tasks,
        }
    }

    /// Current aggregate view
    #[must_use]
    pub fn view(&self) -> AggregateView {
        AggregateView::build(&self.mirrors, &self.errors, &self.notifier)
    }

    /// Receiver that wakes whenever the view may have changed
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notifier.subscribe()
    }

    /// Wait until the view satisfies `predicate`, then return it
    ///
    /// Callers bound the wait with `tokio::time::timeout`.
    pub async fn wait_until(&self, predicate: impl Fn(&AggregateView) -> bool) -> AggregateView {
        let mut rx = self.notifier.subscribe();
        loop {
            let _ = rx.borrow_and_update();
            let view = self.view();
            if predicate(&view) {
                return view;
            }
            if rx.changed().await.is_err() {
                return self.view();
            }
        }
    }

    /// Wait for every mirror's first outcome
    pub async fn ready(&self) -> AggregateView {
        self.wait_until(|view| !view.loading).await
    }

    /// The mirrors backing the view
    #[inline]
    #[must_use]
    pub fn mirrors(&self) -> &SiteMirrors {
        &self.mirrors
    }

    /// The seeding gates of this session
    #[inline]
    #[must_use]
    pub fn seeder(&self) -> &Seeder {
        &self.seeder
    }

    /// Configuration the session was started with
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Most recent blocking condition
    #[must_use]
    pub fn last_error(&self) -> Option<SystemError> {
        self.errors.current()
    }

    /// Check credential and enter admin mode
    pub fn login(&self, username: &str, password: &str) -> bool {
        self.gate.login(username, password)
    }

    /// Leave admin mode
    pub fn logout(&self) {
        self.gate.logout();
    }

    /// Switch surface; admin requires a login
    pub fn navigate(&self, mode: ViewMode) -> bool {
        self.gate.navigate(mode)
    }

    /// Current surface
    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        self.gate.mode()
    }

    /// Write access, for logged-in sessions only
    ///
    /// # Errors
    /// `NotAuthorized` unless logged in
    pub fn admin(&self) -> SyncResult<&WriteCoordinator> {
        if self.gate.is_authenticated() {
            Ok(&self.coordinator)
        } else {
            Err(SyncError::NotAuthorized)
        }
    }

    /// Submit the public contact form
    ///
    /// # Errors
    /// `Validation` if a form field is missing
    pub async fn submit_message(&self, message: ContactMessage) -> SyncResult<WriteOutcome> {
        self.coordinator.submit_message(message).await
    }

    /// Load a local dump into mirrors that have not synced yet
    pub fn hydrate(&self, dump: LocalDump) {
        let mirrors = &self.mirrors;
        let loaded = [
            mirrors.main.hydrate(dump.main_roster),
            mirrors.secondary.hydrate(dump.secondary_roster),
            mirrors.gallery.hydrate(dump.gallery),
            mirrors.settings.hydrate(vec![dump.settings]),
        ];
        self.coordinator.restore_outbox(dump.outbox);
        tracing::debug!(
            mirrors = loaded.iter().filter(|l| **l).count(),
            "local dump applied"
        );
    }

    /// Capture the current view and outbox
    #[must_use]
    pub fn dump(&self) -> LocalDump {
        LocalDump::capture(&self.view(), self.coordinator.outbox())
    }

    /// Stop every subscription and wait for the tasks to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "subscription task ended abnormally");
            }
        }
        tracing::info!("site context stopped");
    }
}

/// First delay before reopening a failed subscription
const RESUBSCRIBE_INITIAL: Duration = Duration::from_millis(50);

/// Longest delay between resubscription attempts
const RESUBSCRIBE_MAX: Duration = Duration::from_secs(5);

/// Everything a subscription task needs
#[derive(Clone)]
struct Driver {
    store: Arc<dyn RemoteStore>,
    mirrors: Arc<SiteMirrors>,
    seeder: Arc<Seeder>,
    errors: ErrorState,
    shutdown: watch::Receiver<bool>,
}

impl Driver {
    fn spawn<E: Entity>(
        &self,
        select: fn(&SiteMirrors) -> &CollectionMirror<E>,
        seed: bool,
    ) -> JoinHandle<()> {
        tokio::spawn(self.clone().run(select, seed))
    }

    async fn run<E: Entity>(self, select: fn(&SiteMirrors) -> &CollectionMirror<E>, seed: bool) {
        let mut shutdown = self.shutdown.clone();
        let mirror = select(&self.mirrors);
        let collection = mirror.collection();
        mirror.mark_subscribed();

        let mut backoff = RESUBSCRIBE_INITIAL;
        let mut failures = 0u32;
        loop {
            if *shutdown.borrow() {
                break;
            }
            match self.store.subscribe(collection).await {
                Ok(mut stream) => {
                    backoff = RESUBSCRIBE_INITIAL;
                    failures = 0;
                    tracing::debug!(%collection, "subscription open");
                    if !self.pump(mirror, &mut stream, &mut shutdown, seed).await {
                        break;
                    }
                    tracing::debug!(%collection, "subscription ended by the store");
                }
                Err(error) => {
                    // Only the first failure of a streak replaces the contents,
                    // so local fallback writes survive the retries
                    if failures == 0 {
                        mirror.apply_error(&error);
                        self.errors.record(SystemError::from_remote(collection, &error));
                    }
                    failures += 1;
                    tracing::debug!(%collection, failures, ?backoff, "subscribe failed, retrying");
                }
            }
            if !pause(&mut shutdown, backoff).await {
                break;
            }
            backoff = (backoff * 2).min(RESUBSCRIBE_MAX);
        }
        tracing::debug!(%collection, "subscription closed");
    }

    /// Drive one open subscription; returns false on shutdown, true if the
    /// store ended the stream
    async fn pump<E: Entity>(
        &self,
        mirror: &CollectionMirror<E>,
        stream: &mut SnapshotStream,
        shutdown: &mut watch::Receiver<bool>,
        seed: bool,
    ) -> bool {
        let collection = mirror.collection();
        loop {
            tokio::select! {
                _ = shutdown.changed() => return false,
                event = stream.next() => match event {
                    Some(Ok(snapshot)) => {
                        let report = mirror.apply_snapshot(snapshot);
                        if seed {
                            let outcome = self
                                .seeder
                                .seed_if_first_empty(collection, report.is_empty(), mirror.defaults())
                                .await;
                            if matches!(outcome, SeedOutcome::Failed(_)) {
                                mirror.show_defaults();
                            }
                        }
                    }
                    Some(Err(error)) => {
                        mirror.apply_error(&error);
                        self.errors.record(SystemError::from_remote(collection, &error));
                    }
                    None => return true,
                },
            }
        }
    }
}

/// Sleep unless shutdown is signalled first; returns false on shutdown
async fn pause(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = shutdown.changed() => false,
        () = tokio::time::sleep(delay) => true,
    }
}
