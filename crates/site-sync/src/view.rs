//! Aggregate read model
//!
//! Combines the four mirrors and the recorded system error into one
//! [`AggregateView`]. Every mutation bumps a shared revision counter so
//! observers can wait for the next change instead of polling.

use crate::error::SystemError;
use crate::mirror::{CollectionMirror, MirrorShape};
use parking_lot::Mutex;
use serde::Serialize;
use site_model::{defaults, CollectionId, GalleryItem, Roster, RosterMember, SiteSettings};
use std::sync::Arc;
use tokio::sync::watch;

/// Shared change counter
#[derive(Debug, Clone)]
pub struct ViewNotifier {
    tx: Arc<watch::Sender<u64>>,
}

impl ViewNotifier {
    /// Create notifier at revision 0
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Record a change
    pub fn bump(&self) {
        self.tx.send_modify(|revision| *revision += 1);
    }

    /// Current revision
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.tx.borrow()
    }

    /// Receiver that wakes on every change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

impl Default for ViewNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// The most recent blocking condition
#[derive(Debug, Clone)]
pub struct ErrorState {
    current: Arc<Mutex<Option<SystemError>>>,
    notifier: ViewNotifier,
}

impl ErrorState {
    /// Create empty state
    #[must_use]
    pub fn new(notifier: ViewNotifier) -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            notifier,
        }
    }

    /// Replace the recorded error
    pub fn record(&self, error: SystemError) {
        *self.current.lock() = Some(error);
        self.notifier.bump();
    }

    /// Clear the recorded error
    pub fn clear(&self) {
        if self.current.lock().take().is_some() {
            self.notifier.bump();
        }
    }

    /// Current error, if any
    #[must_use]
    pub fn current(&self) -> Option<SystemError> {
        self.current.lock().clone()
    }
}

/// The four mirrors of a site
#[derive(Debug)]
pub struct SiteMirrors {
    /// Main committee
    pub main: CollectionMirror<RosterMember>,
    /// Secondary committee
    pub secondary: CollectionMirror<RosterMember>,
    /// Gallery
    pub gallery: CollectionMirror<GalleryItem>,
    /// Settings singleton
    pub settings: CollectionMirror<SiteSettings>,
}

impl SiteMirrors {
    /// Create uninitialized mirrors sharing one notifier
    #[must_use]
    pub fn new(notifier: &ViewNotifier) -> Self {
        Self {
            main: CollectionMirror::new(
                CollectionId::MainRoster,
                MirrorShape::SortedById,
                defaults::main_roster(),
                notifier.clone(),
            ),
            secondary: CollectionMirror::new(
                CollectionId::SecondaryRoster,
                MirrorShape::SortedById,
                defaults::secondary_roster(),
                notifier.clone(),
            ),
            gallery: CollectionMirror::new(
                CollectionId::Gallery,
                MirrorShape::Arrival,
                defaults::gallery(),
                notifier.clone(),
            ),
            settings: CollectionMirror::new(
                CollectionId::Settings,
                MirrorShape::Singleton(SiteSettings::default_key()),
                vec![defaults::settings()],
                notifier.clone(),
            ),
        }
    }

    /// Mirror of a roster
    #[inline]
    #[must_use]
    pub fn roster(&self, roster: Roster) -> &CollectionMirror<RosterMember> {
        match roster {
            Roster::Main => &self.main,
            Roster::Secondary => &self.secondary,
        }
    }

    /// Stored settings, or the defaults when none are stored
    #[must_use]
    pub fn current_settings(&self) -> SiteSettings {
        self.settings
            .entities()
            .into_iter()
            .next()
            .unwrap_or_else(defaults::settings)
    }

    /// Check if any mirror is still waiting for its first outcome
    #[must_use]
    pub fn loading(&self) -> bool {
        !(self.main.phase().is_settled()
            && self.secondary.phase().is_settled()
            && self.gallery.phase().is_settled()
            && self.settings.phase().is_settled())
    }
}

/// Everything the presentation layer renders
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateView {
    /// Main committee, sorted by id
    pub main_roster: Vec<RosterMember>,
    /// Secondary committee, sorted by id
    pub secondary_roster: Vec<RosterMember>,
    /// Gallery, in arrival order
    pub gallery: Vec<GalleryItem>,
    /// Settings, defaulted when absent
    pub settings: SiteSettings,
    /// Some mirror has not produced its first outcome
    pub loading: bool,
    /// Most recent blocking condition
    pub last_error: Option<SystemError>,
    /// Revision the view was built at
    pub revision: u64,
}

impl AggregateView {
    /// Build one consistent view
    ///
    /// Retries if a mirror changed while the view was being assembled.
    #[must_use]
    pub fn build(mirrors: &SiteMirrors, errors: &ErrorState, notifier: &ViewNotifier) -> Self {
        loop {
            let revision = notifier.revision();
            let view = Self {
                main_roster: mirrors.main.entities(),
                secondary_roster: mirrors.secondary.entities(),
                gallery: mirrors.gallery.entities(),
                settings: mirrors.current_settings(),
                loading: mirrors.loading(),
                last_error: errors.current(),
                revision,
            };
            if notifier.revision() == revision {
                return view;
            }
        }
    }

    /// Roster by selector
    #[must_use]
    pub fn roster(&self, roster: Roster) -> &[RosterMember] {
        match roster {
            Roster::Main => &self.main_roster,
            Roster::Secondary => &self.secondary_roster,
        }
    }
}
