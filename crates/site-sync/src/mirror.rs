//! Local mirror of one remote collection
//!
//! A mirror holds the latest full snapshot mapped into entities. Each
//! snapshot replaces the contents wholesale. A subscription error swaps in
//! the canonical defaults so the presentation layer always has content.
//! The write path may patch the mirror locally when the remote store
//! rejects a write.

use crate::error::{ErrorKind, RemoteError};
use crate::remote::Snapshot;
use crate::view::ViewNotifier;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use site_model::{CollectionId, Entity, EntityId};

/// Lifecycle of a mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorPhase {
    /// No subscription yet
    Uninitialized,
    /// Subscription opened, no snapshot yet
    Subscribed,
    /// Holds the latest remote snapshot
    Synced,
    /// Holds defaults after a subscription error
    Errored,
}

impl MirrorPhase {
    /// Check if the first outcome (snapshot or error) has arrived
    #[inline]
    #[must_use]
    pub fn is_settled(self) -> bool {
        matches!(self, MirrorPhase::Synced | MirrorPhase::Errored)
    }
}

/// How a mirror orders and filters its contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorShape {
    /// Ascending by id
    SortedById,
    /// Order of arrival in the snapshot
    Arrival,
    /// At most one document, with the given key
    Singleton(EntityId),
}

/// What applying a snapshot did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotReport {
    /// Entities now held
    pub len: usize,
    /// Documents skipped for malformed keys
    pub skipped: usize,
    /// First snapshot this mirror has seen
    pub first: bool,
}

impl SnapshotReport {
    /// Check if the snapshot held no entities
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Debug)]
struct MirrorState<E> {
    phase: MirrorPhase,
    entities: Vec<E>,
    last_error: Option<ErrorKind>,
    snapshots_seen: u64,
}

/// Mirror of one collection
#[derive(Debug)]
pub struct CollectionMirror<E: Entity> {
    collection: CollectionId,
    shape: MirrorShape,
    defaults: Vec<E>,
    state: RwLock<MirrorState<E>>,
    notifier: ViewNotifier,
}

impl<E: Entity> CollectionMirror<E> {
    /// Create an empty, uninitialized mirror
    #[must_use]
    pub fn new(
        collection: CollectionId,
        shape: MirrorShape,
        defaults: Vec<E>,
        notifier: ViewNotifier,
    ) -> Self {
        Self {
            collection,
            shape,
            defaults,
            state: RwLock::new(MirrorState {
                phase: MirrorPhase::Uninitialized,
                entities: Vec::new(),
                last_error: None,
                snapshots_seen: 0,
            }),
            notifier,
        }
    }

    /// Mirrored collection
    #[inline]
    #[must_use]
    pub fn collection(&self) -> CollectionId {
        self.collection
    }

    /// Canonical defaults
    #[inline]
    #[must_use]
    pub fn defaults(&self) -> &[E] {
        &self.defaults
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> MirrorPhase {
        self.state.read().phase
    }

    /// Kind of the last subscription error, kept until the next snapshot
    #[must_use]
    pub fn last_error(&self) -> Option<ErrorKind> {
        self.state.read().last_error
    }

    /// Snapshots applied so far
    #[must_use]
    pub fn snapshots_seen(&self) -> u64 {
        self.state.read().snapshots_seen
    }

    /// Current contents
    #[must_use]
    pub fn entities(&self) -> Vec<E> {
        self.state.read().entities.clone()
    }

    /// Look up one entity
    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<E> {
        self.state
            .read()
            .entities
            .iter()
            .find(|e| e.key() == id)
            .cloned()
    }

    /// Number of entities held
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().entities.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().entities.is_empty()
    }

    /// Record that the subscription is open
    pub fn mark_subscribed(&self) {
        let mut state = self.state.write();
        if state.phase == MirrorPhase::Uninitialized {
            state.phase = MirrorPhase::Subscribed;
            drop(state);
            self.notifier.bump();
        }
    }

    /// Replace the contents with a remote snapshot
    pub fn apply_snapshot(&self, snapshot: Snapshot) -> SnapshotReport {
        let mut skipped = 0;
        let mut entities = Vec::with_capacity(snapshot.len());
        for doc in snapshot {
            let key = match EntityId::parse(doc.key.as_str()) {
                Ok(key) => key,
                Err(err) => {
                    tracing::warn!(
                        collection = %self.collection,
                        key = %doc.key,
                        error = %err,
                        "skipping document with malformed key"
                    );
                    skipped += 1;
                    continue;
                }
            };
            if let MirrorShape::Singleton(wanted) = &self.shape {
                if key != *wanted {
                    continue;
                }
            }
            entities.push(E::from_document(key, &doc.fields));
        }
        self.order(&mut entities);

        let report = {
            let mut state = self.state.write();
            state.entities = entities;
            state.phase = MirrorPhase::Synced;
            state.last_error = None;
            state.snapshots_seen += 1;
            SnapshotReport {
                len: state.entities.len(),
                skipped,
                first: state.snapshots_seen == 1,
            }
        };

        tracing::debug!(
            collection = %self.collection,
            entities = report.len,
            skipped = report.skipped,
            "snapshot applied"
        );
        self.notifier.bump();
        report
    }

    /// Fall back to defaults after a subscription error
    pub fn apply_error(&self, error: &RemoteError) {
        let mut defaults = self.defaults.clone();
        self.order(&mut defaults);
        {
            let mut state = self.state.write();
            state.entities = defaults;
            state.phase = MirrorPhase::Errored;
            state.last_error = Some(error.kind());
        }

        tracing::warn!(
            collection = %self.collection,
            %error,
            "subscription failed, showing defaults"
        );
        self.notifier.bump();
    }

    /// Show the defaults without leaving the current phase
    ///
    /// Used when an empty collection could not be seeded; the next snapshot
    /// replaces them as usual.
    pub fn show_defaults(&self) {
        let mut defaults = self.defaults.clone();
        self.order(&mut defaults);
        self.state.write().entities = defaults;
        self.notifier.bump();
    }

    /// Insert or replace by id, keeping the mirror's ordering
    pub fn upsert_local(&self, entity: E) {
        {
            let mut state = self.state.write();
            match &self.shape {
                MirrorShape::Singleton(_) => state.entities = vec![entity],
                MirrorShape::Arrival => {
                    match state.entities.iter_mut().find(|e| e.key() == entity.key()) {
                        Some(slot) => *slot = entity,
                        None => state.entities.push(entity),
                    }
                }
                MirrorShape::SortedById => {
                    match state
                        .entities
                        .binary_search_by(|e| e.key().cmp(entity.key()))
                    {
                        Ok(pos) => state.entities[pos] = entity,
                        Err(pos) => state.entities.insert(pos, entity),
                    }
                }
            }
        }
        self.notifier.bump();
    }

    /// Remove by id; returns whether anything was removed
    pub fn remove_local(&self, id: &EntityId) -> bool {
        let removed = {
            let mut state = self.state.write();
            let before = state.entities.len();
            state.entities.retain(|e| e.key() != id);
            state.entities.len() != before
        };
        if removed {
            self.notifier.bump();
        }
        removed
    }

    /// Load locally persisted contents; ignored once the mirror has synced
    pub fn hydrate(&self, mut entities: Vec<E>) -> bool {
        self.order(&mut entities);
        {
            let mut state = self.state.write();
            if state.phase == MirrorPhase::Synced {
                return false;
            }
            state.entities = entities;
        }
        self.notifier.bump();
        true
    }

    fn order(&self, entities: &mut Vec<E>) {
        match &self.shape {
            MirrorShape::SortedById => entities.sort_by(|a, b| a.key().cmp(b.key())),
            MirrorShape::Arrival => {}
            MirrorShape::Singleton(_) => entities.truncate(1),
        }
    }
}
