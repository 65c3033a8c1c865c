//! One-time population of empty collections
//!
//! A collection is seeded only when the first snapshot this session observes
//! is empty, and never after it has been seen with content. Seeding writes
//! the canonical defaults under their fixed ids in a single batch, so a
//! repeated seed converges on the same set. Failures are logged and
//! otherwise ignored: the mirror's fallback already shows defaults.

use crate::error::{ErrorKind, RemoteError};
use crate::remote::{RemoteStore, WriteBatch};
use dashmap::DashMap;
use site_model::{CollectionId, Entity};
use std::sync::Arc;

/// Seeding state of one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedGate {
    /// First snapshot not yet observed
    Pending,
    /// First snapshot was empty; seeding claimed
    Claimed,
    /// First snapshot had content; never seed
    Populated,
}

/// Result of a seeding attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Defaults written
    Seeded {
        /// Documents written
        documents: usize,
    },
    /// Gate did not allow seeding
    Skipped,
    /// Remote store rejected the batch
    Failed(ErrorKind),
}

/// Seeds empty collections with defaults
#[derive(Debug)]
pub struct Seeder {
    store: Arc<dyn RemoteStore>,
    gates: DashMap<CollectionId, SeedGate>,
}

impl Seeder {
    /// Create seeder
    #[must_use]
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            gates: DashMap::new(),
        }
    }

    /// Current gate of a collection
    #[must_use]
    pub fn gate(&self, collection: CollectionId) -> SeedGate {
        self.gates
            .get(&collection)
            .map_or(SeedGate::Pending, |gate| *gate)
    }

    /// Record a snapshot observation; returns true exactly once, when the
    /// first observation of the collection is empty
    pub fn observe(&self, collection: CollectionId, empty: bool) -> bool {
        let mut gate = self.gates.entry(collection).or_insert(SeedGate::Pending);
        if *gate != SeedGate::Pending {
            return false;
        }
        *gate = if empty {
            SeedGate::Claimed
        } else {
            SeedGate::Populated
        };
        empty
    }

    /// Write the defaults under their fixed ids in one batch
    pub async fn seed<E: Entity>(&self, collection: CollectionId, defaults: &[E]) -> SeedOutcome {
        if collection == CollectionId::Settings {
            return SeedOutcome::Skipped;
        }

        let mut batch = WriteBatch::new();
        for entity in defaults {
            batch.set(collection, entity.key().clone(), entity.to_document());
        }
        let documents = batch.len();

        match self.store.commit(batch).await {
            Ok(()) => {
                tracing::info!(%collection, documents, "seeded empty collection with defaults");
                SeedOutcome::Seeded { documents }
            }
            Err(error) => {
                log_failure(collection, &error);
                SeedOutcome::Failed(error.kind())
            }
        }
    }

    /// Observe a snapshot and seed if this is the first, empty observation
    pub async fn seed_if_first_empty<E: Entity>(
        &self,
        collection: CollectionId,
        empty: bool,
        defaults: &[E],
    ) -> SeedOutcome {
        if collection == CollectionId::Settings || !self.observe(collection, empty) {
            return SeedOutcome::Skipped;
        }
        self.seed(collection, defaults).await
    }
}

fn log_failure(collection: CollectionId, error: &RemoteError) {
    tracing::warn!(%collection, %error, "seeding failed, continuing with local defaults");
}
