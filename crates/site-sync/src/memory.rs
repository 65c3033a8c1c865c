//! In-process remote store
//!
//! Holds collections in memory and publishes a full snapshot to every
//! subscriber after each change. An access policy and an offline switch
//! let callers reproduce rejected writes, rejected reads and network loss.

use crate::error::RemoteError;
use crate::remote::{BatchOp, RemoteDocument, RemoteStore, Snapshot, SnapshotStream, WriteBatch};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use site_model::{CollectionId, Document, EntityId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

type Event = Result<Arc<Snapshot>, RemoteError>;

/// Which operations the store currently rejects
#[derive(Debug, Clone, Default)]
struct AccessPolicy {
    denied_reads: HashSet<CollectionId>,
    denied_writes: HashSet<CollectionId>,
    offline: bool,
}

impl AccessPolicy {
    fn check_write(&self, collection: CollectionId) -> Result<(), RemoteError> {
        if self.offline {
            return Err(RemoteError::Unavailable("store is offline".into()));
        }
        if self.denied_writes.contains(&collection) {
            return Err(RemoteError::PermissionDenied(format!(
                "writes to {collection} are not allowed"
            )));
        }
        Ok(())
    }

    fn check_read(&self, collection: CollectionId) -> Result<(), RemoteError> {
        if self.denied_reads.contains(&collection) {
            return Err(RemoteError::PermissionDenied(format!(
                "reads of {collection} are not allowed"
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct CollectionState {
    docs: BTreeMap<EntityId, Document>,
    events: watch::Sender<Event>,
}

impl CollectionState {
    fn new() -> Self {
        let (events, _) = watch::channel(Ok(Arc::new(Snapshot::new())));
        Self {
            docs: BTreeMap::new(),
            events,
        }
    }

    fn snapshot(&self) -> Snapshot {
        self.docs
            .iter()
            .map(|(id, fields)| RemoteDocument::new(id.as_str(), fields.clone()))
            .collect()
    }

    fn publish(&self) {
        self.events.send_replace(Ok(Arc::new(self.snapshot())));
    }
}

/// Store statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Accepted write operations (batch operations count individually)
    pub writes: usize,
    /// Rejected write calls
    pub rejected_writes: usize,
    /// Subscriptions opened
    pub subscriptions: usize,
}

/// In-memory [`RemoteStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<CollectionId, CollectionState>>,
    policy: Arc<RwLock<AccessPolicy>>,
    writes: AtomicUsize,
    rejected_writes: AtomicUsize,
    subscriptions: AtomicUsize,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store with pre-populated documents, without notifying anyone
    #[must_use]
    pub fn with_documents(
        docs: impl IntoIterator<Item = (CollectionId, EntityId, Document)>,
    ) -> Self {
        let store = Self::new();
        {
            let mut collections = store.collections.lock();
            for (collection, id, document) in docs {
                collections
                    .entry(collection)
                    .or_insert_with(CollectionState::new)
                    .docs
                    .insert(id, document);
            }
            for state in collections.values() {
                state.publish();
            }
        }
        store
    }

    /// Reject writes to a collection
    pub fn deny_writes(&self, collection: CollectionId) {
        self.policy.write().denied_writes.insert(collection);
    }

    /// Reject writes to every collection
    pub fn deny_all_writes(&self) {
        let mut policy = self.policy.write();
        policy.denied_writes.extend(CollectionId::MIRRORED);
        policy.denied_writes.insert(CollectionId::Messages);
    }

    /// Accept writes to a collection again
    pub fn allow_writes(&self, collection: CollectionId) {
        self.policy.write().denied_writes.remove(&collection);
    }

    /// Reject reads of a collection; live subscribers get an error event
    pub fn deny_reads(&self, collection: CollectionId) {
        self.policy.write().denied_reads.insert(collection);
        self.republish(collection);
    }

    /// Accept reads again; live subscribers get the current snapshot
    pub fn allow_reads(&self, collection: CollectionId) {
        self.policy.write().denied_reads.remove(&collection);
        self.republish(collection);
    }

    /// Simulate network loss; subscribing and writing fail while offline
    pub fn set_offline(&self, offline: bool) {
        self.policy.write().offline = offline;
    }

    /// Push an error event to live subscribers of a collection
    pub fn fail_subscription(&self, collection: CollectionId, error: RemoteError) {
        let mut collections = self.collections.lock();
        let state = collections
            .entry(collection)
            .or_insert_with(CollectionState::new);
        state.events.send_replace(Err(error));
    }

    /// Current documents of a collection, ordered by key
    #[must_use]
    pub fn documents(&self, collection: CollectionId) -> Snapshot {
        self.collections
            .lock()
            .get(&collection)
            .map(CollectionState::snapshot)
            .unwrap_or_default()
    }

    /// Fetch a single document
    #[must_use]
    pub fn document(&self, collection: CollectionId, id: &EntityId) -> Option<Document> {
        self.collections
            .lock()
            .get(&collection)
            .and_then(|state| state.docs.get(id).cloned())
    }

    /// Live subscribers of a collection
    #[must_use]
    pub fn subscriber_count(&self, collection: CollectionId) -> usize {
        self.collections
            .lock()
            .get(&collection)
            .map_or(0, |state| state.events.receiver_count())
    }

    /// Get store statistics
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            writes: self.writes.load(Ordering::Relaxed),
            rejected_writes: self.rejected_writes.load(Ordering::Relaxed),
            subscriptions: self.subscriptions.load(Ordering::Relaxed),
        }
    }

    fn republish(&self, collection: CollectionId) {
        if let Some(state) = self.collections.lock().get(&collection) {
            state.publish();
        }
    }

    fn check_write(&self, collection: CollectionId) -> Result<(), RemoteError> {
        let checked = self.policy.read().check_write(collection);
        if checked.is_err() {
            self.rejected_writes.fetch_add(1, Ordering::Relaxed);
        }
        checked
    }

    /// Apply one operation; returns whether the collection changed
    fn apply(collections: &mut HashMap<CollectionId, CollectionState>, op: BatchOp) -> bool {
        match op {
            BatchOp::Set {
                collection,
                id,
                document,
            } => {
                let state = collections
                    .entry(collection)
                    .or_insert_with(CollectionState::new);
                state.docs.insert(id, document.clone()) != Some(document)
            }
            BatchOp::Delete { collection, id } => collections
                .get_mut(&collection)
                .is_some_and(|state| state.docs.remove(&id).is_some()),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn subscribe(&self, collection: CollectionId) -> Result<SnapshotStream, RemoteError> {
        if self.policy.read().offline {
            return Err(RemoteError::Unavailable("store is offline".into()));
        }

        let rx = self
            .collections
            .lock()
            .entry(collection)
            .or_insert_with(CollectionState::new)
            .events
            .subscribe();
        self.subscriptions.fetch_add(1, Ordering::Relaxed);

        let policy = Arc::clone(&self.policy);
        let stream = futures::stream::unfold((rx, true), move |(mut rx, first)| {
            let policy = Arc::clone(&policy);
            async move {
                if !first && rx.changed().await.is_err() {
                    return None;
                }
                let event = rx.borrow_and_update().clone();
                let item = event.and_then(|snapshot| {
                    policy.read().check_read(collection)?;
                    Ok(Snapshot::clone(&snapshot))
                });
                Some((item, (rx, false)))
            }
        });
        Ok(Box::pin(stream))
    }

    async fn set(
        &self,
        collection: CollectionId,
        id: &EntityId,
        document: Document,
    ) -> Result<(), RemoteError> {
        self.commit_ops(vec![BatchOp::Set {
            collection,
            id: id.clone(),
            document,
        }])
    }

    async fn delete(&self, collection: CollectionId, id: &EntityId) -> Result<(), RemoteError> {
        self.commit_ops(vec![BatchOp::Delete {
            collection,
            id: id.clone(),
        }])
    }

    async fn append(
        &self,
        collection: CollectionId,
        document: Document,
    ) -> Result<EntityId, RemoteError> {
        let id = EntityId::generate();
        self.commit_ops(vec![BatchOp::Set {
            collection,
            id: id.clone(),
            document,
        }])?;
        Ok(id)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), RemoteError> {
        self.commit_ops(batch.into_ops())
    }
}

impl MemoryStore {
    fn commit_ops(&self, ops: Vec<BatchOp>) -> Result<(), RemoteError> {
        for op in &ops {
            self.check_write(op.collection())?;
        }

        let count = ops.len();
        let mut collections = self.collections.lock();
        let mut touched = HashSet::new();
        for op in ops {
            let collection = op.collection();
            if Self::apply(&mut collections, op) {
                touched.insert(collection);
            }
        }
        for collection in touched {
            if let Some(state) = collections.get(&collection) {
                state.publish();
            }
        }

        self.writes.fetch_add(count, Ordering::Relaxed);
        tracing::trace!(ops = count, "memory store commit");
        Ok(())
    }
}
