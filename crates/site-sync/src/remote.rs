//! Remote document store boundary
//!
//! The store is a set of named collections of keyed documents. Subscriptions
//! deliver a full snapshot of the collection on every change; there are no
//! incremental deltas.

use crate::error::RemoteError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use site_model::{CollectionId, Document, EntityId};
use std::sync::Arc;

/// One document as delivered by a subscription
///
/// Keys arrive unvalidated; the mirror skips keys that are not valid ids.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    /// Document key
    pub key: String,
    /// Document fields
    pub fields: Document,
}

impl RemoteDocument {
    /// Create document
    #[inline]
    #[must_use]
    pub fn new(key: impl Into<String>, fields: Document) -> Self {
        Self {
            key: key.into(),
            fields,
        }
    }
}

/// Full contents of a collection at one point in time
pub type Snapshot = Vec<RemoteDocument>;

/// Snapshot events of one subscription
///
/// A stream yields an `Err` when the store rejects or loses the
/// subscription; later items may still follow.
pub type SnapshotStream = BoxStream<'static, Result<Snapshot, RemoteError>>;

/// One operation of a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Create or replace a document
    Set {
        /// Target collection
        collection: CollectionId,
        /// Document key
        id: EntityId,
        /// Full document
        document: Document,
    },
    /// Remove a document
    Delete {
        /// Target collection
        collection: CollectionId,
        /// Document key
        id: EntityId,
    },
}

impl BatchOp {
    /// Collection the operation targets
    #[inline]
    #[must_use]
    pub fn collection(&self) -> CollectionId {
        match self {
            BatchOp::Set { collection, .. } | BatchOp::Delete { collection, .. } => *collection,
        }
    }
}

/// Writes committed atomically
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create empty batch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a set operation
    pub fn set(&mut self, collection: CollectionId, id: EntityId, document: Document) -> &mut Self {
        self.ops.push(BatchOp::Set {
            collection,
            id,
            document,
        });
        self
    }

    /// Add a delete operation
    pub fn delete(&mut self, collection: CollectionId, id: EntityId) -> &mut Self {
        self.ops.push(BatchOp::Delete { collection, id });
        self
    }

    /// Number of operations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Operations in insertion order
    #[inline]
    pub fn ops(&self) -> impl Iterator<Item = &BatchOp> {
        self.ops.iter()
    }

    /// Consume into operations
    #[inline]
    #[must_use]
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Remote document store
///
/// Implementations must be cheap to share; the context holds one behind an
/// `Arc` and hands clones to every subscription task.
#[async_trait]
pub trait RemoteStore: std::fmt::Debug + Send + Sync + 'static {
    /// Open a snapshot subscription
    ///
    /// The first item is the current contents of the collection.
    async fn subscribe(&self, collection: CollectionId) -> Result<SnapshotStream, RemoteError>;

    /// Create or fully replace a document
    async fn set(
        &self,
        collection: CollectionId,
        id: &EntityId,
        document: Document,
    ) -> Result<(), RemoteError>;

    /// Remove a document; removing a missing document succeeds
    async fn delete(&self, collection: CollectionId, id: &EntityId) -> Result<(), RemoteError>;

    /// Append a document under a store-assigned key
    async fn append(
        &self,
        collection: CollectionId,
        document: Document,
    ) -> Result<EntityId, RemoteError>;

    /// Apply every operation or none
    async fn commit(&self, batch: WriteBatch) -> Result<(), RemoteError>;
}

#[async_trait]
impl<S: RemoteStore + ?Sized> RemoteStore for Arc<S> {
    async fn subscribe(&self, collection: CollectionId) -> Result<SnapshotStream, RemoteError> {
        (**self).subscribe(collection).await
    }

    async fn set(
        &self,
        collection: CollectionId,
        id: &EntityId,
        document: Document,
    ) -> Result<(), RemoteError> {
        (**self).set(collection, id, document).await
    }

    async fn delete(&self, collection: CollectionId, id: &EntityId) -> Result<(), RemoteError> {
        (**self).delete(collection, id).await
    }

    async fn append(
        &self,
        collection: CollectionId,
        document: Document,
    ) -> Result<EntityId, RemoteError> {
        (**self).append(collection, document).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), RemoteError> {
        (**self).commit(batch).await
    }
}
