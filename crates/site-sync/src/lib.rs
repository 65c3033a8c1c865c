//! Remote mirror and write coordination for the community site
//!
//! The site's content lives in a remote document store. This crate keeps a
//! local, always-renderable copy of it and routes admin edits back:
//!
//! - **Collection mirrors** subscribe once per collection and replace their
//!   contents with every full snapshot. On a subscription error they show the
//!   canonical defaults instead of going blank.
//! - **Seeder** writes the defaults into a collection the first time this
//!   session sees it empty, and never again.
//! - **Write coordinator** sends sanitized documents to the store. When the
//!   store rejects a write, the change is applied to the local mirror and the
//!   error is recorded, so the edit stays visible.
//! - **Aggregate view** combines the mirrors, a loading flag and the most
//!   recent error into one snapshot for the presentation layer.
//!
//! [`SiteContext`] owns all of it with an explicit `start`/`shutdown`
//! lifecycle.
//!
//! # Example
//!
//! ```rust
//! use site_sync::{MemoryStore, SiteConfig, SiteContext};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Arc::new(MemoryStore::new());
//! let ctx = SiteContext::start(store, SiteConfig::default());
//!
//! // First visit against an empty store: the defaults get seeded
//! let view = ctx.wait_until(|v| v.main_roster.len() == 4).await;
//! assert_eq!(view.main_roster[0].id.as_str(), "mc1");
//!
//! ctx.shutdown().await;
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod auth;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod dump;
pub mod error;
pub mod memory;
pub mod mirror;
pub mod remote;
pub mod seeder;
pub mod view;

pub use auth::{AdminGate, ViewMode};
pub use config::{AdminConfig, ImageConfig, SiteConfig};
pub use context::SiteContext;
pub use coordinator::{WriteCoordinator, WriteOutcome, DEFAULT_OUTBOX_CAPACITY};
pub use dump::LocalDump;
pub use error::{ErrorKind, RemoteError, SyncError, SyncResult, SystemError};
pub use memory::{MemoryStore, StoreStats};
pub use mirror::{CollectionMirror, MirrorPhase, MirrorShape, SnapshotReport};
pub use remote::{BatchOp, RemoteDocument, RemoteStore, Snapshot, SnapshotStream, WriteBatch};
pub use seeder::{SeedGate, SeedOutcome, Seeder};
pub use view::{AggregateView, ErrorState, SiteMirrors, ViewNotifier};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
