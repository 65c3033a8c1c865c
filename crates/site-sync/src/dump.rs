//! Local dump of the aggregate view
//!
//! Written on demand and loaded at startup so a session has content before
//! the first snapshots arrive. A dump never overrides a mirror that has
//! already synced.

use crate::error::SyncResult;
use crate::view::AggregateView;
use serde::{Deserialize, Serialize};
use site_model::{ContactMessage, GalleryItem, RosterMember, SiteSettings};
use std::path::Path;

/// Serializable copy of the site content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDump {
    /// Main committee
    pub main_roster: Vec<RosterMember>,
    /// Secondary committee
    pub secondary_roster: Vec<RosterMember>,
    /// Gallery
    pub gallery: Vec<GalleryItem>,
    /// Settings
    pub settings: SiteSettings,
    /// Contact messages the store rejected
    #[serde(default)]
    pub outbox: Vec<ContactMessage>,
}

impl LocalDump {
    /// Capture a view and the current outbox
    #[must_use]
    pub fn capture(view: &AggregateView, outbox: Vec<ContactMessage>) -> Self {
        Self {
            main_roster: view.main_roster.clone(),
            secondary_roster: view.secondary_roster.clone(),
            gallery: view.gallery.clone(),
            settings: view.settings.clone(),
            outbox,
        }
    }

    /// Write as pretty JSON
    ///
    /// # Errors
    /// `Serialization` or `Io`
    pub async fn write(&self, path: impl AsRef<Path>) -> SyncResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path.as_ref(), json).await?;
        tracing::debug!(path = %path.as_ref().display(), "local dump written");
        Ok(())
    }

    /// Read a dump written by [`LocalDump::write`]
    ///
    /// # Errors
    /// `Io` if the file cannot be read, `Serialization` if it does not parse
    pub async fn read(path: impl AsRef<Path>) -> SyncResult<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
