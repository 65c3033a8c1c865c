//! Write path with local fallback
//!
//! Every admin edit is validated, sanitized into a full document and sent to
//! the remote store. On success the remote echo updates the mirror through
//! its subscription. On failure the coordinator records the error and applies
//! the same change to the mirror directly, so the edit stays visible for the
//! rest of the session. Remote failures are never returned as `Err`: callers
//! get a [`WriteOutcome`] telling them whether the change was persisted.

use crate::error::{ErrorKind, RemoteError, SyncResult, SystemError};
use crate::mirror::CollectionMirror;
use crate::remote::RemoteStore;
use crate::view::{ErrorState, SiteMirrors};
use parking_lot::Mutex;
use serde::Serialize;
use site_image::{ImageIngestor, SizePreset};
use site_model::{
    CollectionId, ContactMessage, EncodedImage, Entity, EntityId, GalleryField, GalleryItem, ImageRef,
    MemberField, Roster, RosterMember, SettingsField, SiteSettings, ValidationError,
};
use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of unsent contact messages kept locally
pub const DEFAULT_OUTBOX_CAPACITY: usize = 100;

/// Whether a write reached the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "kind")]
pub enum WriteOutcome {
    /// Remote store accepted the write
    Persisted,
    /// Remote store rejected the write; applied to the local mirror only
    LocalOnly(ErrorKind),
}

impl WriteOutcome {
    /// Check if the write reached the remote store
    #[inline]
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        matches!(self, WriteOutcome::Persisted)
    }
}

/// Coordinates admin writes
#[derive(Debug)]
pub struct WriteCoordinator {
    store: Arc<dyn RemoteStore>,
    mirrors: Arc<SiteMirrors>,
    errors: ErrorState,
    ingestor: ImageIngestor,
    outbox: Mutex<VecDeque<ContactMessage>>,
    outbox_capacity: usize,
}

impl WriteCoordinator {
    /// Create coordinator
    #[must_use]
    pub fn new(
        store: Arc<dyn RemoteStore>,
        mirrors: Arc<SiteMirrors>,
        errors: ErrorState,
        ingestor: ImageIngestor,
    ) -> Self {
        Self {
            store,
            mirrors,
            errors,
            ingestor,
            outbox: Mutex::new(VecDeque::new()),
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
        }
    }

    /// With outbox capacity (at least 1)
    #[must_use]
    pub fn with_outbox_capacity(mut self, capacity: usize) -> Self {
        self.outbox_capacity = capacity.max(1);
        self
    }

    /// Image ingestor used by the attach operations
    #[inline]
    #[must_use]
    pub fn ingestor(&self) -> &ImageIngestor {
        &self.ingestor
    }

    /// Create or replace a member
    ///
    /// # Errors
    /// `Validation` if the member fails validation; nothing is written
    pub async fn save_member(
        &self,
        roster: Roster,
        member: RosterMember,
    ) -> SyncResult<WriteOutcome> {
        self.save(self.mirrors.roster(roster), member).await
    }

    /// Remove a member
    ///
    /// # Errors
    /// Never fails; kept fallible for symmetry with the other writes
    pub async fn delete_member(&self, roster: Roster, id: &EntityId) -> SyncResult<WriteOutcome> {
        self.delete(self.mirrors.roster(roster), id).await
    }

    /// Change one field of an existing member
    ///
    /// # Errors
    /// `Validation` if the member is not in the mirror
    pub async fn update_member(
        &self,
        roster: Roster,
        id: &EntityId,
        field: MemberField,
    ) -> SyncResult<WriteOutcome> {
        let mirror = self.mirrors.roster(roster);
        let mut member = Self::existing(mirror, id)?;
        member.apply(field);
        self.save(mirror, member).await
    }

    /// Add a placeholder member with a fresh id
    ///
    /// # Errors
    /// As [`WriteCoordinator::save_member`]
    pub async fn create_member(&self, roster: Roster) -> SyncResult<(EntityId, WriteOutcome)> {
        let member = RosterMember::placeholder();
        let id = member.id.clone();
        let outcome = self.save_member(roster, member).await?;
        Ok((id, outcome))
    }

    /// Ingest a photo and set it on a member
    ///
    /// # Errors
    /// `Image` if the upload cannot be ingested, `Validation` if the member is
    /// unknown; nothing is written in either case
    pub async fn attach_member_photo(
        &self,
        roster: Roster,
        id: &EntityId,
        bytes: Vec<u8>,
    ) -> SyncResult<WriteOutcome> {
        Self::existing(self.mirrors.roster(roster), id)?;
        let photo = self.ingest(bytes, SizePreset::Photo).await?;
        self.update_member(roster, id, MemberField::Photo(Some(photo)))
            .await
    }

    /// Create or replace a gallery item
    ///
    /// # Errors
    /// `Validation` if the item has no image source
    pub async fn save_gallery_item(&self, item: GalleryItem) -> SyncResult<WriteOutcome> {
        self.save(&self.mirrors.gallery, item).await
    }

    /// Remove a gallery item
    ///
    /// # Errors
    /// Never fails; kept fallible for symmetry with the other writes
    pub async fn delete_gallery_item(&self, id: &EntityId) -> SyncResult<WriteOutcome> {
        self.delete(&self.mirrors.gallery, id).await
    }

    /// Change one field of an existing gallery item
    ///
    /// # Errors
    /// `Validation` if the item is unknown or the result has no image source
    pub async fn update_gallery_item(
        &self,
        id: &EntityId,
        field: GalleryField,
    ) -> SyncResult<WriteOutcome> {
        let mut item = Self::existing(&self.mirrors.gallery, id)?;
        item.apply(field);
        self.save(&self.mirrors.gallery, item).await
    }

    /// Add a placeholder gallery item with a fresh id
    ///
    /// # Errors
    /// As [`WriteCoordinator::save_gallery_item`]
    pub async fn create_gallery_item(&self) -> SyncResult<(EntityId, WriteOutcome)> {
        let item = GalleryItem::placeholder();
        let id = item.id.clone();
        let outcome = self.save_gallery_item(item).await?;
        Ok((id, outcome))
    }

    /// Ingest a picture and make it the item's image source
    ///
    /// # Errors
    /// `Image` if the upload cannot be ingested, `Validation` if the item is
    /// unknown
    pub async fn attach_gallery_image(
        &self,
        id: &EntityId,
        bytes: Vec<u8>,
    ) -> SyncResult<WriteOutcome> {
        Self::existing(&self.mirrors.gallery, id)?;
        let image = self.ingest(bytes, SizePreset::Photo).await?;
        self.update_gallery_item(id, GalleryField::ImageRef(ImageRef::Encoded(image)))
            .await
    }

    /// Replace the settings singleton
    ///
    /// # Errors
    /// Never fails for well-formed settings
    pub async fn save_settings(&self, settings: SiteSettings) -> SyncResult<WriteOutcome> {
        self.save(&self.mirrors.settings, settings).await
    }

    /// Change one settings field, starting from the defaults if none are stored
    ///
    /// # Errors
    /// As [`WriteCoordinator::save_settings`]
    pub async fn update_settings(&self, field: SettingsField) -> SyncResult<WriteOutcome> {
        let mut settings = self.mirrors.current_settings();
        settings.apply(field);
        self.save_settings(settings).await
    }

    /// Ingest a logo (photo preset)
    ///
    /// # Errors
    /// `Image` if the upload cannot be ingested
    pub async fn attach_logo(&self, bytes: Vec<u8>) -> SyncResult<WriteOutcome> {
        let logo = self.ingest(bytes, SizePreset::Photo).await?;
        self.update_settings(SettingsField::Logo(Some(logo))).await
    }

    /// Ingest a favicon (icon preset)
    ///
    /// # Errors
    /// `Image` if the upload cannot be ingested
    pub async fn attach_favicon(&self, bytes: Vec<u8>) -> SyncResult<WriteOutcome> {
        let favicon = self.ingest(bytes, SizePreset::Icon).await?;
        self.update_settings(SettingsField::Favicon(Some(favicon)))
            .await
    }

    /// Append a contact message
    ///
    /// Messages are not mirrored. A message the store rejects is kept in a
    /// bounded local outbox; the oldest entry is dropped when it is full.
    ///
    /// # Errors
    /// `Validation` if a form field is missing
    pub async fn submit_message(&self, message: ContactMessage) -> SyncResult<WriteOutcome> {
        message.validate()?;
        let collection = CollectionId::Messages;

        match self.store.append(collection, message.to_document()).await {
            Ok(id) => {
                tracing::info!(%id, "contact message stored");
                self.errors.clear();
                Ok(WriteOutcome::Persisted)
            }
            Err(error) => {
                let kind = self.record_failure(collection, &error);
                let mut outbox = self.outbox.lock();
                if outbox.len() >= self.outbox_capacity {
                    outbox.pop_front();
                }
                outbox.push_back(message);
                Ok(WriteOutcome::LocalOnly(kind))
            }
        }
    }

    /// Messages the store rejected, oldest first
    #[must_use]
    pub fn outbox(&self) -> Vec<ContactMessage> {
        self.outbox.lock().iter().cloned().collect()
    }

    /// Restore a persisted outbox, keeping the newest entries
    pub fn restore_outbox(&self, messages: Vec<ContactMessage>) {
        let mut outbox = self.outbox.lock();
        outbox.extend(messages);
        while outbox.len() > self.outbox_capacity {
            outbox.pop_front();
        }
    }

    /// Encode an upload without writing anything
    ///
    /// # Errors
    /// `Image` with `Decode` or `PayloadTooLarge`
    pub async fn ingest(&self, bytes: Vec<u8>, preset: SizePreset) -> SyncResult<EncodedImage> {
        Ok(self.ingestor.ingest(bytes, preset).await?)
    }

    fn existing<E: Entity>(mirror: &CollectionMirror<E>, id: &EntityId) -> SyncResult<E> {
        mirror
            .get(id)
            .ok_or_else(|| ValidationError::unknown_entity(E::KIND, id.as_str()).into())
    }

    async fn save<E: Entity>(
        &self,
        mirror: &CollectionMirror<E>,
        entity: E,
    ) -> SyncResult<WriteOutcome> {
        entity.validate()?;
        let collection = mirror.collection();

        match self
            .store
            .set(collection, entity.key(), entity.to_document())
            .await
        {
            Ok(()) => {
                tracing::debug!(%collection, id = %entity.key(), "write persisted");
                self.errors.clear();
                Ok(WriteOutcome::Persisted)
            }
            Err(error) => {
                let kind = self.record_failure(collection, &error);
                mirror.upsert_local(entity);
                Ok(WriteOutcome::LocalOnly(kind))
            }
        }
    }

    async fn delete<E: Entity>(
        &self,
        mirror: &CollectionMirror<E>,
        id: &EntityId,
    ) -> SyncResult<WriteOutcome> {
        let collection = mirror.collection();

        match self.store.delete(collection, id).await {
            Ok(()) => {
                tracing::debug!(%collection, %id, "delete persisted");
                self.errors.clear();
                Ok(WriteOutcome::Persisted)
            }
            Err(error) => {
                let kind = self.record_failure(collection, &error);
                mirror.remove_local(id);
                Ok(WriteOutcome::LocalOnly(kind))
            }
        }
    }

    fn record_failure(&self, collection: CollectionId, error: &RemoteError) -> ErrorKind {
        tracing::warn!(%collection, %error, "remote write failed, keeping change locally");
        self.errors.record(SystemError::from_remote(collection, error));
        error.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::remote::RemoteDocument;
    use crate::view::ViewNotifier;
    use crate::SyncError;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use site_model::defaults;
    use std::io::Cursor;

    struct Fixture {
        store: Arc<MemoryStore>,
        mirrors: Arc<SiteMirrors>,
        errors: ErrorState,
        coordinator: WriteCoordinator,
    }

    fn fixture() -> Fixture {
        let notifier = ViewNotifier::new();
        let store = Arc::new(MemoryStore::new());
        let mirrors = Arc::new(SiteMirrors::new(&notifier));
        let errors = ErrorState::new(notifier);
        let coordinator = WriteCoordinator::new(
            store.clone(),
            mirrors.clone(),
            errors.clone(),
            ImageIngestor::default(),
        );
        Fixture {
            store,
            mirrors,
            errors,
            coordinator,
        }
    }

    fn id(raw: &str) -> EntityId {
        EntityId::parse(raw).unwrap()
    }

    fn png() -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(1200, 600, |x, y| Rgb([x as u8, y as u8, 90]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn seed_mirror(fx: &Fixture) {
        let docs = defaults::main_roster()
            .into_iter()
            .map(|m| RemoteDocument::new(m.id.as_str(), m.to_document()))
            .collect();
        fx.mirrors.main.apply_snapshot(docs);
    }

    #[tokio::test]
    async fn successful_save_writes_full_document() {
        let fx = fixture();
        let member = RosterMember::new(id("mc1"), "A", "President", "P");

        let outcome = fx.coordinator.save_member(Roster::Main, member).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Persisted);

        let stored = fx
            .store
            .document(CollectionId::MainRoster, &id("mc1"))
            .unwrap();
        assert_eq!(stored["image"], "");
        assert_eq!(stored["avatarText"], "P");
        // Mirror is updated by the subscription echo, not by the coordinator
        assert!(fx.mirrors.main.is_empty());
    }

    #[tokio::test]
    async fn denied_save_falls_back_locally() {
        let fx = fixture();
        fx.store.deny_writes(CollectionId::MainRoster);

        let member = RosterMember::new(id("mc5"), "B", "Member", "M");
        let outcome = fx
            .coordinator
            .save_member(Roster::Main, member.clone())
            .await
            .unwrap();

        assert_eq!(outcome, WriteOutcome::LocalOnly(ErrorKind::PermissionDenied));
        assert_eq!(fx.mirrors.main.get(&id("mc5")), Some(member));
        assert_eq!(
            fx.errors.current().map(|e| e.kind),
            Some(ErrorKind::PermissionDenied)
        );
        assert!(fx.store.documents(CollectionId::MainRoster).is_empty());
    }

    #[tokio::test]
    async fn success_clears_recorded_error() {
        let fx = fixture();
        fx.store.deny_writes(CollectionId::Gallery);
        fx.coordinator
            .save_gallery_item(GalleryItem::placeholder())
            .await
            .unwrap();
        assert!(fx.errors.current().is_some());

        fx.store.allow_writes(CollectionId::Gallery);
        fx.coordinator
            .save_gallery_item(GalleryItem::placeholder())
            .await
            .unwrap();
        assert!(fx.errors.current().is_none());
    }

    #[tokio::test]
    async fn denied_delete_removes_locally() {
        let fx = fixture();
        seed_mirror(&fx);
        fx.store.set_offline(true);

        let outcome = fx
            .coordinator
            .delete_member(Roster::Main, &id("mc2"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WriteOutcome::LocalOnly(ErrorKind::TransientRemoteFailure)
        );
        assert!(fx.mirrors.main.get(&id("mc2")).is_none());
        assert_eq!(fx.mirrors.main.len(), 3);
    }

    #[tokio::test]
    async fn update_of_unknown_entity_is_validation_error() {
        let fx = fixture();
        let err = fx
            .coordinator
            .update_member(Roster::Main, &id("ghost"), MemberField::Name("x".into()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Validation(ValidationError::UnknownEntity { .. })
        ));
        assert_eq!(fx.store.stats().writes, 0);
    }

    #[tokio::test]
    async fn update_changes_one_field() {
        let fx = fixture();
        seed_mirror(&fx);
        fx.coordinator
            .update_member(Roster::Main, &id("mc3"), MemberField::Role("Auditor".into()))
            .await
            .unwrap();

        let stored = fx
            .store
            .document(CollectionId::MainRoster, &id("mc3"))
            .unwrap();
        assert_eq!(stored["role"], "Auditor");
        assert_eq!(stored["name"], "Yasar");
    }

    #[tokio::test]
    async fn invalid_gallery_item_is_rejected_before_write() {
        let fx = fixture();
        let item = GalleryItem::new(id("g9"), ImageRef::default(), "no source");
        let err = fx.coordinator.save_gallery_item(item).await.unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
        assert_eq!(fx.store.stats().writes + fx.store.stats().rejected_writes, 0);
    }

    #[tokio::test]
    async fn create_member_uses_placeholder() {
        let fx = fixture();
        let (new_id, outcome) = fx.coordinator.create_member(Roster::Secondary).await.unwrap();
        assert!(outcome.is_persisted());

        let stored = fx
            .store
            .document(CollectionId::SecondaryRoster, &new_id)
            .unwrap();
        assert_eq!(stored["name"], "New Member");
    }

    #[tokio::test]
    async fn update_settings_starts_from_defaults() {
        let fx = fixture();
        fx.coordinator
            .update_settings(SettingsField::Title("Renamed".into()))
            .await
            .unwrap();

        let stored = fx
            .store
            .document(CollectionId::Settings, &SiteSettings::default_key())
            .unwrap();
        assert_eq!(stored["title"], "Renamed");
        assert_eq!(stored["logo"], "");
    }

    #[tokio::test]
    async fn attach_favicon_uses_icon_preset() {
        let fx = fixture();
        fx.coordinator.attach_favicon(png()).await.unwrap();

        let stored = fx
            .store
            .document(CollectionId::Settings, &SiteSettings::default_key())
            .unwrap();
        let favicon = EncodedImage::from_data_url(stored["favicon"].as_str().unwrap()).unwrap();
        let decoded = site_image::decode_encoded(&favicon).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (128, 64));
    }

    #[tokio::test]
    async fn undecodable_upload_writes_nothing() {
        let fx = fixture();
        seed_mirror(&fx);
        let err = fx
            .coordinator
            .attach_member_photo(Roster::Main, &id("mc1"), b"not an image".to_vec())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::DecodeFailure));
        assert_eq!(fx.store.stats().writes, 0);
        assert!(fx.errors.current().is_none());
    }

    #[tokio::test]
    async fn attach_member_photo_sets_photo() {
        let fx = fixture();
        seed_mirror(&fx);
        fx.coordinator
            .attach_member_photo(Roster::Main, &id("mc1"), png())
            .await
            .unwrap();

        let stored = fx
            .store
            .document(CollectionId::MainRoster, &id("mc1"))
            .unwrap();
        assert!(stored["image"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn rejected_messages_go_to_bounded_outbox() {
        let fx = fixture();
        let coordinator = WriteCoordinator::new(
            fx.store.clone(),
            fx.mirrors.clone(),
            fx.errors.clone(),
            ImageIngestor::default(),
        )
        .with_outbox_capacity(2);
        fx.store.deny_writes(CollectionId::Messages);

        for n in 0..3 {
            let msg = ContactMessage::new(format!("n{n}"), "a@b.c", "hello");
            let outcome = coordinator.submit_message(msg).await.unwrap();
            assert_eq!(outcome, WriteOutcome::LocalOnly(ErrorKind::PermissionDenied));
        }

        let names: Vec<_> = coordinator
            .outbox()
            .into_iter()
            .map(|m| m.sender_name)
            .collect();
        assert_eq!(names, vec!["n1", "n2"]);
    }

    #[tokio::test]
    async fn invalid_message_is_rejected() {
        let fx = fixture();
        let err = fx
            .coordinator
            .submit_message(ContactMessage::new("", "a@b.c", "hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ValidationFailure));
        assert!(fx.store.documents(CollectionId::Messages).is_empty());
    }

    #[test]
    fn outcome_serializes_tagged() {
        let json = serde_json::to_value(WriteOutcome::LocalOnly(ErrorKind::PermissionDenied)).unwrap();
        assert_eq!(json["status"], "localOnly");
        assert_eq!(json["kind"], "permission-denied");
    }

    #[tokio::test]
    async fn oversized_inline_image_writes_nothing() {
        let fx = fixture();
        seed_mirror(&fx);
        let photo = EncodedImage::from_base64("image/jpeg", &"A".repeat(2 * 1024 * 1024));
        let member = RosterMember::new(id("mc1"), "A", "President", "P").with_photo(photo.clone());

        let err = fx
            .coordinator
            .save_member(Roster::Main, member)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::PayloadTooLarge));

        let err = fx
            .coordinator
            .update_settings(SettingsField::Logo(Some(photo)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::PayloadTooLarge));

        assert_eq!(fx.store.stats().writes, 0);
        assert_eq!(fx.store.stats().rejected_writes, 0);
        assert!(fx.errors.current().is_none());
        assert!(fx.mirrors.main.get(&id("mc1")).unwrap().photo.is_none());
    }
}
