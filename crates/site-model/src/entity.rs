//! Site entities and their document mapping

use crate::document::{self, Document};
use crate::error::ValidationError;
use crate::id::EntityId;
use crate::image::{EncodedImage, ImageRef};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::OnceLock;

/// Fixed key of the settings singleton document
pub const SETTINGS_KEY: &str = "general";

/// An entity held in a keyed remote collection
///
/// `to_document` is the sanitizer: every field is emitted, absent optional
/// values as the empty string. `from_document` is the tolerant reverse
/// mapping used by the mirrors.
pub trait Entity: Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Human-readable kind, used in logs and errors
    const KIND: &'static str;

    /// Document key
    fn key(&self) -> &EntityId;

    /// Fully populated remote document
    fn to_document(&self) -> Document;

    /// Map a remote document, coercing missing or mistyped fields
    fn from_document(key: EntityId, doc: &Document) -> Self;

    /// Check required fields before a write
    ///
    /// # Errors
    /// Returns `ValidationError::MissingField` when a required field is empty
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

fn optional_image(doc: &Document, field: &str) -> Option<EncodedImage> {
    document::optional_text(doc, field).and_then(|v| EncodedImage::from_data_url(v).ok())
}

fn image_value(image: Option<&EncodedImage>) -> Value {
    Value::String(image.map(|i| i.as_str().to_string()).unwrap_or_default())
}

/// Committee member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterMember {
    /// Key within the roster
    pub id: EntityId,
    /// Display name
    pub name: String,
    /// Position held
    pub role: String,
    /// Placeholder text shown when there is no photo
    pub short_label: String,
    /// Inline photo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<EncodedImage>,
}

impl RosterMember {
    /// Create member without a photo
    #[must_use]
    pub fn new(
        id: EntityId,
        name: impl Into<String>,
        role: impl Into<String>,
        short_label: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            role: role.into(),
            short_label: short_label.into(),
            photo: None,
        }
    }

    /// Attach a photo
    #[must_use]
    pub fn with_photo(mut self, photo: EncodedImage) -> Self {
        self.photo = Some(photo);
        self
    }

    /// Placeholder member created by the admin "add" action
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(EntityId::generate(), "New Member", "Role", "NM")
    }
}

impl Entity for RosterMember {
    const KIND: &'static str = "roster member";

    fn key(&self) -> &EntityId {
        &self.id
    }

    fn to_document(&self) -> Document {
        document::from_pairs([
            ("id", Value::String(self.id.to_string())),
            ("name", Value::String(self.name.clone())),
            ("role", Value::String(self.role.clone())),
            ("avatarText", Value::String(self.short_label.clone())),
            ("image", image_value(self.photo.as_ref())),
        ])
    }

    fn from_document(key: EntityId, doc: &Document) -> Self {
        Self {
            id: key,
            name: document::text(doc, "name"),
            role: document::text(doc, "role"),
            short_label: document::text(doc, "avatarText"),
            photo: optional_image(doc, "image"),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.photo
            .as_ref()
            .map_or(Ok(()), |photo| photo.check_budget("image"))
    }
}

/// Gallery picture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    /// Key within the gallery
    pub id: EntityId,
    /// URL or inline image
    pub image_ref: ImageRef,
    /// Caption / alt text
    pub caption: String,
}

impl GalleryItem {
    /// Create gallery item
    #[must_use]
    pub fn new(id: EntityId, image_ref: impl Into<ImageRef>, caption: impl Into<String>) -> Self {
        Self {
            id,
            image_ref: image_ref.into(),
            caption: caption.into(),
        }
    }

    /// Placeholder item created by the admin "add" action
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(
            EntityId::generate(),
            ImageRef::Url("https://picsum.photos/seed/new/600/400".to_string()),
            "New Event",
        )
    }
}

impl Entity for GalleryItem {
    const KIND: &'static str = "gallery item";

    fn key(&self) -> &EntityId {
        &self.id
    }

    fn to_document(&self) -> Document {
        document::from_pairs([
            ("id", Value::String(self.id.to_string())),
            ("src", Value::String(self.image_ref.as_str().to_string())),
            ("alt", Value::String(self.caption.clone())),
        ])
    }

    fn from_document(key: EntityId, doc: &Document) -> Self {
        Self {
            id: key,
            image_ref: ImageRef::parse(&document::text(doc, "src")),
            caption: document::text(doc, "alt"),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.image_ref.as_str().is_empty() {
            return Err(ValidationError::MissingField {
                entity: Self::KIND,
                field: "src",
            });
        }
        match &self.image_ref {
            ImageRef::Encoded(image) => image.check_budget("src"),
            ImageRef::Url(_) => Ok(()),
        }
    }
}

fn settings_key() -> &'static EntityId {
    static KEY: OnceLock<EntityId> = OnceLock::new();
    KEY.get_or_init(|| EntityId::from_static(SETTINGS_KEY))
}

/// Site branding singleton
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    /// Site title
    pub title: String,
    /// Inline logo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<EncodedImage>,
    /// Inline favicon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<EncodedImage>,
}

impl SiteSettings {
    /// Create settings with a title only
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            logo: None,
            favicon: None,
        }
    }

    /// The fixed document key, as an owned id
    #[must_use]
    pub fn default_key() -> EntityId {
        settings_key().clone()
    }
}

impl Entity for SiteSettings {
    const KIND: &'static str = "site settings";

    fn key(&self) -> &EntityId {
        settings_key()
    }

    fn to_document(&self) -> Document {
        document::from_pairs([
            ("title", Value::String(self.title.clone())),
            ("logo", image_value(self.logo.as_ref())),
            ("favicon", image_value(self.favicon.as_ref())),
        ])
    }

    fn from_document(_key: EntityId, doc: &Document) -> Self {
        Self {
            title: document::text(doc, "title"),
            logo: optional_image(doc, "logo"),
            favicon: optional_image(doc, "favicon"),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        for (field, image) in [("logo", &self.logo), ("favicon", &self.favicon)] {
            if let Some(image) = image {
                image.check_budget(field)?;
            }
        }
        Ok(())
    }
}

/// Contact form submission (append-only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    /// Sender's name
    pub sender_name: String,
    /// Sender's email address
    pub sender_email: String,
    /// Message text
    pub body: String,
    /// Submission time
    pub submitted_at: DateTime<Utc>,
}

impl ContactMessage {
    /// Create a message stamped with the current time
    #[must_use]
    pub fn new(
        sender_name: impl Into<String>,
        sender_email: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            sender_name: sender_name.into(),
            sender_email: sender_email.into(),
            body: body.into(),
            submitted_at: Utc::now(),
        }
    }

    /// Remote document; the timestamp is stored as epoch milliseconds
    #[must_use]
    pub fn to_document(&self) -> Document {
        document::from_pairs([
            ("name", Value::String(self.sender_name.trim().to_string())),
            ("email", Value::String(self.sender_email.trim().to_string())),
            ("message", Value::String(self.body.clone())),
            ("timestamp", Value::from(self.submitted_at.timestamp_millis())),
        ])
    }

    /// Reverse mapping, used for local dumps and tests
    #[must_use]
    pub fn from_document(doc: &Document) -> Self {
        Self {
            sender_name: document::text(doc, "name"),
            sender_email: document::text(doc, "email"),
            body: document::text(doc, "message"),
            submitted_at: Utc
                .timestamp_millis_opt(document::millis(doc, "timestamp"))
                .single()
                .unwrap_or_default(),
        }
    }

    /// All three form fields are required and the email must look like one
    ///
    /// # Errors
    /// Returns `ValidationError::MissingField` naming the first bad field
    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing = |field| ValidationError::MissingField {
            entity: "contact message",
            field,
        };
        if self.sender_name.trim().is_empty() {
            return Err(missing("name"));
        }
        if !self.sender_email.contains('@') {
            return Err(missing("email"));
        }
        if self.body.trim().is_empty() {
            return Err(missing("message"));
        }
        Ok(())
    }
}
