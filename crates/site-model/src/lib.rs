//! Site data model
//!
//! The entities mirrored from the remote document store and edited through
//! the admin surface:
//! - **RosterMember**: committee members, held in two independent rosters
//! - **GalleryItem**: gallery pictures (external URL or inline encoded image)
//! - **SiteSettings**: the branding singleton
//! - **ContactMessage**: write-only contact form submissions
//!
//! Every entity converts to and from the remote [`Document`] shape. Writing a
//! document always produces every field, so the remote store never sees an
//! undefined value.
//!
//! # Example
//!
//! ```rust
//! use site_model::{Entity, EntityId, MemberField, RosterMember};
//!
//! let id = EntityId::parse("mc1").unwrap();
//! let mut member = RosterMember::new(id, "Basheer K", "President", "President");
//! member.apply(MemberField::Role("Patron".into()));
//!
//! let doc = member.to_document();
//! assert_eq!(doc["role"], "Patron");
//! assert_eq!(doc["image"], "");
//! ```

#![warn(missing_docs)]

pub mod collection;
pub mod defaults;
pub mod document;
pub mod entity;
pub mod error;
pub mod field;
pub mod id;
pub mod image;

pub use collection::{CollectionId, Roster};
pub use document::Document;
pub use entity::{ContactMessage, Entity, GalleryItem, RosterMember, SiteSettings, SETTINGS_KEY};
pub use error::ValidationError;
pub use field::{GalleryField, MemberField, SettingsField};
pub use id::EntityId;
pub use image::{EncodedImage, ImageRef, MAX_ENCODED_BYTES};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with site entities
    pub use crate::{
        CollectionId, ContactMessage, Document, EncodedImage, Entity, EntityId, GalleryField,
        GalleryItem, ImageRef, MemberField, Roster, RosterMember, SettingsField, SiteSettings,
        ValidationError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
