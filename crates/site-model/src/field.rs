//! Tagged field updates
//!
//! Each entity has a closed set of editable fields. An edit in the admin
//! surface is one variant carrying the new, already typed value.

use crate::entity::{GalleryItem, RosterMember, SiteSettings};
use crate::image::{EncodedImage, ImageRef};

/// Editable field of a [`RosterMember`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberField {
    /// Display name
    Name(String),
    /// Position held
    Role(String),
    /// Placeholder label
    ShortLabel(String),
    /// Photo; `None` removes it
    Photo(Option<EncodedImage>),
}

/// Editable field of a [`GalleryItem`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryField {
    /// Picture source
    ImageRef(ImageRef),
    /// Caption
    Caption(String),
}

/// Editable field of [`SiteSettings`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsField {
    /// Site title
    Title(String),
    /// Logo; `None` removes it
    Logo(Option<EncodedImage>),
    /// Favicon; `None` removes it
    Favicon(Option<EncodedImage>),
}

impl RosterMember {
    /// Apply one field update in place
    pub fn apply(&mut self, field: MemberField) {
        match field {
            MemberField::Name(name) => self.name = name,
            MemberField::Role(role) => self.role = role,
            MemberField::ShortLabel(label) => self.short_label = label,
            MemberField::Photo(photo) => self.photo = photo,
        }
    }
}

impl GalleryItem {
    /// Apply one field update in place
    pub fn apply(&mut self, field: GalleryField) {
        match field {
            GalleryField::ImageRef(image_ref) => self.image_ref = image_ref,
            GalleryField::Caption(caption) => self.caption = caption,
        }
    }
}

impl SiteSettings {
    /// Apply one field update in place
    pub fn apply(&mut self, field: SettingsField) {
        match field {
            SettingsField::Title(title) => self.title = title,
            SettingsField::Logo(logo) => self.logo = logo,
            SettingsField::Favicon(favicon) => self.favicon = favicon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityId;

    #[test]
    fn member_fields_touch_only_their_slot() {
        let mut member = RosterMember::new(EntityId::parse("m1").unwrap(), "A", "B", "C");
        member.apply(MemberField::Role("Treasurer".into()));
        assert_eq!(member.name, "A");
        assert_eq!(member.role, "Treasurer");
        assert_eq!(member.short_label, "C");

        let photo = EncodedImage::from_base64("image/jpeg", "QUJD");
        member.apply(MemberField::Photo(Some(photo.clone())));
        assert_eq!(member.photo, Some(photo));
        member.apply(MemberField::Photo(None));
        assert_eq!(member.photo, None);
    }

    #[test]
    fn gallery_fields() {
        let mut item = GalleryItem::placeholder();
        item.apply(GalleryField::Caption("Sports meet".into()));
        item.apply(GalleryField::ImageRef(ImageRef::Url("https://x/y.jpg".into())));
        assert_eq!(item.caption, "Sports meet");
        assert_eq!(item.image_ref.as_str(), "https://x/y.jpg");
    }

    #[test]
    fn settings_fields() {
        let mut settings = SiteSettings::new("Old");
        settings.apply(SettingsField::Title("New".into()));
        settings.apply(SettingsField::Favicon(Some(EncodedImage::from_base64(
            "image/jpeg",
            "QUJD",
        ))));
        assert_eq!(settings.title, "New");
        assert!(settings.favicon.is_some());
        assert!(settings.logo.is_none());
    }
}
