//! Canonical default content
//!
//! Seeded once into empty remote collections, and shown locally whenever a
//! collection cannot be read.

use crate::entity::{GalleryItem, RosterMember, SiteSettings};
use crate::id::EntityId;
use crate::image::ImageRef;

/// Title shown until settings are edited
pub const DEFAULT_TITLE: &str = "Vadakara NRI Forum Abu Dhabi";

fn member(id: &'static str, name: &str, role: &str, label: &str) -> RosterMember {
    RosterMember::new(EntityId::from_static(id), name, role, label)
}

/// Main committee defaults, `mc1..mc4`
#[must_use]
pub fn main_roster() -> Vec<RosterMember> {
    vec![
        member("mc1", "Basheer K", "President", "President"),
        member("mc2", "Sreejith", "General Secretary", "Secretary"),
        member("mc3", "Yasar", "Treasurer", "Treasurer"),
        member("mc4", "Member Name", "Vice President", "Vice President"),
    ]
}

/// Secondary committee defaults, `bc1..bc4`
#[must_use]
pub fn secondary_roster() -> Vec<RosterMember> {
    vec![
        member("bc1", "Minha Riyas", "President", "BV President"),
        member("bc2", "Hishaan Vikas", "General Secretary", "BV Secretary"),
        member("bc3", "Shabeeb", "Vice president", "BV V.President"),
        member("bc4", "Iftin Arafath", "Join secretary", "BV J.Secretary"),
    ]
}

/// Gallery defaults, `g1..g8`
#[must_use]
pub fn gallery() -> Vec<GalleryItem> {
    const ITEMS: [(&str, &str); 8] = [
        ("g1", "Community event 1"),
        ("g2", "Cultural program"),
        ("g3", "Sports meet"),
        ("g4", "Social gathering"),
        ("g5", "Charity initiative"),
        ("g6", "Educational seminar"),
        ("g7", "Annual celebration"),
        ("g8", "Members meeting"),
    ];
    ITEMS
        .into_iter()
        .enumerate()
        .map(|(n, (id, caption))| {
            GalleryItem::new(
                EntityId::from_static(id),
                ImageRef::Url(format!("https://picsum.photos/seed/event{}/600/400", n + 1)),
                caption,
            )
        })
        .collect()
}

/// Settings substituted while none are stored remotely
#[must_use]
pub fn settings() -> SiteSettings {
    SiteSettings::new(DEFAULT_TITLE)
}
