//! Testing utilities for the site workspace
//!
//! Shared fixtures, store setups and waiting helpers.

#![allow(missing_docs)]

use image::{ImageBuffer, ImageFormat, Rgb};
use site_model::{CollectionId, ContactMessage, Entity, EntityId, GalleryItem, RosterMember};
use site_sync::{AggregateView, MemoryStore, SiteConfig, SiteContext};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

pub const ADMIN_USER: &str = "tester";
pub const ADMIN_PASSWORD: &str = "secret";

/// Upper bound for any wait in a test
pub const WAIT: Duration = Duration::from_secs(5);

pub fn id(raw: &str) -> EntityId {
    EntityId::parse(raw).unwrap()
}

pub fn member(raw_id: &str, name: &str) -> RosterMember {
    RosterMember::new(id(raw_id), name, "Member", "M")
}

pub fn gallery_item(raw_id: &str, caption: &str) -> GalleryItem {
    GalleryItem::new(id(raw_id), "https://example.org/photo.jpg", caption)
}

pub fn message(name: &str) -> ContactMessage {
    ContactMessage::new(name, "visitor@example.org", "Hello from the contact form")
}

/// PNG with a smooth gradient
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 160])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn config() -> SiteConfig {
    SiteConfig::default().with_admin(ADMIN_USER, ADMIN_PASSWORD)
}

/// Store holding the given members in a roster collection
pub fn store_with_members(collection: CollectionId, members: &[RosterMember]) -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_documents(members.iter().map(|m| {
        (collection, m.id.clone(), m.to_document())
    })))
}

/// Start a logged-in context and wait until every mirror has settled
pub async fn start_admin(store: &Arc<MemoryStore>) -> SiteContext {
    let ctx = SiteContext::start(store.clone(), config());
    assert!(ctx.login(ADMIN_USER, ADMIN_PASSWORD));
    ready(&ctx).await;
    ctx
}

pub async fn ready(ctx: &SiteContext) -> AggregateView {
    tokio::time::timeout(WAIT, ctx.ready())
        .await
        .expect("mirrors did not settle in time")
}

/// Wait for a view condition, failing the test on timeout
pub async fn wait_for(
    ctx: &SiteContext,
    what: &str,
    predicate: impl Fn(&AggregateView) -> bool,
) -> AggregateView {
    match tokio::time::timeout(WAIT, ctx.wait_until(predicate)).await {
        Ok(view) => view,
        Err(_) => panic!("timed out waiting for {what}; last view: {:#?}", ctx.view()),
    }
}

pub fn ids(members: &[RosterMember]) -> Vec<String> {
    members.iter().map(|m| m.id.to_string()).collect()
}
