//! First-visit seeding against the in-memory store

use pretty_assertions::assert_eq;
use site_model::{defaults, CollectionId, RosterMember};
use site_sync::{SeedGate, SiteContext};
use site_test_utils::{config, ids, member, ready, store_with_members, wait_for};
use std::sync::Arc;

#[tokio::test]
async fn empty_store_is_seeded_with_sorted_defaults() {
    let store = Arc::new(site_sync::MemoryStore::new());
    let ctx = SiteContext::start(store.clone(), config());

    let view = wait_for(&ctx, "seeded rosters and gallery", |v| {
        v.main_roster.len() == 4 && v.secondary_roster.len() == 4 && v.gallery.len() == 8
    })
    .await;

    assert_eq!(ids(&view.main_roster), vec!["mc1", "mc2", "mc3", "mc4"]);
    assert_eq!(ids(&view.secondary_roster), vec!["bc1", "bc2", "bc3", "bc4"]);
    assert_eq!(view.main_roster, defaults::main_roster());
    assert!(view.last_error.is_none());

    // Settings are never written, only substituted
    assert!(store.documents(CollectionId::Settings).is_empty());
    assert_eq!(view.settings, defaults::settings());

    ctx.shutdown().await;
}

#[tokio::test]
async fn populated_collection_is_left_alone() {
    let store = store_with_members(CollectionId::MainRoster, &[member("zz", "Existing")]);
    let ctx = SiteContext::start(store.clone(), config());

    let view = wait_for(&ctx, "secondary roster seeded", |v| {
        !v.loading && v.secondary_roster.len() == 4
    })
    .await;
    assert_eq!(ids(&view.main_roster), vec!["zz"]);
    assert_eq!(ctx.seeder().gate(CollectionId::MainRoster), SeedGate::Populated);
    assert_eq!(store.documents(CollectionId::MainRoster).len(), 1);

    ctx.shutdown().await;
}

#[tokio::test]
async fn second_session_does_not_reseed() {
    let store = Arc::new(site_sync::MemoryStore::new());

    let first = SiteContext::start(store.clone(), config());
    wait_for(&first, "first seed", |v| {
        v.main_roster.len() == 4 && v.secondary_roster.len() == 4 && v.gallery.len() == 8
    })
    .await;
    first.shutdown().await;
    let writes_after_seed = store.stats().writes;
    assert_eq!(writes_after_seed, 4 + 4 + 8);

    let second = SiteContext::start(store.clone(), config());
    ready(&second).await;
    assert_eq!(second.seeder().gate(CollectionId::Gallery), SeedGate::Populated);
    assert_eq!(store.stats().writes, writes_after_seed);
    second.shutdown().await;
}

#[tokio::test]
async fn concurrent_sessions_converge_on_one_default_set() {
    let store = Arc::new(site_sync::MemoryStore::new());
    let a = SiteContext::start(store.clone(), config());
    let b = SiteContext::start(store.clone(), config());

    wait_for(&a, "session a seeded", |v| v.main_roster.len() == 4).await;
    wait_for(&b, "session b seeded", |v| v.main_roster.len() == 4).await;

    let stored: Vec<_> = store
        .documents(CollectionId::MainRoster)
        .into_iter()
        .map(|d| d.key)
        .collect();
    assert_eq!(stored, vec!["mc1", "mc2", "mc3", "mc4"]);

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn failed_seed_is_silent_and_shows_defaults() {
    let store = Arc::new(site_sync::MemoryStore::new());
    store.deny_all_writes();
    let ctx = SiteContext::start(store.clone(), config());

    let view = wait_for(&ctx, "defaults after failed seed", |v| {
        !v.loading && v.main_roster.len() == 4 && v.secondary_roster.len() == 4 && v.gallery.len() == 8
    })
    .await;
    assert_eq!(view.secondary_roster, defaults::secondary_roster());
    assert!(view.last_error.is_none(), "seeding failures are not surfaced");
    assert!(store.documents(CollectionId::MainRoster).is_empty());

    ctx.shutdown().await;
}

#[tokio::test]
async fn admin_emptying_a_roster_does_not_trigger_reseed() {
    let store = Arc::new(site_sync::MemoryStore::new());
    let ctx = SiteContext::start(store.clone(), config());
    wait_for(&ctx, "seeded", |v| v.main_roster.len() == 4).await;
    assert!(ctx.login(site_test_utils::ADMIN_USER, site_test_utils::ADMIN_PASSWORD));

    let admin = ctx.admin().unwrap();
    for m in defaults::main_roster() {
        admin
            .delete_member(site_model::Roster::Main, &m.id)
            .await
            .unwrap();
    }

    let view = wait_for(&ctx, "empty main roster", |v| v.main_roster.is_empty()).await;
    assert_eq!(view.main_roster, Vec::<RosterMember>::new());
    assert!(store.documents(CollectionId::MainRoster).is_empty());

    ctx.shutdown().await;
}
