//! Identity-resolution order and ledger behaviour.
//!
//! 1. Directory hits win outright
//! 2. Directory misses fall back to the ledger override
//! 3. Unresolvable labels are recorded idempotently
//! 4. Character ids never touch the ledger

use fleetstats_core::{
    directory::{Identity, StaticDirectory},
    resolver::{IdentityResolver, Resolution},
    store::StatsStore,
};

fn store() -> StatsStore {
    let store = StatsStore::in_memory().expect("in-memory store");
    store.migrate().expect("migrate");
    store
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: directory hit
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn directory_hit_resolves_directly() {
    let store = store();
    let mut dir = StaticDirectory::new();
    dir.add_character(11, "Pilot One", 1, 2001);

    let resolver = IdentityResolver::new(&dir, &store);
    assert_eq!(
        resolver.resolve_account("Pilot One").unwrap(),
        Resolution::Resolved(Identity {
            user_id: 1,
            corporation_id: 2001
        })
    );
    assert_eq!(
        store.unknown_account_count().unwrap(),
        0,
        "a directory hit must not touch the ledger"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: ledger override, corporation from the user's main character
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn ledger_override_resolves_directory_misses() {
    let store = store();
    let mut dir = StaticDirectory::new();
    dir.set_main_corporation(7, 2002);

    store.record_unknown_account("Old Alt").unwrap();
    store.backfill_unknown_account("Old Alt", 7).unwrap();

    let resolver = IdentityResolver::new(&dir, &store);
    assert_eq!(
        resolver.resolve_account("Old Alt").unwrap(),
        Resolution::Resolved(Identity {
            user_id: 7,
            corporation_id: 2002
        })
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: unresolved labels recorded exactly once
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn unresolved_labels_are_recorded_idempotently() {
    let store = store();
    let dir = StaticDirectory::new();

    let resolver = IdentityResolver::new(&dir, &store);
    assert_eq!(
        resolver.resolve_account("Stranger").unwrap(),
        Resolution::Unresolved
    );
    assert_eq!(
        resolver.resolve_account("Stranger").unwrap(),
        Resolution::Unresolved,
        "resolution is not retried within a run"
    );

    assert_eq!(
        store.unknown_account_count().unwrap(),
        1,
        "resolving the same label twice must create exactly one row"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: a backfilled row survives later failed resolutions untouched
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn recording_never_overwrites_a_backfill() {
    let store = store();
    let dir = StaticDirectory::new();

    store.record_unknown_account("Old Alt").unwrap();
    store.backfill_unknown_account("Old Alt", 7).unwrap();

    // Directory still misses and user 7 has no main corp, so resolution
    // fails — but the recorded mapping must survive.
    let resolver = IdentityResolver::new(&dir, &store);
    assert_eq!(
        resolver.resolve_account("Old Alt").unwrap(),
        Resolution::Unresolved
    );
    assert_eq!(
        store.ledger_override("Old Alt").unwrap(),
        Some(7),
        "a failed resolution must not clear the operator's backfill"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: character resolution is directory-only
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn character_misses_never_reach_the_ledger() {
    let store = store();
    let dir = StaticDirectory::new();

    let resolver = IdentityResolver::new(&dir, &store);
    assert_eq!(resolver.resolve_character(999), Resolution::Unresolved);
    assert_eq!(
        store.unknown_account_count().unwrap(),
        0,
        "the ledger is keyed by account label, not character id"
    );
}
