//! Downstream read queries — the surface presentation code depends on.
//!
//! 1. Per-user totals filter by corporation and source
//! 2. Corp and creator totals cover the period/source composite
//! 3. "No data for this period" is observable as an empty state

use chrono::{DateTime, TimeZone, Utc};
use fleetstats_core::{
    aggregator::Aggregator,
    directory::StaticDirectory,
    event::{FleetCreationRecord, ParticipationRecord},
    period::Period,
    source::{EventSource, MemorySource},
    store::StatsStore,
};

fn store() -> StatsStore {
    let store = StatsStore::in_memory().expect("in-memory store");
    store.migrate().expect("migrate");
    store
}

fn march(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 18, 0, 0).unwrap()
}

/// Two corps: U1/U2 in 2001, U3 in 2002. U1 leads one fleet.
fn aggregated_store() -> StatsStore {
    let store = store();
    let mut dir = StaticDirectory::new();
    dir.add_character(11, "Pilot One", 1, 2001);
    dir.add_character(12, "Pilot Two", 2, 2001);
    dir.add_character(13, "Pilot Three", 3, 2002);

    let mut events = MemorySource::new(vec!["Roam".into(), "Strategic".into()]);
    for (character, fleet_type, day) in [
        (11, "Roam", 5),
        (11, "Roam", 6),
        (12, "Strategic", 7),
        (13, "Roam", 8),
    ] {
        events.push_participation(ParticipationRecord {
            character_id: character,
            fleet_type: Some(fleet_type.into()),
            occurred_at: march(day),
        });
    }
    events.push_creation(FleetCreationRecord {
        creator_character_id: 11,
        fleet_type: Some("Roam".into()),
        occurred_at: march(5),
    });

    Aggregator::new(&store, &dir)
        .aggregate_tracker(&events, Period::new(3, 2024).unwrap())
        .unwrap();
    store
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: per-user totals are scoped to one corporation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn user_totals_filter_by_corporation() {
    let store = aggregated_store();
    let period = Period::new(3, 2024).unwrap();

    let rows = store
        .user_totals(2001, period, EventSource::Tracker)
        .unwrap();
    assert_eq!(rows.len(), 2, "only corp 2001's two users may appear");

    let u1 = rows.iter().find(|r| r.user_id == 1).expect("U1 present");
    assert_eq!((u1.fleet_type.as_str(), u1.total), ("Roam", 2));
    let u2 = rows.iter().find(|r| r.user_id == 2).expect("U2 present");
    assert_eq!((u2.fleet_type.as_str(), u2.total), ("Strategic", 1));

    assert!(
        rows.iter().all(|r| r.corporation_id == 2001),
        "corporation_id is denormalized onto every row"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: corp and creator rollups
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn corp_and_creator_totals_cover_the_period() {
    let store = aggregated_store();
    let period = Period::new(3, 2024).unwrap();

    let corps = store.corp_totals(period, EventSource::Tracker).unwrap();
    let roam_2001 = corps
        .iter()
        .find(|r| r.corporation_id == 2001 && r.fleet_type == "Roam")
        .expect("corp 2001 Roam row");
    assert_eq!(roam_2001.total, 2);
    let roam_2002 = corps
        .iter()
        .find(|r| r.corporation_id == 2002 && r.fleet_type == "Roam")
        .expect("corp 2002 Roam row");
    assert_eq!(roam_2002.total, 1);

    let creators = store.creator_totals(period, EventSource::Tracker).unwrap();
    assert_eq!(creators.len(), 1);
    assert_eq!(creators[0].creator_id, 1);
    assert_eq!(creators[0].total_created, 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: empty period reads as "no data", not an error
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn empty_periods_read_as_no_data() {
    let store = aggregated_store();
    let march = Period::new(3, 2024).unwrap();
    let june = Period::new(6, 2024).unwrap();

    assert!(store.has_data_for_period(march).unwrap());
    assert!(
        !store.has_data_for_period(june).unwrap(),
        "an unaggregated period must read as empty, not fail"
    );
    assert!(
        store
            .user_totals(2001, june, EventSource::Tracker)
            .unwrap()
            .is_empty(),
        "queries against an empty period succeed with no rows"
    );
}
