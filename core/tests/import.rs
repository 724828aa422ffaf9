//! Integration tests for import-source aggregation.
//!
//! 1. Cell values accrete as-is; zero cells leave no counter row
//! 2. Unknown account labels land in the ledger exactly once
//! 3. A backfilled ledger row resolves on later runs via the user's
//!    main corporation
//! 4. Mappings outside the persisted whitelist abort before any write

use fleetstats_core::{
    aggregator::{AggregationOutcome, Aggregator},
    directory::StaticDirectory,
    error::StatsError,
    import_source::ColumnMapping,
    period::Period,
    source::EventSource,
    store::StatsStore,
};

fn store() -> StatsStore {
    let store = StatsStore::in_memory().expect("in-memory store");
    store.migrate().expect("migrate");
    store
}

fn directory() -> StaticDirectory {
    let mut dir = StaticDirectory::new();
    dir.add_character(11, "Pilot One", 1, 2001);
    dir
}

fn mapping(pairs: &[(&str, &str)]) -> ColumnMapping {
    pairs
        .iter()
        .map(|(c, t)| (c.to_string(), t.to_string()))
        .collect()
}

/// Whitelist the mapping the way the upload flow would before a run.
fn whitelist(store: &StatsStore, map: &ColumnMapping) {
    for (column, fleet_type) in map {
        store.save_column_mapping(column, fleet_type).unwrap();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: the canonical sparsity scenario
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn zero_cells_never_create_counter_rows() {
    let store = store();
    let dir = directory();
    let period = Period::new(3, 2024).unwrap();

    let map = mapping(&[("Roam", "Roam"), ("Strategic", "Strategic")]);
    whitelist(&store, &map);

    let outcome = Aggregator::new(&store, &dir)
        .aggregate_import("Account,Roam,Strategic\nPilot One,0,5\n", &map, period)
        .unwrap();
    assert!(matches!(outcome, AggregationOutcome::Processed(_)));

    let strategic = store
        .fleet_type_id("Strategic", EventSource::Import, period)
        .unwrap()
        .expect("Strategic registered");
    assert_eq!(
        store.user_stat_total(1, period, strategic).unwrap(),
        Some(5),
        "the cell value is the increment"
    );

    assert_eq!(
        store.user_stat_count(period, EventSource::Import).unwrap(),
        1,
        "the zero-valued Roam cell must not have created a row"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: unresolvable labels are recorded once, and only once
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn unknown_labels_land_in_the_ledger_once() {
    let store = store();
    let dir = directory();

    let map = mapping(&[("Roam", "Roam")]);
    whitelist(&store, &map);
    let aggregator = Aggregator::new(&store, &dir);

    // The same stranger appears twice in March and again in April.
    let text = "Account,Roam\nStranger,2\nStranger,3\n";
    aggregator
        .aggregate_import(text, &map, Period::new(3, 2024).unwrap())
        .unwrap();
    aggregator
        .aggregate_import(text, &map, Period::new(4, 2024).unwrap())
        .unwrap();

    assert_eq!(
        store.unknown_account_count().unwrap(),
        1,
        "repeat failures for one label must not duplicate ledger rows"
    );
    let rows = store.unknown_accounts().unwrap();
    assert_eq!(rows[0].account_name, "Stranger");
    assert_eq!(rows[0].user_id, None, "fresh ledger rows start unmapped");
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: operator backfill resolves the label on the next run
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn backfilled_labels_resolve_on_later_runs() {
    let store = store();
    let mut dir = directory();
    dir.set_main_corporation(7, 2002);

    let map = mapping(&[("Roam", "Roam")]);
    whitelist(&store, &map);
    let aggregator = Aggregator::new(&store, &dir);

    let march = Period::new(3, 2024).unwrap();
    aggregator
        .aggregate_import("Account,Roam\nStranger,2\n", &map, march)
        .unwrap();
    assert_eq!(
        store.user_stat_count(march, EventSource::Import).unwrap(),
        0,
        "unresolved rows must not accrete"
    );

    // Operator maps the label to user 7, whose main corp is 2002.
    store.backfill_unknown_account("Stranger", 7).unwrap();

    let april = Period::new(4, 2024).unwrap();
    aggregator
        .aggregate_import("Account,Roam\nStranger,2\n", &map, april)
        .unwrap();

    let roam = store
        .fleet_type_id("Roam", EventSource::Import, april)
        .unwrap()
        .unwrap();
    assert_eq!(store.user_stat_total(7, april, roam).unwrap(), Some(2));
    assert_eq!(
        store.corp_stat_total(2002, april, roam).unwrap(),
        Some(2),
        "the override corporation comes from the user's main character"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: whitelist validation aborts before any mutation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn unwhitelisted_mapping_aborts_clean() {
    let store = store();
    let dir = directory();
    let period = Period::new(3, 2024).unwrap();

    // Nothing whitelisted; "Roam" is unknown to the mapping table.
    let map = mapping(&[("Roam", "Roam")]);
    let result = Aggregator::new(&store, &dir).aggregate_import(
        "Account,Roam\nPilot One,2\n",
        &map,
        period,
    );

    assert!(
        matches!(result, Err(StatsError::InvalidMapping(_))),
        "unwhitelisted columns must be rejected"
    );
    assert!(
        !store.has_data_for_period(period).unwrap(),
        "a rejected mapping must not have written anything"
    );
    assert_eq!(
        store.run_completed(EventSource::Import, period).unwrap(),
        None,
        "a rejected mapping must not have claimed the unit"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: ignored columns are rejected even when whitelisted
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn ignored_columns_cannot_be_mapped() {
    let store = store();
    let dir = directory();
    let period = Period::new(3, 2024).unwrap();

    let map = mapping(&[("Fuel Run", "Logistics")]);
    whitelist(&store, &map);
    store.ignore_column("Fuel Run").unwrap();

    let result = Aggregator::new(&store, &dir).aggregate_import(
        "Account,Fuel Run\nPilot One,2\n",
        &map,
        period,
    );
    assert!(
        matches!(result, Err(StatsError::InvalidMapping(_))),
        "the ignore list must win over the whitelist"
    );
}
