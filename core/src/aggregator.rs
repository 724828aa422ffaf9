//! The period aggregator — one invocation accretes one (month, year,
//! source) unit of work into the monthly counter tables.
//!
//! Design:
//!   - Entry is a single IMMEDIATE transaction: guard check, run-row
//!     insert, registry priming. Two simultaneous entries for the same
//!     unit serialize at BEGIN; the loser sees the run row and reports
//!     AlreadyProcessed. A priming failure rolls everything back.
//!   - Each event accretes in its own transaction. An unresolved
//!     identity or a duplicate-key race skips that event only; the
//!     batch always continues.
//!   - AlreadyProcessed is a success signal, not an error.

use crate::directory::IdentityDirectory;
use crate::error::StatsResult;
use crate::import_source::{parse_import, validate_mapping, ColumnMapping};
use crate::period::Period;
use crate::registry::FleetTypeRegistry;
use crate::resolver::{IdentityResolver, Resolution};
use crate::source::{EventSource, FleetEventSource};
use crate::store::StatsStore;
use chrono::Utc;
use std::collections::BTreeSet;
use uuid::Uuid;

/// What one aggregation call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregationOutcome {
    /// Counters were written; the summary says how much.
    Processed(Summary),
    /// The guard matched: this unit was aggregated before (or a run is
    /// in flight). Nothing was written.
    AlreadyProcessed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub run_id: String,
    pub events_processed: u64,
    pub events_skipped: u64,
    pub unresolved_identities: u64,
    pub unknown_type_fallbacks: u64,
    pub duplicate_conflicts: u64,
    pub fleets_created: u64,
}

pub struct Aggregator<'a, D: IdentityDirectory> {
    store: &'a StatsStore,
    directory: &'a D,
}

impl<'a, D: IdentityDirectory> Aggregator<'a, D> {
    pub fn new(store: &'a StatsStore, directory: &'a D) -> Self {
        Self { store, directory }
    }

    // ── Tracker source ─────────────────────────────────────────

    /// Aggregate one period of tracker events. Increments are 1 per
    /// discrete participation record.
    pub fn aggregate_tracker(
        &self,
        events: &dyn FleetEventSource,
        period: Period,
    ) -> StatsResult<AggregationOutcome> {
        let source = EventSource::Tracker;
        let catalog = events.fleet_type_names();

        let (run_id, registry) = match self.enter(source, period, &catalog)? {
            Some(entry) => entry,
            None => return Ok(AggregationOutcome::AlreadyProcessed),
        };

        let (start, end) = period.bounds()?;
        let resolver = IdentityResolver::new(self.directory, self.store);
        let mut summary = Summary {
            run_id: run_id.clone(),
            ..Summary::default()
        };

        for record in events.participation_records(start, end) {
            let identity = match resolver.resolve_character(record.character_id) {
                Resolution::Resolved(identity) => identity,
                Resolution::Unresolved => {
                    summary.unresolved_identities += 1;
                    summary.events_skipped += 1;
                    continue;
                }
            };

            let fleet_type_id = self.lookup_type(
                &registry,
                record.fleet_type.as_deref(),
                source,
                period,
                &mut summary,
            );

            match self.store.accrete_participation(
                identity.user_id,
                identity.corporation_id,
                period,
                fleet_type_id,
                1,
            ) {
                Ok(()) => summary.events_processed += 1,
                Err(e) if e.is_unique_violation() => {
                    log::warn!(
                        "aggregate {source} {period}: duplicate-key race on \
                         user {} type {fleet_type_id}, event skipped",
                        identity.user_id
                    );
                    summary.duplicate_conflicts += 1;
                    summary.events_skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        // Creation pass: one increment per fleet, keyed by creator.
        for record in events.creation_records(start, end) {
            let identity = match resolver.resolve_character(record.creator_character_id) {
                Resolution::Resolved(identity) => identity,
                Resolution::Unresolved => {
                    summary.unresolved_identities += 1;
                    summary.events_skipped += 1;
                    continue;
                }
            };

            let fleet_type_id = self.lookup_type(
                &registry,
                record.fleet_type.as_deref(),
                source,
                period,
                &mut summary,
            );

            match self
                .store
                .accrete_creation(identity.user_id, period, fleet_type_id)
            {
                Ok(()) => {
                    summary.events_processed += 1;
                    summary.fleets_created += 1;
                }
                Err(e) if e.is_unique_violation() => {
                    log::warn!(
                        "aggregate {source} {period}: duplicate-key race on \
                         creator {}, event skipped",
                        identity.user_id
                    );
                    summary.duplicate_conflicts += 1;
                    summary.events_skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        self.finish(source, period, &summary)?;
        Ok(AggregationOutcome::Processed(summary))
    }

    // ── Import source ──────────────────────────────────────────

    /// Aggregate one period of spreadsheet-import rows. Increments are
    /// the numeric cell values; the parser already dropped zero and
    /// blank cells, so no counter row is ever created for them.
    pub fn aggregate_import(
        &self,
        csv_text: &str,
        mapping: &ColumnMapping,
        period: Period,
    ) -> StatsResult<AggregationOutcome> {
        let source = EventSource::Import;

        // Both of these happen before the guard: nothing has been
        // written yet, so a bad mapping or a malformed file aborts clean.
        validate_mapping(self.store, mapping)?;
        let records = parse_import(csv_text, mapping)?;

        let type_names: Vec<String> = mapping
            .values()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let (run_id, registry) = match self.enter(source, period, &type_names)? {
            Some(entry) => entry,
            None => return Ok(AggregationOutcome::AlreadyProcessed),
        };

        let resolver = IdentityResolver::new(self.directory, self.store);
        let mut summary = Summary {
            run_id: run_id.clone(),
            ..Summary::default()
        };

        for record in records {
            let identity = match resolver.resolve_account(&record.account)? {
                Resolution::Resolved(identity) => identity,
                Resolution::Unresolved => {
                    summary.unresolved_identities += 1;
                    summary.events_skipped += 1;
                    continue;
                }
            };

            let fleet_type_id = self.lookup_type(
                &registry,
                Some(record.fleet_type.as_str()),
                source,
                period,
                &mut summary,
            );

            match self.store.accrete_participation(
                identity.user_id,
                identity.corporation_id,
                period,
                fleet_type_id,
                record.count as i64,
            ) {
                Ok(()) => summary.events_processed += 1,
                Err(e) if e.is_unique_violation() => {
                    log::warn!(
                        "aggregate {source} {period}: duplicate-key race on \
                         account '{}', event skipped",
                        record.account
                    );
                    summary.duplicate_conflicts += 1;
                    summary.events_skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        self.finish(source, period, &summary)?;
        Ok(AggregationOutcome::Processed(summary))
    }

    // ── Shared plumbing ────────────────────────────────────────

    /// Guard check, run-row insert, and registry priming as one
    /// IMMEDIATE transaction. Returns None when the unit was already
    /// aggregated (or a concurrent run holds the run row).
    fn enter(
        &self,
        source: EventSource,
        period: Period,
        type_names: &[String],
    ) -> StatsResult<Option<(String, FleetTypeRegistry)>> {
        let tx = self.store.begin_immediate()?;

        if self.store.has_counter_rows(source, period)? {
            log::info!("aggregate {source} {period}: already processed, nothing to do");
            return Ok(None);
        }

        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now().to_rfc3339();
        if let Err(e) = self.store.insert_run(&run_id, source, period, &started_at) {
            if e.is_unique_violation() {
                log::info!(
                    "aggregate {source} {period}: run row exists \
                     (concurrent run or interrupted prior run)"
                );
                return Ok(None);
            }
            return Err(e);
        }

        // Any failure here rolls back the run row with it: a setup
        // error must abort before any counter is written.
        let registry = FleetTypeRegistry::prime(self.store, source, period, type_names)?;

        tx.commit()?;
        log::info!("aggregate {source} {period}: run {run_id} started");
        Ok(Some((run_id, registry)))
    }

    fn lookup_type(
        &self,
        registry: &FleetTypeRegistry,
        label: Option<&str>,
        source: EventSource,
        period: Period,
        summary: &mut Summary,
    ) -> crate::types::FleetTypeId {
        let lookup = registry.resolve(label);
        if lookup.fallback {
            log::warn!(
                "aggregate {source} {period}: fleet type '{}' was not primed, \
                 counting under '{}'",
                label.unwrap_or_default(),
                crate::registry::UNKNOWN_FLEET_TYPE
            );
            summary.unknown_type_fallbacks += 1;
        }
        lookup.fleet_type_id
    }

    fn finish(&self, source: EventSource, period: Period, summary: &Summary) -> StatsResult<()> {
        self.store.complete_run(
            &summary.run_id,
            &Utc::now().to_rfc3339(),
            summary.events_processed,
            summary.events_skipped,
        )?;
        log::info!(
            "aggregate {source} {period}: {} events accreted, {} skipped \
             ({} unresolved, {} duplicate races, {} unknown-type fallbacks)",
            summary.events_processed,
            summary.events_skipped,
            summary.unresolved_identities,
            summary.duplicate_conflicts,
            summary.unknown_type_fallbacks
        );
        Ok(())
    }
}
