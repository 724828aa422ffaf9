//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The aggregator, registry, and resolver call store methods — they
//! never execute SQL directly.

mod ledger;
mod mapping;
mod queries;

pub use ledger::UnknownAccountRow;
pub use mapping::ColumnMappingRow;
pub use queries::{CorpTotalRow, CreatorTotalRow, UserTotalRow};

use crate::error::StatsResult;
use crate::period::Period;
use crate::source::EventSource;
use crate::types::{CorporationId, FleetTypeId, UserId};
use rusqlite::{params, Connection, OptionalExtension};

pub struct StatsStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl StatsStore {
    pub fn open(path: &str) -> StatsResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> StatsResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new isolated database.
    pub fn reopen(&self) -> StatsResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> StatsResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_fleet_types.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_monthly_stats.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_unknown_accounts.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_aggregation_runs.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/005_import_mappings.sql"))?;
        Ok(())
    }

    // ── Transactions ───────────────────────────────────────────

    /// Open an IMMEDIATE transaction. Writers serialize at BEGIN, which
    /// is what lets the guard check and the first write act as one unit.
    pub(crate) fn begin_immediate(&self) -> StatsResult<StoreTx<'_>> {
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        Ok(StoreTx {
            conn: &self.conn,
            done: false,
        })
    }

    // ── Fleet types ────────────────────────────────────────────

    /// Get-or-create a fleet-type row. Race-tolerant: a concurrent
    /// insert of the same unique key is treated as "already exists".
    pub fn ensure_fleet_type(
        &self,
        name: &str,
        source: EventSource,
        period: Period,
    ) -> StatsResult<FleetTypeId> {
        self.conn.execute(
            "INSERT INTO monthly_fleet_type (name, source, month, year)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (name, source, month, year) DO NOTHING",
            params![name, source.as_str(), period.month, period.year],
        )?;
        let id: FleetTypeId = self.conn.query_row(
            "SELECT id FROM monthly_fleet_type
             WHERE name = ?1 AND source = ?2 AND month = ?3 AND year = ?4",
            params![name, source.as_str(), period.month, period.year],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn fleet_type_id(
        &self,
        name: &str,
        source: EventSource,
        period: Period,
    ) -> StatsResult<Option<FleetTypeId>> {
        self.conn
            .query_row(
                "SELECT id FROM monthly_fleet_type
                 WHERE name = ?1 AND source = ?2 AND month = ?3 AND year = ?4",
                params![name, source.as_str(), period.month, period.year],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn fleet_type_names_for_period(
        &self,
        source: EventSource,
        period: Period,
    ) -> StatsResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM monthly_fleet_type
             WHERE source = ?1 AND month = ?2 AND year = ?3
             ORDER BY name ASC",
        )?;
        let names = stmt
            .query_map(params![source.as_str(), period.month, period.year], |row| {
                row.get(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    // ── Aggregation guard & runs ───────────────────────────────

    /// The guard signal: any user or corp counter row for this period
    /// whose fleet type carries this source.
    pub fn has_counter_rows(&self, source: EventSource, period: Period) -> StatsResult<bool> {
        let found: i64 = self.conn.query_row(
            "SELECT EXISTS (
                 SELECT 1 FROM monthly_user_stats s
                 JOIN monthly_fleet_type t ON s.fleet_type_id = t.id
                 WHERE s.month = ?1 AND s.year = ?2 AND t.source = ?3)
             OR EXISTS (
                 SELECT 1 FROM monthly_corp_stats c
                 JOIN monthly_fleet_type t ON c.fleet_type_id = t.id
                 WHERE c.month = ?1 AND c.year = ?2 AND t.source = ?3)",
            params![period.month, period.year, source.as_str()],
            |row| row.get(0),
        )?;
        Ok(found != 0)
    }

    pub fn insert_run(
        &self,
        run_id: &str,
        source: EventSource,
        period: Period,
        started_at: &str,
    ) -> StatsResult<()> {
        self.conn.execute(
            "INSERT INTO aggregation_run (run_id, source, month, year, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run_id,
                source.as_str(),
                period.month,
                period.year,
                started_at
            ],
        )?;
        Ok(())
    }

    pub fn complete_run(
        &self,
        run_id: &str,
        completed_at: &str,
        events_processed: u64,
        events_skipped: u64,
    ) -> StatsResult<()> {
        self.conn.execute(
            "UPDATE aggregation_run
             SET completed_at = ?1, events_processed = ?2, events_skipped = ?3
             WHERE run_id = ?4",
            params![
                completed_at,
                events_processed as i64,
                events_skipped as i64,
                run_id
            ],
        )?;
        Ok(())
    }

    /// Whether the period's run finished (NULL completed_at means a run
    /// started and died mid-batch, or is still going).
    pub fn run_completed(&self, source: EventSource, period: Period) -> StatsResult<Option<bool>> {
        self.conn
            .query_row(
                "SELECT completed_at IS NOT NULL FROM aggregation_run
                 WHERE source = ?1 AND month = ?2 AND year = ?3",
                params![source.as_str(), period.month, period.year],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    // ── Counter accretion ──────────────────────────────────────

    /// Accrete one participation event: the user row and the corp row
    /// are read-incremented-written with the same amount inside one
    /// transaction, so a concurrent writer on the same key serializes
    /// instead of losing an update.
    pub fn accrete_participation(
        &self,
        user_id: UserId,
        corporation_id: CorporationId,
        period: Period,
        fleet_type_id: FleetTypeId,
        amount: i64,
    ) -> StatsResult<()> {
        let tx = self.begin_immediate()?;

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT total_fats FROM monthly_user_stats
                 WHERE user_id = ?1 AND month = ?2 AND year = ?3 AND fleet_type_id = ?4",
                params![user_id, period.month, period.year, fleet_type_id],
                |row| row.get(0),
            )
            .optional()?;
        match existing {
            Some(total) => {
                self.conn.execute(
                    "UPDATE monthly_user_stats SET total_fats = ?1
                     WHERE user_id = ?2 AND month = ?3 AND year = ?4 AND fleet_type_id = ?5",
                    params![total + amount, user_id, period.month, period.year, fleet_type_id],
                )?;
            }
            None => {
                self.conn.execute(
                    "INSERT INTO monthly_user_stats
                         (user_id, corporation_id, month, year, fleet_type_id, total_fats)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        user_id,
                        corporation_id,
                        period.month,
                        period.year,
                        fleet_type_id,
                        amount
                    ],
                )?;
            }
        }

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT total_fats FROM monthly_corp_stats
                 WHERE corporation_id = ?1 AND month = ?2 AND year = ?3 AND fleet_type_id = ?4",
                params![corporation_id, period.month, period.year, fleet_type_id],
                |row| row.get(0),
            )
            .optional()?;
        match existing {
            Some(total) => {
                self.conn.execute(
                    "UPDATE monthly_corp_stats SET total_fats = ?1
                     WHERE corporation_id = ?2 AND month = ?3 AND year = ?4 AND fleet_type_id = ?5",
                    params![
                        total + amount,
                        corporation_id,
                        period.month,
                        period.year,
                        fleet_type_id
                    ],
                )?;
            }
            None => {
                self.conn.execute(
                    "INSERT INTO monthly_corp_stats
                         (corporation_id, month, year, fleet_type_id, total_fats)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        corporation_id,
                        period.month,
                        period.year,
                        fleet_type_id,
                        amount
                    ],
                )?;
            }
        }

        tx.commit()
    }

    /// Accrete one fleet-creation record for its creator.
    pub fn accrete_creation(
        &self,
        creator_id: UserId,
        period: Period,
        fleet_type_id: FleetTypeId,
    ) -> StatsResult<()> {
        let tx = self.begin_immediate()?;

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT total_created FROM monthly_creator_stats
                 WHERE creator_id = ?1 AND month = ?2 AND year = ?3 AND fleet_type_id = ?4",
                params![creator_id, period.month, period.year, fleet_type_id],
                |row| row.get(0),
            )
            .optional()?;
        match existing {
            Some(total) => {
                self.conn.execute(
                    "UPDATE monthly_creator_stats SET total_created = ?1
                     WHERE creator_id = ?2 AND month = ?3 AND year = ?4 AND fleet_type_id = ?5",
                    params![total + 1, creator_id, period.month, period.year, fleet_type_id],
                )?;
            }
            None => {
                self.conn.execute(
                    "INSERT INTO monthly_creator_stats
                         (creator_id, month, year, fleet_type_id, total_created)
                     VALUES (?1, ?2, ?3, ?4, 1)",
                    params![creator_id, period.month, period.year, fleet_type_id],
                )?;
            }
        }

        tx.commit()
    }
}

/// RAII wrapper around a hand-opened transaction. Rolls back on drop
/// unless committed.
pub(crate) struct StoreTx<'a> {
    conn: &'a Connection,
    done: bool,
}

impl StoreTx<'_> {
    pub(crate) fn commit(mut self) -> StatsResult<()> {
        self.conn.execute_batch("COMMIT;")?;
        self.done = true;
        Ok(())
    }
}

impl Drop for StoreTx<'_> {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.conn.execute_batch("ROLLBACK;");
        }
    }
}
