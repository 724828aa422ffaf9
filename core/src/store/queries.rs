//! Downstream read queries — the surface presentation code consumes.
//!
//! Everything filters on the (month, year, entity, source) composite the
//! counter tables are indexed for. An empty result means "no data for
//! this period", which callers must keep distinct from a failed run.

use super::StatsStore;
use crate::error::StatsResult;
use crate::period::Period;
use crate::source::EventSource;
use crate::types::{CorporationId, FleetTypeId, UserId};
use rusqlite::{params, OptionalExtension};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTotalRow {
    pub user_id: UserId,
    pub corporation_id: CorporationId,
    pub fleet_type: String,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpTotalRow {
    pub corporation_id: CorporationId,
    pub fleet_type: String,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorTotalRow {
    pub creator_id: UserId,
    pub fleet_type: String,
    pub total_created: i64,
}

impl StatsStore {
    /// Per-user totals for one corporation, split by fleet type.
    pub fn user_totals(
        &self,
        corporation_id: CorporationId,
        period: Period,
        source: EventSource,
    ) -> StatsResult<Vec<UserTotalRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.user_id, s.corporation_id, t.name, s.total_fats
             FROM monthly_user_stats s
             JOIN monthly_fleet_type t ON s.fleet_type_id = t.id
             WHERE s.corporation_id = ?1 AND s.month = ?2 AND s.year = ?3
               AND t.source = ?4
             ORDER BY s.user_id ASC, t.name ASC",
        )?;
        let rows = stmt.query_map(
            params![corporation_id, period.month, period.year, source.as_str()],
            |row| {
                Ok(UserTotalRow {
                    user_id: row.get(0)?,
                    corporation_id: row.get(1)?,
                    fleet_type: row.get(2)?,
                    total: row.get(3)?,
                })
            },
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Per-corporation totals for a period, split by fleet type.
    pub fn corp_totals(
        &self,
        period: Period,
        source: EventSource,
    ) -> StatsResult<Vec<CorpTotalRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.corporation_id, t.name, c.total_fats
             FROM monthly_corp_stats c
             JOIN monthly_fleet_type t ON c.fleet_type_id = t.id
             WHERE c.month = ?1 AND c.year = ?2 AND t.source = ?3
             ORDER BY c.corporation_id ASC, t.name ASC",
        )?;
        let rows = stmt.query_map(
            params![period.month, period.year, source.as_str()],
            |row| {
                Ok(CorpTotalRow {
                    corporation_id: row.get(0)?,
                    fleet_type: row.get(1)?,
                    total: row.get(2)?,
                })
            },
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Per-creator fleet-creation totals for a period.
    pub fn creator_totals(
        &self,
        period: Period,
        source: EventSource,
    ) -> StatsResult<Vec<CreatorTotalRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.creator_id, t.name, s.total_created
             FROM monthly_creator_stats s
             JOIN monthly_fleet_type t ON s.fleet_type_id = t.id
             WHERE s.month = ?1 AND s.year = ?2 AND t.source = ?3
             ORDER BY s.creator_id ASC, t.name ASC",
        )?;
        let rows = stmt.query_map(
            params![period.month, period.year, source.as_str()],
            |row| {
                Ok(CreatorTotalRow {
                    creator_id: row.get(0)?,
                    fleet_type: row.get(1)?,
                    total_created: row.get(2)?,
                })
            },
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Whether any counter rows exist for the period, either source.
    /// "No data for this period" is a distinct state from "run failed".
    pub fn has_data_for_period(&self, period: Period) -> StatsResult<bool> {
        let found: i64 = self.conn.query_row(
            "SELECT EXISTS (
                 SELECT 1 FROM monthly_user_stats WHERE month = ?1 AND year = ?2)
             OR EXISTS (
                 SELECT 1 FROM monthly_corp_stats WHERE month = ?1 AND year = ?2)",
            params![period.month, period.year],
            |row| row.get(0),
        )?;
        Ok(found != 0)
    }

    // ── Single-row lookups ─────────────────────────────────────

    pub fn user_stat_total(
        &self,
        user_id: UserId,
        period: Period,
        fleet_type_id: FleetTypeId,
    ) -> StatsResult<Option<i64>> {
        self.conn
            .query_row(
                "SELECT total_fats FROM monthly_user_stats
                 WHERE user_id = ?1 AND month = ?2 AND year = ?3 AND fleet_type_id = ?4",
                params![user_id, period.month, period.year, fleet_type_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn corp_stat_total(
        &self,
        corporation_id: CorporationId,
        period: Period,
        fleet_type_id: FleetTypeId,
    ) -> StatsResult<Option<i64>> {
        self.conn
            .query_row(
                "SELECT total_fats FROM monthly_corp_stats
                 WHERE corporation_id = ?1 AND month = ?2 AND year = ?3 AND fleet_type_id = ?4",
                params![corporation_id, period.month, period.year, fleet_type_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn creator_stat_total(
        &self,
        creator_id: UserId,
        period: Period,
        fleet_type_id: FleetTypeId,
    ) -> StatsResult<Option<i64>> {
        self.conn
            .query_row(
                "SELECT total_created FROM monthly_creator_stats
                 WHERE creator_id = ?1 AND month = ?2 AND year = ?3 AND fleet_type_id = ?4",
                params![creator_id, period.month, period.year, fleet_type_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    // ── Aggregate sums ─────────────────────────────────────────

    pub fn sum_user_totals(&self, period: Period, source: EventSource) -> StatsResult<i64> {
        self.conn
            .query_row(
                "SELECT COALESCE(SUM(s.total_fats), 0)
                 FROM monthly_user_stats s
                 JOIN monthly_fleet_type t ON s.fleet_type_id = t.id
                 WHERE s.month = ?1 AND s.year = ?2 AND t.source = ?3",
                params![period.month, period.year, source.as_str()],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn sum_corp_totals(&self, period: Period, source: EventSource) -> StatsResult<i64> {
        self.conn
            .query_row(
                "SELECT COALESCE(SUM(c.total_fats), 0)
                 FROM monthly_corp_stats c
                 JOIN monthly_fleet_type t ON c.fleet_type_id = t.id
                 WHERE c.month = ?1 AND c.year = ?2 AND t.source = ?3",
                params![period.month, period.year, source.as_str()],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn user_stat_count(&self, period: Period, source: EventSource) -> StatsResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*)
                 FROM monthly_user_stats s
                 JOIN monthly_fleet_type t ON s.fleet_type_id = t.id
                 WHERE s.month = ?1 AND s.year = ?2 AND t.source = ?3",
                params![period.month, period.year, source.as_str()],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}
