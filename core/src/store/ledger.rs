//! Unknown-account ledger queries.

use super::StatsStore;
use crate::error::StatsResult;
use crate::types::UserId;
use rusqlite::{params, OptionalExtension};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAccountRow {
    pub account_name: String,
    pub user_id: Option<UserId>,
}

impl StatsStore {
    /// Record an account label that failed resolution. Idempotent:
    /// an existing row — backfilled or not — is never overwritten.
    pub fn record_unknown_account(&self, account_name: &str) -> StatsResult<()> {
        self.conn.execute(
            "INSERT INTO unknown_account (account_name, user_id)
             VALUES (?1, NULL)
             ON CONFLICT (account_name) DO NOTHING",
            params![account_name],
        )?;
        Ok(())
    }

    /// A backfilled user_id for this label, if an operator supplied one.
    pub fn ledger_override(&self, account_name: &str) -> StatsResult<Option<UserId>> {
        let user_id: Option<Option<UserId>> = self
            .conn
            .query_row(
                "SELECT user_id FROM unknown_account WHERE account_name = ?1",
                params![account_name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(user_id.flatten())
    }

    /// Operator backfill: map a previously unknown label to a user.
    pub fn backfill_unknown_account(
        &self,
        account_name: &str,
        user_id: UserId,
    ) -> StatsResult<()> {
        self.conn.execute(
            "UPDATE unknown_account SET user_id = ?1 WHERE account_name = ?2",
            params![user_id, account_name],
        )?;
        Ok(())
    }

    pub fn unknown_accounts(&self) -> StatsResult<Vec<UnknownAccountRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT account_name, user_id FROM unknown_account
             ORDER BY account_name ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(UnknownAccountRow {
                account_name: row.get(0)?,
                user_id: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn unknown_account_count(&self) -> StatsResult<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM unknown_account", [], |row| row.get(0))
            .map_err(Into::into)
    }
}
