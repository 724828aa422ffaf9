//! Import column-mapping whitelist queries.

use super::StatsStore;
use crate::error::StatsResult;
use rusqlite::params;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMappingRow {
    pub column_name: String,
    pub mapped_to: String,
}

impl StatsStore {
    /// Upsert a whitelist entry: `column_name` in import headers maps to
    /// the given fleet-type name.
    pub fn save_column_mapping(&self, column_name: &str, mapped_to: &str) -> StatsResult<()> {
        self.conn.execute(
            "INSERT INTO import_column_mapping (column_name, mapped_to)
             VALUES (?1, ?2)
             ON CONFLICT (column_name) DO UPDATE SET mapped_to = excluded.mapped_to",
            params![column_name, mapped_to],
        )?;
        Ok(())
    }

    pub fn column_mappings(&self) -> StatsResult<Vec<ColumnMappingRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name, mapped_to FROM import_column_mapping
             ORDER BY column_name ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ColumnMappingRow {
                column_name: row.get(0)?,
                mapped_to: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn clear_column_mappings(&self) -> StatsResult<()> {
        self.conn
            .execute("DELETE FROM import_column_mapping", [])?;
        Ok(())
    }

    /// Mark a header column as permanently ignored by imports.
    pub fn ignore_column(&self, column_name: &str) -> StatsResult<()> {
        self.conn.execute(
            "INSERT INTO import_ignored_column (column_name)
             VALUES (?1)
             ON CONFLICT (column_name) DO NOTHING",
            params![column_name],
        )?;
        Ok(())
    }

    pub fn ignored_columns(&self) -> StatsResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name FROM import_ignored_column ORDER BY column_name ASC",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}
