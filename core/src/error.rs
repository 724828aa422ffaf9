use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid period: month {month}, year {year}")]
    InvalidPeriod { month: u32, year: i32 },

    #[error("Invalid column mapping: {0}")]
    InvalidMapping(String),

    #[error("Malformed import data: {0}")]
    Import(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StatsError {
    /// True when the underlying SQLite error is a uniqueness-constraint
    /// violation. The aggregator treats these as skippable per-event
    /// races, not batch failures.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            StatsError::Database(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

pub type StatsResult<T> = Result<T, StatsError>;
