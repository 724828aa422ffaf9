//! Calendar periods — the (month, year) granularity everything is keyed by.

use crate::error::{StatsError, StatsResult};
use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Earliest plausible year for event data (game launch).
const MIN_YEAR: i32 = 2003;
const MAX_YEAR: i32 = 9999;

/// A (month, year) pair. `month` is 1-12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    pub month: u32,
    pub year: i32,
}

impl Period {
    pub fn new(month: u32, year: i32) -> StatsResult<Self> {
        if !(1..=12).contains(&month) || !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(StatsError::InvalidPeriod { month, year });
        }
        Ok(Self { month, year })
    }

    /// The period one month before `now`. Live data is never aggregated,
    /// so the default unit of work is the previous calendar month.
    pub fn last_month(now: DateTime<Utc>) -> Self {
        if now.month() == 1 {
            Self { month: 12, year: now.year() - 1 }
        } else {
            Self { month: now.month() - 1, year: now.year() }
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { month: 1, year: self.year + 1 }
        } else {
            Self { month: self.month + 1, year: self.year }
        }
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self { month: 12, year: self.year - 1 }
        } else {
            Self { month: self.month - 1, year: self.year }
        }
    }

    /// The half-open UTC window `[first-of-month 00:00, first-of-next-month 00:00)`.
    pub fn bounds(&self) -> StatsResult<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.first_day()?;
        let end = self.next().first_day()?;
        Ok((start, end))
    }

    fn first_day(&self) -> StatsResult<DateTime<Utc>> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .ok_or(StatsError::InvalidPeriod {
                month: self.month,
                year: self.year,
            })
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejects_out_of_range_months() {
        assert!(Period::new(0, 2024).is_err());
        assert!(Period::new(13, 2024).is_err());
        assert!(Period::new(6, 1999).is_err());
        assert!(Period::new(6, 2024).is_ok());
    }

    #[test]
    fn bounds_roll_year_at_december() {
        let p = Period::new(12, 2023).unwrap();
        let (start, end) = p.bounds().unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn last_month_rolls_year_in_january() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let p = Period::last_month(now);
        assert_eq!((p.month, p.year), (12, 2023));
    }
}
