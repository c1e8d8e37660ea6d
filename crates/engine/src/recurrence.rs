//! Calendar arithmetic shared by recurring rules and subscriptions.
//!
//! Occurrences are always computed from the original start date rather than
//! from the previous occurrence: a monthly schedule starting on January 31st
//! yields Feb 28 (29), Mar 31, Apr 30... and never drifts to the 28th.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

pub const MAX_INTERVAL: u32 = 366;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Average number of occurrences per calendar month for the given
    /// interval.
    pub fn per_month(self, interval: u32) -> f64 {
        let interval = f64::from(interval.max(1));
        match self {
            Self::Daily => 365.25 / 12.0 / interval,
            Self::Weekly => 365.25 / 7.0 / 12.0 / interval,
            Self::Monthly => 1.0 / interval,
            Self::Yearly => 1.0 / 12.0 / interval,
        }
    }
}

impl TryFrom<&str> for Frequency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::InvalidKind(format!(
                "invalid frequency: {other}"
            ))),
        }
    }
}

pub(crate) fn validate_interval(interval: u32) -> ResultEngine<()> {
    if interval == 0 || interval > MAX_INTERVAL {
        return Err(EngineError::InvalidAmount(format!(
            "interval must be between 1 and {MAX_INTERVAL}"
        )));
    }
    Ok(())
}

/// Returns the `n`-th occurrence (0 = `start`) of a schedule.
pub fn occurrence(
    start: DateTime<Utc>,
    frequency: Frequency,
    interval: u32,
    n: u32,
) -> ResultEngine<DateTime<Utc>> {
    let overflow = || EngineError::InvalidDate("schedule overflows the calendar".to_string());
    let steps = n.checked_mul(interval).ok_or_else(overflow)?;

    match frequency {
        Frequency::Daily => start
            .checked_add_signed(Duration::days(i64::from(steps)))
            .ok_or_else(overflow),
        Frequency::Weekly => start
            .checked_add_signed(Duration::weeks(i64::from(steps)))
            .ok_or_else(overflow),
        Frequency::Monthly => start
            .checked_add_months(Months::new(steps))
            .ok_or_else(overflow),
        Frequency::Yearly => {
            let months = steps.checked_mul(12).ok_or_else(overflow)?;
            start
                .checked_add_months(Months::new(months))
                .ok_or_else(overflow)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
    }

    #[test]
    fn daily_and_weekly_steps() {
        let start = at(2024, 1, 1);
        assert_eq!(occurrence(start, Frequency::Daily, 1, 0).unwrap(), start);
        assert_eq!(occurrence(start, Frequency::Daily, 3, 2).unwrap(), at(2024, 1, 7));
        assert_eq!(occurrence(start, Frequency::Weekly, 2, 1).unwrap(), at(2024, 1, 15));
    }

    #[test]
    fn monthly_end_of_month_does_not_drift() {
        let start = at(2024, 1, 31);
        assert_eq!(occurrence(start, Frequency::Monthly, 1, 1).unwrap(), at(2024, 2, 29));
        assert_eq!(occurrence(start, Frequency::Monthly, 1, 2).unwrap(), at(2024, 3, 31));
        assert_eq!(occurrence(start, Frequency::Monthly, 1, 3).unwrap(), at(2024, 4, 30));
        assert_eq!(occurrence(start, Frequency::Monthly, 3, 1).unwrap(), at(2024, 4, 30));
    }

    #[test]
    fn yearly_leap_day_clamps() {
        let start = at(2024, 2, 29);
        assert_eq!(occurrence(start, Frequency::Yearly, 1, 1).unwrap(), at(2025, 2, 28));
        assert_eq!(occurrence(start, Frequency::Yearly, 1, 4).unwrap(), at(2028, 2, 29));
    }

    #[test]
    fn interval_bounds() {
        assert!(validate_interval(0).is_err());
        assert!(validate_interval(1).is_ok());
        assert!(validate_interval(MAX_INTERVAL + 1).is_err());
    }

    #[test]
    fn monthly_rates() {
        assert!((Frequency::Monthly.per_month(1) - 1.0).abs() < f64::EPSILON);
        assert!((Frequency::Yearly.per_month(1) - 1.0 / 12.0).abs() < 1e-12);
        assert!((Frequency::Monthly.per_month(3) - 1.0 / 3.0).abs() < 1e-12);
    }
}
