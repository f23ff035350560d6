//! Calendar-aware extension periods

use std::fmt;
use std::str::FromStr;

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Amount of time to add to a membership
///
/// Month and year steps follow the calendar: adding one month to Jan 31
/// lands on the last day of February.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "count", rename_all = "snake_case")]
pub enum ExtendBy {
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
}

impl ExtendBy {
    /// Extension buttons offered by the front desk
    pub const PRESETS: [(&'static str, ExtendBy); 7] = [
        ("1 week", ExtendBy::Weeks(1)),
        ("15 days", ExtendBy::Days(15)),
        ("1 month", ExtendBy::Months(1)),
        ("2 months", ExtendBy::Months(2)),
        ("3 months", ExtendBy::Months(3)),
        ("6 months", ExtendBy::Months(6)),
        ("1 year", ExtendBy::Years(1)),
    ];

    /// Add this period to `base`, or `None` if the result is out of range
    pub fn add_to(self, base: NaiveDate) -> Option<NaiveDate> {
        match self {
            ExtendBy::Days(n) => base.checked_add_days(Days::new(u64::from(n))),
            ExtendBy::Weeks(n) => base.checked_add_days(Days::new(u64::from(n) * 7)),
            ExtendBy::Months(n) => base.checked_add_months(Months::new(n)),
            ExtendBy::Years(n) => base.checked_add_months(Months::new(n.checked_mul(12)?)),
        }
    }
}

impl fmt::Display for ExtendBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtendBy::Days(n) => write!(f, "{}d", n),
            ExtendBy::Weeks(n) => write!(f, "{}w", n),
            ExtendBy::Months(n) => write!(f, "{}m", n),
            ExtendBy::Years(n) => write!(f, "{}y", n),
        }
    }
}

impl FromStr for ExtendBy {
    type Err = ValidationError;

    /// Parses `<count><unit>` where unit is one of `d`, `w`, `m`, `y`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_ascii_lowercase();
        let invalid = || ValidationError::InvalidPeriod(s.trim().to_string());

        let unit = input.chars().last().ok_or_else(invalid)?;
        let count: u32 = input[..input.len() - unit.len_utf8()]
            .parse()
            .map_err(|_| invalid())?;
        if count == 0 {
            return Err(invalid());
        }

        match unit {
            'd' => Ok(ExtendBy::Days(count)),
            'w' => Ok(ExtendBy::Weeks(count)),
            'm' => Ok(ExtendBy::Months(count)),
            'y' => Ok(ExtendBy::Years(count)),
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_periods() {
        assert_eq!("15d".parse::<ExtendBy>().unwrap(), ExtendBy::Days(15));
        assert_eq!("1W".parse::<ExtendBy>().unwrap(), ExtendBy::Weeks(1));
        assert_eq!(" 3m ".parse::<ExtendBy>().unwrap(), ExtendBy::Months(3));
        assert_eq!("1y".parse::<ExtendBy>().unwrap(), ExtendBy::Years(1));
    }

    #[test]
    fn test_parse_rejects_bad_periods() {
        for bad in ["", "m", "0d", "-1m", "3x", "1.5m", "ñ"] {
            assert!(bad.parse::<ExtendBy>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_display_matches_parse() {
        for (_, period) in ExtendBy::PRESETS {
            assert_eq!(period.to_string().parse::<ExtendBy>().unwrap(), period);
        }
    }

    #[test]
    fn test_month_end_clamping() {
        assert_eq!(ExtendBy::Months(1).add_to(date(2024, 1, 31)), Some(date(2024, 2, 29)));
        assert_eq!(ExtendBy::Months(1).add_to(date(2023, 1, 31)), Some(date(2023, 2, 28)));
        assert_eq!(ExtendBy::Years(1).add_to(date(2024, 2, 29)), Some(date(2025, 2, 28)));
    }

    #[test]
    fn test_day_and_week_steps() {
        assert_eq!(ExtendBy::Days(15).add_to(date(2024, 12, 20)), Some(date(2025, 1, 4)));
        assert_eq!(ExtendBy::Weeks(1).add_to(date(2024, 2, 25)), Some(date(2024, 3, 3)));
    }
}
