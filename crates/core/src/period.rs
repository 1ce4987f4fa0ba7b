use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quarter::Q1 => write!(f, "Q1"),
            Quarter::Q2 => write!(f, "Q2"),
            Quarter::Q3 => write!(f, "Q3"),
            Quarter::Q4 => write!(f, "Q4"),
        }
    }
}

impl Quarter {
    pub fn new(n: u8) -> Option<Self> {
        match n {
            1 => Some(Quarter::Q1),
            2 => Some(Quarter::Q2),
            3 => Some(Quarter::Q3),
            4 => Some(Quarter::Q4),
            _ => None,
        }
    }

    pub fn containing(date: NaiveDate) -> Self {
        match date.month() {
            1..=3 => Quarter::Q1,
            4..=6 => Quarter::Q2,
            7..=9 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }

    fn first_month(self) -> u32 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 4,
            Quarter::Q3 => 7,
            Quarter::Q4 => 10,
        }
    }

    pub fn start_date(self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.first_month(), 1)
    }

    pub fn end_date(self, year: i32) -> Option<NaiveDate> {
        let next = match self {
            Quarter::Q4 => NaiveDate::from_ymd_opt(year + 1, 1, 1),
            q => NaiveDate::from_ymd_opt(year, q.first_month() + 3, 1),
        };
        next.and_then(|d| d.pred_opt())
    }
}

/// Inclusive date range used to restrict a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn year(year: i32) -> Option<Self> {
        Some(DateRange::new(
            NaiveDate::from_ymd_opt(year, 1, 1)?,
            NaiveDate::from_ymd_opt(year, 12, 31)?,
        ))
    }

    pub fn quarter(year: i32, quarter: Quarter) -> Option<Self> {
        Some(DateRange::new(quarter.start_date(year)?, quarter.end_date(year)?))
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Calendar month bucket for monthly reports, displayed as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn quarter_new_valid_and_invalid() {
        assert_eq!(Quarter::new(1), Some(Quarter::Q1));
        assert_eq!(Quarter::new(4), Some(Quarter::Q4));
        assert_eq!(Quarter::new(0), None);
        assert_eq!(Quarter::new(5), None);
    }

    #[test]
    fn quarter_display() {
        assert_eq!(Quarter::Q1.to_string(), "Q1");
        assert_eq!(Quarter::Q4.to_string(), "Q4");
    }

    #[test]
    fn quarter_containing_date() {
        assert_eq!(Quarter::containing(date(2025, 3, 31)), Quarter::Q1);
        assert_eq!(Quarter::containing(date(2025, 4, 1)), Quarter::Q2);
        assert_eq!(Quarter::containing(date(2025, 9, 30)), Quarter::Q3);
        assert_eq!(Quarter::containing(date(2025, 12, 31)), Quarter::Q4);
    }

    #[test]
    fn quarter_bounds() {
        assert_eq!(Quarter::Q1.start_date(2024), Some(date(2024, 1, 1)));
        assert_eq!(Quarter::Q1.end_date(2024), Some(date(2024, 3, 31)));
        assert_eq!(Quarter::Q2.end_date(2025), Some(date(2025, 6, 30)));
        assert_eq!(Quarter::Q3.start_date(2025), Some(date(2025, 7, 1)));
        assert_eq!(Quarter::Q4.end_date(2025), Some(date(2025, 12, 31)));
    }

    #[test]
    fn date_range_contains_is_inclusive() {
        let range = DateRange::quarter(2025, Quarter::Q2).unwrap();
        assert!(range.contains(date(2025, 4, 1)));
        assert!(range.contains(date(2025, 6, 30)));
        assert!(!range.contains(date(2025, 3, 31)));
        assert!(!range.contains(date(2025, 7, 1)));
    }

    #[test]
    fn year_range_covers_calendar_year() {
        let range = DateRange::year(2025).unwrap();
        assert_eq!(range.to_string(), "2025-01-01 to 2025-12-31");
    }

    #[test]
    fn year_month_display_is_zero_padded() {
        assert_eq!(YearMonth::of(date(2025, 6, 30)).to_string(), "2025-06");
        assert!(YearMonth::of(date(2025, 1, 31)) < YearMonth::of(date(2025, 2, 1)));
        assert!(YearMonth::of(date(2024, 12, 1)) < YearMonth::of(date(2025, 1, 1)));
    }
}
