use chrono::{DateTime, Datelike as _, NaiveDate, TimeZone as _, Utc};
use eyre::{bail, Error};
use serde::{Deserialize, Serialize};

/// One quarter of the April-March fiscal calendar.
///
/// Q1 = Apr-Jun, Q2 = Jul-Sep, Q3 = Oct-Dec, Q4 = Jan-Mar of the next
/// calendar year. A fiscal year is named by the calendar year it starts in,
/// so March of calendar year Y belongs to fiscal year Y-1.
///
/// This module is the only place quarter arithmetic lives.
#[derive(Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug, Hash)]
pub struct FiscalQuarter {
    pub fiscal_year: i32,
    pub quarter: u8,
}

impl FiscalQuarter {
    pub fn new(quarter: u8, fiscal_year: i32) -> Result<Self, Error> {
        if !(1..=4).contains(&quarter) {
            bail!("invalid quarter: {}", quarter);
        }
        Ok(FiscalQuarter {
            fiscal_year,
            quarter,
        })
    }

    pub fn of(date: DateTime<Utc>) -> Self {
        let quarter = match date.month() {
            4..=6 => 1,
            7..=9 => 2,
            10..=12 => 3,
            _ => 4,
        };
        let fiscal_year = if date.month() < 4 {
            date.year() - 1
        } else {
            date.year()
        };
        FiscalQuarter {
            fiscal_year,
            quarter,
        }
    }

    pub fn current() -> Self {
        Self::of(Utc::now())
    }

    pub fn all(fiscal_year: i32) -> [FiscalQuarter; 4] {
        [1, 2, 3, 4].map(|quarter| FiscalQuarter {
            fiscal_year,
            quarter,
        })
    }

    pub fn start(&self) -> DateTime<Utc> {
        let (year, month) = match self.quarter {
            1 => (self.fiscal_year, 4),
            2 => (self.fiscal_year, 7),
            3 => (self.fiscal_year, 10),
            _ => (self.fiscal_year + 1, 1),
        };
        start_of_day(year, month, 1)
    }

    pub fn end(&self) -> DateTime<Utc> {
        let (year, month, day) = match self.quarter {
            1 => (self.fiscal_year, 6, 30),
            2 => (self.fiscal_year, 9, 30),
            3 => (self.fiscal_year, 12, 31),
            _ => (self.fiscal_year + 1, 3, 31),
        };
        end_of_day(year, month, day)
    }

    /// Inclusive `[start, end]` bounds, end at 23:59:59.999999.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start(), self.end())
    }

    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.start() <= date && date <= self.end()
    }

    /// The three `(year, month)` pairs the quarter spans.
    pub fn months(&self) -> [(i32, u32); 3] {
        let (year, first) = match self.quarter {
            1 => (self.fiscal_year, 4),
            2 => (self.fiscal_year, 7),
            3 => (self.fiscal_year, 10),
            _ => (self.fiscal_year + 1, 1),
        };
        [(year, first), (year, first + 1), (year, first + 2)]
    }

    /// Display label, e.g. `Q3-2025`.
    pub fn label(&self) -> String {
        format!("Q{}-{}", self.quarter, self.fiscal_year)
    }

    pub fn parse_label(label: &str) -> Result<Self, Error> {
        let rest = label
            .strip_prefix('Q')
            .ok_or_else(|| eyre::eyre!("invalid quarter label: {}", label))?;
        let (quarter, year) = rest
            .split_once('-')
            .ok_or_else(|| eyre::eyre!("invalid quarter label: {}", label))?;
        Self::new(quarter.parse()?, year.parse()?)
    }
}

/// Fiscal year a date falls into.
pub fn fiscal_year_of(date: DateTime<Utc>) -> i32 {
    FiscalQuarter::of(date).fiscal_year
}

/// Apr 1 of `year` through end-of-day Mar 31 of `year + 1`.
pub fn fiscal_year_bounds(year: i32) -> (DateTime<Utc>, DateTime<Utc>) {
    (start_of_day(year, 4, 1), end_of_day(year + 1, 3, 31))
}

fn start_of_day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .expect("valid calendar day")
}

fn end_of_day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_micro_opt(23, 59, 59, 999_999))
        .expect("valid calendar day");
    Utc.from_utc_datetime(&naive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn april_starts_the_fiscal_year() {
        let q = FiscalQuarter::of(at(2025, 4, 1));
        assert_eq!(q.quarter, 1);
        assert_eq!(q.fiscal_year, 2025);
    }

    #[test]
    fn march_belongs_to_the_previous_fiscal_year() {
        let q = FiscalQuarter::of(at(2025, 3, 31));
        assert_eq!(q.quarter, 4);
        assert_eq!(q.fiscal_year, 2024);
    }

    #[test]
    fn q4_bounds_fall_in_the_next_calendar_year() {
        let q4 = FiscalQuarter::new(4, 2024).unwrap();
        assert_eq!(q4.start(), Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(q4.end().date_naive(), NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
    }

    #[test]
    fn quarters_cover_the_fiscal_year_without_gaps() {
        let quarters = FiscalQuarter::all(2024);
        let (year_start, year_end) = fiscal_year_bounds(2024);
        assert_eq!(quarters[0].start(), year_start);
        assert_eq!(quarters[3].end(), year_end);
        for pair in quarters.windows(2) {
            assert_eq!(
                pair[0].end() + Duration::microseconds(1),
                pair[1].start(),
                "gap between {} and {}",
                pair[0].label(),
                pair[1].label()
            );
        }
    }

    #[test]
    fn bounds_are_end_of_day_inclusive() {
        let q1 = FiscalQuarter::new(1, 2025).unwrap();
        assert!(q1.contains(at(2025, 6, 30)));
        assert!(!q1.contains(at(2025, 7, 1)));
    }

    #[test]
    fn label_round_trip() {
        let q = FiscalQuarter::new(3, 2025).unwrap();
        assert_eq!(q.label(), "Q3-2025");
        assert_eq!(FiscalQuarter::parse_label("Q3-2025").unwrap(), q);
        assert!(FiscalQuarter::parse_label("Q5-2025").is_err());
        assert!(FiscalQuarter::parse_label("2025").is_err());
    }

    #[test]
    fn quarter_months() {
        let q4 = FiscalQuarter::new(4, 2024).unwrap();
        assert_eq!(q4.months(), [(2025, 1), (2025, 2), (2025, 3)]);
        let q2 = FiscalQuarter::new(2, 2024).unwrap();
        assert_eq!(q2.months(), [(2024, 7), (2024, 8), (2024, 9)]);
    }
}
