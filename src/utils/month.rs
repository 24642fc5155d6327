use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::utils::validation::MONTH_RE;

/// A calendar month selected by a `YYYY-MM` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonthParam {
    pub year: i32,
    pub month: u32,
    /// `false` when the raw value was unusable and the current month was substituted.
    pub is_valid: bool,
}

/// Parses `raw`, falling back to the month containing `today` when it is
/// missing, malformed, more than ten years back or beyond next year.
pub fn parse_month_param(raw: Option<&str>, today: NaiveDate) -> MonthParam {
    let current = MonthParam {
        year: today.year(),
        month: today.month(),
        is_valid: true,
    };

    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return current;
    };
    if !MONTH_RE.is_match(raw) {
        return MonthParam {
            is_valid: false,
            ..current
        };
    }

    let parsed = raw
        .split_once('-')
        .and_then(|(y, m)| Some((y.parse::<i32>().ok()?, m.parse::<u32>().ok()?)));
    match parsed {
        Some((year, month)) if (today.year() - 10..=today.year() + 1).contains(&year) => {
            MonthParam {
                year,
                month,
                is_valid: true,
            }
        }
        _ => MonthParam {
            is_valid: false,
            ..current
        },
    }
}

impl MonthParam {
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.first_day()
            .checked_add_months(Months::new(1))
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let last = self.last_day();
        self.first_day().iter_days().take_while(move |d| *d <= last)
    }

    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// Fiscal year a date falls in, named by the calendar year it starts in.
pub fn fiscal_year(date: NaiveDate, start_month: u32) -> i32 {
    if date.month() >= start_month {
        date.year()
    } else {
        date.year() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn valid_month_is_used() {
        let m = parse_month_param(Some("2025-02"), today());
        assert_eq!(
            m,
            MonthParam {
                year: 2025,
                month: 2,
                is_valid: true
            }
        );
        assert_eq!(m.last_day(), NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        assert_eq!(m.days().count(), 28);
    }

    #[test]
    fn missing_month_is_current_and_valid() {
        let m = parse_month_param(None, today());
        assert_eq!((m.year, m.month, m.is_valid), (2025, 6, true));
        assert_eq!(m.label(), "2025-06");
    }

    #[test]
    fn malformed_or_out_of_range_falls_back() {
        for raw in ["2025-13", "abc", "2014-12", "2027-01"] {
            let m = parse_month_param(Some(raw), today());
            assert_eq!((m.year, m.month, m.is_valid), (2025, 6, false), "{raw}");
        }
        assert!(parse_month_param(Some("2015-01"), today()).is_valid);
        assert!(parse_month_param(Some("2026-12"), today()).is_valid);
    }

    #[test]
    fn leap_february_and_december() {
        let feb = parse_month_param(Some("2024-02"), today());
        assert_eq!(feb.days().count(), 29);
        let dec = parse_month_param(Some("2024-12"), today());
        assert_eq!(dec.last_day(), NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn fiscal_year_starts_in_april() {
        let march = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let april = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        assert_eq!(fiscal_year(march, 4), 2024);
        assert_eq!(fiscal_year(april, 4), 2025);
        assert_eq!(fiscal_year(march, 1), 2025);
    }
}
