//! Jalali calendar boundary tests
//!
//! Dates cross the API as Jalali strings. These check known anchor dates, leap
//! years, and that conversion to Gregorian and back is lossless.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use shared::calendar::{CalendarError, JalaliDate};
use std::str::FromStr;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Dated {
    #[serde(with = "shared::calendar::jalali")]
    date: NaiveDate,
    #[serde(default, with = "shared::calendar::jalali_option")]
    inspected: Option<NaiveDate>,
}

fn gregorian(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test Nowruz anchors
    #[test]
    fn test_new_year_anchors() {
        let nowruz_1403 = JalaliDate::new(1403, 1, 1).unwrap();
        assert_eq!(nowruz_1403.to_gregorian(), gregorian(2024, 3, 20));

        let nowruz_1404 = JalaliDate::new(1404, 1, 1).unwrap();
        assert_eq!(nowruz_1404.to_gregorian(), gregorian(2025, 3, 21));
    }

    /// Test a mid-year conversion from Gregorian
    #[test]
    fn test_from_gregorian() {
        let date = JalaliDate::from_gregorian(gregorian(2025, 11, 18)).unwrap();
        assert_eq!(date.to_string(), "1404-08-27");
    }

    /// Test the last day of Esfand in leap and common years
    #[test]
    fn test_esfand_30() {
        assert!(JalaliDate::is_leap_year(1403));
        assert!(!JalaliDate::is_leap_year(1404));
        assert!(JalaliDate::from_str("1403-12-30").is_ok());
        assert_eq!(
            JalaliDate::from_str("1404-12-30"),
            Err(CalendarError::InvalidDate {
                year: 1404,
                month: 12,
                day: 30
            })
        );
    }

    /// Test malformed strings
    #[test]
    fn test_malformed_strings() {
        for raw in ["", "1403-1-01", "1403/01/01", "14030101", "1403-01-01-01", "abcd-ef-gh"] {
            assert!(
                matches!(JalaliDate::from_str(raw), Err(CalendarError::Malformed(_))),
                "{:?}",
                raw
            );
        }
        assert!(JalaliDate::from_str("1403-13-01").is_err());
        assert!(JalaliDate::from_str("1403-07-31").is_err());
    }

    /// Test the serde adapters write and read Jalali strings
    #[test]
    fn test_serde_adapters() {
        let value = Dated {
            date: gregorian(2024, 3, 20),
            inspected: None,
        };
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["date"], "1403-01-01");
        assert!(json["inspected"].is_null());

        let parsed: Dated =
            serde_json::from_str(r#"{"date":"1404-08-27","inspected":"1403-12-30"}"#).unwrap();
        assert_eq!(parsed.date, gregorian(2025, 11, 18));
        assert_eq!(parsed.inspected, Some(gregorian(2025, 3, 20)));

        assert!(serde_json::from_str::<Dated>(r#"{"date":"1404-12-30"}"#).is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// Gregorian to Jalali and back is the identity over several decades
        #[test]
        fn prop_round_trip(offset in 0i64..(365 * 60)) {
            let date = gregorian(1990, 1, 1) + Duration::days(offset);
            let jalali = JalaliDate::from_gregorian(date).unwrap();
            prop_assert_eq!(jalali.to_gregorian(), date);

            let reparsed = JalaliDate::from_str(&jalali.to_string()).unwrap();
            prop_assert_eq!(reparsed, jalali);
        }

        /// Consecutive Gregorian days map to consecutive Jalali days
        #[test]
        fn prop_consecutive_days(offset in 0i64..(365 * 60)) {
            let today = gregorian(1990, 1, 1) + Duration::days(offset);
            let a = JalaliDate::from_gregorian(today).unwrap();
            let b = JalaliDate::from_gregorian(today + Duration::days(1)).unwrap();
            prop_assert!(b > a);
        }
    }
}
