//! Jalali (Solar Hijri) calendar dates
//!
//! Dates cross the API as Jalali `YYYY-MM-DD` strings; everything behind the
//! boundary works with Gregorian [`NaiveDate`]. The conversion uses the
//! 33-year arithmetic leap cycle and is exact for years 1000 through 1999.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Years outside this range are rejected
pub const MIN_YEAR: i32 = 1000;
pub const MAX_YEAR: i32 = 1999;

// Offsets between the cycle day counts below and chrono's days-from-CE
const GREGORIAN_EPOCH_OFFSET: i64 = 356_032;
const JALALI_EPOCH_OFFSET: i64 = 365;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("'{0}' is not a YYYY-MM-DD date")]
    Malformed(String),

    #[error("{year:04}-{month:02}-{day:02} does not exist in the Jalali calendar")]
    InvalidDate { year: i32, month: u32, day: u32 },

    #[error("year {0} is outside the supported range")]
    OutOfRange(i32),
}

/// A validated Jalali calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JalaliDate {
    year: i32,
    month: u32,
    day: u32,
}

impl JalaliDate {
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self, CalendarError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(CalendarError::OutOfRange(year));
        }
        if !(1..=12).contains(&month) || day < 1 || day > month_length(year, month) {
            return Err(CalendarError::InvalidDate { year, month, day });
        }
        Ok(Self { year, month, day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn is_leap_year(year: i32) -> bool {
        cycle_days(year + 1, 1, 1) - cycle_days(year, 1, 1) == 366
    }

    pub fn from_gregorian(date: NaiveDate) -> Result<Self, CalendarError> {
        let mut days = i64::from(date.num_days_from_ce()) + GREGORIAN_EPOCH_OFFSET;

        let mut year = -1595 + 33 * (days / 12_053);
        days %= 12_053;
        year += 4 * (days / 1461);
        days %= 1461;
        if days > 365 {
            year += (days - 1) / 365;
            days = (days - 1) % 365;
        }

        let (month, day) = if days < 186 {
            (1 + days / 31, 1 + days % 31)
        } else {
            (7 + (days - 186) / 30, 1 + (days - 186) % 30)
        };

        let year = i32::try_from(year).map_err(|_| CalendarError::OutOfRange(i32::MAX))?;
        // month and day are bounded by the arithmetic above
        Self::new(year, month as u32, day as u32)
    }

    pub fn to_gregorian(&self) -> NaiveDate {
        let days = cycle_days(self.year, self.month, self.day) - JALALI_EPOCH_OFFSET;
        // Every date in the supported year range maps well inside chrono's range
        NaiveDate::from_num_days_from_ce_opt(days as i32).unwrap_or(NaiveDate::MIN)
    }
}

fn month_length(year: i32, month: u32) -> u32 {
    match month {
        1..=6 => 31,
        7..=11 => 30,
        12 if JalaliDate::is_leap_year(year) => 30,
        _ => 29,
    }
}

/// Day count on the Jalali 33-year cycle
fn cycle_days(year: i32, month: u32, day: u32) -> i64 {
    let jy = i64::from(year) + 1595;
    let month = i64::from(month);
    let month_offset = if month < 7 {
        (month - 1) * 31
    } else {
        (month - 7) * 30 + 186
    };
    -355_668 + 365 * jy + (jy / 33) * 8 + ((jy % 33) + 3) / 4 + i64::from(day) + month_offset
}

impl fmt::Display for JalaliDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for JalaliDate {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CalendarError::Malformed(s.to_string());
        let mut parts = s.trim().split('-');
        let (Some(y), Some(m), Some(d), None) = (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        if y.len() != 4 || m.len() != 2 || d.len() != 2 {
            return Err(malformed());
        }
        let year = y.parse().map_err(|_| malformed())?;
        let month = m.parse().map_err(|_| malformed())?;
        let day = d.parse().map_err(|_| malformed())?;
        JalaliDate::new(year, month, day)
    }
}

impl Serialize for JalaliDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JalaliDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: a Gregorian [`NaiveDate`] field written as a Jalali string
///
/// ```ignore
/// #[serde(with = "shared::calendar::jalali")]
/// pub plan_date: NaiveDate,
/// ```
pub mod jalali {
    use super::JalaliDate;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        JalaliDate::from_gregorian(*date)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        Ok(JalaliDate::deserialize(deserializer)?.to_gregorian())
    }
}

/// Like [`jalali`] for `Option<NaiveDate>`
pub mod jalali_option {
    use super::JalaliDate;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        date.map(JalaliDate::from_gregorian)
            .transpose()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        Ok(Option::<JalaliDate>::deserialize(deserializer)?.map(|date| date.to_gregorian()))
    }
}
