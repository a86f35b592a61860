/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! DateTime value for representing protocol timestamps.
//!
//! Unlike [`std::time::Instant`], this type is not opaque: the time inside of
//! it can be read and modified. It also holds the formatting logic for every
//! timestamp format the protocols use on the wire; the corresponding parsers
//! live in the `aws-clientrt-parse` crate.

use num_integer::div_mod_floor;
use std::convert::TryFrom;
use std::error::Error as StdError;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

mod format;

const MILLIS_PER_SECOND: i64 = 1000;
const NANOS_PER_MILLI: u32 = 1_000_000;
const NANOS_PER_SECOND: i128 = 1_000_000_000;
const NANOS_PER_SECOND_U32: u32 = 1_000_000_000;

const SECONDS_PER_DAY: i64 = 86_400;

/// Instant in time represented as seconds and sub-second nanos since
/// the Unix epoch (January 1, 1970 at midnight UTC/GMT).
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct DateTime {
    seconds: i64,
    subsecond_nanos: u32,
}

impl DateTime {
    /// Creates a `DateTime` from a number of seconds since the Unix epoch.
    pub fn from_secs(epoch_seconds: i64) -> Self {
        DateTime {
            seconds: epoch_seconds,
            subsecond_nanos: 0,
        }
    }

    /// Creates a `DateTime` from a number of seconds and sub-second nanos since the Unix epoch.
    ///
    /// # Panics
    ///
    /// Panics when `subsecond_nanos` is a full second or more.
    pub fn from_secs_and_nanos(seconds: i64, subsecond_nanos: u32) -> Self {
        if subsecond_nanos >= NANOS_PER_SECOND_U32 {
            panic!("{} is >= 1_000_000_000", subsecond_nanos)
        }
        DateTime {
            seconds,
            subsecond_nanos,
        }
    }

    /// Converts a number of milliseconds since the Unix epoch into a `DateTime`.
    pub fn from_millis(epoch_millis: i64) -> Self {
        let (seconds, millis) = div_mod_floor(epoch_millis, MILLIS_PER_SECOND);
        DateTime::from_secs_and_nanos(seconds, millis as u32 * NANOS_PER_MILLI)
    }

    /// Creates a `DateTime` from a number of nanoseconds since the Unix epoch.
    pub fn from_nanos(epoch_nanos: i128) -> Result<Self, ConversionError> {
        let (seconds, subsecond_nanos) = div_mod_floor(epoch_nanos, NANOS_PER_SECOND);
        let seconds = i64::try_from(seconds).map_err(|_| {
            ConversionError("given epoch nanos are too large to fit into a DateTime")
        })?;
        // safe cast because of the modulus
        Ok(DateTime {
            seconds,
            subsecond_nanos: subsecond_nanos as u32,
        })
    }

    /// Returns the epoch seconds component of the `DateTime`.
    ///
    /// _Note: this does not include the sub-second nanos._
    pub fn secs(&self) -> i64 {
        self.seconds
    }

    /// Returns the sub-second nanos component of the `DateTime`.
    pub fn subsec_nanos(&self) -> u32 {
        self.subsecond_nanos
    }

    /// Returns true if sub-second nanos is greater than zero.
    pub fn has_subsec_nanos(&self) -> bool {
        self.subsecond_nanos != 0
    }

    /// Formats the `DateTime` to a string using the given `format`.
    pub fn fmt(&self, format: Format) -> String {
        match format {
            Format::DateTime => format::date_time::format(self),
            Format::HttpDate => format::http_date::format(self),
            Format::EpochSeconds => format::epoch_seconds::format(self),
        }
    }
}

impl From<DateTime> for SystemTime {
    fn from(date_time: DateTime) -> Self {
        if date_time.secs() < 0 {
            let mut secs = date_time.secs().unsigned_abs();
            let mut nanos = date_time.subsec_nanos();
            if date_time.has_subsec_nanos() {
                secs -= 1;
                nanos = NANOS_PER_SECOND_U32 - nanos;
            }
            UNIX_EPOCH - Duration::new(secs, nanos)
        } else {
            UNIX_EPOCH + Duration::new(date_time.secs().unsigned_abs(), date_time.subsec_nanos())
        }
    }
}

impl From<SystemTime> for DateTime {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(duration) => DateTime::from_secs_and_nanos(
                i64::try_from(duration.as_secs())
                    .expect("SystemTime has the same precision as DateTime"),
                duration.subsec_nanos(),
            ),
            Err(earlier) => {
                let duration = earlier.duration();
                let mut secs = -(duration.as_secs() as i128);
                let mut nanos = duration.subsec_nanos() as i128;
                if nanos != 0 {
                    secs -= 1;
                    nanos = NANOS_PER_SECOND - nanos;
                }
                DateTime::from_nanos(secs * NANOS_PER_SECOND + nanos)
                    .expect("SystemTime has the same precision as DateTime")
            }
        }
    }
}

/// Failure to convert a `DateTime` to or from another type.
#[derive(Debug)]
#[non_exhaustive]
pub struct ConversionError(&'static str);

impl StdError for ConversionError {}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Formats for representing a `DateTime` on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Format {
    /// ISO-8601 extended date time, UTC, `Z` suffix.
    DateTime,
    /// Date format used by the HTTP `Date` header, specified in RFC-5322.
    HttpDate,
    /// Number of seconds since the Unix epoch with an optional fraction.
    EpochSeconds,
}

/// Calendar fields of a `DateTime` in UTC.
///
/// Used by the formatters in this crate and by the SigV4 date stamps.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[allow(missing_docs)]
pub struct CivilDateTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub subsecond_nanos: u32,
}

impl CivilDateTime {
    /// Splits a `DateTime` into UTC calendar fields.
    pub fn from_date_time(date_time: &DateTime) -> Self {
        let (days, secs_of_day) = div_mod_floor(date_time.secs(), SECONDS_PER_DAY);
        let (year, month, day) = civil_from_days(days);
        CivilDateTime {
            year,
            month,
            day,
            hour: (secs_of_day / 3600) as u8,
            minute: (secs_of_day % 3600 / 60) as u8,
            second: (secs_of_day % 60) as u8,
            subsecond_nanos: date_time.subsec_nanos(),
        }
    }

    /// Day of the week, `0` = Sunday.
    pub fn day_of_week(&self) -> u8 {
        let days = days_from_civil(self.year, self.month, self.day);
        // the epoch was a Thursday
        (days + 4).rem_euclid(7) as u8
    }
}

/// Days since the Unix epoch for a proleptic Gregorian calendar date.
pub fn days_from_civil(year: i32, month: u8, day: u8) -> i64 {
    let year = i64::from(year) - i64::from(month <= 2);
    let era = if year >= 0 { year } else { year - 399 } / 400;
    let year_of_era = year - era * 400;
    let month = i64::from(month);
    let day_of_year = (153 * (if month > 2 { month - 3 } else { month + 9 }) + 2) / 5
        + i64::from(day)
        - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

/// Inverse of [`days_from_civil`].
pub fn civil_from_days(days: i64) -> (i32, u8, u8) {
    let days = days + 719_468;
    let era = if days >= 0 { days } else { days - 146_096 } / 146_097;
    let day_of_era = days - era * 146_097;
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let year = year_of_era + era * 400;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let mp = (5 * day_of_year + 2) / 153;
    let day = (day_of_year - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    (
        (year + i64::from(month <= 2)) as i32,
        month,
        day,
    )
}

/// Number of seconds since the Unix epoch for the given UTC calendar fields.
pub fn epoch_seconds_from_civil(
    year: i32,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
) -> i64 {
    days_from_civil(year, month, day) * SECONDS_PER_DAY
        + i64::from(hour) * 3600
        + i64::from(minute) * 60
        + i64::from(second)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::proptest;

    #[test]
    fn test_fmt() {
        let date_time = DateTime::from_secs(1576540098);
        assert_eq!(date_time.fmt(Format::DateTime), "2019-12-16T23:48:18Z");
        assert_eq!(date_time.fmt(Format::EpochSeconds), "1576540098");
        assert_eq!(
            date_time.fmt(Format::HttpDate),
            "Mon, 16 Dec 2019 23:48:18 GMT"
        );

        let date_time = DateTime::from_secs_and_nanos(1576540098, 520_000_000);
        assert_eq!(date_time.fmt(Format::DateTime), "2019-12-16T23:48:18.52Z");
        assert_eq!(date_time.fmt(Format::EpochSeconds), "1576540098.52");
        assert_eq!(
            date_time.fmt(Format::HttpDate),
            "Mon, 16 Dec 2019 23:48:18.52 GMT"
        );
    }

    #[test]
    fn civil_round_trip_known_dates() {
        assert_eq!(0, days_from_civil(1970, 1, 1));
        assert_eq!((1970, 1, 1), civil_from_days(0));
        assert_eq!((2000, 2, 29), civil_from_days(days_from_civil(2000, 2, 29)));
        assert_eq!((1969, 12, 31), civil_from_days(-1));
    }

    #[test]
    fn civil_fields_of_timestamp() {
        let civil = CivilDateTime::from_date_time(&DateTime::from_secs(1604588357));
        assert_eq!(
            civil,
            CivilDateTime {
                year: 2020,
                month: 11,
                day: 5,
                hour: 14,
                minute: 59,
                second: 17,
                subsecond_nanos: 0,
            }
        );
        // 2020-11-05 was a Thursday
        assert_eq!(4, civil.day_of_week());
    }

    #[test]
    fn system_time_round_trip() {
        let date_time = DateTime::from_secs_and_nanos(1576540098, 123_456_789);
        assert_eq!(date_time, DateTime::from(SystemTime::from(date_time)));

        let before_epoch = DateTime::from_secs_and_nanos(-1627680005, 877_000_000);
        assert_eq!(before_epoch, DateTime::from(SystemTime::from(before_epoch)));
    }

    proptest! {
        #[test]
        fn civil_round_trips(days in -1_000_000i64..1_000_000) {
            let (y, m, d) = civil_from_days(days);
            assert_eq!(days, days_from_civil(y, m, d));
            assert!((1..=12).contains(&m));
            assert!((1..=31).contains(&d));
        }
    }
}
