/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Parsers for the wire timestamp formats: epoch seconds, ISO-8601, and
//! RFC-5322.
//!
//! Each entry point consumes the entire input and produces a
//! [`ParsedDatetime`] holding the calendar fields exactly as written,
//! including the UTC offset. Use [`ParsedDatetime::as_date_time`] to
//! normalize to an instant.

use crate::combinators::{
    alt, char, fraction, map, n_digits_in_range, one_of, optional, preceded, take_m_n_digits,
    take_while_m_n, PResult, ParseError,
};
use aws_clientrt_types::date_time::epoch_seconds_from_civil;
use aws_clientrt_types::date_time::{civil_from_days, DateTime};

const NANOS_PER_SECOND: i128 = 1_000_000_000;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Calendar fields parsed out of a timestamp, exactly as written.
///
/// `second` ranges to 60 to tolerate leap seconds. `offset_seconds` is the
/// signed offset from UTC that was written with the timestamp (zero for `Z`,
/// `GMT`, and friends).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct ParsedDatetime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub nanos: u32,
    pub offset_seconds: i32,
}

impl ParsedDatetime {
    /// Normalizes the calendar fields to an instant, applying the offset.
    pub fn as_date_time(&self) -> DateTime {
        let local = epoch_seconds_from_civil(
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        );
        DateTime::from_secs_and_nanos(local - i64::from(self.offset_seconds), self.nanos)
    }

    fn from_epoch_nanos(epoch_nanos: i128) -> Self {
        let date_time = DateTime::from_nanos(epoch_nanos)
            .expect("parsed epoch seconds fit into a DateTime");
        let days = date_time.secs().div_euclid(86_400);
        let secs_of_day = date_time.secs().rem_euclid(86_400);
        let (year, month, day) = civil_from_days(days);
        ParsedDatetime {
            year,
            month,
            day,
            hour: (secs_of_day / 3600) as u8,
            minute: (secs_of_day % 3600 / 60) as u8,
            second: (secs_of_day % 60) as u8,
            nanos: date_time.subsec_nanos(),
            offset_seconds: 0,
        }
    }
}

fn expect_end_of_input(input: &str, pos: usize) -> Result<(), ParseError> {
    if pos == input.len() {
        Ok(())
    } else {
        Err(ParseError::error(pos, "expected end of input"))
    }
}

/// Parses `integer[.fraction]` seconds since the Unix epoch. The fraction is
/// scaled to nanoseconds and must not exceed nine digits.
pub fn parse_epoch(input: &str) -> Result<ParsedDatetime, ParseError> {
    let (pos, sign) = optional(char('-'))(input, 0)?;
    let (pos, seconds) = take_m_n_digits(1, 18)(input, pos)?;
    let (pos, frac_nanos) = optional(preceded(char('.'), fraction(1, 9, 9)))(input, pos)?;
    expect_end_of_input(input, pos)?;

    let magnitude = seconds as i128 * NANOS_PER_SECOND + frac_nanos.unwrap_or(0) as i128;
    let epoch_nanos = if sign.is_some() { -magnitude } else { magnitude };
    Ok(ParsedDatetime::from_epoch_nanos(epoch_nanos))
}

/// Parses an ISO-8601 date or date-time.
///
/// Accepted shapes:
/// * `YYYY-MM-DD` (midnight UTC)
/// * `YYYY-MM-DDThh:mm:ss[.fraction][Z|z|±hh:mm]`
/// * `YYYYMMDDThhmmss[…]` and `YYYYMMDDThh:mm:ss[…]` (colons in the time are
///   optional for the basic date form, but must be used consistently)
pub fn parse_iso8601(input: &str) -> Result<ParsedDatetime, ParseError> {
    let (pos, year) = n_digits_in_range(4, 1..=9999)(input, 0)?;
    let (pos, dash) = optional(char('-'))(input, pos)?;
    let extended = dash.is_some();
    let (pos, month) = n_digits_in_range(2, 1..=12)(input, pos)?;
    let pos = if extended {
        let (pos, _) = char('-')(input, pos)?;
        pos
    } else {
        pos
    };
    let (pos, day) = n_digits_in_range(2, 1..=31)(input, pos)?;

    if extended && pos == input.len() {
        // date-only form
        return Ok(ParsedDatetime {
            year: year as i32,
            month: month as u8,
            day: day as u8,
            hour: 0,
            minute: 0,
            second: 0,
            nanos: 0,
            offset_seconds: 0,
        });
    }

    let (pos, _) = char('T')(input, pos)?;
    let (pos, hour) = n_digits_in_range(2, 0..=23)(input, pos)?;
    let (pos, colon) = if extended {
        let (pos, c) = char(':')(input, pos)?;
        (pos, Some(c))
    } else {
        optional(char(':'))(input, pos)?
    };
    let (pos, minute) = n_digits_in_range(2, 0..=59)(input, pos)?;
    let pos = if colon.is_some() {
        let (pos, _) = char(':')(input, pos)?;
        pos
    } else {
        pos
    };
    let (pos, second) = n_digits_in_range(2, 0..=60)(input, pos)?;
    let (pos, frac_nanos) = optional(preceded(char('.'), fraction(1, 9, 9)))(input, pos)?;
    let (pos, offset_seconds) = iso8601_offset(input, pos)?;
    expect_end_of_input(input, pos)?;

    Ok(ParsedDatetime {
        year: year as i32,
        month: month as u8,
        day: day as u8,
        hour: hour as u8,
        minute: minute as u8,
        second: second as u8,
        nanos: frac_nanos.unwrap_or(0) as u32,
        offset_seconds,
    })
}

/// `Z`, `z`, `±hh:mm`, or nothing (UTC assumed). Anything else, including
/// fraction digits past the supported nine, is an invalid timezone offset.
fn iso8601_offset(input: &str, pos: usize) -> PResult<i32> {
    if pos == input.len() {
        return Ok((pos, 0));
    }
    let parser = alt((
        map(one_of("Zz"), |_| 0i32),
        |input: &str, pos: usize| -> PResult<i32> {
            let (pos, sign) = one_of("+-")(input, pos)?;
            let (pos, hours) = n_digits_in_range(2, 0..=23)(input, pos)?;
            let (pos, _) = char(':')(input, pos)?;
            let (pos, minutes) = n_digits_in_range(2, 0..=59)(input, pos)?;
            let magnitude = (hours * 3600 + minutes * 60) as i32;
            let offset = if sign == '-' { -magnitude } else { magnitude };
            Ok((pos, offset))
        },
    ));
    parser(input, pos).map_err(|_| ParseError::error(pos, "invalid timezone offset"))
}

/// Parses an RFC-5322 date-time, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
///
/// The day of week is optional; the day accepts one or two digits; seconds
/// are optional and may be `60` for a leap second. The zone is a mandatory
/// `±hhmm` numeric offset or one of `GMT`, `UTC`, `UT`, `Z`; other named
/// zones are rejected.
pub fn parse_rfc5322(input: &str) -> Result<ParsedDatetime, ParseError> {
    let alpha = |c: char| c.is_ascii_alphabetic();

    let mut pos = 0;
    if input.chars().next().map(|c| c.is_ascii_alphabetic()) == Some(true) {
        let (after_name, name) = take_while_m_n(3, 3, alpha)(input, pos)?;
        if !DAY_NAMES.contains(&name) {
            return Err(ParseError::error(pos, "invalid day of week"));
        }
        let (after_sep, _) = char(',')(input, after_name)?;
        let (after_space, _) = char(' ')(input, after_sep)?;
        pos = after_space;
    }

    let (pos, day) = {
        let (pos, day) = take_m_n_digits(1, 2)(input, pos)?;
        if !(1..=31).contains(&day) {
            return Err(ParseError::error(pos, "day is not in the range 1..=31"));
        }
        (pos, day)
    };
    let (pos, _) = char(' ')(input, pos)?;
    let month_pos = pos;
    let (pos, month_name) = take_while_m_n(3, 3, alpha)(input, pos)?;
    let month = MONTH_NAMES
        .iter()
        .position(|name| *name == month_name)
        .ok_or_else(|| ParseError::error(month_pos, "invalid month"))?
        + 1;
    let (pos, _) = char(' ')(input, pos)?;
    let (pos, year) = n_digits_in_range(4, 1..=9999)(input, pos)?;
    let (pos, _) = char(' ')(input, pos)?;
    let (pos, hour) = n_digits_in_range(2, 0..=23)(input, pos)?;
    let (pos, _) = char(':')(input, pos)?;
    let (pos, minute) = n_digits_in_range(2, 0..=59)(input, pos)?;
    // seconds are optional and tolerate a leap second
    let (pos, second) = optional(preceded(char(':'), n_digits_in_range(2, 0..=60)))(input, pos)?;
    let (pos, _) = char(' ')(input, pos)?;
    let (pos, offset_seconds) = rfc5322_zone(input, pos)?;
    expect_end_of_input(input, pos)?;

    Ok(ParsedDatetime {
        year: year as i32,
        month: month as u8,
        day: day as u8,
        hour: hour as u8,
        minute: minute as u8,
        second: second.unwrap_or(0) as u8,
        nanos: 0,
        offset_seconds,
    })
}

/// `±hhmm` (sign mandatory, two digits each) or one of the UTC names.
fn rfc5322_zone(input: &str, pos: usize) -> PResult<i32> {
    match input[pos..].chars().next() {
        Some(sign @ ('+' | '-')) => {
            let parsed = (|| -> PResult<u64> {
                let (pos, hours) = n_digits_in_range(2, 0..=23)(input, pos + 1)?;
                let (pos, minutes) = n_digits_in_range(2, 0..=59)(input, pos)?;
                Ok((pos, hours * 3600 + minutes * 60))
            })();
            match parsed {
                Ok((end, magnitude)) => {
                    let magnitude = magnitude as i32;
                    Ok((end, if sign == '-' { -magnitude } else { magnitude }))
                }
                Err(_) => Err(ParseError::error(pos, "invalid timezone offset")),
            }
        }
        Some(c) if c.is_ascii_alphabetic() => {
            let (end, name) = take_while_m_n(1, 4, |c: char| c.is_ascii_alphabetic())(input, pos)?;
            match name {
                "GMT" | "UTC" | "UT" | "Z" => Ok((end, 0)),
                _ => Err(ParseError::error(pos, "invalid timezone offset")),
            }
        }
        _ => Err(ParseError::error(pos, "invalid timezone offset")),
    }
}
