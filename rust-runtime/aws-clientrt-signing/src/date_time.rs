/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! SigV4 date stamps: `YYYYMMDD` and `YYYYMMDDTHHMMSSZ`.

use aws_clientrt_types::date_time::CivilDateTime;
use aws_clientrt_types::DateTime;
use std::time::SystemTime;

/// Formats the date portion of the credential scope.
pub(crate) fn format_date(time: SystemTime) -> String {
    let civil = CivilDateTime::from_date_time(&DateTime::from(time));
    format!("{:04}{:02}{:02}", civil.year, civil.month, civil.day)
}

/// Formats the `X-Amz-Date` timestamp.
pub(crate) fn format_date_time(time: SystemTime) -> String {
    let civil = CivilDateTime::from_date_time(&DateTime::from(time));
    format!(
        "{:04}{:02}{:02}T{:02}{:02}{:02}Z",
        civil.year, civil.month, civil.day, civil.hour, civil.minute, civil.second
    )
}

#[cfg(test)]
pub(crate) mod test_parsers {
    use std::time::{Duration, SystemTime};

    /// Parses a `YYYYMMDDTHHMMSSZ` date stamp back into a `SystemTime`.
    pub(crate) fn parse_date_time(date_time: &str) -> Option<SystemTime> {
        let bytes = date_time.as_bytes();
        if bytes.len() != 16 || bytes[8] != b'T' || bytes[15] != b'Z' {
            return None;
        }
        let digits = |range: std::ops::Range<usize>| date_time[range].parse::<i64>().ok();
        let (year, month, day) = (digits(0..4)?, digits(4..6)?, digits(6..8)?);
        let (hour, minute, second) = (digits(9..11)?, digits(11..13)?, digits(13..15)?);
        let days = aws_clientrt_types::date_time::days_from_civil(
            year as i32,
            month as u8,
            day as u8,
        );
        let secs = days * 86_400 + hour * 3600 + minute * 60 + second;
        Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs as u64))
    }

    #[test]
    fn round_trips() {
        let time = parse_date_time("20150830T123600Z").unwrap();
        assert_eq!("20150830T123600Z", super::format_date_time(time));
        assert_eq!("20150830", super::format_date(time));
    }
}
