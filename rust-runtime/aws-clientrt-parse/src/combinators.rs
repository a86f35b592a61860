/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! A tiny parser-combinator library.
//!
//! A parser is a function of `(input, position)` returning the new position
//! and a result, or a [`ParseError`]. Errors always carry the position they
//! occurred at. [`ParseError::Incomplete`] is distinct from a match failure:
//! it means the input ended before the parser could decide, and it drives
//! backtracking in [`alt`] the same way a failure does.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::ops::RangeInclusive;

/// Result of running a parser: the new position paired with the parsed value.
pub type PResult<T> = Result<(usize, T), ParseError>;

/// A failed parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input did not match what the parser expected.
    Error {
        /// Byte offset the failure occurred at.
        position: usize,
        /// What the parser expected.
        message: Cow<'static, str>,
    },
    /// The input ended before the parser could decide.
    Incomplete {
        /// Byte offset the input ran out at.
        position: usize,
        /// Minimum number of additional bytes required.
        needed: usize,
    },
}

impl ParseError {
    /// Creates a match failure at `position`.
    pub fn error(position: usize, message: impl Into<Cow<'static, str>>) -> Self {
        ParseError::Error {
            position,
            message: message.into(),
        }
    }

    /// Creates an incomplete-input failure at `position`.
    pub fn incomplete(position: usize, needed: usize) -> Self {
        ParseError::Incomplete { position, needed }
    }

    /// Byte offset the failure occurred at.
    pub fn position(&self) -> usize {
        match self {
            ParseError::Error { position, .. } => *position,
            ParseError::Incomplete { position, .. } => *position,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Error { position, message } => {
                write!(f, "parse error at position {}: {}", position, message)
            }
            ParseError::Incomplete { position, needed } => write!(
                f,
                "incomplete input at position {}: at least {} more bytes required",
                position, needed
            ),
        }
    }
}

impl StdError for ParseError {}

/// Matches exactly the character `expected`.
pub fn char(expected: char) -> impl Fn(&str, usize) -> PResult<char> {
    move |input, pos| match input[pos..].chars().next() {
        Some(c) if c == expected => Ok((pos + c.len_utf8(), c)),
        Some(_) => Err(ParseError::error(
            pos,
            format!("expected `{}`", expected),
        )),
        None => Err(ParseError::incomplete(pos, expected.len_utf8())),
    }
}

/// Matches the literal `expected`. Signals incomplete input when the
/// remaining input is shorter than the literal.
pub fn tag(expected: &'static str) -> impl Fn(&str, usize) -> PResult<&'static str> {
    move |input, pos| {
        let remaining = &input[pos..];
        if remaining.len() < expected.len() {
            return Err(ParseError::incomplete(
                pos,
                expected.len() - remaining.len(),
            ));
        }
        if remaining.starts_with(expected) {
            Ok((pos + expected.len(), expected))
        } else {
            Err(ParseError::error(pos, format!("expected `{}`", expected)))
        }
    }
}

/// Matches any one of the characters in `allowed`.
pub fn one_of(allowed: &'static str) -> impl Fn(&str, usize) -> PResult<char> {
    move |input, pos| match input[pos..].chars().next() {
        Some(c) if allowed.contains(c) => Ok((pos + c.len_utf8(), c)),
        Some(_) => Err(ParseError::error(
            pos,
            format!("expected one of `{}`", allowed),
        )),
        None => Err(ParseError::incomplete(pos, 1)),
    }
}

/// Matches between `m` and `n` characters satisfying `pred` (greedy).
pub fn take_while_m_n<'a>(
    m: usize,
    n: usize,
    pred: impl Fn(char) -> bool,
) -> impl Fn(&'a str, usize) -> PResult<&'a str> {
    move |input, pos| {
        let mut end = pos;
        let mut count = 0;
        for c in input[pos..].chars() {
            if count == n || !pred(c) {
                break;
            }
            end += c.len_utf8();
            count += 1;
        }
        if count < m {
            if end == input.len() {
                Err(ParseError::incomplete(end, m - count))
            } else {
                Err(ParseError::error(
                    end,
                    format!("expected at least {} matching characters", m),
                ))
            }
        } else {
            Ok((end, &input[pos..end]))
        }
    }
}

/// Matches everything up to (not including) the first character satisfying
/// `pred`. Signals incomplete input when no such character exists.
pub fn take_till<'a>(
    pred: impl Fn(char) -> bool,
) -> impl Fn(&'a str, usize) -> PResult<&'a str> {
    move |input, pos| {
        let mut end = pos;
        for c in input[pos..].chars() {
            if pred(c) {
                return Ok((end, &input[pos..end]));
            }
            end += c.len_utf8();
        }
        Err(ParseError::incomplete(end, 1))
    }
}

/// Matches exactly `n` decimal digits and returns them as an integer.
pub fn take_n_digits(n: usize) -> impl Fn(&str, usize) -> PResult<u64> {
    take_m_n_digits(n, n)
}

/// Matches between `m` and `n` decimal digits (greedy) and returns them as
/// an integer.
pub fn take_m_n_digits(m: usize, n: usize) -> impl Fn(&str, usize) -> PResult<u64> {
    move |input, pos| {
        let (end, digits) = take_while_m_n(m, n, |c| c.is_ascii_digit())(input, pos)?;
        let value = digits
            .parse::<u64>()
            .map_err(|_| ParseError::error(pos, "number too large"))?;
        Ok((end, value))
    }
}

/// Matches exactly `n` decimal digits whose value lies in `range`.
pub fn n_digits_in_range(
    n: usize,
    range: RangeInclusive<u64>,
) -> impl Fn(&str, usize) -> PResult<u64> {
    move |input, pos| {
        let (end, value) = take_n_digits(n)(input, pos)?;
        if range.contains(&value) {
            Ok((end, value))
        } else {
            Err(ParseError::error(
                pos,
                format!(
                    "{} is not in the range {}..={}",
                    value,
                    range.start(),
                    range.end()
                ),
            ))
        }
    }
}

/// Matches between `m` and `n` decimal digits whose value lies in `range`.
pub fn mn_digits_in_range(
    m: usize,
    n: usize,
    range: RangeInclusive<u64>,
) -> impl Fn(&str, usize) -> PResult<u64> {
    move |input, pos| {
        let (end, value) = take_m_n_digits(m, n)(input, pos)?;
        if range.contains(&value) {
            Ok((end, value))
        } else {
            Err(ParseError::error(
                pos,
                format!(
                    "{} is not in the range {}..={}",
                    value,
                    range.start(),
                    range.end()
                ),
            ))
        }
    }
}

/// Matches a decimal fraction of between `min_digits` and `max_digits`
/// digits and reinterprets it as an integer scaled to `scale_digits`.
///
/// `"1"` with a scale of 9 parses as `100_000_000` (0.1 seconds in nanos).
pub fn fraction(
    min_digits: usize,
    max_digits: usize,
    scale_digits: u32,
) -> impl Fn(&str, usize) -> PResult<u64> {
    move |input, pos| {
        let (end, digits) =
            take_while_m_n(min_digits, max_digits, |c| c.is_ascii_digit())(input, pos)?;
        let value = digits
            .parse::<u64>()
            .map_err(|_| ParseError::error(pos, "fraction too large"))?;
        let scale = scale_digits
            .checked_sub(digits.len() as u32)
            .ok_or_else(|| ParseError::error(pos, "fraction exceeds supported precision"))?;
        Ok((end, value * 10u64.pow(scale)))
    }
}

/// Runs `parser`; on failure yields `None` without consuming input.
pub fn optional<T>(
    parser: impl Fn(&str, usize) -> PResult<T>,
) -> impl Fn(&str, usize) -> PResult<Option<T>> {
    move |input, pos| match parser(input, pos) {
        Ok((new_pos, value)) => Ok((new_pos, Some(value))),
        Err(_) => Ok((pos, None)),
    }
}

/// Runs `parser` only when `flag` is set; yields `None` otherwise.
pub fn cond<T>(
    flag: bool,
    parser: impl Fn(&str, usize) -> PResult<T>,
) -> impl Fn(&str, usize) -> PResult<Option<T>> {
    move |input, pos| {
        if flag {
            let (new_pos, value) = parser(input, pos)?;
            Ok((new_pos, Some(value)))
        } else {
            Ok((pos, None))
        }
    }
}

/// Runs `first`, discards its result, then runs `second`.
pub fn preceded<T1, T2>(
    first: impl Fn(&str, usize) -> PResult<T1>,
    second: impl Fn(&str, usize) -> PResult<T2>,
) -> impl Fn(&str, usize) -> PResult<T2> {
    move |input, pos| {
        let (pos, _) = first(input, pos)?;
        second(input, pos)
    }
}

/// Runs both parsers in sequence and returns both results.
pub fn then<T1, T2>(
    first: impl Fn(&str, usize) -> PResult<T1>,
    second: impl Fn(&str, usize) -> PResult<T2>,
) -> impl Fn(&str, usize) -> PResult<(T1, T2)> {
    move |input, pos| {
        let (pos, v1) = first(input, pos)?;
        let (pos, v2) = second(input, pos)?;
        Ok((pos, (v1, v2)))
    }
}

/// Transforms the result of `parser` with `f`.
pub fn map<T, U>(
    parser: impl Fn(&str, usize) -> PResult<T>,
    f: impl Fn(T) -> U,
) -> impl Fn(&str, usize) -> PResult<U> {
    move |input, pos| {
        let (new_pos, value) = parser(input, pos)?;
        Ok((new_pos, f(value)))
    }
}

/// A tuple of parsers tried in order by [`alt`].
pub trait Alt<T> {
    /// Runs each alternative at `pos` until one succeeds.
    fn choice(&self, input: &str, pos: usize) -> PResult<T>;
}

/// Tries each alternative in order, backtracking on failure or incomplete
/// input. When every alternative fails, the error reports that no
/// alternative matched.
pub fn alt<T, A: Alt<T>>(alternatives: A) -> impl Fn(&str, usize) -> PResult<T> {
    move |input, pos| alternatives.choice(input, pos)
}

macro_rules! impl_alt {
    ($($parser:ident),+) => {
        impl<T, $($parser),+> Alt<T> for ($($parser,)+)
        where
            $($parser: Fn(&str, usize) -> PResult<T>,)+
        {
            fn choice(&self, input: &str, pos: usize) -> PResult<T> {
                #[allow(non_snake_case)]
                let ($($parser,)+) = self;
                $(
                    if let Ok(success) = $parser(input, pos) {
                        return Ok(success);
                    }
                )+
                Err(ParseError::error(pos, "no alternatives matched"))
            }
        }
    };
}

impl_alt!(P1, P2);
impl_alt!(P1, P2, P3);
impl_alt!(P1, P2, P3, P4);
impl_alt!(P1, P2, P3, P4, P5);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn char_matches_and_reports_position() {
        let parser = char('T');
        assert_eq!(Ok((1, 'T')), parser("T", 0));
        assert_eq!(
            Err(ParseError::error(3, "expected `T`")),
            parser("abcX", 3)
        );
        assert_eq!(Err(ParseError::incomplete(1, 1)), parser("a", 1));
    }

    #[test]
    fn tag_signals_incomplete_on_short_input() {
        let parser = tag("GMT");
        assert_eq!(Ok((3, "GMT")), parser("GMT", 0));
        assert_eq!(Err(ParseError::incomplete(0, 1)), parser("GM", 0));
        assert!(matches!(
            parser("EST", 0),
            Err(ParseError::Error { position: 0, .. })
        ));
    }

    #[test]
    fn digit_parsers() {
        assert_eq!(Ok((4, 1994)), take_n_digits(4)("1994", 0));
        assert_eq!(Ok((2, 6)), take_m_n_digits(1, 2)("06x", 0));
        assert_eq!(Ok((1, 6)), take_m_n_digits(1, 2)("6 Nov", 0));
        assert!(matches!(
            take_n_digits(4)("19x4", 0),
            Err(ParseError::Error { .. })
        ));
        // all-digits but too short: more input could still satisfy the parser
        assert_eq!(
            Err(ParseError::incomplete(2, 2)),
            take_n_digits(4)("19", 0)
        );
    }

    #[test]
    fn range_checked_digits() {
        assert_eq!(Ok((2, 12)), n_digits_in_range(2, 1..=12)("12", 0));
        assert!(matches!(
            n_digits_in_range(2, 1..=12)("13", 0),
            Err(ParseError::Error { position: 0, .. })
        ));
        assert_eq!(Ok((1, 6)), mn_digits_in_range(1, 2, 1..=31)("6,", 0));
    }

    #[test]
    fn fraction_scales_to_requested_digits() {
        assert_eq!(Ok((1, 100_000_000)), fraction(1, 9, 9)("1", 0));
        assert_eq!(Ok((9, 1)), fraction(1, 9, 9)("000000001", 0));
        assert_eq!(Ok((6, 123_456_000)), fraction(1, 9, 9)("123456", 0));
        // greedy but capped at max_digits: the tenth digit is left unconsumed
        assert_eq!(Ok((9, 123_456_789)), fraction(1, 9, 9)("1234567891", 0));
    }

    #[test]
    fn optional_does_not_consume_on_failure() {
        let parser = optional(char('.'));
        assert_eq!(Ok((1, Some('.'))), parser(".5", 0));
        assert_eq!(Ok((0, None)), parser("5", 0));
        assert_eq!(Ok((0, None)), parser("", 0));
    }

    #[test]
    fn alt_tries_in_order() {
        let parser = alt((map(tag("GMT"), |_| 0i32), map(tag("UTC"), |_| 0i32)));
        assert_eq!(Ok((3, 0)), parser("UTC", 0));
        assert_eq!(
            Err(ParseError::error(0, "no alternatives matched")),
            parser("EST", 0)
        );
    }

    #[test]
    fn sequencing() {
        let parser = preceded(char('.'), take_n_digits(3));
        assert_eq!(Ok((4, 123)), parser(".123", 0));

        let pair = then(take_n_digits(2), preceded(char(':'), take_n_digits(2)));
        assert_eq!(Ok((5, (8, 49))), pair("08:49", 0));
    }

    #[test]
    fn cond_only_runs_when_flagged() {
        assert_eq!(Ok((1, Some('x'))), cond(true, char('x'))("x", 0));
        assert_eq!(Ok((0, None)), cond(false, char('x'))("x", 0));
    }

    #[test]
    fn take_till_requires_terminator() {
        let parser = take_till(|c| c == ';');
        assert_eq!(Ok((3, "abc")), parser("abc;rest", 0));
        assert_eq!(Err(ParseError::incomplete(3, 1)), parser("abc", 0));
    }
}
