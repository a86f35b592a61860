/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::decode::XmlDecodeError;
use std::borrow::Cow;

/// Decodes character references and the five named references
/// (`lt gt amp apos quot`) in text and attribute values.
///
/// Returns borrowed input when nothing needs decoding.
pub(crate) fn unescape(s: &str) -> Result<Cow<'_, str>, XmlDecodeError> {
    if !s.contains('&') {
        return Ok(Cow::Borrowed(s));
    }
    let mut out = String::with_capacity(s.len());
    let mut remaining = s;
    while let Some(idx) = remaining.find('&') {
        out.push_str(&remaining[..idx]);
        let after_amp = &remaining[idx + 1..];
        let semicolon = after_amp.find(';').ok_or_else(|| {
            XmlDecodeError::custom("unterminated character reference")
        })?;
        let reference = &after_amp[..semicolon];
        match reference {
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "amp" => out.push('&'),
            "apos" => out.push('\''),
            "quot" => out.push('"'),
            _ => {
                let code_point = if let Some(hex) = reference
                    .strip_prefix("#x")
                    .or_else(|| reference.strip_prefix("#X"))
                {
                    u32::from_str_radix(hex, 16).map_err(|_| {
                        XmlDecodeError::custom(format!(
                            "invalid hex character reference `&{};`",
                            reference
                        ))
                    })?
                } else if let Some(decimal) = reference.strip_prefix('#') {
                    decimal.parse::<u32>().map_err(|_| {
                        XmlDecodeError::custom(format!(
                            "invalid character reference `&{};`",
                            reference
                        ))
                    })?
                } else {
                    return Err(XmlDecodeError::custom(format!(
                        "unknown entity reference `&{};`",
                        reference
                    )));
                };
                let c = char::from_u32(code_point).ok_or_else(|| {
                    XmlDecodeError::custom(format!(
                        "character reference `&{};` is not a valid character",
                        reference
                    ))
                })?;
                out.push(c);
            }
        }
        remaining = &after_amp[semicolon + 1..];
    }
    out.push_str(remaining);
    Ok(Cow::Owned(out))
}
