/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Escaping for element text and attribute values.

use std::borrow::Cow;

/// Escapes the XML-significant characters (and the whitespace controls that
/// must survive attribute normalization) for element text and attribute
/// values.
pub fn escape(s: &str) -> Cow<'_, str> {
    let needs_escaping = s
        .chars()
        .any(|c| matches!(c, '<' | '>' | '&' | '\'' | '"' | '\r' | '\n' | '\t'));
    if !needs_escaping {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            '\r' => out.push_str("&#xD;"),
            '\n' => out.push_str("&#xA;"),
            '\t' => out.push_str("&#x9;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod test {
    use super::escape;
    use crate::unescape::unescape;
    use proptest::proptest;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!("a&lt;b&gt;&amp;&quot;&apos;", escape("a<b>&\"'"));
        assert_eq!("line&#xA;break", escape("line\nbreak"));
        assert_eq!("untouched", escape("untouched"));
    }

    proptest! {
        #[test]
        fn escape_unescape_round_trips(text: String) {
            assert_eq!(text, unescape(&escape(&text)).unwrap());
        }
    }
}
