/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use super::settings::{
    HashSpecification, PayloadChecksumKind, SessionTokenMode, SignatureType, SigningSettings,
    UriEncoding, UriPathNormalizationMode,
};
use super::sign::SignableRequest;
use super::url_escape::percent_encode;
use super::SigningError;
use super::SigningParams;
use crate::date_time::{format_date, format_date_time};
use crate::sign::sha256_hex_string;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

pub(crate) const HMAC_256: &str = "AWS4-HMAC-SHA256";

const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
const STREAMING_PAYLOAD: &str = "STREAMING-AWS4-HMAC-SHA256-PAYLOAD";
const STREAMING_PAYLOAD_TRAILERS: &str = "STREAMING-AWS4-HMAC-SHA256-PAYLOAD-TRAILER";
const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Headers never included in a signature: proxies rewrite them, or they are
/// products of signing itself.
const EXCLUDED_HEADERS: [&str; 3] = ["authorization", "user-agent", "x-amzn-trace-id"];

pub(crate) mod header {
    pub(crate) const X_AMZ_CONTENT_SHA_256: &str = "x-amz-content-sha256";
    pub(crate) const X_AMZ_DATE: &str = "x-amz-date";
    pub(crate) const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";
}

pub(crate) mod param {
    pub(crate) const X_AMZ_ALGORITHM: &str = "X-Amz-Algorithm";
    pub(crate) const X_AMZ_CREDENTIAL: &str = "X-Amz-Credential";
    pub(crate) const X_AMZ_DATE: &str = "X-Amz-Date";
    pub(crate) const X_AMZ_EXPIRES: &str = "X-Amz-Expires";
    pub(crate) const X_AMZ_SECURITY_TOKEN: &str = "X-Amz-Security-Token";
    pub(crate) const X_AMZ_SIGNATURE: &str = "X-Amz-Signature";
    pub(crate) const X_AMZ_SIGNED_HEADERS: &str = "X-Amz-SignedHeaders";
}

#[derive(Debug, PartialEq)]
pub(crate) struct CanonicalRequest<'a> {
    pub(crate) method: &'a str,
    pub(crate) path: String,
    pub(crate) params: Option<String>,
    /// Lowercased name to canonicalized value, sorted.
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) signed_headers: SignedHeaders,
    pub(crate) date_time: String,
    pub(crate) content_sha256: Cow<'a, str>,
    /// Query parameters the signing process added (query signing only),
    /// without the signature itself.
    pub(crate) added_params: Vec<(&'static str, String)>,
}

impl<'a> CanonicalRequest<'a> {
    /// Constructs the canonical request for `req`.
    ///
    /// Several settings alter the outcome:
    /// - The URI path is normalized and re-encoded per
    ///   `uri_path_normalization_mode` and `uri_encoding`
    /// - `hash_specification` chooses the payload hash line
    /// - Headers pass through the internal denylist, `excluded_headers`, and
    ///   the `should_sign_header` predicate
    /// - When signing via query parameters, the `X-Amz-*` parameters are
    ///   merged into the canonical query string
    pub(crate) fn from(
        req: &'a SignableRequest<'a>,
        params: &'a SigningParams<'a>,
    ) -> Result<CanonicalRequest<'a>, SigningError> {
        let settings = &params.settings;
        let date_time = format_date_time(params.time);
        let path = Self::path(req.uri_path(), settings);
        let content_sha256 = Self::payload_hash(req.body(), &settings.hash_specification);

        let (signed_headers, headers) =
            Self::headers(req, params, &date_time, &content_sha256)?;
        let signed_headers = SignedHeaders::new(signed_headers);

        let mut added_params = Vec::new();
        if settings.signature_type == SignatureType::QueryParams {
            let expires = settings.expires_in.ok_or(SigningError::MissingExpiry)?;
            let scope = Scope::new(params.time, params.region, params.name);
            added_params.push((param::X_AMZ_ALGORITHM, HMAC_256.to_string()));
            added_params.push((
                param::X_AMZ_CREDENTIAL,
                format!("{}/{}", params.credentials.access_key_id(), scope),
            ));
            added_params.push((param::X_AMZ_DATE, date_time.clone()));
            added_params.push((param::X_AMZ_EXPIRES, expires.as_secs().to_string()));
            added_params.push((
                param::X_AMZ_SIGNED_HEADERS,
                signed_headers.to_string(),
            ));
            if settings.session_token_mode == SessionTokenMode::Include {
                if let Some(token) = params.credentials.session_token() {
                    added_params.push((param::X_AMZ_SECURITY_TOKEN, token.to_string()));
                }
            }
        }
        let query = Self::params(req.uri_query(), &added_params);

        Ok(CanonicalRequest {
            method: req.method(),
            path,
            params: query,
            headers,
            signed_headers,
            date_time,
            content_sha256,
            added_params,
        })
    }

    fn path(path: &str, settings: &SigningSettings) -> String {
        let path = if path.is_empty() { "/" } else { path };
        let path = match settings.uri_path_normalization_mode {
            UriPathNormalizationMode::Enabled => normalize_dot_segments(path),
            UriPathNormalizationMode::Disabled => path.to_string(),
        };
        match settings.uri_encoding {
            // The path is already URI encoded once; encoding it again only
            // needs to escape the escapes
            UriEncoding::Double => path.replace('%', "%25"),
            UriEncoding::Single => path,
        }
    }

    fn payload_hash(body: &'a [u8], spec: &'a HashSpecification) -> Cow<'a, str> {
        match spec {
            HashSpecification::CalculateFromPayload => Cow::Owned(sha256_hex_string(body)),
            HashSpecification::UnsignedPayload => Cow::Borrowed(UNSIGNED_PAYLOAD),
            HashSpecification::EmptyBody => Cow::Borrowed(EMPTY_SHA256),
            HashSpecification::StreamingAws4HmacSha256Payload => {
                Cow::Borrowed(STREAMING_PAYLOAD)
            }
            HashSpecification::StreamingAws4HmacSha256PayloadWithTrailers => {
                Cow::Borrowed(STREAMING_PAYLOAD_TRAILERS)
            }
            HashSpecification::Precalculated(hex) => Cow::Borrowed(hex.as_str()),
        }
    }

    fn headers(
        req: &'a SignableRequest<'a>,
        params: &'a SigningParams<'a>,
        date_time: &str,
        payload_hash: &str,
    ) -> Result<(Vec<CanonicalHeaderName>, Vec<(String, String)>), SigningError> {
        let settings = &params.settings;
        // Multiple values for one name are joined with commas in the order
        // they appear in the request.
        let mut canonical: BTreeMap<String, String> = BTreeMap::new();
        fn insert(map: &mut BTreeMap<String, String>, name: String, value: String) {
            match map.entry(name) {
                std::collections::btree_map::Entry::Vacant(entry) => {
                    entry.insert(value);
                }
                std::collections::btree_map::Entry::Occupied(mut entry) => {
                    let existing = entry.get_mut();
                    existing.push(',');
                    existing.push_str(&value);
                }
            }
        }

        for (name, value) in req.headers() {
            let name = name.to_ascii_lowercase();
            if !Self::should_sign_header(&name, settings) {
                continue;
            }
            insert(&mut canonical, name, normalize_header_value(value));
        }

        // The canonical request includes headers not present in the input
        if !canonical.contains_key("host") {
            let authority = req.uri_authority().ok_or_else(|| SigningError::InvalidUri {
                message: "the request URI must have an authority for signing".to_string(),
            })?;
            insert(&mut canonical, "host".to_string(), authority.to_string());
        }

        match settings.signature_type {
            SignatureType::Headers | SignatureType::Chunk | SignatureType::ChunkTrailer => {
                insert(
                    &mut canonical,
                    header::X_AMZ_DATE.to_string(),
                    date_time.to_string(),
                );
                if settings.session_token_mode == SessionTokenMode::Include {
                    if let Some(token) = params.credentials.session_token() {
                        insert(
                            &mut canonical,
                            header::X_AMZ_SECURITY_TOKEN.to_string(),
                            token.to_string(),
                        );
                    }
                }
                if settings.payload_checksum_kind == PayloadChecksumKind::XAmzSha256 {
                    insert(
                        &mut canonical,
                        header::X_AMZ_CONTENT_SHA_256.to_string(),
                        payload_hash.to_string(),
                    );
                }
            }
            // query-signed requests only sign the headers that were already
            // on the request
            SignatureType::QueryParams | SignatureType::Event => {}
        }

        let headers: Vec<(String, String)> = canonical.into_iter().collect();
        let signed_headers = headers
            .iter()
            .map(|(name, _)| CanonicalHeaderName(name.clone()))
            .collect();
        Ok((signed_headers, headers))
    }

    fn should_sign_header(name: &str, settings: &SigningSettings) -> bool {
        if EXCLUDED_HEADERS.contains(&name) {
            return false;
        }
        if let Some(excluded) = &settings.excluded_headers {
            if excluded.iter().any(|excluded| excluded == name) {
                return false;
            }
        }
        match &settings.should_sign_header {
            Some(predicate) => predicate(name),
            None => true,
        }
    }

    fn params(query: Option<&str>, added_params: &[(&'static str, String)]) -> Option<String> {
        let mut params: Vec<(Cow<'_, str>, Cow<'_, str>)> = match query {
            Some(query) => form_urlencoded::parse(query.as_bytes()).collect(),
            None => Vec::new(),
        };
        for (key, value) in added_params {
            params.push((Cow::Borrowed(*key), Cow::Borrowed(value.as_str())));
        }
        if params.is_empty() && added_params.is_empty() && query.is_none() {
            return None;
        }
        // Sort by param name, and then by param value
        params.sort();
        let mut out = String::new();
        let mut first = true;
        for (key, value) in params {
            if !first {
                out.push('&');
            }
            first = false;
            out.push_str(&percent_encode(&key));
            out.push('=');
            out.push_str(&percent_encode(&value));
        }
        Some(out)
    }
}

impl<'a> fmt::Display for CanonicalRequest<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.method)?;
        writeln!(f, "{}", self.path)?;
        writeln!(f, "{}", self.params.as_deref().unwrap_or(""))?;
        for (name, value) in &self.headers {
            writeln!(f, "{}:{}", name, value)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", self.signed_headers)?;
        write!(f, "{}", self.content_sha256)?;
        Ok(())
    }
}

/// Removes `.` and `..` segments (and redundant slashes) from a path.
fn normalize_dot_segments(path: &str) -> String {
    let mut output: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                output.pop();
            }
            other => output.push(other),
        }
    }
    let mut normalized = String::with_capacity(path.len());
    normalized.push('/');
    normalized.push_str(&output.join("/"));
    if path.ends_with('/') && normalized.len() > 1 {
        normalized.push('/');
    }
    normalized
}

/// Trims outer whitespace and collapses inner runs to single spaces.
fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, PartialEq, Default)]
pub(crate) struct SignedHeaders {
    inner: Vec<CanonicalHeaderName>,
}

impl SignedHeaders {
    fn new(mut inner: Vec<CanonicalHeaderName>) -> Self {
        inner.sort();
        SignedHeaders { inner }
    }
}

impl fmt::Display for SignedHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.inner.iter().peekable();
        while let Some(next) = iter.next() {
            match iter.peek().is_some() {
                true => write!(f, "{};", next.0)?,
                false => write!(f, "{}", next.0)?,
            };
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub(crate) struct CanonicalHeaderName(String);

impl PartialOrd for CanonicalHeaderName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CanonicalHeaderName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub(crate) struct Scope<'a> {
    pub(crate) date: String,
    pub(crate) region: &'a str,
    pub(crate) service: &'a str,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(time: SystemTime, region: &'a str, service: &'a str) -> Self {
        Scope {
            date: format_date(time),
            region,
            service,
        }
    }
}

impl<'a> fmt::Display for Scope<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/aws4_request",
            self.date, self.region, self.service
        )
    }
}

#[derive(PartialEq, Debug)]
pub(crate) struct StringToSign<'a> {
    pub(crate) scope: Scope<'a>,
    pub(crate) date_time: String,
    pub(crate) hashed_creq: &'a str,
}

impl<'a> StringToSign<'a> {
    pub(crate) fn new(
        time: SystemTime,
        region: &'a str,
        service: &'a str,
        hashed_creq: &'a str,
    ) -> Self {
        Self {
            scope: Scope::new(time, region, service),
            date_time: format_date_time(time),
            hashed_creq,
        }
    }
}

impl<'a> fmt::Display for StringToSign<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}\n{}\n{}",
            HMAC_256, self.date_time, self.scope, self.hashed_creq
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_time::test_parsers::parse_date_time;
    use crate::http_request::sign::SignableRequest;
    use aws_clientrt_auth::Credentials;
    use pretty_assertions::assert_eq;

    fn test_credentials() -> Credentials {
        Credentials::from_keys("ANOTREAL", "notrealrnrELgWzOk3IfjzDKtFBhDby", None)
    }

    fn test_params<'a>(
        credentials: &'a Credentials,
        settings: SigningSettings,
    ) -> SigningParams<'a> {
        SigningParams::builder()
            .credentials(credentials)
            .region("us-east-1")
            .name("service")
            .time(parse_date_time("20150830T123600Z").unwrap())
            .settings(settings)
            .build()
            .unwrap()
    }

    fn vanilla_query_request<'a>() -> SignableRequest<'a> {
        SignableRequest::new(
            "GET",
            "https://example.amazonaws.com/?Param2=value2&Param1=value1",
            std::iter::empty(),
            b"",
        )
        .unwrap()
    }

    #[test]
    fn canonical_request_matches_the_reference() {
        let credentials = test_credentials();
        let params = test_params(&credentials, SigningSettings::default());
        let req = vanilla_query_request();
        let creq = CanonicalRequest::from(&req, &params).unwrap();
        let expected = "GET\n\
                        /\n\
                        Param1=value1&Param2=value2\n\
                        host:example.amazonaws.com\n\
                        x-amz-date:20150830T123600Z\n\
                        \n\
                        host;x-amz-date\n\
                        e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert_eq!(expected, creq.to_string());
        assert_eq!(
            "816cd5b414d056048ba4f7c5386d6e0533120fb1fcfa93762cf0fc39e2cf19e0",
            sha256_hex_string(creq.to_string().as_bytes())
        );
    }

    #[test]
    fn sha256_header_is_signed_when_requested() {
        let credentials = test_credentials();
        let params = test_params(
            &credentials,
            SigningSettings {
                payload_checksum_kind: PayloadChecksumKind::XAmzSha256,
                ..Default::default()
            },
        );
        let req = vanilla_query_request();
        let creq = CanonicalRequest::from(&req, &params).unwrap();
        assert_eq!(
            EMPTY_SHA256,
            &creq.content_sha256
        );
        assert_eq!(
            "host;x-amz-content-sha256;x-amz-date",
            creq.signed_headers.to_string()
        );
    }

    #[test]
    fn unsigned_payload_marker() {
        let credentials = test_credentials();
        let params = test_params(
            &credentials,
            SigningSettings {
                hash_specification: HashSpecification::UnsignedPayload,
                ..Default::default()
            },
        );
        let req = vanilla_query_request();
        let creq = CanonicalRequest::from(&req, &params).unwrap();
        assert_eq!("UNSIGNED-PAYLOAD", &creq.content_sha256);
        assert!(creq.to_string().ends_with("UNSIGNED-PAYLOAD"));
    }

    #[test]
    fn precalculated_payload_hash() {
        let hash = "44ce7dd67c959e0d3524ffac1771dfbba87d2b6b4b4e99e42034a8b803f8b072";
        let credentials = test_credentials();
        let params = test_params(
            &credentials,
            SigningSettings {
                hash_specification: HashSpecification::Precalculated(hash.to_string()),
                ..Default::default()
            },
        );
        let req = vanilla_query_request();
        let creq = CanonicalRequest::from(&req, &params).unwrap();
        assert_eq!(hash, &creq.content_sha256);
    }

    #[test]
    fn generate_scope() {
        let time = parse_date_time("20150830T123600Z").unwrap();
        let scope = Scope::new(time, "us-east-1", "iam");
        assert_eq!("20150830/us-east-1/iam/aws4_request", scope.to_string());
    }

    #[test]
    fn string_to_sign_layout() {
        let time = parse_date_time("20150830T123600Z").unwrap();
        let hashed_creq = "816cd5b414d056048ba4f7c5386d6e0533120fb1fcfa93762cf0fc39e2cf19e0";
        let sts = StringToSign::new(time, "us-east-1", "service", hashed_creq);
        assert_eq!(
            "AWS4-HMAC-SHA256\n\
             20150830T123600Z\n\
             20150830/us-east-1/service/aws4_request\n\
             816cd5b414d056048ba4f7c5386d6e0533120fb1fcfa93762cf0fc39e2cf19e0",
            sts.to_string()
        );
    }

    #[test]
    fn duplicate_query_keys_are_preserved_and_sorted_by_value() {
        let credentials = test_credentials();
        let params = test_params(&credentials, SigningSettings::default());
        let req = SignableRequest::new(
            "GET",
            "https://example.amazonaws.com/?key=b&key=a",
            std::iter::empty(),
            b"",
        )
        .unwrap();
        let creq = CanonicalRequest::from(&req, &params).unwrap();
        assert_eq!(Some("key=a&key=b"), creq.params.as_deref());
    }

    #[test]
    fn unreserved_query_characters_are_not_encoded() {
        let credentials = test_credentials();
        let params = test_params(&credentials, SigningSettings::default());
        let req = SignableRequest::new(
            "GET",
            "https://s3.us-east-1.amazonaws.com/my-bucket?list-type=2&prefix=~objprefix&single&k=&unreserved=-_.~",
            std::iter::empty(),
            b"",
        )
        .unwrap();
        let creq = CanonicalRequest::from(&req, &params).unwrap();
        assert_eq!(
            Some("k=&list-type=2&prefix=~objprefix&single=&unreserved=-_.~"),
            creq.params.as_deref(),
        );
    }

    #[test]
    fn header_values_are_trimmed_and_collapsed() {
        assert_eq!("test test", normalize_header_value("  test  test   "));
        assert_eq!("a b c", normalize_header_value("a\t b \t c"));
    }

    #[test]
    fn dot_segments_are_removed() {
        assert_eq!("/a/c", normalize_dot_segments("/a/b/../c"));
        assert_eq!("/a/b", normalize_dot_segments("/./a//b"));
        assert_eq!("/", normalize_dot_segments("/"));
        assert_eq!("/a/", normalize_dot_segments("/a/b/../"));
    }

    #[test]
    fn double_uri_encoding_escapes_the_escapes() {
        let credentials = test_credentials();
        let params = test_params(&credentials, SigningSettings::default());
        let req = SignableRequest::new(
            "GET",
            "https://example.amazonaws.com/a%20b/c",
            std::iter::empty(),
            b"",
        )
        .unwrap();
        let creq = CanonicalRequest::from(&req, &params).unwrap();
        assert_eq!("/a%2520b/c", creq.path);

        let params = test_params(
            &credentials,
            SigningSettings {
                uri_encoding: UriEncoding::Single,
                ..Default::default()
            },
        );
        let creq = CanonicalRequest::from(&req, &params).unwrap();
        assert_eq!("/a%20b/c", creq.path);
    }

    #[test]
    fn excluded_headers_and_predicate() {
        let credentials = test_credentials();
        let mut settings = SigningSettings::default();
        settings.excluded_headers = Some(vec!["x-internal".into()]);
        settings.should_sign_header = Some(std::sync::Arc::new(|name| name != "x-vetoed"));
        let params = test_params(&credentials, settings);
        let req = SignableRequest::new(
            "GET",
            "https://example.amazonaws.com/",
            vec![
                ("user-agent", "aws-cli"),
                ("x-amzn-trace-id", "Root=1"),
                ("x-internal", "1"),
                ("x-vetoed", "1"),
                ("x-kept", "1"),
            ]
            .into_iter(),
            b"",
        )
        .unwrap();
        let creq = CanonicalRequest::from(&req, &params).unwrap();
        assert_eq!(
            "host;x-amz-date;x-kept",
            creq.signed_headers.to_string()
        );
    }
}
