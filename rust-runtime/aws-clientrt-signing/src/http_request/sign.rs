/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use super::canonical_request::{header, param, CanonicalRequest, Scope, StringToSign, HMAC_256};
use super::settings::{PayloadChecksumKind, SessionTokenMode, SignatureType, SigningAlgorithm};
use super::url_escape::percent_encode;
use super::{SigningError, SigningParams};
use crate::sign::{calculate_signature, generate_signing_key, sha256_hex_string};
use crate::SigningOutput;
use http::Uri;
use std::borrow::Cow;
use std::fmt::{Debug, Formatter};

/// Represents all of the information necessary to sign an HTTP request.
#[derive(Debug)]
#[non_exhaustive]
pub struct SignableRequest<'a> {
    method: &'a str,
    uri: Uri,
    headers: Vec<(&'a str, &'a str)>,
    body: &'a [u8],
}

impl<'a> SignableRequest<'a> {
    /// Creates a new `SignableRequest`.
    pub fn new(
        method: &'a str,
        uri: impl Into<Cow<'a, str>>,
        headers: impl Iterator<Item = (&'a str, &'a str)>,
        body: &'a [u8],
    ) -> Result<Self, SigningError> {
        let uri = uri
            .into()
            .parse()
            .map_err(|err: http::uri::InvalidUri| SigningError::InvalidUri {
                message: err.to_string(),
            })?;
        Ok(Self {
            method,
            uri,
            headers: headers.collect(),
            body,
        })
    }

    pub(crate) fn method(&self) -> &'a str {
        self.method
    }

    pub(crate) fn uri_path(&self) -> &str {
        self.uri.path()
    }

    pub(crate) fn uri_query(&self) -> Option<&str> {
        self.uri.query()
    }

    pub(crate) fn uri_authority(&self) -> Option<&str> {
        self.uri.authority().map(|authority| authority.as_str())
    }

    pub(crate) fn headers(&self) -> &[(&'a str, &'a str)] {
        self.headers.as_slice()
    }

    pub(crate) fn body(&self) -> &'a [u8] {
        self.body
    }
}

impl<'a, B: AsRef<[u8]>> From<&'a http::Request<B>> for SignableRequest<'a> {
    fn from(request: &'a http::Request<B>) -> Self {
        SignableRequest {
            method: request.method().as_str(),
            uri: request.uri().clone(),
            headers: request
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str(),
                        value.to_str().expect("header values must be valid UTF-8"),
                    )
                })
                .collect(),
            body: request.body().as_ref(),
        }
    }
}

/// A header the signing process wants applied to the request.
pub struct Header {
    key: &'static str,
    value: String,
    sensitive: bool,
}

impl Debug for Header {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut fmt = f.debug_struct("Header");
        fmt.field("key", &self.key);
        let value = if self.sensitive {
            "** redacted **"
        } else {
            &self.value
        };
        fmt.field("value", &value);
        fmt.finish()
    }
}

impl Header {
    /// The name of this header.
    pub fn name(&self) -> &'static str {
        self.key
    }

    /// The value of this header.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether this header has a sensitive value.
    pub fn sensitive(&self) -> bool {
        self.sensitive
    }
}

/// Instructions for applying a signature to an HTTP request.
#[derive(Debug)]
pub struct SigningInstructions {
    headers: Vec<Header>,
    params: Vec<(&'static str, String)>,
}

impl SigningInstructions {
    fn new(headers: Vec<Header>, params: Vec<(&'static str, String)>) -> Self {
        Self { headers, params }
    }

    /// Returns the headers and query params that should be applied to this
    /// request.
    pub fn into_parts(self) -> (Vec<Header>, Vec<(&'static str, String)>) {
        (self.headers, self.params)
    }

    /// Returns the headers that should be added to the request.
    pub fn headers(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.headers
            .iter()
            .map(|header| (header.key, header.value.as_str()))
    }

    /// Returns the query parameters that should be added to the request.
    pub fn params(&self) -> &[(&'static str, String)] {
        self.params.as_slice()
    }

    /// Applies the instructions to the given `request`.
    pub fn apply_to_request<B>(self, request: &mut http::Request<B>) {
        let (new_headers, new_params) = self.into_parts();
        for header in new_headers.into_iter() {
            let mut value = http::HeaderValue::from_str(&header.value)
                .expect("signing produces valid header values");
            value.set_sensitive(header.sensitive);
            request.headers_mut().insert(header.key, value);
        }
        if !new_params.is_empty() {
            let path = request.uri().path();
            let mut query = match request.uri().query() {
                Some(query) if !query.is_empty() => {
                    let mut query = query.to_string();
                    query.push('&');
                    query
                }
                _ => String::new(),
            };
            let mut first = query.is_empty();
            for (name, value) in &new_params {
                if !first {
                    query.push('&');
                }
                first = false;
                query.push_str(&percent_encode(name));
                query.push('=');
                query.push_str(&percent_encode(value));
            }
            let path_and_query = format!("{}?{}", path, query);
            let mut parts = request.uri().clone().into_parts();
            parts.path_and_query = Some(
                path_and_query
                    .parse()
                    .expect("percent-encoded query is a valid path"),
            );
            *request.uri_mut() = Uri::from_parts(parts).expect("the URI was valid before");
        }
    }
}

/// Produces a signature for the given `request` and returns instructions
/// that can be used to apply that signature to an HTTP request.
pub fn sign<'a>(
    request: SignableRequest<'a>,
    params: &'a SigningParams<'a>,
) -> Result<SigningOutput<SigningInstructions>, SigningError> {
    tracing::trace!(request = ?request, params = ?params, "signing request");
    if params.settings.algorithm == SigningAlgorithm::SigV4Asymmetric {
        return Err(SigningError::UnsupportedSignatureType {
            signature_type: "sigv4a",
        });
    }
    match params.settings.signature_type {
        SignatureType::Headers | SignatureType::Chunk | SignatureType::ChunkTrailer => {
            let (headers, signature) = calculate_signing_headers(&request, params)?;
            Ok(SigningOutput::new(
                SigningInstructions::new(headers, vec![]),
                signature,
            ))
        }
        SignatureType::QueryParams => {
            let (query_params, signature) = calculate_signing_params(&request, params)?;
            Ok(SigningOutput::new(
                SigningInstructions::new(vec![], query_params),
                signature,
            ))
        }
        SignatureType::Event => Err(SigningError::UnsupportedSignatureType {
            signature_type: "event",
        }),
    }
}

fn signature_for(
    creq: &CanonicalRequest<'_>,
    params: &SigningParams<'_>,
) -> (String, String) {
    // Step 2: the string to sign
    let encoded_creq = sha256_hex_string(creq.to_string().as_bytes());
    let sts = StringToSign::new(params.time, params.region, params.name, &encoded_creq);

    // Step 3: derive the signing key and sign
    let signing_key = generate_signing_key(
        params.credentials.secret_access_key(),
        params.time,
        params.region,
        params.name,
    );
    let string_to_sign = sts.to_string();
    let signature = calculate_signature(signing_key, string_to_sign.as_bytes());
    tracing::trace!(canonical_request = %creq, string_to_sign = %string_to_sign, "calculated signature");
    (signature, string_to_sign)
}

fn calculate_signing_headers<'a>(
    request: &'a SignableRequest<'a>,
    params: &'a SigningParams<'a>,
) -> Result<(Vec<Header>, String), SigningError> {
    // Step 1: the canonical request
    let creq = CanonicalRequest::from(request, params)?;
    let (signature, _) = signature_for(&creq, params);

    // Step 4: apply the signature to the request
    let mut headers = vec![];
    headers.push(Header {
        key: header::X_AMZ_DATE,
        value: creq.date_time.clone(),
        sensitive: false,
    });
    headers.push(Header {
        key: "authorization",
        value: build_authorization_header(params, &creq, &signature),
        sensitive: false,
    });
    if params.settings.payload_checksum_kind == PayloadChecksumKind::XAmzSha256 {
        headers.push(Header {
            key: header::X_AMZ_CONTENT_SHA_256,
            value: creq.content_sha256.to_string(),
            sensitive: false,
        });
    }
    if let Some(token) = params.credentials.session_token() {
        headers.push(Header {
            key: header::X_AMZ_SECURITY_TOKEN,
            value: token.to_string(),
            sensitive: true,
        });
    }
    Ok((headers, signature))
}

fn calculate_signing_params<'a>(
    request: &'a SignableRequest<'a>,
    params: &'a SigningParams<'a>,
) -> Result<(Vec<(&'static str, String)>, String), SigningError> {
    let creq = CanonicalRequest::from(request, params)?;
    let (signature, _) = signature_for(&creq, params);

    let mut signing_params: Vec<(&'static str, String)> = creq.added_params.clone();
    signing_params.push((param::X_AMZ_SIGNATURE, signature.clone()));
    // the token must come after the signature so excluded tokens do not
    // participate in the canonical query string
    if params.settings.session_token_mode == SessionTokenMode::Exclude {
        if let Some(token) = params.credentials.session_token() {
            signing_params.push((param::X_AMZ_SECURITY_TOKEN, token.to_string()));
        }
    }
    Ok((signing_params, signature))
}

// Authorization: algorithm Credential=access key ID/credential scope, SignedHeaders=SignedHeaders, Signature=signature
fn build_authorization_header(
    params: &SigningParams<'_>,
    creq: &CanonicalRequest<'_>,
    signature: &str,
) -> String {
    format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        HMAC_256,
        params.credentials.access_key_id(),
        Scope::new(params.time, params.region, params.name),
        creq.signed_headers,
        signature
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_time::test_parsers::parse_date_time;
    use crate::http_request::settings::SigningSettings;
    use aws_clientrt_auth::Credentials;
    use pretty_assertions::assert_eq;
    use proptest::proptest;
    use std::time::Duration;

    fn test_credentials() -> Credentials {
        Credentials::from_keys("ANOTREAL", "notrealrnrELgWzOk3IfjzDKtFBhDby", None)
    }

    fn test_credentials_with_session_token() -> Credentials {
        Credentials::from_keys(
            "ANOTREAL",
            "notrealrnrELgWzOk3IfjzDKtFBhDby",
            Some("notarealsessiontoken".to_string()),
        )
    }

    fn params<'a>(credentials: &'a Credentials, settings: SigningSettings) -> SigningParams<'a> {
        SigningParams::builder()
            .credentials(credentials)
            .region("us-east-1")
            .name("service")
            .time(parse_date_time("20150830T123600Z").unwrap())
            .settings(settings)
            .build()
            .unwrap()
    }

    #[test]
    fn sign_vanilla_with_headers() {
        let credentials = test_credentials();
        let params = params(&credentials, SigningSettings::default());
        let request = SignableRequest::new(
            "GET",
            "https://example.amazonaws.com/?Param2=value2&Param1=value1",
            std::iter::empty(),
            b"",
        )
        .unwrap();

        let out = sign(request, &params).unwrap();
        assert_eq!(
            "5557820e7380d585310524bd93d51a08d7757fb5efd7344ee12088f2b0860947",
            out.signature()
        );

        let (headers, query_params) = out.into_parts().0.into_parts();
        assert!(query_params.is_empty());
        let authorization = headers
            .iter()
            .find(|header| header.name() == "authorization")
            .unwrap();
        assert_eq!(
            "AWS4-HMAC-SHA256 \
             Credential=ANOTREAL/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5557820e7380d585310524bd93d51a08d7757fb5efd7344ee12088f2b0860947",
            authorization.value()
        );
        let date = headers
            .iter()
            .find(|header| header.name() == "x-amz-date")
            .unwrap();
        assert_eq!("20150830T123600Z", date.value());
    }

    #[test]
    fn signing_is_deterministic() {
        let credentials = test_credentials();
        let make_request = || {
            SignableRequest::new(
                "GET",
                "https://example.amazonaws.com/?Param2=value2&Param1=value1",
                std::iter::empty(),
                b"",
            )
            .unwrap()
        };
        let params = params(&credentials, SigningSettings::default());
        let first = sign(make_request(), &params).unwrap();
        let second = sign(make_request(), &params).unwrap();
        assert_eq!(first.signature(), second.signature());
    }

    #[test]
    fn sign_with_query_params() {
        let credentials = test_credentials();
        let params = params(
            &credentials,
            SigningSettings {
                signature_type: SignatureType::QueryParams,
                expires_in: Some(Duration::from_secs(35)),
                ..Default::default()
            },
        );
        let request = SignableRequest::new(
            "GET",
            "https://example.amazonaws.com/?Param2=value2&Param1=value1",
            std::iter::empty(),
            b"",
        )
        .unwrap();

        let out = sign(request, &params).unwrap();
        let (headers, query_params) = out.into_parts().0.into_parts();
        assert!(headers.is_empty());
        let get = |name: &str| {
            query_params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.as_str())
        };
        assert_eq!(Some("AWS4-HMAC-SHA256"), get("X-Amz-Algorithm"));
        assert_eq!(
            Some("ANOTREAL/20150830/us-east-1/service/aws4_request"),
            get("X-Amz-Credential")
        );
        assert_eq!(Some("20150830T123600Z"), get("X-Amz-Date"));
        assert_eq!(Some("35"), get("X-Amz-Expires"));
        assert_eq!(Some("host"), get("X-Amz-SignedHeaders"));
        let signature = get("X-Amz-Signature").unwrap();
        assert_eq!(64, signature.len());
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn query_signing_requires_expiry() {
        let credentials = test_credentials();
        let params = params(
            &credentials,
            SigningSettings {
                signature_type: SignatureType::QueryParams,
                ..Default::default()
            },
        );
        let request = SignableRequest::new(
            "GET",
            "https://example.amazonaws.com/",
            std::iter::empty(),
            b"",
        )
        .unwrap();
        assert!(matches!(
            sign(request, &params),
            Err(SigningError::MissingExpiry)
        ));
    }

    #[test]
    fn excluded_session_token_is_attached_but_unsigned() {
        let credentials_without = test_credentials();
        let without_token_params = params(&credentials_without, SigningSettings::default());
        let request = SignableRequest::new(
            "GET",
            "https://some-endpoint.some-region.amazonaws.com/",
            std::iter::empty(),
            b"",
        )
        .unwrap();
        let signature_without_token = sign(request, &without_token_params)
            .unwrap()
            .signature()
            .to_string();

        let credentials_with = test_credentials_with_session_token();
        let exclude_params = params(
            &credentials_with,
            SigningSettings {
                session_token_mode: SessionTokenMode::Exclude,
                ..Default::default()
            },
        );
        let request = SignableRequest::new(
            "GET",
            "https://some-endpoint.some-region.amazonaws.com/",
            std::iter::empty(),
            b"",
        )
        .unwrap();
        let out = sign(request, &exclude_params).unwrap();

        // excluding the token must not change the signature
        assert_eq!(
            "ab32de057edf094958d178b3c91f3c8d5c296d526b11da991cd5773d09cea560",
            out.signature()
        );
        assert_eq!(signature_without_token, out.signature());
        // but the token is still attached to the request
        let (headers, _) = out.into_parts().0.into_parts();
        let token = headers
            .iter()
            .find(|header| header.name() == "x-amz-security-token")
            .unwrap();
        assert_eq!("notarealsessiontoken", token.value());
        assert!(token.sensitive());
    }

    #[test]
    fn included_session_token_changes_the_signature() {
        let credentials_plain = test_credentials();
        let credentials_token = test_credentials_with_session_token();
        let make_request = || {
            SignableRequest::new(
                "GET",
                "https://example.amazonaws.com/",
                std::iter::empty(),
                b"",
            )
            .unwrap()
        };
        let plain = params(&credentials_plain, SigningSettings::default());
        let with_token = params(&credentials_token, SigningSettings::default());
        let sig_plain = sign(make_request(), &plain).unwrap();
        let sig_token = sign(make_request(), &with_token).unwrap();
        assert_ne!(sig_plain.signature(), sig_token.signature());
    }

    #[test]
    fn header_value_whitespace_is_collapsed_for_signing() {
        let credentials = test_credentials();
        let signing_params = params(&credentials, SigningSettings::default());
        let spaced = SignableRequest::new(
            "GET",
            "https://example.amazonaws.com/",
            std::iter::once(("some-header", "  test  test   ")),
            b"",
        )
        .unwrap();
        let collapsed = SignableRequest::new(
            "GET",
            "https://example.amazonaws.com/",
            std::iter::once(("some-header", "test test")),
            b"",
        )
        .unwrap();
        let spaced_signature = sign(spaced, &signing_params).unwrap();
        assert_eq!(
            "244f2a0db34c97a528f22715fe01b2417b7750c8a95c7fc104a3c48d81d84c08",
            spaced_signature.signature()
        );
        assert_eq!(
            spaced_signature.signature(),
            sign(collapsed, &signing_params).unwrap().signature(),
        );
    }

    #[test]
    fn sign_headers_with_utf8_values() {
        let credentials = test_credentials();
        let signing_params = params(&credentials, SigningSettings::default());
        let request = SignableRequest::new(
            "GET",
            "https://some-endpoint.some-region.amazonaws.com/",
            std::iter::once(("some-header", "テスト")),
            b"",
        )
        .unwrap();
        let out = sign(request, &signing_params).unwrap();
        assert_eq!(
            "55e16b31f9bde5fd04f9d3b780dd2b5e5f11a5219001f91a8ca9ec83eaf1618f",
            out.signature()
        );
    }

    #[test]
    fn apply_to_request_sets_headers_and_query() {
        let credentials = test_credentials();
        let signing_params = params(
            &credentials,
            SigningSettings {
                signature_type: SignatureType::QueryParams,
                expires_in: Some(Duration::from_secs(60)),
                ..Default::default()
            },
        );
        let mut request = http::Request::builder()
            .method("GET")
            .uri("https://example.amazonaws.com/path?existing=1")
            .body(Vec::<u8>::new())
            .unwrap();
        let out = sign(SignableRequest::from(&request), &signing_params).unwrap();
        out.into_parts().0.apply_to_request(&mut request);

        let query = request.uri().query().unwrap();
        assert!(query.starts_with("existing=1&"));
        assert!(query.contains("X-Amz-Signature="));
        assert!(query.contains("X-Amz-Credential=ANOTREAL%2F20150830%2Fus-east-1%2Fservice%2Faws4_request"));
    }

    proptest! {
        #[test]
        fn signing_any_header_value_never_panics(value in "[ -~]*") {
            let credentials = test_credentials();
            let signing_params = params(&credentials, SigningSettings::default());
            if let Ok(request) = SignableRequest::new(
                "GET",
                "https://example.amazonaws.com/",
                std::iter::once(("x-sign-me", value.as_str())),
                b"",
            ) {
                let _ = sign(request, &signing_params);
            }
        }
    }
}
