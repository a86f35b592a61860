/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// AWS-style access credentials.
///
/// Immutable once constructed and cheap to clone. The `Debug`
/// implementation redacts the secret access key and session token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(Arc<Inner>);

#[derive(PartialEq, Eq)]
struct Inner {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    expiration: Option<SystemTime>,
    provider_name: Option<&'static str>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut creds = f.debug_struct("Credentials");
        creds
            .field("access_key_id", &self.0.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.0.session_token.as_ref().map(|_| "** redacted **"))
            .field("expiration", &self.0.expiration)
            .field("provider_name", &self.0.provider_name);
        creds.finish()
    }
}

impl Credentials {
    /// Creates credentials with every field.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        expiration: Option<SystemTime>,
        provider_name: &'static str,
    ) -> Self {
        Credentials(Arc::new(Inner {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
            expiration,
            provider_name: Some(provider_name),
        }))
    }

    /// Creates credentials from access keys alone, without an expiration.
    pub fn from_keys(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Credentials(Arc::new(Inner {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
            expiration: None,
            provider_name: None,
        }))
    }

    /// The access key id.
    pub fn access_key_id(&self) -> &str {
        &self.0.access_key_id
    }

    /// The secret access key.
    pub fn secret_access_key(&self) -> &str {
        &self.0.secret_access_key
    }

    /// The session token for temporary credentials, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.0.session_token.as_deref()
    }

    /// When these credentials stop being valid, if known.
    pub fn expiration(&self) -> Option<SystemTime> {
        self.0.expiration
    }

    /// Name of the provider that produced these credentials, if known.
    pub fn provider_name(&self) -> Option<&'static str> {
        self.0.provider_name
    }
}

#[cfg(test)]
mod test {
    use super::Credentials;

    #[test]
    fn debug_redacts_secrets() {
        let creds = Credentials::new(
            "AKIDEXAMPLE",
            "super-secret",
            Some("session-token".to_string()),
            None,
            "Static",
        );
        let debugged = format!("{:?}", creds);
        assert!(debugged.contains("AKIDEXAMPLE"));
        assert!(!debugged.contains("super-secret"));
        assert!(!debugged.contains("session-token"));
    }
}
