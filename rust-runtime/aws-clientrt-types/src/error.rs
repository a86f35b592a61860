/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Generic error types shared by every layer of the runtime.
//!
//! Failures surface either as a [`ClientError`] (the request never produced a
//! usable response) or a [`ServiceError`] (the service answered with an
//! error). Both hang off the [`SdkError`] root. Error metadata that is not
//! universal (retryability, throttling, the raw protocol response) travels in
//! a typed [`PropertyBag`] rather than growing this type forever.

use crate::property_bag::PropertyBag;
use std::error::Error as StdError;
use std::fmt;

/// A boxed error that is `Send` and `Sync`.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Who is at fault for a service error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// The request was malformed in a way the caller can fix.
    Client,
    /// The service failed to process a valid request.
    Server,
    /// The fault could not be determined from the response.
    Unknown,
}

/// Marker attribute: the error is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retryable(pub bool);

/// Marker attribute: the error was caused by throttling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlingError(pub bool);

/// Metadata attached to errors returned by a service.
#[derive(Debug, Default)]
pub struct ErrorMetadata {
    code: Option<String>,
    message: Option<String>,
    request_id: Option<String>,
    error_type: Option<ErrorType>,
    attributes: PropertyBag,
}

impl ErrorMetadata {
    /// Returns a builder for `ErrorMetadata`.
    pub fn builder() -> ErrorMetadataBuilder {
        ErrorMetadataBuilder::default()
    }

    /// The error code returned by the service, if any.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// The error message returned by the service, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The request id associated with this error, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Whether the service or the caller is at fault.
    pub fn error_type(&self) -> ErrorType {
        self.error_type.unwrap_or(ErrorType::Unknown)
    }

    /// Whether this error is retryable, if the attribute was set.
    pub fn retryable(&self) -> Option<bool> {
        self.attributes.get::<Retryable>().map(|r| r.0)
    }

    /// Whether this error was caused by throttling, if the attribute was set.
    pub fn throttling(&self) -> Option<bool> {
        self.attributes.get::<ThrottlingError>().map(|t| t.0)
    }

    /// Typed attributes attached to this error.
    pub fn attributes(&self) -> &PropertyBag {
        &self.attributes
    }
}

/// Builder for [`ErrorMetadata`].
#[derive(Debug, Default)]
pub struct ErrorMetadataBuilder {
    inner: ErrorMetadata,
}

impl ErrorMetadataBuilder {
    /// Sets the error code.
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.inner.code = Some(code.into());
        self
    }

    /// Sets the error message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.inner.message = Some(message.into());
        self
    }

    /// Sets the request id.
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.inner.request_id = Some(request_id.into());
        self
    }

    /// Sets the fault.
    pub fn error_type(mut self, error_type: ErrorType) -> Self {
        self.inner.error_type = Some(error_type);
        self
    }

    /// Attaches a typed attribute.
    pub fn attribute<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.inner.attributes.insert(value);
        self
    }

    /// Creates the metadata.
    pub fn build(self) -> ErrorMetadata {
        self.inner
    }
}

/// Failure before a usable response was produced: construction, signing,
/// serialization, connection errors.
#[derive(Debug)]
pub struct ClientError {
    message: String,
    source: Option<BoxError>,
}

impl ClientError {
    /// Creates a `ClientError` from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a `ClientError` carrying an underlying cause.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for ClientError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|err| err.as_ref() as _)
    }
}

/// A modeled or unmodeled error returned by a service.
#[derive(Debug)]
pub struct ServiceError {
    metadata: ErrorMetadata,
}

impl ServiceError {
    /// Creates a `ServiceError` from its metadata.
    pub fn new(metadata: ErrorMetadata) -> Self {
        Self { metadata }
    }

    /// The metadata parsed out of the error response.
    pub fn metadata(&self) -> &ErrorMetadata {
        &self.metadata
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.metadata.code(), self.metadata.message()) {
            (Some(code), Some(message)) => write!(f, "{}: {}", code, message),
            (Some(code), None) => write!(f, "{}", code),
            (None, Some(message)) => write!(f, "{}", message),
            (None, None) => write!(f, "unmodeled service error"),
        }
    }
}

impl StdError for ServiceError {}

/// Root error type for a dispatched operation.
#[derive(Debug)]
#[non_exhaustive]
pub enum SdkError {
    /// The request failed on the client side.
    Client(ClientError),
    /// The service returned an error response.
    Service(ServiceError),
}

impl fmt::Display for SdkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdkError::Client(_) => write!(f, "client error"),
            SdkError::Service(_) => write!(f, "service error"),
        }
    }
}

impl StdError for SdkError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            SdkError::Client(err) => Some(err),
            SdkError::Service(err) => Some(err),
        }
    }
}

impl From<ClientError> for SdkError {
    fn from(err: ClientError) -> Self {
        SdkError::Client(err)
    }
}

impl From<ServiceError> for SdkError {
    fn from(err: ServiceError) -> Self {
        SdkError::Service(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn typed_attributes() {
        let metadata = ErrorMetadata::builder()
            .code("Throttling")
            .message("Rate exceeded")
            .error_type(ErrorType::Client)
            .attribute(Retryable(true))
            .attribute(ThrottlingError(true))
            .build();
        assert_eq!(Some(true), metadata.retryable());
        assert_eq!(Some(true), metadata.throttling());
        assert_eq!(ErrorType::Client, metadata.error_type());
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = ServiceError::new(
            ErrorMetadata::builder()
                .code("NoSuchKey")
                .message("The specified key does not exist.")
                .build(),
        );
        assert_eq!(
            "NoSuchKey: The specified key does not exist.",
            format!("{}", err)
        );
    }
}
