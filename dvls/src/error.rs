//! DVLS error types using thiserror 2.0.
//!
//! Every failure a caller can see is a [`DvlsError`]. Transport-level problems
//! are wrapped in a [`RequestError`] that carries the URL and, when the server
//! answered, the status code and raw body for inspection.

use thiserror::Error;

use crate::response::SaveResult;

/// Cause of a failed HTTP exchange.
#[derive(Error, Debug)]
pub enum RequestFailure {
    /// The request never got an answer (DNS, TLS, connection reset, timeout).
    #[error("error while submitting request: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered with something other than 200 or 201.
    #[error("unexpected status code {0}")]
    UnexpectedStatus(u16),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    /// The response body was not the JSON we expected.
    #[error("failed to unmarshal response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The liveness check or token refresh failed before the request was sent.
    #[error("failed to refresh login token: {0}")]
    Login(String),
}

/// A failed request against a DVLS endpoint.
#[derive(Error, Debug)]
#[error(
    "error while submitting request on url {url}{}: {source}",
    .status.map_or_else(String::new, |status| format!(" (status {status})"))
)]
pub struct RequestError {
    /// Full URL of the request.
    pub url: String,
    /// HTTP status, when the server answered.
    pub status: Option<u16>,
    /// Raw response body, when the server answered with an error status.
    pub body: Option<Vec<u8>>,
    /// Underlying cause.
    #[source]
    pub source: RequestFailure,
}

impl RequestError {
    /// Create a request error that never reached a status line.
    #[must_use]
    pub fn new(url: impl Into<String>, source: RequestFailure) -> Self {
        Self {
            url: url.into(),
            status: None,
            body: None,
            source,
        }
    }

    /// Create a request error for a non-success status.
    #[must_use]
    pub fn unexpected_status(url: impl Into<String>, status: u16, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            status: Some(status),
            body: Some(body),
            source: RequestFailure::UnexpectedStatus(status),
        }
    }

    /// Response body as lossy UTF-8, if any.
    #[must_use]
    pub fn body_text(&self) -> Option<String> {
        self.body
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

/// DVLS client errors.
#[derive(Error, Debug)]
pub enum DvlsError {
    /// HTTP exchange failed
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Login was rejected or returned no token
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The server processed the request but reported a non-success result
    #[error("unexpected result code {} ({code}) {message}", .code.as_u8())]
    ResultCode {
        /// Server result code
        code: SaveResult,
        /// Server message
        message: String,
    },

    /// Client-side validation failed before any request was sent
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The `(type, subType)` pair has no known payload shape
    #[error("unsupported entry type ({entry_type}/{sub_type})")]
    UnsupportedEntryType {
        /// Entry type as sent by the server
        entry_type: String,
        /// Entry subtype as sent by the server
        sub_type: String,
    },

    /// The operation is not defined for this subtype
    #[error("unsupported entry subtype ({sub_type}). Supported subtypes: {supported}")]
    UnsupportedSubType {
        /// Offending subtype
        sub_type: String,
        /// Comma separated list of accepted subtypes
        supported: String,
    },

    /// Name lookup matched no entry
    #[error("entry not found")]
    EntryNotFound,

    /// Name lookup matched more than one entry
    #[error("multiple entries found")]
    MultipleEntriesFound,

    /// Name lookup matched no vault
    #[error("vault not found")]
    VaultNotFound,

    /// Name lookup matched more than one vault
    #[error("multiple vaults found")]
    MultipleVaultsFound,

    /// Request or response payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A request URL could not be built
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Client configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for DVLS operations.
pub type DvlsResult<T> = Result<T, DvlsError>;

impl DvlsError {
    /// True when the server answered with HTTP 404.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Request(RequestError {
                status: Some(404),
                ..
            })
        )
    }

    /// True for the server telling us the token is no longer valid.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Request(RequestError {
                status: Some(401),
                ..
            })
        )
    }

    /// HTTP status of a failed request, if the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Request(err) => err.status,
            _ => None,
        }
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an authentication error.
    #[must_use]
    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an unsupported entry type error.
    #[must_use]
    pub fn unsupported_entry(entry_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self::UnsupportedEntryType {
            entry_type: entry_type.into(),
            sub_type: sub_type.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_display_with_status() {
        let err = RequestError::unexpected_status("https://dvls.local/api/v1/vault", 500, b"boom".to_vec());
        assert_eq!(
            err.to_string(),
            "error while submitting request on url https://dvls.local/api/v1/vault (status 500): unexpected status code 500"
        );
        assert_eq!(err.body_text().as_deref(), Some("boom"));
    }

    #[test]
    fn test_request_error_display_without_status() {
        let err = RequestError::new(
            "https://dvls.local/api/is-logged",
            RequestFailure::Login("timed out".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "error while submitting request on url https://dvls.local/api/is-logged: failed to refresh login token: timed out"
        );
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "failed to refresh login token: timed out");
    }

    #[test]
    fn test_is_not_found() {
        let not_found: DvlsError = RequestError::unexpected_status("u", 404, Vec::new()).into();
        assert!(not_found.is_not_found());
        assert_eq!(not_found.status(), Some(404));

        let server_error: DvlsError = RequestError::unexpected_status("u", 500, Vec::new()).into();
        assert!(!server_error.is_not_found());
        assert!(!DvlsError::EntryNotFound.is_not_found());
    }

    #[test]
    fn test_result_code_display() {
        let err = DvlsError::ResultCode {
            code: SaveResult::AccessDenied,
            message: "nope".to_string(),
        };
        assert_eq!(err.to_string(), "unexpected result code 2 (AccessDenied) nope");
    }

    #[test]
    fn test_unsupported_entry_display() {
        let err = DvlsError::unsupported_entry("Credential", "Biometric");
        assert_eq!(err.to_string(), "unsupported entry type (Credential/Biometric)");
    }
}
