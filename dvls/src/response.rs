//! Response envelope and server result codes.

use std::fmt;

use serde_json::Value;

use crate::error::{DvlsError, DvlsResult};

/// Result code reported by the server in the `result` member of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SaveResult {
    /// Generic failure. Also the value of a response without a result code.
    #[default]
    Error,
    /// Operation succeeded
    Success,
    /// Caller lacks the permission
    AccessDenied,
    /// Payload was rejected
    InvalidData,
    /// Object already exists
    AlreadyExists,
    /// License or quota limit reached
    MaximumReached,
    /// Object does not exist
    NotFound,
    /// Server license expired
    LicenseExpired,
    /// Server could not classify the failure
    Unknown,
    /// Two factor is required but not configured
    TwoFactorTypeNotConfigured,
    /// Web API session must log in again
    WebApiRedirectToLogin,
    /// Login email already in use
    DuplicateLoginEmail,
    /// A code this client does not know about
    Other(u8),
}

impl SaveResult {
    /// Numeric wire value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Error => 0,
            Self::Success => 1,
            Self::AccessDenied => 2,
            Self::InvalidData => 3,
            Self::AlreadyExists => 4,
            Self::MaximumReached => 5,
            Self::NotFound => 6,
            Self::LicenseExpired => 7,
            Self::Unknown => 8,
            Self::TwoFactorTypeNotConfigured => 9,
            Self::WebApiRedirectToLogin => 10,
            Self::DuplicateLoginEmail => 11,
            Self::Other(code) => code,
        }
    }

    /// Whether the code means the operation went through.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<u8> for SaveResult {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Error,
            1 => Self::Success,
            2 => Self::AccessDenied,
            3 => Self::InvalidData,
            4 => Self::AlreadyExists,
            5 => Self::MaximumReached,
            6 => Self::NotFound,
            7 => Self::LicenseExpired,
            8 => Self::Unknown,
            9 => Self::TwoFactorTypeNotConfigured,
            10 => Self::WebApiRedirectToLogin,
            11 => Self::DuplicateLoginEmail,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for SaveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "Error",
            Self::Success => "Success",
            Self::AccessDenied => "AccessDenied",
            Self::InvalidData => "InvalidData",
            Self::AlreadyExists => "AlreadyExists",
            Self::MaximumReached => "MaximumReached",
            Self::NotFound => "NotFound",
            Self::LicenseExpired => "LicenseExpired",
            Self::Unknown => "Unknown",
            Self::TwoFactorTypeNotConfigured => "TwoFactorTypeNotConfigured",
            Self::WebApiRedirectToLogin => "WebApiRedirectToLogin",
            Self::DuplicateLoginEmail => "DuplicateLoginEmail",
            Self::Other(code) => return write!(f, "SaveResult({code})"),
        };
        f.write_str(name)
    }
}

/// Per-request options for the dispatcher.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Overrides the default `application/json` content type.
    pub content_type: Option<String>,
    /// Return the body untouched, skipping envelope parsing.
    pub raw_body: bool,
}

impl RequestOptions {
    /// Options for a binary download.
    #[must_use]
    pub const fn raw() -> Self {
        Self {
            content_type: None,
            raw_body: true,
        }
    }

    /// Set the request content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// A successful HTTP response from the DVLS API.
#[derive(Debug, Clone, Default)]
pub struct Response {
    /// Raw response body.
    pub body: Vec<u8>,
    /// `result` member of a JSON object body.
    pub result: SaveResult,
    /// `message` member of a JSON object body.
    pub message: String,
}

impl Response {
    /// Wrap a body, reading the envelope members unless `raw` is set.
    ///
    /// Only JSON objects carry an envelope. Other JSON documents (the bare
    /// `false` of the liveness endpoint, arrays) keep the default members.
    ///
    /// # Errors
    ///
    /// Returns the parse error when a non-raw, non-empty body is not JSON.
    pub fn parse(body: Vec<u8>, raw: bool) -> Result<Self, serde_json::Error> {
        let mut response = Self {
            body,
            ..Self::default()
        };
        if raw || response.body.is_empty() {
            return Ok(response);
        }

        let value: Value = serde_json::from_slice(&response.body)?;
        if let Value::Object(map) = value {
            let member = |lower: &str, upper: &str| map.get(lower).or_else(|| map.get(upper)).cloned();
            if let Some(code) = member("result", "Result").and_then(|v| v.as_u64()) {
                response.result = u8::try_from(code).map_or(SaveResult::Other(u8::MAX), SaveResult::from);
            }
            if let Some(Value::String(message)) = member("message", "Message") {
                response.message = message;
            }
        }
        Ok(response)
    }

    /// Fail unless the server reported [`SaveResult::Success`].
    ///
    /// # Errors
    ///
    /// Returns [`DvlsError::ResultCode`] with the code and server message.
    pub fn check_save_result(&self) -> DvlsResult<()> {
        if self.result.is_success() {
            Ok(())
        } else {
            Err(DvlsError::ResultCode {
                code: self.result,
                message: self.message.clone(),
            })
        }
    }

    /// Decode the whole body.
    ///
    /// # Errors
    ///
    /// Returns a serialization error when the body does not match `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> DvlsResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Decode the `data` member of a nested envelope.
    ///
    /// # Errors
    ///
    /// Returns a serialization error when the member is missing or malformed.
    pub fn data<T: serde::de::DeserializeOwned>(&self) -> DvlsResult<T> {
        let envelope: DataEnvelope<T> = self.json()?;
        Ok(envelope.data)
    }

    /// Body as text, lossy.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(serde::Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: serde::Deserialize<'de>"))]
pub struct Paginated<T> {
    /// Items on this page
    #[serde(default = "Vec::new", deserialize_with = "crate::entry::null_as_default")]
    pub data: Vec<T>,
    /// 1-based index of this page
    #[serde(default)]
    pub current_page: u32,
    /// Requested page size
    #[serde(default)]
    pub page_size: u32,
    /// Item count over all pages
    #[serde(default)]
    pub total_count: u32,
    /// Page count
    #[serde(default)]
    pub total_page: u32,
}

impl<T> Paginated<T> {
    /// Whether a page after this one exists.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.current_page < self.total_page && !self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_envelope() {
        let resp = Response::parse(br#"{"result":1,"message":"ok","data":{}}"#.to_vec(), false).unwrap();
        assert_eq!(resp.result, SaveResult::Success);
        assert_eq!(resp.message, "ok");
        assert!(resp.check_save_result().is_ok());
    }

    #[test]
    fn test_parse_bare_bool_keeps_defaults() {
        let resp = Response::parse(b"false".to_vec(), false).unwrap();
        assert_eq!(resp.result, SaveResult::Error);
        assert_eq!(resp.text(), "false");
    }

    #[test]
    fn test_raw_body_skips_json() {
        let resp = Response::parse(vec![0xff, 0x00, 0x12], true).unwrap();
        assert_eq!(resp.body, vec![0xff, 0x00, 0x12]);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(Response::parse(b"<html>".to_vec(), false).is_err());
    }

    #[test]
    fn test_check_save_result_failure() {
        let resp = Response::parse(br#"{"result":6,"message":"missing"}"#.to_vec(), false).unwrap();
        let err = resp.check_save_result().unwrap_err();
        assert_eq!(err.to_string(), "unexpected result code 6 (NotFound) missing");
    }

    #[test]
    fn test_unknown_code_round_trips() {
        assert_eq!(SaveResult::from(42), SaveResult::Other(42));
        assert_eq!(SaveResult::Other(42).as_u8(), 42);
        for code in 0..=11 {
            assert_eq!(SaveResult::from(code).as_u8(), code);
        }
    }

    #[test]
    fn test_paginated_has_next() {
        let page: Paginated<u32> = serde_json::from_str(
            r#"{"data":[1,2],"currentPage":1,"pageSize":2,"totalCount":3,"totalPage":2}"#,
        )
        .unwrap();
        assert!(page.has_next());

        let last: Paginated<u32> =
            serde_json::from_str(r#"{"data":null,"currentPage":2,"totalPage":2}"#).unwrap();
        assert!(last.data.is_empty());
        assert!(!last.has_next());
    }

    #[test]
    fn test_data_envelope() {
        let resp = Response::parse(br#"{"result":1,"data":{"id":"abc"}}"#.to_vec(), false).unwrap();
        let data: serde_json::Value = resp.data().unwrap();
        assert_eq!(data["id"], "abc");
    }
}
