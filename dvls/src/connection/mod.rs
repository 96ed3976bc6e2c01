//! Entries on the legacy connection API (`/api/connections/partial`).
//!
//! Connections travel inside a `{result, data}` envelope. The type specific
//! details sit in the connection's own `data` member, which the server sends
//! either as an object or as a JSON document encoded in a string. Sensitive
//! fields are never part of a plain read; they come from a separate
//! `sensitive-data` call.

pub mod attachment;
pub mod certificate;
pub mod host;
mod service;
pub mod ssh;
pub mod website;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::DeserializeOwned};
use serde_json::Value;

pub use attachment::{Attachment, AttachmentService};
pub use certificate::{CertificateDataMode, CertificateEntry, CertificateService};
pub use host::{HostDetails, HostEntry, HostService};
pub use service::ConnectionService;
pub use ssh::{SshDetails, SshEntry, SshService};
pub use website::{WebsiteDetails, WebsiteEntry, WebsiteService};

use crate::{
    entry::null_as_default,
    error::{DvlsError, DvlsResult},
    time::{self, ServerTime},
};

/// Numeric connection type of a legacy entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionType {
    /// Not set
    Undefined,
    /// Web browser (website entries)
    WebBrowser,
    /// Folder
    Group,
    /// Credential
    Credential,
    /// Document (certificate entries)
    Document,
    /// Host
    Host,
    /// SSH shell
    SshShell,
    /// Any other type
    Other(u16),
}

impl ConnectionType {
    /// Wire value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::Undefined => 0,
            Self::WebBrowser => 5,
            Self::Group => 25,
            Self::Credential => 26,
            Self::Document => 45,
            Self::Host => 53,
            Self::SshShell => 77,
            Self::Other(code) => code,
        }
    }
}

impl From<u16> for ConnectionType {
    fn from(code: u16) -> Self {
        match code {
            0 => Self::Undefined,
            5 => Self::WebBrowser,
            25 => Self::Group,
            26 => Self::Credential,
            45 => Self::Document,
            53 => Self::Host,
            77 => Self::SshShell,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("Undefined"),
            Self::WebBrowser => f.write_str("WebBrowser"),
            Self::Group => f.write_str("Group"),
            Self::Credential => f.write_str("Credential"),
            Self::Document => f.write_str("Document"),
            Self::Host => f.write_str("Host"),
            Self::SshShell => f.write_str("SSHShell"),
            Self::Other(code) => write!(f, "ConnectionType({code})"),
        }
    }
}

impl Serialize for ConnectionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.as_u16())
    }
}

impl<'de> Deserialize<'de> for ConnectionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<u16>::deserialize(deserializer)?.map_or(Self::Undefined, Self::from))
    }
}

/// Join tags into the `keywords` string. Tags containing a space are quoted.
#[must_use]
pub fn tags_to_keywords(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| {
            if tag.contains(' ') {
                format!("\"{tag}\"")
            } else {
                tag.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a `keywords` string on spaces outside double quotes, then unquote.
#[must_use]
pub fn keywords_to_tags(keywords: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in keywords.chars() {
        if c == '"' {
            quoted = !quoted;
        }
        if c == ' ' && !quoted {
            if !current.is_empty() {
                tags.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        tags.push(current);
    }

    tags.into_iter()
        .map(|tag| match tag.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
            Some(inner) => inner.to_string(),
            None => tag,
        })
        .collect()
}

/// Resolve a member the server sends either as an object or as a JSON
/// document inside a string. `null` and `""` become an empty object.
pub(crate) fn inline_data(value: Value) -> DvlsResult<Value> {
    match value {
        Value::Null => Ok(Value::Object(serde_json::Map::new())),
        Value::String(s) if s.trim().is_empty() => Ok(Value::Object(serde_json::Map::new())),
        Value::String(s) => Ok(serde_json::from_str(&s)?),
        other => Ok(other),
    }
}

/// `data` member of a legacy response, unwrapped from its string form.
pub(crate) fn envelope_data(body: &[u8]) -> DvlsResult<Value> {
    #[derive(Deserialize)]
    struct Envelope {
        #[serde(default)]
        data: Value,
    }
    let envelope: Envelope = serde_json::from_slice(body)?;
    inline_data(envelope.data)
}

/// A secret slot as the server reports it.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SensitiveItem {
    /// Whether the slot holds a value
    #[serde(alias = "HasSensitiveData", rename = "hasSensitiveData")]
    pub has_sensitive_data: bool,
    /// Slot value
    #[serde(alias = "SensitiveData", rename = "sensitiveData")]
    pub sensitive_data: Option<String>,
}

impl SensitiveItem {
    /// Value of a filled slot; `None` for an empty one.
    #[must_use]
    pub fn into_value(self) -> Option<String> {
        self.has_sensitive_data
            .then(|| self.sensitive_data.unwrap_or_default())
    }
}

impl fmt::Debug for SensitiveItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensitiveItem")
            .field("has_sensitive_data", &self.has_sensitive_data)
            .finish_non_exhaustive()
    }
}

/// camelCase secret slot written with a save.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WriteItem<'a> {
    has_sensitive_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    sensitive_data: Option<&'a str>,
}

impl<'a> WriteItem<'a> {
    pub(crate) const fn new(value: Option<&'a str>) -> Self {
        Self {
            has_sensitive_data: value.is_some(),
            sensitive_data: value,
        }
    }
}

/// PascalCase secret slot written with a save.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct PascalWriteItem<'a> {
    has_sensitive_data: bool,
    sensitive_data: &'a str,
}

impl<'a> PascalWriteItem<'a> {
    pub(crate) fn new(value: Option<&'a str>) -> Self {
        Self {
            has_sensitive_data: value.is_some(),
            sensitive_data: value.unwrap_or_default(),
        }
    }
}

/// Secret slots returned by the `sensitive-data` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SensitiveData {
    /// Password slot
    #[serde(alias = "PasswordItem")]
    pub password_item: Option<SensitiveItem>,
    /// Private key slot
    #[serde(alias = "PrivateKeyData")]
    pub private_key_data: Option<SensitiveItem>,
    /// Passphrase slot
    #[serde(alias = "PrivateKeyPassPhraseItem")]
    pub private_key_pass_phrase_item: Option<SensitiveItem>,
    /// Certificate password slot
    #[serde(alias = "Password")]
    pub password: Option<SensitiveItem>,
}

/// Type specific details of a connection.
///
/// `Serialize` produces the document stored in the connection's `data`
/// member; `Deserialize` reads what a plain get returns.
pub trait ConnectionDetails:
    Serialize + DeserializeOwned + Default + Clone + fmt::Debug + Send + Sync
{
    /// Connection type these details belong to.
    const CONNECTION_TYPE: ConnectionType;

    /// Fill the secret fields from a `sensitive-data` response.
    fn apply_sensitive(&mut self, sensitive: SensitiveData);
}

/// A legacy connection entry with details of type `D`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connection<D> {
    /// Server assigned id, empty until created
    pub id: String,
    /// Owning vault (`repositoryId`)
    pub vault_id: String,
    /// Display name
    pub name: String,
    /// Free text description
    pub description: String,
    /// Folder path (`group`)
    pub path: String,
    /// Tags (`keywords`)
    pub tags: Vec<String>,
    /// Last modification time
    pub modified_on: Option<ServerTime>,
    /// Server subtype label, kept across updates
    pub connection_sub_type: String,
    /// Type specific details
    pub details: D,
}

impl<D: ConnectionDetails> Connection<D> {
    /// New, not yet saved connection.
    #[must_use]
    pub fn new(vault_id: impl Into<String>, name: impl Into<String>, details: D) -> Self {
        Self {
            id: String::new(),
            vault_id: vault_id.into(),
            name: name.into(),
            description: String::new(),
            path: String::new(),
            tags: Vec::new(),
            modified_on: None,
            connection_sub_type: String::new(),
            details,
        }
    }

    /// Set the folder path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replace the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Decode a connection row.
    ///
    /// # Errors
    ///
    /// [`DvlsError::UnsupportedEntryType`] when the row is of another
    /// connection type, serialization errors for malformed rows.
    pub fn from_value(value: Value) -> DvlsResult<Self> {
        let raw: RawConnection = serde_json::from_value(value)?;
        if raw.connection_type != ConnectionType::Undefined
            && raw.connection_type != D::CONNECTION_TYPE
        {
            return Err(DvlsError::unsupported_entry(
                raw.connection_type.to_string(),
                raw.connection_sub_type,
            ));
        }

        let details = serde_json::from_value(inline_data(raw.data)?)?;
        Ok(Self {
            id: raw.id,
            vault_id: raw.repository_id,
            name: raw.name,
            description: raw.description,
            path: raw.group,
            tags: keywords_to_tags(&raw.keywords),
            modified_on: raw.modified_date,
            connection_sub_type: raw.connection_sub_type,
            details,
        })
    }

    /// Save body for this connection.
    pub(crate) fn to_save_body(&self) -> DvlsResult<SaveBody<'_>> {
        Ok(SaveBody {
            id: &self.id,
            repository_id: &self.vault_id,
            name: &self.name,
            description: &self.description,
            events: Events::default(),
            data: serde_json::to_string(&self.details)?,
            expiration: "",
            check_out_mode: 0,
            group: &self.path,
            connection_type: D::CONNECTION_TYPE,
            connection_sub_type: &self.connection_sub_type,
            keywords: tags_to_keywords(&self.tags),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConnection {
    #[serde(default, deserialize_with = "null_as_default")]
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    repository_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    group: String,
    #[serde(default, deserialize_with = "time::deserialize_optional")]
    modified_date: Option<ServerTime>,
    #[serde(default, deserialize_with = "null_as_default")]
    keywords: String,
    #[serde(default = "undefined_type")]
    connection_type: ConnectionType,
    #[serde(default, deserialize_with = "sub_type_string")]
    connection_sub_type: String,
    #[serde(default)]
    data: Value,
}

const fn undefined_type() -> ConnectionType {
    ConnectionType::Undefined
}

/// The subtype is a string on most rows and a number on some old ones.
fn sub_type_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Audit prompts sent with every save. All disabled.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct Events {
    open_comment_prompt: bool,
    credential_viewed_prompt: bool,
    ticket_number_is_required_on_credential_viewed: bool,
    ticket_number_is_required_on_close: bool,
    credential_viewed_comment_is_required: bool,
    ticket_number_is_required_on_open: bool,
    close_comment_is_required: bool,
    open_comment_prompt_on_browser_extension_link: bool,
    close_comment_prompt: bool,
    open_comment_is_required: bool,
    warn_if_already_opened: bool,
}

/// Body of `POST`/`PUT /api/connections/partial/save`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SaveBody<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    id: &'a str,
    repository_id: &'a str,
    name: &'a str,
    description: &'a str,
    events: Events,
    data: String,
    expiration: &'a str,
    check_out_mode: u8,
    group: &'a str,
    connection_type: ConnectionType,
    connection_sub_type: &'a str,
    keywords: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keywords_quote_spaced_tags() {
        let tags = vec!["prod".to_string(), "team a".to_string(), "db".to_string()];
        let keywords = tags_to_keywords(&tags);
        assert_eq!(keywords, "prod \"team a\" db");
        assert_eq!(keywords_to_tags(&keywords), tags);
    }

    #[test]
    fn test_keywords_collapse_repeated_spaces() {
        assert_eq!(keywords_to_tags("  a   b "), vec!["a", "b"]);
        assert!(keywords_to_tags("").is_empty());
    }

    #[test]
    fn test_inline_data_accepts_string_and_object() {
        let from_string = inline_data(Value::String(r#"{"host":"h"}"#.into())).unwrap();
        let from_object = inline_data(json!({"host": "h"})).unwrap();
        assert_eq!(from_string, from_object);
        assert_eq!(inline_data(Value::Null).unwrap(), json!({}));
    }

    #[test]
    fn test_sensitive_item_value() {
        let filled: SensitiveItem =
            serde_json::from_value(json!({"hasSensitiveData": true, "sensitiveData": "pw"})).unwrap();
        assert_eq!(filled.into_value().as_deref(), Some("pw"));

        let pascal: SensitiveItem =
            serde_json::from_value(json!({"HasSensitiveData": false, "SensitiveData": "x"})).unwrap();
        assert_eq!(pascal.into_value(), None);
    }

    #[test]
    fn test_connection_type_numbers() {
        assert_eq!(ConnectionType::from(45), ConnectionType::Document);
        assert_eq!(ConnectionType::SshShell.as_u16(), 77);
        assert_eq!(ConnectionType::from(999), ConnectionType::Other(999));
        assert_eq!(serde_json::to_value(ConnectionType::Host).unwrap(), json!(53));
    }

    #[test]
    fn test_events_are_all_false() {
        let value = serde_json::to_value(Events::default()).unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.len(), 11);
        assert!(map.values().all(|v| v == &json!(false)));
    }
}
