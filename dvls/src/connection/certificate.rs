//! Certificate entries (document connections of subtype `Certificate`).
//!
//! A certificate either points at a URL or carries a file. File content is
//! not part of the entry row; it is uploaded as an attachment once the row
//! exists. A failed upload leaves the row in place.

use std::{fmt, sync::Arc};

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{
    Attachment, AttachmentService, ConnectionType, SensitiveItem, envelope_data, inline_data,
    keywords_to_tags,
    service::{fetch_sensitive, partial_endpoint, require_id},
    tags_to_keywords,
};
use crate::{
    entry::null_as_default,
    error::{DvlsError, DvlsResult},
    response::RequestOptions,
    time::{self, ServerTime},
    transport::AuthenticatedTransport,
};

const CERTIFICATE_SUB_TYPE: &str = "Certificate";

/// Where the certificate content lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CertificateDataMode {
    /// Uploaded file
    File,
    /// Remote URL
    #[default]
    Url,
    /// A mode this client does not know about
    Other(i32),
}

impl CertificateDataMode {
    /// Wire value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::File => 2,
            Self::Url => 3,
            Self::Other(mode) => mode,
        }
    }
}

impl From<i32> for CertificateDataMode {
    fn from(mode: i32) -> Self {
        match mode {
            2 => Self::File,
            3 => Self::Url,
            other => Self::Other(other),
        }
    }
}

/// A certificate entry.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CertificateEntry {
    /// Server assigned id, empty until created
    pub id: String,
    /// Owning vault
    pub vault_id: String,
    /// Display name
    pub name: String,
    /// Free text description
    pub description: String,
    /// Folder path
    pub path: String,
    /// Tags
    pub tags: Vec<String>,
    /// Certificate expiry
    pub expiration: Option<ServerTime>,
    /// Certificate password, empty until revealed
    pub password: String,
    /// Fetch URL content with the web default credentials
    pub use_default_credentials: bool,
    /// URL or file name
    pub identifier: String,
    /// Last modification time
    pub modified_on: Option<ServerTime>,
    mode: CertificateDataMode,
    file_size: u64,
}

impl fmt::Debug for CertificateEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateEntry")
            .field("id", &self.id)
            .field("vault_id", &self.vault_id)
            .field("name", &self.name)
            .field("path", &self.path)
            .field("identifier", &self.identifier)
            .field("mode", &self.mode)
            .field("file_size", &self.file_size)
            .field("password", &if self.password.is_empty() { "" } else { "[REDACTED]" })
            .finish_non_exhaustive()
    }
}

impl CertificateEntry {
    /// New, not yet saved certificate. `identifier` is the URL for
    /// [`CertificateService::new_url`] or the file name for
    /// [`CertificateService::new_file`].
    #[must_use]
    pub fn new(
        vault_id: impl Into<String>,
        name: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            vault_id: vault_id.into(),
            name: name.into(),
            identifier: identifier.into(),
            ..Self::default()
        }
    }

    /// Set the password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the folder path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
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

    /// Where the content lives, as stored on the server.
    #[must_use]
    pub const fn data_mode(&self) -> CertificateDataMode {
        self.mode
    }

    /// Size of the uploaded file; 0 for URL certificates.
    #[must_use]
    pub const fn file_size(&self) -> u64 {
        self.file_size
    }

    fn from_row(row: serde_json::Value) -> DvlsResult<Self> {
        let raw: RawCertificate = serde_json::from_value(row)?;
        let data: CertificateData = serde_json::from_value(inline_data(raw.data)?)?;
        Ok(Self {
            id: raw.id,
            vault_id: raw.repository_id,
            name: raw.name,
            description: raw.description,
            path: raw.group,
            tags: keywords_to_tags(&raw.keywords),
            expiration: raw.expiration,
            password: data.password.sensitive_data.unwrap_or_default(),
            use_default_credentials: data.use_web_default_credentials,
            identifier: data.file_name,
            modified_on: raw.modified_date,
            mode: CertificateDataMode::from(data.data_mode),
            file_size: data.document_size,
        })
    }

    fn to_row(&self) -> WriteCertificate<'_> {
        WriteCertificate {
            id: &self.id,
            repository_id: &self.vault_id,
            name: &self.name,
            description: &self.description,
            group: &self.path,
            keywords: tags_to_keywords(&self.tags),
            expiration: self.expiration,
            connection_type: ConnectionType::Document,
            connection_sub_type: CERTIFICATE_SUB_TYPE,
            data: WriteCertificateData {
                data_mode: self.mode.as_i32(),
                document_size: self.file_size,
                file_name: &self.identifier,
                kind: CERTIFICATE_SUB_TYPE,
                use_web_default_credentials: self.use_default_credentials,
                password: WritePassword {
                    has_sensitive_data: true,
                    sensitive_data: &self.password,
                },
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCertificate {
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
    #[serde(default, deserialize_with = "time::deserialize_optional")]
    expiration: Option<ServerTime>,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CertificateData {
    data_mode: i32,
    document_size: u64,
    #[serde(deserialize_with = "null_as_default")]
    file_name: String,
    use_web_default_credentials: bool,
    password: SensitiveItem,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteCertificate<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    id: &'a str,
    repository_id: &'a str,
    name: &'a str,
    description: &'a str,
    group: &'a str,
    #[serde(skip_serializing_if = "String::is_empty")]
    keywords: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiration: Option<ServerTime>,
    connection_type: ConnectionType,
    connection_sub_type: &'a str,
    data: WriteCertificateData<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteCertificateData<'a> {
    data_mode: i32,
    document_size: u64,
    file_name: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    use_web_default_credentials: bool,
    password: WritePassword<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WritePassword<'a> {
    has_sensitive_data: bool,
    sensitive_data: &'a str,
}

/// Certificate entries and their content.
#[derive(Debug, Clone)]
pub struct CertificateService {
    transport: Arc<AuthenticatedTransport>,
    attachments: AttachmentService,
}

impl CertificateService {
    pub(crate) fn new(transport: Arc<AuthenticatedTransport>) -> Self {
        Self {
            attachments: AttachmentService::new(Arc::clone(&transport)),
            transport,
        }
    }

    async fn save(&self, method: Method, entry: &CertificateEntry) -> DvlsResult<CertificateEntry> {
        let url = partial_endpoint(&self.transport, &["save"])?;
        let response = self
            .transport
            .send_json(method, url, &entry.to_row())
            .await?;
        response.check_save_result()?;
        CertificateEntry::from_row(envelope_data(&response.body)?)
    }

    /// Fetch one certificate. The password is left as stored in the row;
    /// see [`Self::get_password`].
    ///
    /// # Errors
    ///
    /// Request and result code errors.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> DvlsResult<CertificateEntry> {
        require_id(id)?;
        let url = partial_endpoint(&self.transport, &[id])?;
        let response = self.transport.send_empty(Method::GET, url).await?;
        response.check_save_result()?;
        CertificateEntry::from_row(envelope_data(&response.body)?)
    }

    /// Download the uploaded file of a certificate.
    ///
    /// # Errors
    ///
    /// Request errors.
    #[instrument(skip(self))]
    pub async fn get_file_content(&self, id: &str) -> DvlsResult<Vec<u8>> {
        require_id(id)?;
        let url = self
            .transport
            .endpoint(&["api", "connections", id, "document"])?;
        let response = self
            .transport
            .request(Method::GET, url, None, RequestOptions::raw())
            .await?;
        Ok(response.body)
    }

    /// Return `entry` with its password filled in.
    ///
    /// # Errors
    ///
    /// Request and result code errors.
    #[instrument(skip(self, entry), fields(id = %entry.id))]
    pub async fn get_password(&self, entry: &CertificateEntry) -> DvlsResult<CertificateEntry> {
        let sensitive = fetch_sensitive(&self.transport, &entry.id).await?;
        let mut revealed = entry.clone();
        revealed.password = sensitive
            .password
            .and_then(SensitiveItem::into_value)
            .unwrap_or_default();
        Ok(revealed)
    }

    /// Create a certificate that points at `entry.identifier` as a URL.
    ///
    /// # Errors
    ///
    /// Validation, request and result code errors.
    #[instrument(skip(self, entry), fields(name = %entry.name))]
    pub async fn new_url(&self, entry: &CertificateEntry) -> DvlsResult<CertificateEntry> {
        Self::validate_new(entry)?;
        let mut entry = entry.clone();
        entry.mode = CertificateDataMode::Url;
        entry.file_size = 0;
        self.save(Method::POST, &entry).await
    }

    /// Create a certificate and upload `content` as its file.
    ///
    /// # Errors
    ///
    /// Validation, request and result code errors from either step. When the
    /// upload fails the created row is not removed.
    #[instrument(skip(self, entry, content), fields(name = %entry.name, size = content.len()))]
    pub async fn new_file(
        &self,
        entry: &CertificateEntry,
        content: &[u8],
    ) -> DvlsResult<CertificateEntry> {
        Self::validate_new(entry)?;
        let mut entry = entry.clone();
        entry.mode = CertificateDataMode::File;
        entry.file_size = content.len() as u64;

        let saved = self.save(Method::POST, &entry).await?;

        let attachment = Attachment {
            entry_id: saved.id.clone(),
            file_name: saved.identifier.clone(),
            size: content.len() as u64,
            is_private: true,
            ..Attachment::default()
        };
        let attachment_id = self.attachments.create(&attachment).await?;
        self.attachments
            .upload(&attachment_id, &attachment.file_name, content)
            .await?;

        info!(id = %saved.id, attachment_id = %attachment_id, "Certificate file uploaded");
        Ok(saved)
    }

    /// Replace a certificate. The stored data mode and file size are kept.
    ///
    /// # Errors
    ///
    /// Validation, request and result code errors.
    #[instrument(skip(self, entry), fields(id = %entry.id))]
    pub async fn update(&self, entry: &CertificateEntry) -> DvlsResult<CertificateEntry> {
        require_id(&entry.id)?;
        let stored = self.get(&entry.id).await?;

        let mut entry = entry.clone();
        entry.mode = stored.mode;
        entry.file_size = stored.file_size;
        self.save(Method::PUT, &entry).await
    }

    /// Delete one certificate.
    ///
    /// # Errors
    ///
    /// Request and result code errors.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> DvlsResult<()> {
        require_id(id)?;
        let url = partial_endpoint(&self.transport, &[id])?;
        self.transport
            .send_empty(Method::DELETE, url)
            .await?
            .check_save_result()
    }

    fn validate_new(entry: &CertificateEntry) -> DvlsResult<()> {
        if entry.vault_id.is_empty() {
            return Err(DvlsError::validation("entry must have a vault id"));
        }
        if entry.identifier.is_empty() {
            return Err(DvlsError::validation("certificate needs a URL or file name"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_shape() {
        let mut entry = CertificateEntry::new("v1", "tls", "https://pki/cert.pem")
            .with_password("pw")
            .with_tags(["web"]);
        entry.mode = CertificateDataMode::Url;
        let value = serde_json::to_value(entry.to_row()).unwrap();

        assert_eq!(value["connectionType"], 45);
        assert_eq!(value["connectionSubType"], "Certificate");
        assert_eq!(value["repositoryId"], "v1");
        assert_eq!(value["keywords"], "web");
        assert_eq!(
            value["data"],
            json!({
                "dataMode": 3,
                "documentSize": 0,
                "fileName": "https://pki/cert.pem",
                "type": "Certificate",
                "useWebDefaultCredentials": false,
                "password": {"hasSensitiveData": true, "sensitiveData": "pw"}
            })
        );
    }

    #[test]
    fn test_decode_string_and_object_rows() {
        let row = json!({
            "id": "c1",
            "repositoryId": "v1",
            "name": "tls",
            "expiration": "2030-01-01T00:00:00Z",
            "data": {"dataMode": 2, "documentSize": 10, "fileName": "a.pfx",
                     "password": {"hasSensitiveData": true, "sensitiveData": "pw"}}
        });
        let as_object = serde_json::to_vec(&json!({"result": 1, "data": row})).unwrap();
        let as_string = serde_json::to_vec(&json!({"result": 1, "data": row.to_string()})).unwrap();

        for body in [as_object, as_string] {
            let entry = CertificateEntry::from_row(envelope_data(&body).unwrap()).unwrap();
            assert_eq!(entry.id, "c1");
            assert_eq!(entry.data_mode(), CertificateDataMode::File);
            assert_eq!(entry.file_size(), 10);
            assert_eq!(entry.identifier, "a.pfx");
            assert_eq!(entry.password, "pw");
            assert!(entry.expiration.is_some());
        }
    }

    #[test]
    fn test_validate_new() {
        let missing_vault = CertificateEntry::new("", "n", "x");
        assert!(CertificateService::validate_new(&missing_vault).is_err());
        let missing_identifier = CertificateEntry::new("v", "n", "");
        assert!(CertificateService::validate_new(&missing_identifier).is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let entry = CertificateEntry::new("v", "n", "x").with_password("topsecret");
        assert!(!format!("{entry:?}").contains("topsecret"));
    }
}
