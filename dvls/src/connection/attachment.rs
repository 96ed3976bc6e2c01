//! File attachments of connection entries.
//!
//! Uploading is two calls: register the attachment row, then post the bytes
//! to its document endpoint.

use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::envelope_data;
use crate::{
    entry::null_as_default,
    error::{DvlsError, DvlsResult},
    response::RequestOptions,
    transport::AuthenticatedTransport,
};

const SAVE_QUERY: &str = "=&private=false&useSensitiveMode=true";
const OCTET_STREAM: &str = "application/octet-stream";

/// Attachment row tied to an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Server assigned id, empty until created
    #[serde(default, skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub id: String,
    /// Id as a string, mirrored by the server
    #[serde(rename = "idString", default, deserialize_with = "null_as_default")]
    pub id_string: String,
    /// Owning entry
    #[serde(rename = "connectionID", default, deserialize_with = "null_as_default")]
    pub entry_id: String,
    /// Owning entry as a string
    #[serde(rename = "connectionIDString", default, deserialize_with = "null_as_default")]
    pub entry_id_string: String,
    /// Description
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// File name
    #[serde(rename = "filename", default, deserialize_with = "null_as_default")]
    pub file_name: String,
    /// Restrict to the owner
    #[serde(rename = "isPrivate", default)]
    pub is_private: bool,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    /// Title
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
}

/// Attachment registration and upload.
#[derive(Debug, Clone)]
pub struct AttachmentService {
    transport: Arc<AuthenticatedTransport>,
}

impl AttachmentService {
    pub(crate) const fn new(transport: Arc<AuthenticatedTransport>) -> Self {
        Self { transport }
    }

    /// Register an attachment row and return its id.
    ///
    /// # Errors
    ///
    /// Request and result code errors, or a response without an id.
    #[instrument(skip(self, attachment), fields(entry_id = %attachment.entry_id, size = attachment.size))]
    pub async fn create(&self, attachment: &Attachment) -> DvlsResult<String> {
        let mut url = self.transport.endpoint(&["api", "attachment", "save"])?;
        url.set_query(Some(SAVE_QUERY));

        let response = self
            .transport
            .send_json(Method::POST, url, attachment)
            .await?;
        response.check_save_result()?;

        let created: Attachment = serde_json::from_value(envelope_data(&response.body)?)?;
        if created.id.is_empty() {
            return Err(DvlsError::validation("server returned no id for the new attachment"));
        }
        debug!(id = %created.id, "Attachment registered");
        Ok(created.id)
    }

    /// Upload the content of a registered attachment. `file_name` is only
    /// used to pick the content type when the bytes are not recognised.
    ///
    /// # Errors
    ///
    /// Request and result code errors.
    #[instrument(skip(self, content), fields(size = content.len()))]
    pub async fn upload(
        &self,
        attachment_id: &str,
        file_name: &str,
        content: &[u8],
    ) -> DvlsResult<()> {
        if attachment_id.is_empty() {
            return Err(DvlsError::validation("attachment id is required"));
        }
        let url = self
            .transport
            .endpoint(&["api", "attachment", attachment_id, "document"])?;
        let options =
            RequestOptions::default().with_content_type(detect_content_type(content, file_name));

        self.transport
            .request(Method::POST, url, Some(content.to_vec()), options)
            .await?
            .check_save_result()
    }
}

/// MIME type of an upload: sniffed from the leading bytes, then guessed from
/// the file extension, then `application/octet-stream`.
#[must_use]
pub fn detect_content_type(content: &[u8], file_name: &str) -> String {
    infer::get(content).map_or_else(
        || {
            mime_guess::from_path(file_name)
                .first_raw()
                .unwrap_or(OCTET_STREAM)
                .to_string()
        },
        |kind| kind.mime_type().to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attachment_wire_names() {
        let attachment = Attachment {
            entry_id: "e1".into(),
            file_name: "cert.pfx".into(),
            is_private: true,
            size: 12,
            ..Default::default()
        };
        let value = serde_json::to_value(&attachment).unwrap();
        assert_eq!(value["connectionID"], "e1");
        assert_eq!(value["filename"], "cert.pfx");
        assert_eq!(value["isPrivate"], true);
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_attachment_reads_nested_data() {
        let body = serde_json::to_vec(&json!({"result": 1, "data": {"id": "a1", "size": 3}})).unwrap();
        let attachment: Attachment = serde_json::from_value(envelope_data(&body).unwrap()).unwrap();
        assert_eq!(attachment.id, "a1");
        assert_eq!(attachment.size, 3);
    }

    #[test]
    fn test_detect_content_type_from_bytes() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];
        assert_eq!(detect_content_type(&jpeg, "upload"), "image/jpeg");
        assert_eq!(detect_content_type(b"GIF89a\x01\x00\x01\x00", "upload"), "image/gif");
        assert_eq!(detect_content_type(b"%PDF-1.7\n%\xE2\xE3", "cert.txt"), "application/pdf");
        assert_eq!(
            detect_content_type(b"<html><body>hello</body></html>", "page"),
            "text/html"
        );
    }

    #[test]
    fn test_detect_content_type_falls_back_to_name() {
        assert_eq!(detect_content_type(b"{\"a\": 1}", "settings.json"), "application/json");
        assert_eq!(detect_content_type(&[0x30, 0x82, 0x00, 0x01], "blob"), OCTET_STREAM);
        assert_eq!(detect_content_type(&[], ""), OCTET_STREAM);
    }
}
