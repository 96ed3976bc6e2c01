//! Shared calls of the v1 entry API (`/api/v1/vault/{vaultId}/entry`).

use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{
    Entry, EntryData,
    listing::{GetEntriesOptions, dedup_by_key, fetch_all_pages},
};
use crate::{
    error::{DvlsError, DvlsResult},
    transport::AuthenticatedTransport,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryBody<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    path: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    entry_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub_type: Option<&'static str>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    tags: &'a [String],
    data: &'a EntryData,
}

impl<'a> EntryBody<'a> {
    /// Body for `POST`, which carries the type pair.
    fn create(entry: &'a Entry) -> Self {
        Self {
            entry_type: Some(entry.entry_type().as_str()),
            sub_type: Some(entry.sub_type()),
            ..Self::update(entry)
        }
    }

    /// Body for `PUT`; the type pair of a stored entry is fixed.
    fn update(entry: &'a Entry) -> Self {
        Self {
            name: &entry.name,
            description: &entry.description,
            path: &entry.path,
            entry_type: None,
            sub_type: None,
            tags: &entry.tags,
            data: &entry.data,
        }
    }
}

#[derive(Deserialize)]
struct Created {
    #[serde(default)]
    id: String,
}

fn require(value: &str, what: &str) -> DvlsResult<()> {
    if value.is_empty() {
        Err(DvlsError::validation(format!("{what} is required")))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EntryApi {
    transport: Arc<AuthenticatedTransport>,
}

impl EntryApi {
    pub(crate) const fn new(transport: Arc<AuthenticatedTransport>) -> Self {
        Self { transport }
    }

    #[instrument(skip(self))]
    pub(crate) async fn get_by_id(&self, vault_id: &str, entry_id: &str) -> DvlsResult<Entry> {
        require(vault_id, "vault id")?;
        require(entry_id, "entry id")?;

        let url = self
            .transport
            .endpoint(&["api", "v1", "vault", vault_id, "entry", entry_id])?;
        let response = self.transport.send_empty(Method::GET, url).await?;

        let mut entry = Entry::from_json(&response.body)?;
        entry.vault_id = vault_id.to_string();
        Ok(entry)
    }

    pub(crate) async fn create(&self, entry: &Entry) -> DvlsResult<String> {
        require(&entry.vault_id, "vault id")?;

        let url = self
            .transport
            .endpoint(&["api", "v1", "vault", &entry.vault_id, "entry"])?;
        let created: Created = self
            .transport
            .send_json(Method::POST, url, &EntryBody::create(entry))
            .await?
            .json()?;

        if created.id.is_empty() {
            return Err(DvlsError::validation("server returned no id for the new entry"));
        }
        debug!(id = %created.id, "Entry created");
        Ok(created.id)
    }

    pub(crate) async fn update(&self, entry: &Entry) -> DvlsResult<Entry> {
        require(&entry.vault_id, "vault id")?;
        require(&entry.id, "entry id")?;

        let url = self
            .transport
            .endpoint(&["api", "v1", "vault", &entry.vault_id, "entry", &entry.id])?;
        self.transport
            .send_json(Method::PUT, url, &EntryBody::update(entry))
            .await?;

        self.get_by_id(&entry.vault_id, &entry.id).await
    }

    pub(crate) async fn delete_by_id(&self, vault_id: &str, entry_id: &str) -> DvlsResult<()> {
        require(vault_id, "vault id")?;
        require(entry_id, "entry id")?;

        let url = self
            .transport
            .endpoint(&["api", "v1", "vault", vault_id, "entry", entry_id])?;
        self.transport.send_empty(Method::DELETE, url).await?;
        Ok(())
    }

    /// Every decodable entry of a vault that passes `options`.
    pub(crate) async fn list(
        &self,
        vault_id: &str,
        options: &GetEntriesOptions,
    ) -> DvlsResult<Vec<Entry>> {
        require(vault_id, "vault id")?;

        let mut url = self
            .transport
            .endpoint(&["api", "v1", "vault", vault_id, "entry"])?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(name) = options.name.as_deref() {
                query.append_pair("name", name);
            }
            if let Some(path) = options.path.as_deref().filter(|p| !p.is_empty()) {
                query.append_pair("path", path);
            }
        }

        let raw: Vec<Value> = fetch_all_pages(&self.transport, &url).await?;
        let mut entries = Vec::with_capacity(raw.len());
        for value in raw {
            match Entry::from_value(value) {
                Ok(mut entry) => {
                    if entry.vault_id.is_empty() {
                        entry.vault_id = vault_id.to_string();
                    }
                    entries.push(entry);
                }
                Err(DvlsError::UnsupportedEntryType {
                    entry_type,
                    sub_type,
                }) => debug!(%entry_type, %sub_type, "Skipping entry of unsupported type"),
                Err(err) => return Err(err),
            }
        }

        Ok(dedup_by_key(entries, |e| e.id.clone())
            .into_iter()
            .filter(|e| options.matches(&e.name, &e.path))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{CredentialDefaultData, FolderData, FolderSubType};
    use serde_json::json;

    #[test]
    fn test_create_body_carries_type_pair() {
        let entry = Entry::credential(
            "v1",
            "db",
            CredentialDefaultData {
                username: "sa".into(),
                ..Default::default()
            },
        )
        .with_tags(["prod"]);
        let body = serde_json::to_value(EntryBody::create(&entry)).unwrap();
        assert_eq!(
            body,
            json!({
                "name": "db",
                "type": "Credential",
                "subType": "Default",
                "tags": ["prod"],
                "data": {"username": "sa"}
            })
        );
    }

    #[test]
    fn test_update_body_omits_type_pair() {
        let entry = Entry::folder("v1", "ops", FolderSubType::Team, FolderData::default())
            .with_id("f1")
            .with_path("root");
        let body = serde_json::to_value(EntryBody::update(&entry)).unwrap();
        assert_eq!(body, json!({"name": "ops", "path": "root", "data": {}}));
    }

    #[test]
    fn test_require_rejects_empty() {
        assert!(matches!(require("", "vault id"), Err(DvlsError::Validation(_))));
        assert!(require("x", "vault id").is_ok());
    }
}
