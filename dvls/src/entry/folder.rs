//! Folder payload and the folder entry service.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{
    Entry, EntryData, EntryType, GetByNameOptions, GetEntriesOptions, api::EntryApi,
    null_as_default,
};
use crate::error::{DvlsError, DvlsResult};

/// Defaults a folder hands down to the entries it contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderData {
    /// Default domain
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub domain: String,
    /// Default user name
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub username: String,
}

/// Folder entries on the v1 entry API.
#[derive(Debug, Clone)]
pub struct FolderService {
    api: EntryApi,
}

impl FolderService {
    pub(crate) const fn new(api: EntryApi) -> Self {
        Self { api }
    }

    fn validate(entry: &Entry) -> DvlsResult<()> {
        if entry.vault_id.is_empty() {
            return Err(DvlsError::validation("entry must have a vault id"));
        }
        if !matches!(entry.data, EntryData::Folder { .. }) {
            return Err(DvlsError::unsupported_entry(
                entry.entry_type().as_str(),
                entry.sub_type(),
            ));
        }
        Ok(())
    }

    /// Fetch the stored version of `entry`.
    ///
    /// # Errors
    ///
    /// See [`Self::get_by_id`].
    pub async fn get(&self, entry: &Entry) -> DvlsResult<Entry> {
        self.get_by_id(&entry.vault_id, &entry.id).await
    }

    /// Fetch one folder.
    ///
    /// # Errors
    ///
    /// Validation error for empty ids, request errors from the server and
    /// [`DvlsError::UnsupportedEntryType`] if the id names a credential.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, vault_id: &str, entry_id: &str) -> DvlsResult<Entry> {
        let entry = self.api.get_by_id(vault_id, entry_id).await?;
        if entry.entry_type() != EntryType::Folder {
            return Err(DvlsError::unsupported_entry(
                entry.entry_type().as_str(),
                entry.sub_type(),
            ));
        }
        Ok(entry)
    }

    /// Create a folder and return its new id.
    ///
    /// # Errors
    ///
    /// Validation errors, request errors from the server.
    #[instrument(skip(self, entry), fields(vault_id = %entry.vault_id, name = %entry.name))]
    pub async fn new_entry(&self, entry: &Entry) -> DvlsResult<String> {
        Self::validate(entry)?;
        self.api.create(entry).await
    }

    /// Replace a folder and return the stored result.
    ///
    /// # Errors
    ///
    /// Validation errors, request errors from the server.
    #[instrument(skip(self, entry), fields(vault_id = %entry.vault_id, id = %entry.id))]
    pub async fn update(&self, entry: &Entry) -> DvlsResult<Entry> {
        Self::validate(entry)?;
        self.api.update(entry).await
    }

    /// Delete `entry`.
    ///
    /// # Errors
    ///
    /// See [`Self::delete_by_id`].
    pub async fn delete(&self, entry: &Entry) -> DvlsResult<()> {
        self.delete_by_id(&entry.vault_id, &entry.id).await
    }

    /// Delete one folder.
    ///
    /// # Errors
    ///
    /// Validation error for empty ids, request errors from the server.
    #[instrument(skip(self))]
    pub async fn delete_by_id(&self, vault_id: &str, entry_id: &str) -> DvlsResult<()> {
        self.api.delete_by_id(vault_id, entry_id).await
    }

    /// List folders of a vault.
    ///
    /// # Errors
    ///
    /// Request errors from any page.
    #[instrument(skip(self))]
    pub async fn get_entries(
        &self,
        vault_id: &str,
        options: &GetEntriesOptions,
    ) -> DvlsResult<Vec<Entry>> {
        let entries = self.api.list(vault_id, options).await?;
        Ok(entries
            .into_iter()
            .filter(|e| e.entry_type() == EntryType::Folder)
            .collect())
    }

    /// Find the single folder named `name`.
    ///
    /// # Errors
    ///
    /// [`DvlsError::EntryNotFound`] for no match,
    /// [`DvlsError::MultipleEntriesFound`] for more than one.
    #[instrument(skip(self))]
    pub async fn get_by_name(
        &self,
        vault_id: &str,
        name: &str,
        options: &GetByNameOptions,
    ) -> DvlsResult<Entry> {
        let filter = GetEntriesOptions {
            name: Some(name.to_string()),
            path: options.path.clone(),
        };
        let matches = self.get_entries(vault_id, &filter).await?;

        match matches.as_slice() {
            [] => Err(DvlsError::EntryNotFound),
            [only] => self.get_by_id(vault_id, &only.id).await,
            _ => Err(DvlsError::MultipleEntriesFound),
        }
    }
}
