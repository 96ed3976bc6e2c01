//! Vault entries on the v1 entry API.
//!
//! An [`Entry`] carries common metadata plus exactly one typed payload. The
//! payload variant decides the wire `type`/`subType` pair, so the two can
//! never disagree.

mod api;
mod codec;
pub mod credential;
pub mod folder;
pub mod kind;
mod listing;

use std::collections::BTreeMap;

pub(crate) use api::EntryApi;
pub(crate) use codec::null_as_default;
pub use credential::{
    CredentialAccessCodeData, CredentialApiKeyData, CredentialAzureServicePrincipalData,
    CredentialConnectionStringData, CredentialData, CredentialDefaultData,
    CredentialPasskeyData, CredentialPrivateKeyData, CredentialService,
};
pub use folder::{FolderData, FolderService};
pub use kind::{CredentialSubType, EntryType, FolderSubType, UnknownName};
pub use listing::{GetByNameOptions, GetEntriesOptions};
pub(crate) use listing::fetch_all_pages;

use crate::{
    error::{DvlsError, DvlsResult},
    time::ServerTime,
};

/// Typed payload of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryData {
    /// Credential of any subtype
    Credential(CredentialData),
    /// Folder with its label
    Folder {
        /// Folder label
        sub_type: FolderSubType,
        /// Folder defaults
        data: FolderData,
    },
}

impl From<CredentialData> for EntryData {
    fn from(value: CredentialData) -> Self {
        Self::Credential(value)
    }
}

/// A vault entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Server assigned id, empty until created
    pub id: String,
    /// Owning vault
    pub vault_id: String,
    /// Display name
    pub name: String,
    /// Folder path, segments separated by `\`
    pub path: String,
    /// Free text description
    pub description: String,
    /// Tags
    pub tags: Vec<String>,
    /// Creation time
    pub created_on: Option<ServerTime>,
    /// Creator
    pub created_by: String,
    /// Last modification time
    pub modified_on: Option<ServerTime>,
    /// Last modifier
    pub modified_by: String,
    /// Payload
    pub data: EntryData,
}

impl Entry {
    /// New, not yet created entry with the given payload.
    #[must_use]
    pub fn new(vault_id: impl Into<String>, name: impl Into<String>, data: EntryData) -> Self {
        Self {
            id: String::new(),
            vault_id: vault_id.into(),
            name: name.into(),
            path: String::new(),
            description: String::new(),
            tags: Vec::new(),
            created_on: None,
            created_by: String::new(),
            modified_on: None,
            modified_by: String::new(),
            data,
        }
    }

    /// New credential entry.
    #[must_use]
    pub fn credential(
        vault_id: impl Into<String>,
        name: impl Into<String>,
        data: impl Into<CredentialData>,
    ) -> Self {
        Self::new(vault_id, name, EntryData::Credential(data.into()))
    }

    /// New folder entry.
    #[must_use]
    pub fn folder(
        vault_id: impl Into<String>,
        name: impl Into<String>,
        sub_type: FolderSubType,
        data: FolderData,
    ) -> Self {
        Self::new(vault_id, name, EntryData::Folder { sub_type, data })
    }

    /// Set the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
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

    /// Wire `type` of the payload.
    #[must_use]
    pub const fn entry_type(&self) -> EntryType {
        match self.data {
            EntryData::Credential(_) => EntryType::Credential,
            EntryData::Folder { .. } => EntryType::Folder,
        }
    }

    /// Wire `subType` of the payload.
    #[must_use]
    pub const fn sub_type(&self) -> &'static str {
        match &self.data {
            EntryData::Credential(data) => data.sub_type().as_str(),
            EntryData::Folder { sub_type, .. } => sub_type.as_str(),
        }
    }

    /// Flatten a credential into stable string keys. Empty fields are left
    /// out; `entry-id` and `entry-name` are always present.
    ///
    /// # Errors
    ///
    /// Returns [`DvlsError::UnsupportedEntryType`] for non-credential entries.
    pub fn to_credential_map(&self) -> DvlsResult<BTreeMap<String, String>> {
        let EntryData::Credential(data) = &self.data else {
            return Err(DvlsError::unsupported_entry(
                self.entry_type().as_str(),
                self.sub_type(),
            ));
        };

        let mut map = BTreeMap::new();
        map.insert("entry-id".to_string(), self.id.clone());
        map.insert("entry-name".to_string(), self.name.clone());

        let fields: Vec<(&str, &str)> = match data {
            CredentialData::Default(d) => vec![
                ("username", &d.username),
                ("password", &d.password),
                ("domain", &d.domain),
            ],
            CredentialData::AccessCode(d) => vec![("password", &d.password)],
            CredentialData::ApiKey(d) => vec![
                ("api-id", &d.api_id),
                ("api-key", &d.api_key),
                ("tenant-id", &d.tenant_id),
            ],
            CredentialData::AzureServicePrincipal(d) => vec![
                ("client-id", &d.client_id),
                ("client-secret", &d.client_secret),
                ("tenant-id", &d.tenant_id),
            ],
            CredentialData::ConnectionString(d) => {
                vec![("connection-string", &d.connection_string)]
            }
            CredentialData::PrivateKey(d) => vec![
                ("username", &d.username),
                ("password", &d.password),
                ("private-key", &d.private_key),
                ("public-key", &d.public_key),
                ("passphrase", &d.passphrase),
            ],
            CredentialData::Passkey(d) => {
                vec![("private-key", &d.private_key), ("rp-id", &d.rp_id)]
            }
        }
        .into_iter()
        .map(|(k, v)| (k, v.as_str()))
        .collect();

        for (key, value) in fields {
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
        Ok(map)
    }

    /// Replace the single secret of a credential.
    ///
    /// # Errors
    ///
    /// [`DvlsError::UnsupportedEntryType`] for folders,
    /// [`DvlsError::UnsupportedSubType`] for subtypes holding several secrets.
    pub fn set_credential_secret(&mut self, secret: impl Into<String>) -> DvlsResult<()> {
        let entry_type = self.entry_type();
        let sub_type = self.sub_type();
        let EntryData::Credential(data) = &mut self.data else {
            return Err(DvlsError::unsupported_entry(entry_type.as_str(), sub_type));
        };

        let slot = match data {
            CredentialData::Default(d) => &mut d.password,
            CredentialData::AccessCode(d) => &mut d.password,
            CredentialData::ApiKey(d) => &mut d.api_key,
            CredentialData::AzureServicePrincipal(d) => &mut d.client_secret,
            CredentialData::ConnectionString(d) => &mut d.connection_string,
            CredentialData::PrivateKey(_) | CredentialData::Passkey(_) => {
                return Err(DvlsError::UnsupportedSubType {
                    sub_type: sub_type.to_string(),
                    supported: [
                        CredentialSubType::Default,
                        CredentialSubType::AccessCode,
                        CredentialSubType::ApiKey,
                        CredentialSubType::AzureServicePrincipal,
                        CredentialSubType::ConnectionString,
                    ]
                    .map(CredentialSubType::as_str)
                    .join(", "),
                });
            }
        };
        *slot = secret.into();
        Ok(())
    }
}

macro_rules! credential_accessors {
    ($($get:ident, $get_mut:ident => $variant:ident($ty:ty);)+) => {
        impl Entry {
            $(
                #[doc = concat!("Payload if this is a `", stringify!($variant), "` credential.")]
                #[must_use]
                pub const fn $get(&self) -> Option<&$ty> {
                    match &self.data {
                        EntryData::Credential(CredentialData::$variant(d)) => Some(d),
                        _ => None,
                    }
                }

                #[doc = concat!("Mutable payload if this is a `", stringify!($variant), "` credential.")]
                pub fn $get_mut(&mut self) -> Option<&mut $ty> {
                    match &mut self.data {
                        EntryData::Credential(CredentialData::$variant(d)) => Some(d),
                        _ => None,
                    }
                }
            )+
        }
    };
}

credential_accessors! {
    credential_default_data, credential_default_data_mut => Default(CredentialDefaultData);
    credential_access_code_data, credential_access_code_data_mut => AccessCode(CredentialAccessCodeData);
    credential_api_key_data, credential_api_key_data_mut => ApiKey(CredentialApiKeyData);
    credential_azure_service_principal_data, credential_azure_service_principal_data_mut =>
        AzureServicePrincipal(CredentialAzureServicePrincipalData);
    credential_connection_string_data, credential_connection_string_data_mut =>
        ConnectionString(CredentialConnectionStringData);
    credential_private_key_data, credential_private_key_data_mut => PrivateKey(CredentialPrivateKeyData);
    credential_passkey_data, credential_passkey_data_mut => Passkey(CredentialPasskeyData);
}

impl Entry {
    /// Folder defaults if this is a folder.
    #[must_use]
    pub const fn folder_data(&self) -> Option<&FolderData> {
        match &self.data {
            EntryData::Folder { data, .. } => Some(data),
            EntryData::Credential(_) => None,
        }
    }

    /// Mutable folder defaults if this is a folder.
    pub fn folder_data_mut(&mut self) -> Option<&mut FolderData> {
        match &mut self.data {
            EntryData::Folder { data, .. } => Some(data),
            EntryData::Credential(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_key_entry() -> Entry {
        Entry::credential(
            "vault-1",
            "billing",
            CredentialApiKeyData {
                api_id: "id".into(),
                api_key: "key".into(),
                tenant_id: String::new(),
            },
        )
        .with_id("entry-1")
    }

    #[test]
    fn test_type_follows_payload() {
        let entry = api_key_entry();
        assert_eq!(entry.entry_type(), EntryType::Credential);
        assert_eq!(entry.sub_type(), "ApiKey");

        let folder = Entry::folder("v", "f", FolderSubType::Server, FolderData::default());
        assert_eq!(folder.entry_type(), EntryType::Folder);
        assert_eq!(folder.sub_type(), "Server");
    }

    #[test]
    fn test_credential_map_omits_empty_fields() {
        let map = api_key_entry().to_credential_map().unwrap();
        assert_eq!(map["entry-id"], "entry-1");
        assert_eq!(map["entry-name"], "billing");
        assert_eq!(map["api-id"], "id");
        assert_eq!(map["api-key"], "key");
        assert!(!map.contains_key("tenant-id"));
    }

    #[test]
    fn test_credential_map_rejects_folder() {
        let folder = Entry::folder("v", "f", FolderSubType::Folder, FolderData::default());
        assert!(matches!(
            folder.to_credential_map(),
            Err(DvlsError::UnsupportedEntryType { .. })
        ));
    }

    #[test]
    fn test_set_secret_touches_only_secret() {
        let mut entry = api_key_entry();
        entry.set_credential_secret("rotated").unwrap();
        let data = entry.credential_api_key_data().unwrap();
        assert_eq!(data.api_key, "rotated");
        assert_eq!(data.api_id, "id");
    }

    #[test]
    fn test_set_secret_rejects_private_key() {
        let mut entry = Entry::credential("v", "k", CredentialPrivateKeyData::default());
        let err = entry.set_credential_secret("x").unwrap_err();
        assert!(matches!(err, DvlsError::UnsupportedSubType { ref sub_type, .. } if sub_type == "PrivateKey"));
    }

    #[test]
    fn test_accessors_match_variant() {
        let mut entry = api_key_entry();
        assert!(entry.credential_default_data().is_none());
        assert!(entry.folder_data().is_none());
        entry.credential_api_key_data_mut().unwrap().tenant_id = "t".into();
        assert_eq!(entry.credential_api_key_data().unwrap().tenant_id, "t");
    }
}
