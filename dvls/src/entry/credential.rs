//! Credential payloads and the credential entry service.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::instrument;

use super::{
    Entry, EntryData, EntryType, GetByNameOptions, GetEntriesOptions,
    api::EntryApi,
    kind::CredentialSubType,
    null_as_default,
};
use crate::error::{DvlsError, DvlsResult};

const REDACTED: &str = "[REDACTED]";

fn redact(value: &str) -> &str {
    if value.is_empty() { "" } else { REDACTED }
}

/// Domain, user name and password.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialDefaultData {
    /// Domain
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub domain: String,
    /// Password
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub password: String,
    /// User name
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub username: String,
}

impl fmt::Debug for CredentialDefaultData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialDefaultData")
            .field("domain", &self.domain)
            .field("password", &redact(&self.password))
            .field("username", &self.username)
            .finish()
    }
}

/// Single access code.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialAccessCodeData {
    /// Access code
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub password: String,
}

impl fmt::Debug for CredentialAccessCodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialAccessCodeData")
            .field("password", &redact(&self.password))
            .finish()
    }
}

/// API id, key and tenant.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CredentialApiKeyData {
    /// API id
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub api_id: String,
    /// API key
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub api_key: String,
    /// Tenant id
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub tenant_id: String,
}

impl fmt::Debug for CredentialApiKeyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialApiKeyData")
            .field("api_id", &self.api_id)
            .field("api_key", &redact(&self.api_key))
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

/// Azure application registration.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CredentialAzureServicePrincipalData {
    /// Application (client) id
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub client_id: String,
    /// Client secret
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub client_secret: String,
    /// Directory (tenant) id
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub tenant_id: String,
}

impl fmt::Debug for CredentialAzureServicePrincipalData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialAzureServicePrincipalData")
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

/// Connection string.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CredentialConnectionStringData {
    /// Full connection string, secrets included
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub connection_string: String,
}

impl fmt::Debug for CredentialConnectionStringData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialConnectionStringData")
            .field("connection_string", &redact(&self.connection_string))
            .finish()
    }
}

/// Key pair with an optional override login.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialPrivateKeyData {
    /// Override user name
    #[serde(rename = "privateKeyOverrideUsername", skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub username: String,
    /// Override password
    #[serde(rename = "privateKeyOverridePassword", skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub password: String,
    /// Private key material
    #[serde(rename = "privateKeyData", skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub private_key: String,
    /// Public key material
    #[serde(rename = "publicKeyData", skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub public_key: String,
    /// Private key passphrase
    #[serde(rename = "privateKeyPassPhrase", skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub passphrase: String,
}

impl fmt::Debug for CredentialPrivateKeyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPrivateKeyData")
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("private_key", &redact(&self.private_key))
            .field("public_key", &self.public_key)
            .field("passphrase", &redact(&self.passphrase))
            .finish()
    }
}

/// WebAuthn passkey.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialPasskeyData {
    /// Passkey private key
    #[serde(rename = "passkeyPrivateKey", skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub private_key: String,
    /// Relying party id
    #[serde(rename = "passkeyRpId", skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub rp_id: String,
}

impl fmt::Debug for CredentialPasskeyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPasskeyData")
            .field("private_key", &redact(&self.private_key))
            .field("rp_id", &self.rp_id)
            .finish()
    }
}

/// Payload of a credential entry. Exactly one shape is active and it
/// determines the entry's subtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialData {
    /// `Default`
    Default(CredentialDefaultData),
    /// `AccessCode`
    AccessCode(CredentialAccessCodeData),
    /// `ApiKey`
    ApiKey(CredentialApiKeyData),
    /// `AzureServicePrincipal`
    AzureServicePrincipal(CredentialAzureServicePrincipalData),
    /// `ConnectionString`
    ConnectionString(CredentialConnectionStringData),
    /// `PrivateKey`
    PrivateKey(CredentialPrivateKeyData),
    /// `Passkey`
    Passkey(CredentialPasskeyData),
}

impl CredentialData {
    /// Subtype matching the active shape.
    #[must_use]
    pub const fn sub_type(&self) -> CredentialSubType {
        match self {
            Self::Default(_) => CredentialSubType::Default,
            Self::AccessCode(_) => CredentialSubType::AccessCode,
            Self::ApiKey(_) => CredentialSubType::ApiKey,
            Self::AzureServicePrincipal(_) => CredentialSubType::AzureServicePrincipal,
            Self::ConnectionString(_) => CredentialSubType::ConnectionString,
            Self::PrivateKey(_) => CredentialSubType::PrivateKey,
            Self::Passkey(_) => CredentialSubType::Passkey,
        }
    }

    /// Empty payload of the given subtype.
    #[must_use]
    pub fn empty(sub_type: CredentialSubType) -> Self {
        match sub_type {
            CredentialSubType::Default => Self::Default(CredentialDefaultData::default()),
            CredentialSubType::AccessCode => Self::AccessCode(CredentialAccessCodeData::default()),
            CredentialSubType::ApiKey => Self::ApiKey(CredentialApiKeyData::default()),
            CredentialSubType::AzureServicePrincipal => {
                Self::AzureServicePrincipal(CredentialAzureServicePrincipalData::default())
            }
            CredentialSubType::ConnectionString => {
                Self::ConnectionString(CredentialConnectionStringData::default())
            }
            CredentialSubType::PrivateKey => Self::PrivateKey(CredentialPrivateKeyData::default()),
            CredentialSubType::Passkey => Self::Passkey(CredentialPasskeyData::default()),
        }
    }

    /// Decode the `data` document of a credential entry of `sub_type`.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the document does not fit the shape.
    pub fn from_value(sub_type: CredentialSubType, data: Value) -> serde_json::Result<Self> {
        Ok(match sub_type {
            CredentialSubType::Default => Self::Default(serde_json::from_value(data)?),
            CredentialSubType::AccessCode => Self::AccessCode(serde_json::from_value(data)?),
            CredentialSubType::ApiKey => Self::ApiKey(serde_json::from_value(data)?),
            CredentialSubType::AzureServicePrincipal => {
                Self::AzureServicePrincipal(serde_json::from_value(data)?)
            }
            CredentialSubType::ConnectionString => {
                Self::ConnectionString(serde_json::from_value(data)?)
            }
            CredentialSubType::PrivateKey => Self::PrivateKey(serde_json::from_value(data)?),
            CredentialSubType::Passkey => Self::Passkey(serde_json::from_value(data)?),
        })
    }
}

impl Serialize for CredentialData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Default(d) => d.serialize(serializer),
            Self::AccessCode(d) => d.serialize(serializer),
            Self::ApiKey(d) => d.serialize(serializer),
            Self::AzureServicePrincipal(d) => d.serialize(serializer),
            Self::ConnectionString(d) => d.serialize(serializer),
            Self::PrivateKey(d) => d.serialize(serializer),
            Self::Passkey(d) => d.serialize(serializer),
        }
    }
}

impl From<CredentialDefaultData> for CredentialData {
    fn from(value: CredentialDefaultData) -> Self {
        Self::Default(value)
    }
}

impl From<CredentialAccessCodeData> for CredentialData {
    fn from(value: CredentialAccessCodeData) -> Self {
        Self::AccessCode(value)
    }
}

impl From<CredentialApiKeyData> for CredentialData {
    fn from(value: CredentialApiKeyData) -> Self {
        Self::ApiKey(value)
    }
}

impl From<CredentialAzureServicePrincipalData> for CredentialData {
    fn from(value: CredentialAzureServicePrincipalData) -> Self {
        Self::AzureServicePrincipal(value)
    }
}

impl From<CredentialConnectionStringData> for CredentialData {
    fn from(value: CredentialConnectionStringData) -> Self {
        Self::ConnectionString(value)
    }
}

impl From<CredentialPrivateKeyData> for CredentialData {
    fn from(value: CredentialPrivateKeyData) -> Self {
        Self::PrivateKey(value)
    }
}

impl From<CredentialPasskeyData> for CredentialData {
    fn from(value: CredentialPasskeyData) -> Self {
        Self::Passkey(value)
    }
}

/// Credential entries on the v1 entry API.
#[derive(Debug, Clone)]
pub struct CredentialService {
    api: EntryApi,
}

impl CredentialService {
    pub(crate) const fn new(api: EntryApi) -> Self {
        Self { api }
    }

    fn validate(entry: &Entry) -> DvlsResult<()> {
        if entry.vault_id.is_empty() {
            return Err(DvlsError::validation("entry must have a vault id"));
        }
        if !matches!(entry.data, EntryData::Credential(_)) {
            return Err(DvlsError::unsupported_entry(
                entry.entry_type().as_str(),
                entry.sub_type(),
            ));
        }
        Ok(())
    }

    /// Fetch the stored version of `entry` by its vault id and id.
    ///
    /// # Errors
    ///
    /// See [`Self::get_by_id`].
    pub async fn get(&self, entry: &Entry) -> DvlsResult<Entry> {
        self.get_by_id(&entry.vault_id, &entry.id).await
    }

    /// Fetch one credential.
    ///
    /// # Errors
    ///
    /// Validation error for empty ids, request errors from the server (use
    /// [`DvlsError::is_not_found`] for 404) and
    /// [`DvlsError::UnsupportedEntryType`] if the id names a non-credential.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, vault_id: &str, entry_id: &str) -> DvlsResult<Entry> {
        let entry = self.api.get_by_id(vault_id, entry_id).await?;
        if entry.entry_type() != EntryType::Credential {
            return Err(DvlsError::unsupported_entry(
                entry.entry_type().as_str(),
                entry.sub_type(),
            ));
        }
        Ok(entry)
    }

    /// Create a credential and return its new id.
    ///
    /// # Errors
    ///
    /// Validation errors for a missing vault id or a non-credential payload,
    /// request errors from the server.
    #[instrument(skip(self, entry), fields(vault_id = %entry.vault_id, name = %entry.name))]
    pub async fn new_entry(&self, entry: &Entry) -> DvlsResult<String> {
        Self::validate(entry)?;
        self.api.create(entry).await
    }

    /// Replace a credential and return the stored result.
    ///
    /// # Errors
    ///
    /// Validation errors for missing ids or a non-credential payload, request
    /// errors from the server.
    #[instrument(skip(self, entry), fields(vault_id = %entry.vault_id, id = %entry.id))]
    pub async fn update(&self, entry: &Entry) -> DvlsResult<Entry> {
        Self::validate(entry)?;
        self.api.update(entry).await
    }

    /// Delete `entry` by its vault id and id.
    ///
    /// # Errors
    ///
    /// See [`Self::delete_by_id`].
    pub async fn delete(&self, entry: &Entry) -> DvlsResult<()> {
        self.delete_by_id(&entry.vault_id, &entry.id).await
    }

    /// Delete one credential.
    ///
    /// # Errors
    ///
    /// Validation error for empty ids, request errors from the server.
    #[instrument(skip(self))]
    pub async fn delete_by_id(&self, vault_id: &str, entry_id: &str) -> DvlsResult<()> {
        self.api.delete_by_id(vault_id, entry_id).await
    }

    /// List credentials of a vault, optionally filtered by exact name and
    /// folder path.
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
            .filter(|e| e.entry_type() == EntryType::Credential)
            .collect())
    }

    /// Find the single credential of `sub_type` named `name`.
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
        sub_type: CredentialSubType,
        options: &GetByNameOptions,
    ) -> DvlsResult<Entry> {
        let filter = GetEntriesOptions {
            name: Some(name.to_string()),
            path: options.path.clone(),
        };
        let matches: Vec<Entry> = self
            .get_entries(vault_id, &filter)
            .await?
            .into_iter()
            .filter(|e| e.sub_type() == sub_type.as_str())
            .collect();

        match matches.as_slice() {
            [] => Err(DvlsError::EntryNotFound),
            [only] => self.get_by_id(vault_id, &only.id).await,
            _ => Err(DvlsError::MultipleEntriesFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_private_key_wire_names() {
        let data = CredentialData::PrivateKey(CredentialPrivateKeyData {
            username: "root".into(),
            private_key: "KEY".into(),
            passphrase: "pp".into(),
            ..Default::default()
        });
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(
            value,
            json!({
                "privateKeyOverrideUsername": "root",
                "privateKeyData": "KEY",
                "privateKeyPassPhrase": "pp"
            })
        );
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let data = CredentialData::Default(CredentialDefaultData {
            username: "u".into(),
            ..Default::default()
        });
        assert_eq!(serde_json::to_value(&data).unwrap(), json!({"username": "u"}));
    }

    #[test]
    fn test_from_value_round_trip_every_subtype() {
        for st in CredentialSubType::ALL {
            let data = CredentialData::empty(*st);
            let value = serde_json::to_value(&data).unwrap();
            let back = CredentialData::from_value(*st, value).unwrap();
            assert_eq!(back.sub_type(), *st);
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let data = CredentialApiKeyData {
            api_id: "id-1".into(),
            api_key: "very-secret".into(),
            tenant_id: "t".into(),
        };
        let debug = format!("{data:?}");
        assert!(debug.contains("id-1"));
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains(REDACTED));
    }
}
