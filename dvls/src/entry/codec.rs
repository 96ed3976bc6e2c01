//! JSON form of [`Entry`].
//!
//! Decoding reads the outer fields and keeps `data` raw until the
//! `(type, subType)` pair has picked a payload shape.

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    ser::SerializeMap,
};
use serde_json::{Map, Value};

use super::{
    CredentialData, Entry, EntryData, EntryType, FolderSubType,
    kind::parse_credential_sub_type,
};
use crate::{
    error::{DvlsError, DvlsResult},
    time::{self, ServerTime},
};

/// Deserialize a field that the server may send as `null`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    vault_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    path: String,
    #[serde(default, deserialize_with = "time::deserialize_optional")]
    modified_on: Option<ServerTime>,
    #[serde(default, deserialize_with = "null_as_default")]
    modified_by: String,
    #[serde(default, deserialize_with = "time::deserialize_optional")]
    created_on: Option<ServerTime>,
    #[serde(default, deserialize_with = "null_as_default")]
    created_by: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    entry_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    sub_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    tags: Vec<String>,
    #[serde(default)]
    data: Value,
}

fn decode_payload(entry_type: &str, sub_type: &str, data: Value) -> DvlsResult<EntryData> {
    let unsupported = || DvlsError::unsupported_entry(entry_type, sub_type);
    let data = if data.is_null() {
        Value::Object(Map::new())
    } else {
        data
    };

    match entry_type.parse::<EntryType>().map_err(|_| unsupported())? {
        EntryType::Credential => {
            let sub_type = parse_credential_sub_type(sub_type).map_err(|_| unsupported())?;
            Ok(EntryData::Credential(CredentialData::from_value(sub_type, data)?))
        }
        EntryType::Folder => {
            let sub_type = sub_type.parse::<FolderSubType>().map_err(|_| unsupported())?;
            Ok(EntryData::Folder {
                sub_type,
                data: serde_json::from_value(data)?,
            })
        }
    }
}

impl TryFrom<RawEntry> for Entry {
    type Error = DvlsError;

    fn try_from(raw: RawEntry) -> DvlsResult<Self> {
        let data = decode_payload(&raw.entry_type, &raw.sub_type, raw.data)?;
        Ok(Self {
            id: raw.id,
            vault_id: raw.vault_id,
            name: raw.name,
            path: raw.path,
            description: raw.description,
            tags: raw.tags,
            created_on: raw.created_on,
            created_by: raw.created_by,
            modified_on: raw.modified_on,
            modified_by: raw.modified_by,
            data,
        })
    }
}

impl Entry {
    /// Decode an entry document.
    ///
    /// # Errors
    ///
    /// [`DvlsError::UnsupportedEntryType`] for an unknown `(type, subType)`
    /// pair, [`DvlsError::Serialization`] for malformed JSON.
    pub fn from_json(bytes: &[u8]) -> DvlsResult<Self> {
        let raw: RawEntry = serde_json::from_slice(bytes)?;
        raw.try_into()
    }

    /// Decode an already parsed entry document.
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_json`].
    pub fn from_value(value: Value) -> DvlsResult<Self> {
        let raw: RawEntry = serde_json::from_value(value)?;
        raw.try_into()
    }
}

impl<'de> Deserialize<'de> for Entry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawEntry::deserialize(deserializer)?;
        raw.try_into().map_err(serde::de::Error::custom)
    }
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if !self.id.is_empty() {
            map.serialize_entry("id", &self.id)?;
        }
        map.serialize_entry("vaultId", &self.vault_id)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("description", &self.description)?;
        map.serialize_entry("path", &self.path)?;
        if let Some(at) = &self.modified_on {
            map.serialize_entry("modifiedOn", at)?;
        }
        map.serialize_entry("modifiedBy", &self.modified_by)?;
        if let Some(at) = &self.created_on {
            map.serialize_entry("createdOn", at)?;
        }
        map.serialize_entry("createdBy", &self.created_by)?;
        map.serialize_entry("type", self.entry_type().as_str())?;
        map.serialize_entry("subType", self.sub_type())?;
        map.serialize_entry("tags", &self.tags)?;
        map.serialize_entry("data", &self.data)?;
        map.end()
    }
}

/// Serializes the payload alone, as the `data` member.
impl Serialize for EntryData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Credential(data) => data.serialize(serializer),
            Self::Folder { data, .. } => data.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{CredentialSubType, FolderData};
    use serde_json::json;

    #[test]
    fn test_decode_default_credential() {
        let entry = Entry::from_value(json!({
            "id": "e1",
            "vaultId": "v1",
            "name": "db",
            "path": "prod\\sql",
            "type": "Credential",
            "subType": "Default",
            "tags": ["a", "b c"],
            "modifiedOn": "2024-01-02T03:04:05.1234567",
            "data": {"username": "sa", "password": "pw"}
        }))
        .unwrap();

        assert_eq!(entry.vault_id, "v1");
        assert_eq!(entry.tags, vec!["a", "b c"]);
        assert!(entry.modified_on.is_some());
        let data = entry.credential_default_data().unwrap();
        assert_eq!(data.username, "sa");
        assert_eq!(data.password, "pw");
    }

    #[test]
    fn test_missing_subtype_is_default_credential() {
        let entry = Entry::from_value(json!({"type": "Credential", "data": null})).unwrap();
        assert_eq!(entry.sub_type(), CredentialSubType::Default.as_str());
    }

    #[test]
    fn test_null_collections() {
        let entry = Entry::from_value(json!({
            "type": "Folder", "subType": "Site", "tags": null, "description": null
        }))
        .unwrap();
        assert!(entry.tags.is_empty());
        assert_eq!(entry.folder_data(), Some(&FolderData::default()));
    }

    #[test]
    fn test_null_payload_fields_decode_as_empty() {
        let entry = Entry::from_value(json!({
            "type": "Credential",
            "subType": "Default",
            "data": {"username": "u", "password": "p", "domain": null}
        }))
        .unwrap();
        let data = entry.credential_default_data().unwrap();
        assert_eq!(data.username, "u");
        assert!(data.domain.is_empty());

        let entry = Entry::from_value(json!({
            "type": "Credential",
            "subType": "PrivateKey",
            "data": {"privateKeyData": "key", "publicKeyData": null, "privateKeyPassPhrase": null}
        }))
        .unwrap();
        let data = entry.credential_private_key_data().unwrap();
        assert_eq!(data.private_key, "key");
        assert!(data.public_key.is_empty());

        let entry = Entry::from_value(json!({
            "type": "Folder", "subType": "Server", "data": {"domain": null, "username": null}
        }))
        .unwrap();
        assert_eq!(entry.folder_data(), Some(&FolderData::default()));
    }

    #[test]
    fn test_unknown_pair_is_unsupported() {
        let err = Entry::from_value(json!({"type": "Credential", "subType": "Biometric"})).unwrap_err();
        assert_eq!(err.to_string(), "unsupported entry type (Credential/Biometric)");

        let err = Entry::from_value(json!({"type": "Document", "subType": "Pdf"})).unwrap_err();
        assert!(matches!(err, DvlsError::UnsupportedEntryType { .. }));
    }

    #[test]
    fn test_encode_derives_type_from_payload() {
        let entry = Entry::folder("v1", "ops", FolderSubType::Team, FolderData {
            domain: "corp".into(),
            username: String::new(),
        });
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "Folder");
        assert_eq!(value["subType"], "Team");
        assert_eq!(value["data"], json!({"domain": "corp"}));
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_serde_round_trip_through_bytes() {
        let entry = Entry::credential(
            "v1",
            "conn",
            crate::entry::CredentialConnectionStringData {
                connection_string: "Server=x;Password=y".into(),
            },
        )
        .with_id("e9")
        .with_tags(["x"]);
        let bytes = serde_json::to_vec(&entry).unwrap();
        assert_eq!(Entry::from_json(&bytes).unwrap(), entry);
    }
}
