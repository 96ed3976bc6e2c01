//! Vaults (`/api/v1/vault`).

use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    entry::null_as_default,
    error::{DvlsError, DvlsResult},
    transport::AuthenticatedTransport,
};

/// Declares an enum over string wire names that keeps names it does not
/// know in `Other`. A null value decodes as the type's default.
macro_rules! open_wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// Name this client does not know, kept as received
            Other(String),
        }

        impl $name {
            /// Wire name.
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $wire, )+
                    Self::Other(raw) => raw.as_str(),
                }
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                match raw {
                    $( $wire => Self::$variant, )+
                    other => Self::Other(other.to_string()),
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = Option::<String>::deserialize(deserializer)?;
                Ok(raw.map_or_else(Self::default, |raw| Self::from(raw.as_str())))
            }
        }
    };
}

open_wire_enum! {
    /// Who sees a vault in the vault list.
    pub enum VaultVisibility {
        /// Server default
        Default => "Default",
        /// Only members
        Private => "Never",
        /// Every user
        Public => "Everyone",
    }
}

open_wire_enum! {
    /// Protection level of a vault.
    pub enum VaultSecurityLevel {
        /// Standard
        Standard => "Standard",
        /// High
        High => "High",
    }
}

open_wire_enum! {
    /// Kinds of entries a vault accepts.
    pub enum VaultContentType {
        /// Any entry
        Everything => "Everything",
        /// Any entry; used by system vaults and rejected on creation
        Default => "Default",
        /// Secrets only
        Secrets => "Secrets",
        /// Credentials only
        Credentials => "Credentials",
        /// Business information only
        BusinessInformation => "BusinessInformation",
    }
}

impl Default for VaultVisibility {
    fn default() -> Self {
        Self::Default
    }
}

impl Default for VaultSecurityLevel {
    fn default() -> Self {
        Self::Standard
    }
}

impl Default for VaultContentType {
    fn default() -> Self {
        Self::Everything
    }
}

/// A vault.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    /// Server assigned id, empty until created
    #[serde(default, skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub id: String,
    /// Name
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Description
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Accepted entry kinds
    #[serde(default)]
    pub content_type: VaultContentType,
    /// Vault kind as reported by the server, read only
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "String::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub vault_type: String,
    /// Protection level
    #[serde(default)]
    pub security_level: VaultSecurityLevel,
    /// List visibility
    #[serde(default)]
    pub visibility: VaultVisibility,
}

impl Vault {
    /// New, not yet created vault with default settings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the accepted entry kinds.
    #[must_use]
    pub fn with_content_type(mut self, content_type: VaultContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Set the protection level.
    #[must_use]
    pub fn with_security_level(mut self, security_level: VaultSecurityLevel) -> Self {
        self.security_level = security_level;
        self
    }

    /// Set the list visibility.
    #[must_use]
    pub fn with_visibility(mut self, visibility: VaultVisibility) -> Self {
        self.visibility = visibility;
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VaultBody<'a> {
    name: &'a str,
    description: &'a str,
    content_type: &'a VaultContentType,
    security_level: &'a VaultSecurityLevel,
    visibility: &'a VaultVisibility,
}

impl<'a> From<&'a Vault> for VaultBody<'a> {
    fn from(vault: &'a Vault) -> Self {
        Self {
            name: &vault.name,
            description: &vault.description,
            content_type: &vault.content_type,
            security_level: &vault.security_level,
            visibility: &vault.visibility,
        }
    }
}

/// Vault management.
#[derive(Debug, Clone)]
pub struct VaultService {
    transport: Arc<AuthenticatedTransport>,
}

impl VaultService {
    pub(crate) const fn new(transport: Arc<AuthenticatedTransport>) -> Self {
        Self { transport }
    }

    fn vault_url(&self, id: Option<&str>) -> DvlsResult<url::Url> {
        match id {
            Some(id) => self.transport.endpoint(&["api", "v1", "vault", id]),
            None => self.transport.endpoint(&["api", "v1", "vault"]),
        }
    }

    /// Every vault visible to the caller, across all pages.
    ///
    /// # Errors
    ///
    /// Request errors from any page.
    #[instrument(skip(self))]
    pub async fn list(&self) -> DvlsResult<Vec<Vault>> {
        let url = self.vault_url(None)?;
        let vaults: Vec<Vault> = crate::entry::fetch_all_pages(&self.transport, &url).await?;
        debug!(count = vaults.len(), "Listed vaults");
        Ok(vaults)
    }

    /// Fetch one vault.
    ///
    /// # Errors
    ///
    /// Request errors; use [`DvlsError::is_not_found`] for a missing vault.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> DvlsResult<Vault> {
        require_id(id)?;
        self.transport.get_json(self.vault_url(Some(id))?).await
    }

    /// Find the single vault named `name`.
    ///
    /// # Errors
    ///
    /// [`DvlsError::VaultNotFound`] for no match,
    /// [`DvlsError::MultipleVaultsFound`] for more than one.
    #[instrument(skip(self))]
    pub async fn get_by_name(&self, name: &str) -> DvlsResult<Vault> {
        let mut matches: Vec<Vault> = self
            .list()
            .await?
            .into_iter()
            .filter(|v| v.name == name)
            .collect();

        match matches.len() {
            0 => Err(DvlsError::VaultNotFound),
            1 => Ok(matches.remove(0)),
            _ => Err(DvlsError::MultipleVaultsFound),
        }
    }

    /// Create a vault. [`VaultContentType::Default`] is sent as
    /// [`VaultContentType::Everything`].
    ///
    /// # Errors
    ///
    /// Validation error for an empty name, request errors.
    #[instrument(skip(self, vault), fields(name = %vault.name))]
    pub async fn new_vault(&self, vault: &Vault) -> DvlsResult<Vault> {
        if vault.name.is_empty() {
            return Err(DvlsError::validation("vault name is required"));
        }
        let everything = VaultContentType::Everything;
        let mut body = VaultBody::from(vault);
        if *body.content_type == VaultContentType::Default {
            body.content_type = &everything;
        }

        self.transport
            .send_json(Method::POST, self.vault_url(None)?, &body)
            .await?
            .json()
    }

    /// Replace a vault's settings.
    ///
    /// # Errors
    ///
    /// Validation error without an id, request errors.
    #[instrument(skip(self, vault), fields(id = %vault.id))]
    pub async fn update(&self, vault: &Vault) -> DvlsResult<Vault> {
        require_id(&vault.id)?;
        self.transport
            .send_json(Method::PUT, self.vault_url(Some(&vault.id))?, &VaultBody::from(vault))
            .await?
            .json()
    }

    /// Delete one vault.
    ///
    /// # Errors
    ///
    /// Request errors.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> DvlsResult<()> {
        require_id(id)?;
        self.transport
            .send_empty(Method::DELETE, self.vault_url(Some(id))?)
            .await?;
        Ok(())
    }
}

fn require_id(id: &str) -> DvlsResult<()> {
    if id.is_empty() {
        Err(DvlsError::validation("vault id is required"))
    } else {
        Ok(())
    }
}
