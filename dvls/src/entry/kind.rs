//! Closed sets of wire names: entry types and their subtypes.

use std::str::FromStr;

use thiserror::Error;

/// A wire name that is not part of a closed set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} {value:?}")]
pub struct UnknownName {
    /// Name of the set, e.g. `credential subtype`
    pub kind: &'static str,
    /// Rejected value
    pub value: String,
}

/// Declares a fieldless enum that maps one-to-one onto string wire names.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire name.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $wire ),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::entry::kind::UnknownName;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok(Self::$variant), )+
                    other => Err($crate::entry::kind::UnknownName {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                raw.parse().map_err(::serde::de::Error::custom)
            }
        }
    };
}

wire_enum! {
    /// Top level entry kind on the v1 entry API.
    pub enum EntryType ("entry type") {
        /// Secret-bearing credential
        Credential => "Credential",
        /// Container for other entries
        Folder => "Folder",
    }
}

wire_enum! {
    /// Payload shape of a credential entry.
    pub enum CredentialSubType ("credential subtype") {
        /// Domain, user name and password
        Default => "Default",
        /// Single access code
        AccessCode => "AccessCode",
        /// API id, key and tenant
        ApiKey => "ApiKey",
        /// Azure application registration
        AzureServicePrincipal => "AzureServicePrincipal",
        /// Database or service connection string
        ConnectionString => "ConnectionString",
        /// Key pair with optional override login
        PrivateKey => "PrivateKey",
        /// WebAuthn passkey
        Passkey => "Passkey",
    }
}

wire_enum! {
    /// Label of a folder entry. All folders share one payload shape.
    pub enum FolderSubType ("folder subtype") {
        /// Company
        Company => "Company",
        /// Credentials
        Credentials => "Credentials",
        /// Customer
        Customer => "Customer",
        /// Database
        Database => "Database",
        /// Device
        Device => "Device",
        /// Domain
        Domain => "Domain",
        /// Plain folder
        Folder => "Folder",
        /// Identity
        Identity => "Identity",
        /// Macro, script and tools
        MacroScriptTools => "MacroScriptTools",
        /// Printer
        Printer => "Printer",
        /// Server
        Server => "Server",
        /// Site
        Site => "Site",
        /// Smart folder
        SmartFolder => "SmartFolder",
        /// Software
        Software => "Software",
        /// Team
        Team => "Team",
        /// Workstation
        Workstation => "Workstation",
    }
}

impl Default for CredentialSubType {
    fn default() -> Self {
        Self::Default
    }
}

impl Default for FolderSubType {
    fn default() -> Self {
        Self::Folder
    }
}

/// Resolve a credential subtype as sent by the server. The server omits the
/// subtype for default credentials.
pub(crate) fn parse_credential_sub_type(raw: &str) -> Result<CredentialSubType, UnknownName> {
    if raw.is_empty() {
        Ok(CredentialSubType::Default)
    } else {
        CredentialSubType::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_names() {
        for st in CredentialSubType::ALL {
            assert_eq!(st.as_str().parse::<CredentialSubType>().unwrap(), *st);
        }
        for st in FolderSubType::ALL {
            assert_eq!(st.to_string().parse::<FolderSubType>().unwrap(), *st);
        }
        assert_eq!(FolderSubType::ALL.len(), 16);
        assert_eq!(CredentialSubType::ALL.len(), 7);
    }

    #[test]
    fn test_unknown_name() {
        let err = "Biometric".parse::<CredentialSubType>().unwrap_err();
        assert_eq!(err.kind, "credential subtype");
        assert_eq!(err.to_string(), "unknown credential subtype \"Biometric\"");
    }

    #[test]
    fn test_empty_credential_sub_type_is_default() {
        assert_eq!(parse_credential_sub_type("").unwrap(), CredentialSubType::Default);
        assert!(parse_credential_sub_type("default").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&FolderSubType::MacroScriptTools).unwrap();
        assert_eq!(json, "\"MacroScriptTools\"");
        let back: FolderSubType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FolderSubType::MacroScriptTools);
    }
}
