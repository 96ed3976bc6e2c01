//! SSH shell connections.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use super::{
    Connection, ConnectionDetails, ConnectionService, ConnectionType, SensitiveData,
    SensitiveItem, WriteItem,
};
use crate::entry::null_as_default;

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Target, login and key material of an SSH entry.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "ReadSsh")]
pub struct SshDetails {
    /// Host name or address
    pub host: String,
    /// Port
    pub port: u16,
    /// Login name
    pub username: String,
    /// Password, `None` until revealed
    pub password: Option<String>,
    /// Private key, `None` until revealed
    pub private_key: Option<String>,
    /// Private key passphrase, `None` until revealed
    pub passphrase: Option<String>,
}

impl Default for SshDetails {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_SSH_PORT,
            username: String::new(),
            password: None,
            private_key: None,
            passphrase: None,
        }
    }
}

impl fmt::Debug for SshDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("SshDetails")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("private_key", &redact(&self.private_key))
            .field("passphrase", &redact(&self.passphrase))
            .finish()
    }
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ReadSsh {
    #[serde(alias = "Host", deserialize_with = "null_as_default")]
    host: String,
    #[serde(alias = "HostPort")]
    host_port: Option<u16>,
    #[serde(alias = "Username", alias = "userName", deserialize_with = "null_as_default")]
    username: String,
    password_item: Option<SensitiveItem>,
    private_key_data: Option<SensitiveItem>,
    private_key_pass_phrase_item: Option<SensitiveItem>,
}

impl From<ReadSsh> for SshDetails {
    fn from(raw: ReadSsh) -> Self {
        Self {
            host: raw.host,
            port: raw.host_port.filter(|p| *p != 0).unwrap_or(DEFAULT_SSH_PORT),
            username: raw.username,
            password: raw.password_item.and_then(SensitiveItem::into_value),
            private_key: raw.private_key_data.and_then(SensitiveItem::into_value),
            passphrase: raw
                .private_key_pass_phrase_item
                .and_then(SensitiveItem::into_value),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteSsh<'a> {
    host: &'a str,
    host_port: u16,
    #[serde(skip_serializing_if = "str::is_empty")]
    username: &'a str,
    password_item: WriteItem<'a>,
    private_key_data: WriteItem<'a>,
    private_key_pass_phrase_item: WriteItem<'a>,
}

impl Serialize for SshDetails {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WriteSsh {
            host: &self.host,
            host_port: self.port,
            username: &self.username,
            password_item: WriteItem::new(self.password.as_deref()),
            private_key_data: WriteItem::new(self.private_key.as_deref()),
            private_key_pass_phrase_item: WriteItem::new(self.passphrase.as_deref()),
        }
        .serialize(serializer)
    }
}

impl ConnectionDetails for SshDetails {
    const CONNECTION_TYPE: ConnectionType = ConnectionType::SshShell;

    fn apply_sensitive(&mut self, sensitive: SensitiveData) {
        self.password = sensitive.password_item.and_then(SensitiveItem::into_value);
        self.private_key = sensitive.private_key_data.and_then(SensitiveItem::into_value);
        self.passphrase = sensitive
            .private_key_pass_phrase_item
            .and_then(SensitiveItem::into_value);
    }
}

/// SSH connection entry.
pub type SshEntry = Connection<SshDetails>;

/// SSH connection service.
pub type SshService = ConnectionService<SshDetails>;
