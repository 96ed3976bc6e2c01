//! Host connections.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use super::{
    Connection, ConnectionDetails, ConnectionService, ConnectionType, PascalWriteItem,
    SensitiveData,
};
use crate::entry::null_as_default;

/// Target and login of a host entry.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "ReadHost")]
pub struct HostDetails {
    /// Host name or address
    pub host: String,
    /// Login name
    pub username: String,
    /// Password, `None` until revealed
    pub password: Option<String>,
}

impl fmt::Debug for HostDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostDetails")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct ReadHost {
    #[serde(rename = "Host", alias = "host", deserialize_with = "null_as_default")]
    host: String,
    #[serde(rename = "UserName", alias = "Username", alias = "username", alias = "userName", deserialize_with = "null_as_default")]
    username: String,
}

impl From<ReadHost> for HostDetails {
    fn from(raw: ReadHost) -> Self {
        Self {
            host: raw.host,
            username: raw.username,
            password: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct WriteHost<'a> {
    host: &'a str,
    user_name: &'a str,
    password_item: PascalWriteItem<'a>,
}

impl Serialize for HostDetails {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WriteHost {
            host: &self.host,
            user_name: &self.username,
            password_item: PascalWriteItem::new(self.password.as_deref()),
        }
        .serialize(serializer)
    }
}

impl ConnectionDetails for HostDetails {
    const CONNECTION_TYPE: ConnectionType = ConnectionType::Host;

    fn apply_sensitive(&mut self, sensitive: SensitiveData) {
        self.password = sensitive.password_item.and_then(super::SensitiveItem::into_value);
    }
}

/// Host connection entry.
pub type HostEntry = Connection<HostDetails>;

/// Host connection service.
pub type HostService = ConnectionService<HostDetails>;
