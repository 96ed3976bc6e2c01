//! Website connections.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use super::{
    Connection, ConnectionDetails, ConnectionService, ConnectionType, PascalWriteItem,
    SensitiveData, SensitiveItem,
};
use crate::entry::null_as_default;

/// Address and login of a website entry.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "ReadWebsite")]
pub struct WebsiteDetails {
    /// Site address
    pub url: String,
    /// Login name
    pub username: String,
    /// Password, `None` until revealed
    pub password: Option<String>,
    /// Browser the site opens with, as the server numbers them
    pub web_browser_application: i32,
}

impl fmt::Debug for WebsiteDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebsiteDetails")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("web_browser_application", &self.web_browser_application)
            .finish()
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct ReadWebsite {
    #[serde(rename = "URL", alias = "Url", alias = "url", deserialize_with = "null_as_default")]
    url: String,
    #[serde(rename = "Username", alias = "UserName", alias = "username", deserialize_with = "null_as_default")]
    username: String,
    #[serde(rename = "WebBrowserApplication", alias = "webBrowserApplication", deserialize_with = "null_as_default")]
    web_browser_application: i32,
}

impl From<ReadWebsite> for WebsiteDetails {
    fn from(raw: ReadWebsite) -> Self {
        Self {
            url: raw.url,
            username: raw.username,
            password: None,
            web_browser_application: raw.web_browser_application,
        }
    }
}

#[derive(Serialize)]
struct WriteWebsite<'a> {
    #[serde(rename = "URL")]
    url: &'a str,
    #[serde(rename = "Username")]
    username: &'a str,
    #[serde(rename = "WebBrowserApplication")]
    web_browser_application: i32,
    #[serde(rename = "PasswordItem")]
    password_item: PascalWriteItem<'a>,
}

impl Serialize for WebsiteDetails {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WriteWebsite {
            url: &self.url,
            username: &self.username,
            web_browser_application: self.web_browser_application,
            password_item: PascalWriteItem::new(self.password.as_deref()),
        }
        .serialize(serializer)
    }
}

impl ConnectionDetails for WebsiteDetails {
    const CONNECTION_TYPE: ConnectionType = ConnectionType::WebBrowser;

    fn apply_sensitive(&mut self, sensitive: SensitiveData) {
        self.password = sensitive.password_item.and_then(SensitiveItem::into_value);
    }
}

/// Website connection entry.
pub type WebsiteEntry = Connection<WebsiteDetails>;

/// Website connection service.
pub type WebsiteService = ConnectionService<WebsiteDetails>;
