//! Async client for the Devolutions Server (DVLS) REST API.
//!
//! [`DvlsClient`] logs in with an application key or a user account and keeps
//! the session token fresh. Typed services cover vaults, credential and
//! folder entries, certificate, host, SSH and website connections, file
//! attachments and instance information.
//!
//! ```no_run
//! # async fn run() -> dvls::DvlsResult<()> {
//! let client = dvls::DvlsClient::from_env().await?;
//! let vault = client.vaults().get_by_name("Operations").await?;
//! let entry = client
//!     .entries()
//!     .credential()
//!     .get_by_name(&vault.id, "db-admin", dvls::CredentialSubType::Default, &Default::default())
//!     .await?;
//! println!("{:?}", entry.to_credential_map()?.get("username"));
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod connection;
pub mod entry;
pub mod error;
pub mod http;
pub mod response;
pub mod server;
pub mod time;
pub mod transport;
pub mod vault;

pub use auth::Credentials;
pub use client::{DvlsClient, Entries};
pub use config::DvlsConfig;
pub use connection::{
    Attachment, CertificateDataMode, CertificateEntry, Connection, ConnectionType, HostDetails,
    HostEntry, SshDetails, SshEntry, WebsiteDetails, WebsiteEntry,
};
pub use entry::{
    CredentialData, CredentialSubType, Entry, EntryData, EntryType, FolderData, FolderSubType,
    GetByNameOptions, GetEntriesOptions,
};
pub use error::{DvlsError, DvlsResult};
pub use server::{ServerInfo, Timezone};
pub use time::ServerTime;
pub use vault::{Vault, VaultContentType, VaultSecurityLevel, VaultVisibility};
