//! DVLS client facade.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    auth::UserProfile,
    config::DvlsConfig,
    connection::{AttachmentService, CertificateService, HostService, SshService, WebsiteService},
    entry::{CredentialService, EntryApi, FolderService},
    error::DvlsResult,
    server::{ServerInfo, ServerService, Timezone},
    transport::AuthenticatedTransport,
    vault::VaultService,
};

/// Client for one DVLS instance.
///
/// Cloning is cheap; clones share the HTTP pool and the session token.
#[derive(Debug, Clone)]
pub struct DvlsClient {
    transport: Arc<AuthenticatedTransport>,
}

impl DvlsClient {
    /// Build a client and log in.
    ///
    /// # Errors
    ///
    /// Configuration errors, and the login error if the credentials are
    /// rejected.
    #[instrument(skip(config), fields(base_uri = %config.base_uri, identity = %config.credentials.identity()))]
    pub async fn connect(config: DvlsConfig) -> DvlsResult<Self> {
        let client = Self::new(config)?;
        client.transport.login().await?;
        info!("DVLS client connected");
        Ok(client)
    }

    /// Build a client without contacting the server. The first request logs
    /// in.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DvlsError::InvalidConfig`] for an unusable configuration.
    pub fn new(config: DvlsConfig) -> DvlsResult<Self> {
        Ok(Self::from_transport(Arc::new(AuthenticatedTransport::new(config)?)))
    }

    /// Build a client from `DVLS_*` environment variables and log in.
    ///
    /// # Errors
    ///
    /// See [`DvlsConfig::from_env`] and [`DvlsClient::connect`].
    pub async fn from_env() -> DvlsResult<Self> {
        Self::connect(DvlsConfig::from_env()?).await
    }

    /// Wrap an existing transport.
    #[must_use]
    pub const fn from_transport(transport: Arc<AuthenticatedTransport>) -> Self {
        Self { transport }
    }

    /// Underlying transport, for endpoints without a typed wrapper.
    #[must_use]
    pub const fn transport(&self) -> &Arc<AuthenticatedTransport> {
        &self.transport
    }

    /// Profile of the logged in user, for user logins.
    pub async fn user(&self) -> Option<UserProfile> {
        self.transport.user().await
    }

    /// Whether the current token is still accepted.
    ///
    /// # Errors
    ///
    /// Request errors from the liveness endpoint.
    pub async fn is_logged(&self) -> DvlsResult<bool> {
        self.transport.is_logged().await
    }

    /// Entry services grouped by kind.
    #[must_use]
    pub fn entries(&self) -> Entries {
        Entries {
            transport: Arc::clone(&self.transport),
        }
    }

    /// Vault management.
    #[must_use]
    pub fn vaults(&self) -> VaultService {
        VaultService::new(Arc::clone(&self.transport))
    }

    /// Attachment registration and upload.
    #[must_use]
    pub fn attachments(&self) -> AttachmentService {
        AttachmentService::new(Arc::clone(&self.transport))
    }

    /// Instance metadata.
    #[must_use]
    pub fn server(&self) -> ServerService {
        ServerService::new(Arc::clone(&self.transport))
    }

    /// Information shown on the login page.
    ///
    /// # Errors
    ///
    /// See [`ServerService::public_info`].
    pub async fn public_server_info(&self) -> DvlsResult<ServerInfo> {
        self.server().public_info().await
    }

    /// Information for logged in callers.
    ///
    /// # Errors
    ///
    /// See [`ServerService::private_info`].
    pub async fn private_server_info(&self) -> DvlsResult<ServerInfo> {
        self.server().private_info().await
    }

    /// Time zone catalog.
    ///
    /// # Errors
    ///
    /// See [`ServerService::timezones`].
    pub async fn server_timezones(&self) -> DvlsResult<Vec<Timezone>> {
        self.server().timezones().await
    }
}

/// Entry services sharing one transport.
#[derive(Debug, Clone)]
pub struct Entries {
    transport: Arc<AuthenticatedTransport>,
}

impl Entries {
    /// Credential entries.
    #[must_use]
    pub fn credential(&self) -> CredentialService {
        CredentialService::new(EntryApi::new(Arc::clone(&self.transport)))
    }

    /// Folder entries.
    #[must_use]
    pub fn folder(&self) -> FolderService {
        FolderService::new(EntryApi::new(Arc::clone(&self.transport)))
    }

    /// Certificate entries.
    #[must_use]
    pub fn certificate(&self) -> CertificateService {
        CertificateService::new(Arc::clone(&self.transport))
    }

    /// Host connections.
    #[must_use]
    pub fn host(&self) -> HostService {
        HostService::new(Arc::clone(&self.transport))
    }

    /// SSH connections.
    #[must_use]
    pub fn ssh(&self) -> SshService {
        SshService::new(Arc::clone(&self.transport))
    }

    /// Website connections.
    #[must_use]
    pub fn website(&self) -> WebsiteService {
        WebsiteService::new(Arc::clone(&self.transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> DvlsClient {
        let config = DvlsConfig::with_app_key("https://dvls.local/", "key", "secret").unwrap();
        DvlsClient::new(config).unwrap()
    }

    #[test]
    fn test_clones_share_transport() {
        let a = client();
        let b = a.clone();
        assert!(Arc::ptr_eq(a.transport(), b.transport()));
    }

    #[tokio::test]
    async fn test_new_does_not_log_in() {
        let client = client();
        assert_eq!(client.transport().login_count().await, 0);
        assert!(!client.is_logged().await.unwrap());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = DvlsConfig::with_app_key("https://dvls.local/", "", "secret").unwrap();
        assert!(DvlsClient::new(config).is_err());
    }
}
