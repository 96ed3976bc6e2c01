use std::{marker::PhantomData, sync::Arc};

use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{Connection, ConnectionDetails, SensitiveData, envelope_data};
use crate::{
    error::{DvlsError, DvlsResult},
    response::Response,
    transport::AuthenticatedTransport,
};

pub(crate) const PARTIAL: [&str; 3] = ["api", "connections", "partial"];

/// Endpoint below `/api/connections/partial`.
pub(crate) fn partial_endpoint(
    transport: &AuthenticatedTransport,
    rest: &[&str],
) -> DvlsResult<url::Url> {
    let segments: Vec<&str> = PARTIAL.iter().chain(rest).copied().collect();
    transport.endpoint(&segments)
}

pub(crate) fn require_id(id: &str) -> DvlsResult<()> {
    if id.is_empty() {
        Err(DvlsError::validation("entry id is required"))
    } else {
        Ok(())
    }
}

/// Fetch the secret slots of a connection.
pub(crate) async fn fetch_sensitive(
    transport: &AuthenticatedTransport,
    id: &str,
) -> DvlsResult<SensitiveData> {
    #[derive(Deserialize)]
    struct Inner {
        #[serde(default)]
        data: SensitiveData,
    }

    require_id(id)?;
    let url = partial_endpoint(transport, &[id, "sensitive-data"])?;
    let response = transport.send_empty(Method::POST, url).await?;
    response.check_save_result()?;

    let inner: Inner = serde_json::from_value(envelope_data(&response.body)?)?;
    Ok(inner.data)
}

/// Get, save, delete and reveal for one connection type.
pub struct ConnectionService<D> {
    transport: Arc<AuthenticatedTransport>,
    _details: PhantomData<fn() -> D>,
}

impl<D> Clone for ConnectionService<D> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            _details: PhantomData,
        }
    }
}

impl<D> std::fmt::Debug for ConnectionService<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionService")
            .field("details", &std::any::type_name::<D>())
            .finish_non_exhaustive()
    }
}

impl<D: ConnectionDetails> ConnectionService<D> {
    pub(crate) const fn new(transport: Arc<AuthenticatedTransport>) -> Self {
        Self {
            transport,
            _details: PhantomData,
        }
    }

    fn decode(response: &Response) -> DvlsResult<Connection<D>> {
        response.check_save_result()?;
        Connection::from_value(envelope_data(&response.body)?)
    }

    /// Fetch one connection. Secret fields stay empty; see
    /// [`Self::get_details`].
    ///
    /// # Errors
    ///
    /// Request errors, [`DvlsError::ResultCode`] for a failed result and
    /// [`DvlsError::UnsupportedEntryType`] if the id names another type.
    #[instrument(skip(self), fields(connection_type = %D::CONNECTION_TYPE))]
    pub async fn get(&self, id: &str) -> DvlsResult<Connection<D>> {
        require_id(id)?;
        let url = partial_endpoint(&self.transport, &[id])?;
        let response = self.transport.send_empty(Method::GET, url).await?;
        Self::decode(&response)
    }

    /// Create a connection and return the stored result.
    ///
    /// # Errors
    ///
    /// Validation error without a vault id, request and result code errors.
    #[instrument(skip(self, entry), fields(connection_type = %D::CONNECTION_TYPE, name = %entry.name))]
    pub async fn new_entry(&self, entry: &Connection<D>) -> DvlsResult<Connection<D>> {
        if entry.vault_id.is_empty() {
            return Err(DvlsError::validation("entry must have a vault id"));
        }
        self.save(Method::POST, entry).await
    }

    /// Replace a connection and return the stored result.
    ///
    /// # Errors
    ///
    /// Validation error without an id, request and result code errors.
    #[instrument(skip(self, entry), fields(connection_type = %D::CONNECTION_TYPE, id = %entry.id))]
    pub async fn update(&self, entry: &Connection<D>) -> DvlsResult<Connection<D>> {
        require_id(&entry.id)?;
        self.save(Method::PUT, entry).await
    }

    async fn save(&self, method: Method, entry: &Connection<D>) -> DvlsResult<Connection<D>> {
        let url = partial_endpoint(&self.transport, &["save"])?;
        let response = self
            .transport
            .send_json(method, url, &entry.to_save_body()?)
            .await?;
        let saved = Self::decode(&response)?;
        debug!(id = %saved.id, "Connection saved");
        Ok(saved)
    }

    /// Delete one connection.
    ///
    /// # Errors
    ///
    /// Request and result code errors.
    #[instrument(skip(self), fields(connection_type = %D::CONNECTION_TYPE))]
    pub async fn delete(&self, id: &str) -> DvlsResult<()> {
        require_id(id)?;
        let url = partial_endpoint(&self.transport, &[id])?;
        self.transport
            .send_empty(Method::DELETE, url)
            .await?
            .check_save_result()
    }

    /// Return `entry` with its secret fields filled in.
    ///
    /// # Errors
    ///
    /// Request and result code errors, malformed sensitive data.
    #[instrument(skip(self, entry), fields(connection_type = %D::CONNECTION_TYPE, id = %entry.id))]
    pub async fn get_details(&self, entry: &Connection<D>) -> DvlsResult<Connection<D>> {
        let sensitive = fetch_sensitive(&self.transport, &entry.id).await?;
        let mut revealed = entry.clone();
        revealed.details.apply_sensitive(sensitive);
        Ok(revealed)
    }
}
