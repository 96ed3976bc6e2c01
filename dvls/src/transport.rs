//! Authenticated request dispatcher.
//!
//! Every call goes through [`AuthenticatedTransport::request`], which makes
//! sure a live token is attached before the request leaves. A request that
//! still comes back `401` triggers one refresh and one retry. Refreshes are
//! single-flight: callers racing on a stale token share one login.

use std::sync::Arc;

use reqwest::{Client, Method, header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::{
    auth::{Authenticator, IS_LOGGED_ENDPOINT, UserProfile},
    config::DvlsConfig,
    error::{DvlsError, DvlsResult, RequestError, RequestFailure},
    http::build_http_client,
    response::{RequestOptions, Response},
};

const DEFAULT_CONTENT_TYPE: &str = "application/json";

#[derive(Default)]
struct TokenState {
    token: Option<SecretString>,
    generation: u64,
    user: Option<UserProfile>,
}

/// Shared HTTP transport that keeps a session token alive.
pub struct AuthenticatedTransport {
    http: Client,
    base_uri: Url,
    authenticator: Box<dyn Authenticator>,
    state: RwLock<TokenState>,
    refresh_lock: Mutex<()>,
}

impl std::fmt::Debug for AuthenticatedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedTransport")
            .field("base_uri", &self.base_uri.as_str())
            .field("authenticator", &self.authenticator)
            .finish_non_exhaustive()
    }
}

impl AuthenticatedTransport {
    /// Build a transport from configuration. No request is sent.
    ///
    /// # Errors
    ///
    /// Returns [`DvlsError::InvalidConfig`] when validation fails or the HTTP
    /// client cannot be built.
    pub fn new(config: DvlsConfig) -> DvlsResult<Self> {
        config.validate()?;
        let http = build_http_client(&config.http)
            .map_err(|e| DvlsError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(
            http,
            config.base_uri,
            config.credentials.into_authenticator(config.client_name),
        ))
    }

    /// Build a transport around an existing client and authenticator.
    #[must_use]
    pub fn with_client(http: Client, base_uri: Url, authenticator: Box<dyn Authenticator>) -> Self {
        Self {
            http,
            base_uri,
            authenticator,
            state: RwLock::new(TokenState::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Instance root all endpoint paths are joined to.
    #[must_use]
    pub const fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    /// Resolve an endpoint path against the instance root.
    ///
    /// # Errors
    ///
    /// Returns [`DvlsError::Url`] if the path cannot be joined.
    pub fn url(&self, path: &str) -> DvlsResult<Url> {
        Ok(self.base_uri.join(path.trim_start_matches('/'))?)
    }

    /// Resolve an endpoint from path segments, percent-encoding each one.
    ///
    /// # Errors
    ///
    /// Returns [`DvlsError::InvalidConfig`] if the base URI cannot carry a path.
    pub fn endpoint(&self, segments: &[&str]) -> DvlsResult<Url> {
        let mut url = self.base_uri.clone();
        url.path_segments_mut()
            .map_err(|()| DvlsError::InvalidConfig(format!("{} cannot be a base URI", self.base_uri)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Profile of the logged in user, for user logins.
    pub async fn user(&self) -> Option<UserProfile> {
        self.state.read().await.user.clone()
    }

    /// Number of successful logins so far.
    pub async fn login_count(&self) -> u64 {
        self.state.read().await.generation
    }

    /// Log in now, replacing any current token.
    ///
    /// # Errors
    ///
    /// Propagates the authenticator's error.
    pub async fn login(&self) -> DvlsResult<()> {
        let seen = self.state.read().await.generation;
        self.refresh(seen).await
    }

    /// Ask the server whether the current token is still valid.
    ///
    /// # Errors
    ///
    /// Returns a request error if the liveness endpoint cannot be reached or
    /// answers with an error status.
    #[instrument(skip(self))]
    pub async fn is_logged(&self) -> DvlsResult<bool> {
        let Some(token) = self.current_token().await.0 else {
            return Ok(false);
        };
        let url = self.url(IS_LOGGED_ENDPOINT)?;
        match self
            .send_once(&Method::GET, &url, &token, None, &RequestOptions::raw())
            .await
        {
            Ok(response) => Ok(response.text().trim() != "false"),
            Err(err) if err.is_unauthorized() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Send an authenticated request.
    ///
    /// # Errors
    ///
    /// Returns a [`RequestError`] for transport failures, statuses other than
    /// 200/201 and undecodable bodies.
    #[instrument(skip(self, method, url, body, options), fields(method = %method, url = %url))]
    pub async fn request(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
        options: RequestOptions,
    ) -> DvlsResult<Response> {
        let (token, generation) = self.ensure_token(&url).await?;

        match self
            .send_once(&method, &url, &token, body.as_deref(), &options)
            .await
        {
            Err(err) if err.is_unauthorized() => {
                warn!("Token rejected, refreshing and retrying once");
                self.refresh(generation)
                    .await
                    .map_err(|e| login_error(&url, &e))?;
                let (token, _) = self.current_token().await;
                let token = token.ok_or_else(|| DvlsError::auth_failed("no token after refresh"))?;
                self.send_once(&method, &url, &token, body.as_deref(), &options)
                    .await
            }
            other => other,
        }
    }

    /// GET and decode the whole body.
    ///
    /// # Errors
    ///
    /// See [`Self::request`]; also fails if the body does not decode.
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> DvlsResult<T> {
        self.request(Method::GET, url, None, RequestOptions::default())
            .await?
            .json()
    }

    /// Send a JSON body.
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> DvlsResult<Response> {
        let bytes = serde_json::to_vec(body)?;
        self.request(method, url, Some(bytes), RequestOptions::default())
            .await
    }

    /// Send a request without a body.
    ///
    /// # Errors
    ///
    /// See [`Self::request`].
    pub async fn send_empty(&self, method: Method, url: Url) -> DvlsResult<Response> {
        self.request(method, url, None, RequestOptions::default())
            .await
    }

    async fn current_token(&self) -> (Option<String>, u64) {
        let state = self.state.read().await;
        (
            state
                .token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
            state.generation,
        )
    }

    /// Return a live token, logging in first if there is none or the server
    /// reports the current one as stale.
    async fn ensure_token(&self, url: &Url) -> DvlsResult<(String, u64)> {
        let (token, generation) = self.current_token().await;
        let live = match token {
            Some(_) => self.is_logged().await.map_err(|e| {
                DvlsError::from(RequestError::new(
                    url.as_str(),
                    RequestFailure::Login(format!("failed to fetch login status: {e}")),
                ))
            })?,
            None => false,
        };

        if !live {
            self.refresh(generation)
                .await
                .map_err(|e| login_error(url, &e))?;
        }

        match self.current_token().await {
            (Some(token), generation) => Ok((token, generation)),
            (None, _) => Err(DvlsError::auth_failed("no token after login")),
        }
    }

    /// Log in unless another caller already replaced the token we saw.
    async fn refresh(&self, seen_generation: u64) -> DvlsResult<()> {
        let _guard = self.refresh_lock.lock().await;
        if self.state.read().await.generation != seen_generation {
            debug!("Token already refreshed by a concurrent caller");
            return Ok(());
        }

        let session = self.authenticator.login(&self.http, &self.base_uri).await?;

        let mut state = self.state.write().await;
        state.token = Some(session.token);
        state.user = session.user;
        state.generation += 1;
        info!(generation = state.generation, "Logged in to DVLS");
        Ok(())
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        token: &str,
        body: Option<&[u8]>,
        options: &RequestOptions,
    ) -> DvlsResult<Response> {
        let content_type = options
            .content_type
            .as_deref()
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(header::CONTENT_TYPE, content_type)
            .header("tokenId", token);
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        debug!(%method, %url, "Sending request");
        let response = request
            .send()
            .await
            .map_err(|e| RequestError::new(url.as_str(), RequestFailure::Transport(e)))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RequestError::new(url.as_str(), RequestFailure::Body(e)))?
            .to_vec();

        if !matches!(status, 200 | 201) {
            warn!(status, %url, "Request failed");
            return Err(RequestError::unexpected_status(url.as_str(), status, bytes).into());
        }

        Response::parse(bytes, options.raw_body)
            .map_err(|e| RequestError::new(url.as_str(), RequestFailure::Decode(e)).into())
    }
}

fn login_error(url: &Url, err: &DvlsError) -> DvlsError {
    match err {
        DvlsError::Authentication(msg) => DvlsError::Authentication(msg.clone()),
        other => RequestError::new(
            url.as_str(),
            RequestFailure::Login(other.to_string()),
        )
        .into(),
    }
}

/// Cheap handle to a shared transport.
pub type SharedTransport = Arc<AuthenticatedTransport>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Session;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingAuthenticator {
        logins: AtomicUsize,
    }

    #[async_trait]
    impl Authenticator for CountingAuthenticator {
        async fn login(&self, _http: &Client, _base_uri: &Url) -> DvlsResult<Session> {
            let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Session {
                token: SecretString::from(format!("token-{n}")),
                user: None,
            })
        }
    }

    fn transport() -> AuthenticatedTransport {
        AuthenticatedTransport::with_client(
            Client::new(),
            Url::parse("https://dvls.local/sub/").unwrap(),
            Box::new(CountingAuthenticator::default()),
        )
    }

    #[test]
    fn test_url_joins_below_base_path() {
        let t = transport();
        assert_eq!(
            t.url("/api/v1/vault").unwrap().as_str(),
            "https://dvls.local/sub/api/v1/vault"
        );
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let t = transport();
        assert_eq!(
            t.endpoint(&["api", "v1", "vault", "a b/c"]).unwrap().as_str(),
            "https://dvls.local/sub/api/v1/vault/a%20b%2Fc"
        );
    }

    #[tokio::test]
    async fn test_stale_generation_skips_second_login() {
        let t = transport();
        t.refresh(0).await.unwrap();
        // A caller that saw generation 0 must not log in again.
        t.refresh(0).await.unwrap();
        assert_eq!(t.login_count().await, 1);
        assert_eq!(t.current_token().await.0.as_deref(), Some("token-1"));
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_login() {
        let t = Arc::new(transport());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let t = Arc::clone(&t);
                tokio::spawn(async move { t.refresh(0).await })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(t.login_count().await, 1);
    }

    #[tokio::test]
    async fn test_is_logged_without_token() {
        let t = transport();
        assert!(!t.is_logged().await.unwrap());
    }
}
