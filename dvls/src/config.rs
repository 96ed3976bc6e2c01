//! DVLS client configuration.

use std::{env, time::Duration};

use secrecy::SecretString;
use url::Url;

use crate::{
    auth::Credentials,
    error::{DvlsError, DvlsResult},
    http::HttpConfig,
};

/// Value sent as the `Client` login parameter for user logins.
pub const DEFAULT_CLIENT_NAME: &str = "Cli";

/// DVLS client configuration.
#[derive(Debug)]
pub struct DvlsConfig {
    /// Instance root, e.g. `https://dvls.example.com/`
    pub base_uri: Url,
    /// How the client logs in
    pub credentials: Credentials,
    /// HTTP transport settings
    pub http: HttpConfig,
    /// `Client` login parameter sent with user logins
    pub client_name: String,
}

impl DvlsConfig {
    /// Create a configuration for an application key pair.
    ///
    /// # Errors
    ///
    /// Returns [`DvlsError::InvalidConfig`] when `base_uri` is not an absolute URL.
    pub fn with_app_key(
        base_uri: &str,
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> DvlsResult<Self> {
        Ok(Self::new(
            parse_base_uri(base_uri)?,
            Credentials::AppKey {
                app_key: app_key.into(),
                app_secret: SecretString::from(app_secret.into()),
            },
        ))
    }

    /// Create a configuration for a user name and password.
    ///
    /// # Errors
    ///
    /// Returns [`DvlsError::InvalidConfig`] when `base_uri` is not an absolute URL.
    pub fn with_user(
        base_uri: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> DvlsResult<Self> {
        Ok(Self::new(
            parse_base_uri(base_uri)?,
            Credentials::User {
                username: username.into(),
                password: SecretString::from(password.into()),
            },
        ))
    }

    /// Create a configuration from parts.
    #[must_use]
    pub fn new(base_uri: Url, credentials: Credentials) -> Self {
        Self {
            base_uri,
            credentials,
            http: HttpConfig::default(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
        }
    }

    /// Load configuration from `DVLS_*` environment variables.
    ///
    /// Application key credentials (`DVLS_APP_KEY`, `DVLS_APP_SECRET`) win over
    /// user credentials (`DVLS_USERNAME`, `DVLS_PASSWORD`). Setting
    /// `DVLS_ACCEPT_INVALID_CERTS=true` disables certificate checks. A `.env`
    /// file in the working directory is honoured.
    ///
    /// # Errors
    ///
    /// Returns [`DvlsError::InvalidConfig`] for a missing base URI, missing
    /// credentials or an unparsable number.
    pub fn from_env() -> DvlsResult<Self> {
        dotenvy::dotenv().ok();

        let base_uri = env::var("DVLS_BASE_URI")
            .map_err(|_| DvlsError::InvalidConfig("DVLS_BASE_URI is required".to_string()))?;

        let credentials = match (env::var("DVLS_APP_KEY"), env::var("DVLS_APP_SECRET")) {
            (Ok(app_key), Ok(app_secret)) => Credentials::AppKey {
                app_key,
                app_secret: SecretString::from(app_secret),
            },
            _ => match (env::var("DVLS_USERNAME"), env::var("DVLS_PASSWORD")) {
                (Ok(username), Ok(password)) => Credentials::User {
                    username,
                    password: SecretString::from(password),
                },
                _ => {
                    return Err(DvlsError::InvalidConfig(
                        "either DVLS_APP_KEY/DVLS_APP_SECRET or DVLS_USERNAME/DVLS_PASSWORD is required"
                            .to_string(),
                    ));
                }
            },
        };

        let mut http = HttpConfig::default()
            .with_timeout(Duration::from_secs(parse_env("DVLS_TIMEOUT_SECS", 30)?))
            .with_connect_timeout(Duration::from_secs(parse_env(
                "DVLS_CONNECT_TIMEOUT_SECS",
                10,
            )?))
            .with_accept_invalid_certs(parse_env("DVLS_ACCEPT_INVALID_CERTS", false)?);
        if let Ok(user_agent) = env::var("DVLS_USER_AGENT") {
            http = http.with_user_agent(user_agent);
        }

        let config = Self {
            base_uri: parse_base_uri(&base_uri)?,
            credentials,
            http,
            client_name: env::var("DVLS_CLIENT_NAME")
                .unwrap_or_else(|_| DEFAULT_CLIENT_NAME.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Set HTTP transport settings.
    #[must_use]
    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Set request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    /// Set the `Client` login parameter.
    #[must_use]
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DvlsError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> DvlsResult<()> {
        if self.http.timeout.is_zero() || self.http.connect_timeout.is_zero() {
            return Err(DvlsError::InvalidConfig(
                "timeouts must be greater than 0".to_string(),
            ));
        }
        if self.credentials.identity().is_empty() {
            return Err(DvlsError::InvalidConfig(
                "application key or user name must not be empty".to_string(),
            ));
        }
        if !matches!(self.base_uri.scheme(), "http" | "https") {
            return Err(DvlsError::InvalidConfig(format!(
                "unsupported base URI scheme {}",
                self.base_uri.scheme()
            )));
        }
        Ok(())
    }
}

/// Parse the instance root. A trailing slash is added so relative endpoint
/// paths join below any sub-path the instance is hosted under.
fn parse_base_uri(raw: &str) -> DvlsResult<Url> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized)
        .map_err(|e| DvlsError::InvalidConfig(format!("invalid base URI {raw}: {e}")))
}

/// Parse an environment variable with a default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> DvlsResult<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|e: T::Err| DvlsError::InvalidConfig(format!("{name}: {e}"))),
        Err(_) => Ok(default),
    }
}
