//! Login flows.
//!
//! An [`Authenticator`] exchanges long-lived credentials for a session token.
//! The transport calls it on first use and whenever the token goes stale.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::{
    error::{DvlsError, DvlsResult, RequestError, RequestFailure},
    response::Response,
};

/// Application key login endpoint.
pub const APP_KEY_LOGIN_ENDPOINT: &str = "api/v1/login";
/// User login endpoint.
pub const USER_LOGIN_ENDPOINT: &str = "api/login";
/// Token liveness endpoint.
pub const IS_LOGGED_ENDPOINT: &str = "api/is-logged";

/// Long-lived credentials used to obtain a token.
pub enum Credentials {
    /// Application key pair
    AppKey {
        /// Application key
        app_key: String,
        /// Application secret
        app_secret: SecretString,
    },
    /// Interactive user account
    User {
        /// Account name
        username: String,
        /// Account password
        password: SecretString,
    },
}

impl Credentials {
    /// Non-secret half of the credentials.
    #[must_use]
    pub fn identity(&self) -> &str {
        match self {
            Self::AppKey { app_key, .. } => app_key,
            Self::User { username, .. } => username,
        }
    }

    /// Build the authenticator matching these credentials.
    #[must_use]
    pub fn into_authenticator(self, client_name: String) -> Box<dyn Authenticator> {
        match self {
            Self::AppKey {
                app_key,
                app_secret,
            } => Box::new(AppKeyAuthenticator::new(app_key, app_secret)),
            Self::User { username, password } => {
                Box::new(UserAuthenticator::new(username, password, client_name))
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AppKey { app_key, .. } => f
                .debug_struct("AppKey")
                .field("app_key", app_key)
                .field("app_secret", &"[REDACTED]")
                .finish(),
            Self::User { username, .. } => f
                .debug_struct("User")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Profile of the account behind a user login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    /// Account id
    pub id: String,
    /// Login name
    #[serde(alias = "userName")]
    pub name: String,
    /// Display name
    pub display_name: String,
    /// E-mail address
    pub email: String,
    /// Account kind as reported by the server
    pub user_type: String,
}

/// Outcome of a successful login.
pub struct Session {
    /// Token sent in the `tokenId` header
    pub token: SecretString,
    /// Profile, for user logins
    pub user: Option<UserProfile>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// Exchanges credentials for a session token.
#[async_trait]
pub trait Authenticator: Send + Sync + fmt::Debug {
    /// Log in against the instance rooted at `base_uri`.
    async fn login(&self, http: &Client, base_uri: &Url) -> DvlsResult<Session>;
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(rename = "tokenId", alias = "TokenId", default)]
    token_id: String,
    #[serde(default)]
    data: Option<UserProfile>,
}

/// Application key login (`POST /api/v1/login`, form encoded).
pub struct AppKeyAuthenticator {
    app_key: String,
    app_secret: SecretString,
}

impl AppKeyAuthenticator {
    /// Create an authenticator for an application key pair.
    #[must_use]
    pub const fn new(app_key: String, app_secret: SecretString) -> Self {
        Self {
            app_key,
            app_secret,
        }
    }
}

impl fmt::Debug for AppKeyAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppKeyAuthenticator")
            .field("app_key", &self.app_key)
            .field("app_secret", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl Authenticator for AppKeyAuthenticator {
    #[instrument(skip(self, http), fields(app_key = %self.app_key))]
    async fn login(&self, http: &Client, base_uri: &Url) -> DvlsResult<Session> {
        let url = base_uri.join(APP_KEY_LOGIN_ENDPOINT)?;
        let request = http.post(url.clone()).form(&[
            ("AppKey", self.app_key.as_str()),
            ("AppSecret", self.app_secret.expose_secret()),
        ]);

        let response = send_login(request, &url).await?;
        let login: LoginResponse = response.json()?;
        if login.token_id.is_empty() {
            return Err(DvlsError::auth_failed(login_failure_message(&response)));
        }

        debug!("Application key login succeeded");
        Ok(Session {
            token: SecretString::from(login.token_id),
            user: None,
        })
    }
}

#[derive(Serialize)]
struct UserLoginBody<'a> {
    #[serde(rename = "userName")]
    username: &'a str,
    #[serde(rename = "LoginParameters")]
    parameters: UserLoginParameters<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct UserLoginParameters<'a> {
    password: &'a str,
    client: &'a str,
    version: &'a str,
}

/// User name and password login (`POST /api/login`, JSON).
pub struct UserAuthenticator {
    username: String,
    password: SecretString,
    client_name: String,
}

impl UserAuthenticator {
    /// Create an authenticator for a user account.
    #[must_use]
    pub const fn new(username: String, password: SecretString, client_name: String) -> Self {
        Self {
            username,
            password,
            client_name,
        }
    }
}

impl fmt::Debug for UserAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAuthenticator")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("client_name", &self.client_name)
            .finish()
    }
}

#[async_trait]
impl Authenticator for UserAuthenticator {
    #[instrument(skip(self, http), fields(username = %self.username))]
    async fn login(&self, http: &Client, base_uri: &Url) -> DvlsResult<Session> {
        let url = base_uri.join(USER_LOGIN_ENDPOINT)?;
        let body = UserLoginBody {
            username: &self.username,
            parameters: UserLoginParameters {
                password: self.password.expose_secret(),
                client: &self.client_name,
                version: env!("CARGO_PKG_VERSION"),
            },
        };

        let response = send_login(http.post(url.clone()).json(&body), &url).await?;
        let login: LoginResponse = response.json()?;
        if login.token_id.is_empty() {
            return Err(DvlsError::auth_failed(login_failure_message(&response)));
        }

        debug!("User login succeeded");
        Ok(Session {
            token: SecretString::from(login.token_id),
            user: login.data,
        })
    }
}

async fn send_login(request: reqwest::RequestBuilder, url: &Url) -> DvlsResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| RequestError::new(url.as_str(), RequestFailure::Transport(e)))?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| RequestError::new(url.as_str(), RequestFailure::Body(e)))?
        .to_vec();

    if !matches!(status.as_u16(), 200 | 201) {
        return Err(DvlsError::auth_failed(format!(
            "login rejected with status {status}: {}",
            String::from_utf8_lossy(&body)
        )));
    }

    Response::parse(body, false)
        .map_err(|e| RequestError::new(url.as_str(), RequestFailure::Decode(e)).into())
}

fn login_failure_message(response: &Response) -> String {
    if response.message.is_empty() {
        format!("no token returned (result {})", response.result)
    } else {
        format!("no token returned (result {}): {}", response.result, response.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts() {
        let creds = Credentials::AppKey {
            app_key: "key".to_string(),
            app_secret: SecretString::from("s3cr3t".to_string()),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("key"));
        assert!(!debug.contains("s3cr3t"));
    }

    #[test]
    fn test_user_login_body_shape() {
        let body = UserLoginBody {
            username: "alice",
            parameters: UserLoginParameters {
                password: "pw",
                client: "Cli",
                version: "1.0.0",
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["userName"], "alice");
        assert_eq!(json["LoginParameters"]["Password"], "pw");
        assert_eq!(json["LoginParameters"]["Client"], "Cli");
    }

    #[test]
    fn test_login_response_accepts_both_casings() {
        let lower: LoginResponse = serde_json::from_str(r#"{"tokenId":"abc"}"#).unwrap();
        let upper: LoginResponse = serde_json::from_str(r#"{"TokenId":"abc"}"#).unwrap();
        assert_eq!(lower.token_id, "abc");
        assert_eq!(upper.token_id, "abc");
    }

    #[test]
    fn test_user_profile_decodes() {
        let login: LoginResponse = serde_json::from_str(
            r#"{"tokenId":"t","data":{"id":"1","userName":"alice","displayName":"Alice","email":"a@x","userType":"Admin"}}"#,
        )
        .unwrap();
        let user = login.data.unwrap();
        assert_eq!(user.name, "alice");
        assert_eq!(user.display_name, "Alice");
    }
}
