//! Mock DVLS server for testing.
//!
//! [`MockDvls`] wraps a wiremock server with the login and liveness routes
//! already mounted, so tests only declare the endpoints they exercise.

use dvls::{DvlsClient, DvlsConfig};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, header, method, path},
};

use crate::fixtures::{APP_KEY, APP_SECRET};

/// Token handed out by the mock login route.
pub const TOKEN: &str = "mock-token";

/// Mock DVLS instance.
pub struct MockDvls {
    server: MockServer,
}

impl MockDvls {
    /// Start a server accepting [`APP_KEY`] and reporting every token as live.
    pub async fn start() -> Self {
        let mock = Self::bare().await;
        mock.mount_login(TOKEN).await;
        mock.mount_is_logged(true).await;
        mock
    }

    /// Start a server with no routes at all.
    pub async fn bare() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// The wiremock server, for mounting endpoint mocks.
    #[must_use]
    pub const fn server(&self) -> &MockServer {
        &self.server
    }

    /// Instance root to configure a client with.
    #[must_use]
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Client configuration with the accepted application key.
    ///
    /// # Panics
    ///
    /// If the mock server URI does not parse.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn config(&self) -> DvlsConfig {
        DvlsConfig::with_app_key(&self.uri(), APP_KEY, APP_SECRET).expect("mock server URI")
    }

    /// Client that has not logged in yet.
    ///
    /// # Panics
    ///
    /// If the client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn client(&self) -> DvlsClient {
        DvlsClient::new(self.config()).expect("client for mock server")
    }

    /// Answer application key logins with `token`.
    pub async fn mount_login(&self, token: &str) {
        Mock::given(method("POST"))
            .and(path("/api/v1/login"))
            .and(body_string_contains(APP_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tokenId": token})))
            .mount(&self.server)
            .await;
    }

    /// Answer liveness checks with `live`.
    pub async fn mount_is_logged(&self, live: bool) {
        Mock::given(method("GET"))
            .and(path("/api/is-logged"))
            .respond_with(ResponseTemplate::new(200).set_body_string(live.to_string()))
            .mount(&self.server)
            .await;
    }

    /// Answer `verb path` with a JSON body, only for requests carrying `token`.
    pub async fn mount_json(&self, verb: &str, route: &str, body: Value) {
        Mock::given(method(verb))
            .and(path(route))
            .and(header("tokenId", TOKEN))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Number of login requests received so far.
    pub async fn login_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path().ends_with("login"))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_logs_in_against_mock() {
        let mock = MockDvls::start().await;
        let client = DvlsClient::connect(mock.config()).await.unwrap();

        assert!(client.is_logged().await.unwrap());
        assert_eq!(mock.login_requests().await, 1);
    }
}
