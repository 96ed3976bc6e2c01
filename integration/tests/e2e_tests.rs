//! End-to-end tests of the DVLS client against a mock server.
//!
//! Covers session handling (stale tokens, rejected tokens), paginated
//! listings, lookups by name and the multi-step certificate upload.

use dvls::{
    CertificateDataMode, CertificateEntry, CredentialSubType, DvlsClient, DvlsError, Entry,
    GetByNameOptions, GetEntriesOptions, Vault, VaultContentType, VaultVisibility,
    entry::CredentialDefaultData,
};
use serde_json::json;
use test_utils::{
    MockDvls,
    fixtures::{self, VAULT_ID},
    mocks::TOKEN,
};
use wiremock::{
    Mock, ResponseTemplate,
    matchers::{body_partial_json, header, method, path, query_param},
};

fn entry_list_route() -> String {
    format!("/api/v1/vault/{VAULT_ID}/entry")
}

fn entry_route(id: &str) -> String {
    format!("/api/v1/vault/{VAULT_ID}/entry/{id}")
}

async fn mount_entry_listing(mock: &MockDvls) {
    mock.mount_json(
        "GET",
        &entry_list_route(),
        fixtures::page(
            vec![
                fixtures::credential_entry("e1", "db", "prod"),
                fixtures::credential_entry("e2", "db", "staging"),
                fixtures::credential_entry("e3", "api", "prod\\web"),
                fixtures::folder_entry("f1", "prod"),
                fixtures::unsupported_entry("s1"),
            ],
            1,
            1,
        ),
    )
    .await;
}

mod session {
    use super::*;

    /// A token the server no longer accepts is replaced before the request.
    #[tokio::test]
    async fn test_stale_token_triggers_login() {
        test_utils::init_test_tracing();
        let mock = MockDvls::bare().await;
        mock.mount_login(TOKEN).await;
        mock.mount_is_logged(false).await;
        mock.mount_json("GET", "/api/v1/vault/v1", fixtures::vault("v1", "Ops"))
            .await;

        let client = DvlsClient::connect(mock.config()).await.unwrap();
        let vault = client.vaults().get("v1").await.unwrap();

        assert_eq!(vault.name, "Ops");
        assert_eq!(mock.login_requests().await, 2);
        assert_eq!(client.transport().login_count().await, 2);
    }

    /// A 401 causes one refresh and one retry.
    #[tokio::test]
    async fn test_unauthorized_is_retried_once() {
        let mock = MockDvls::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/vault/v1"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(mock.server())
            .await;
        mock.mount_json("GET", "/api/v1/vault/v1", fixtures::vault("v1", "Ops"))
            .await;

        let vault = mock.client().vaults().get("v1").await.unwrap();

        assert_eq!(vault.id, "v1");
        assert_eq!(mock.login_requests().await, 2);
    }

    /// A second 401 is returned to the caller.
    #[tokio::test]
    async fn test_repeated_unauthorized_fails() {
        let mock = MockDvls::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/vault/v1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(mock.server())
            .await;

        let err = mock.client().vaults().get("v1").await.unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(401));
    }

    /// Rejected credentials surface as an authentication error.
    #[tokio::test]
    async fn test_login_without_token_fails() {
        let mock = MockDvls::bare().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tokenId": ""})))
            .mount(mock.server())
            .await;

        let err = DvlsClient::connect(mock.config()).await.unwrap_err();

        assert!(matches!(err, DvlsError::Authentication(_)), "{err:?}");
    }

    /// Concurrent first calls share a single login.
    #[tokio::test]
    async fn test_concurrent_requests_share_login() {
        let mock = MockDvls::start().await;
        mock.mount_json("GET", "/api/v1/vault/v1", fixtures::vault("v1", "Ops"))
            .await;
        let client = mock.client();

        let calls = (0..8).map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.vaults().get("v1").await })
        });
        for call in calls {
            call.await.unwrap().unwrap();
        }

        assert_eq!(mock.login_requests().await, 1);
    }
}

mod vaults {
    use super::*;

    async fn mount_two_pages(mock: &MockDvls) {
        Mock::given(method("GET"))
            .and(path("/api/v1/vault"))
            .and(query_param("pageNumber", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::page(
                vec![fixtures::vault("v1", "Ops"), fixtures::vault("v2", "Dev")],
                1,
                2,
            )))
            .expect(1)
            .mount(mock.server())
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/vault"))
            .and(query_param("pageNumber", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::page(
                vec![fixtures::vault("v3", "Ops")],
                2,
                2,
            )))
            .expect(1)
            .mount(mock.server())
            .await;
    }

    #[tokio::test]
    async fn test_list_walks_every_page() {
        let mock = MockDvls::start().await;
        mount_two_pages(&mock).await;

        let vaults = mock.client().vaults().list().await.unwrap();

        let ids: Vec<&str> = vaults.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["v1", "v2", "v3"]);
    }

    #[tokio::test]
    async fn test_list_keeps_vaults_with_unknown_settings() {
        let mock = MockDvls::start().await;
        let mut odd = fixtures::vault("v2", "Docs");
        odd["contentType"] = json!("Documents");
        odd["visibility"] = json!(null);
        mock.mount_json(
            "GET",
            "/api/v1/vault",
            fixtures::page(vec![fixtures::vault("v1", "Ops"), odd], 1, 1),
        )
        .await;

        let vault = mock.client().vaults().get_by_name("Docs").await.unwrap();

        assert_eq!(vault.content_type, VaultContentType::Other("Documents".into()));
        assert_eq!(vault.visibility, VaultVisibility::Default);
    }

    #[tokio::test]
    async fn test_get_by_name_rejects_duplicates() {
        let mock = MockDvls::start().await;
        mount_two_pages(&mock).await;

        let err = mock.client().vaults().get_by_name("Ops").await.unwrap_err();
        assert!(matches!(err, DvlsError::MultipleVaultsFound));
    }

    #[tokio::test]
    async fn test_create_sends_everything_for_default_content() {
        let mock = MockDvls::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/vault"))
            .and(body_partial_json(json!({"name": "Ops", "contentType": "Everything"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::vault("v9", "Ops")))
            .expect(1)
            .mount(mock.server())
            .await;

        let vault = Vault::new("Ops").with_content_type(VaultContentType::Default);
        let created = mock.client().vaults().new_vault(&vault).await.unwrap();

        assert_eq!(created.id, "v9");
    }

    #[tokio::test]
    async fn test_missing_vault_is_not_found() {
        let mock = MockDvls::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/vault/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(mock.server())
            .await;

        let err = mock.client().vaults().get("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }
}

mod credentials {
    use super::*;

    #[tokio::test]
    async fn test_get_by_name_matches() {
        let mock = MockDvls::start().await;
        mount_entry_listing(&mock).await;
        mock.mount_json("GET", &entry_route("e1"), fixtures::credential_entry("e1", "db", "prod"))
            .await;
        let credentials = mock.client().entries().credential();

        let err = credentials
            .get_by_name(VAULT_ID, "db", CredentialSubType::Default, &GetByNameOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DvlsError::MultipleEntriesFound));

        let err = credentials
            .get_by_name(VAULT_ID, "missing", CredentialSubType::Default, &GetByNameOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DvlsError::EntryNotFound));

        let options = GetByNameOptions {
            path: Some("prod".to_string()),
        };
        let entry = credentials
            .get_by_name(VAULT_ID, "db", CredentialSubType::Default, &options)
            .await
            .unwrap();
        assert_eq!(entry.id, "e1");
        assert_eq!(entry.credential_default_data().unwrap().password, "s3cr3t");
    }

    #[tokio::test]
    async fn test_get_entries_skips_other_kinds() {
        let mock = MockDvls::start().await;
        mount_entry_listing(&mock).await;

        let all = mock
            .client()
            .entries()
            .credential()
            .get_entries(VAULT_ID, &GetEntriesOptions::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let under_prod = mock
            .client()
            .entries()
            .credential()
            .get_entries(VAULT_ID, &GetEntriesOptions::default().with_path("prod"))
            .await
            .unwrap();
        let ids: Vec<&str> = under_prod.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["e1", "e3"]);
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let mock = MockDvls::start().await;
        Mock::given(method("POST"))
            .and(path(entry_list_route()))
            .and(header("tokenId", TOKEN))
            .and(body_partial_json(json!({"type": "Credential", "subType": "Default"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "e9"})))
            .expect(1)
            .mount(mock.server())
            .await;
        mock.mount_json("GET", &entry_route("e9"), fixtures::credential_entry("e9", "db", "prod"))
            .await;

        let credentials = mock.client().entries().credential();
        let entry = Entry::credential(
            VAULT_ID,
            "db",
            CredentialDefaultData {
                username: "svc".to_string(),
                password: "s3cr3t".to_string(),
                ..Default::default()
            },
        )
        .with_path("prod");

        let id = credentials.new_entry(&entry).await.unwrap();
        let stored = credentials.get_by_id(VAULT_ID, &id).await.unwrap();

        assert_eq!(stored.id, "e9");
        assert_eq!(stored.vault_id, VAULT_ID);
        assert_eq!(stored.to_credential_map().unwrap()["username"], "svc");
    }

    #[tokio::test]
    async fn test_get_by_id_rejects_folder() {
        let mock = MockDvls::start().await;
        mock.mount_json("GET", &entry_route("f1"), fixtures::folder_entry("f1", "prod"))
            .await;

        let err = mock
            .client()
            .entries()
            .credential()
            .get_by_id(VAULT_ID, "f1")
            .await
            .unwrap_err();
        assert!(matches!(err, DvlsError::UnsupportedEntryType { .. }), "{err:?}");
    }
}

mod connections {
    use super::*;

    #[tokio::test]
    async fn test_host_get_and_reveal() {
        let mock = MockDvls::start().await;
        mock.mount_json(
            "GET",
            "/api/connections/partial/h1",
            fixtures::connection_envelope(&fixtures::host_row("h1", "web01", "10.0.0.5")),
        )
        .await;
        mock.mount_json(
            "POST",
            "/api/connections/partial/h1/sensitive-data",
            fixtures::ok_envelope(json!({
                "data": {"passwordItem": {"hasSensitiveData": true, "sensitiveData": "hunter2"}}
            })),
        )
        .await;
        let hosts = mock.client().entries().host();

        let host = hosts.get("h1").await.unwrap();
        assert_eq!(host.details.host, "10.0.0.5");
        assert_eq!(host.tags, ["linux", "data center"]);
        assert!(host.details.password.is_none());

        let revealed = hosts.get_details(&host).await.unwrap();
        assert_eq!(revealed.details.password.as_deref(), Some("hunter2"));
    }

    #[tokio::test]
    async fn test_failed_result_code_is_an_error() {
        let mock = MockDvls::start().await;
        mock.mount_json(
            "GET",
            "/api/connections/partial/h1",
            json!({"result": 2, "message": "access denied"}),
        )
        .await;

        let err = mock.client().entries().host().get("h1").await.unwrap_err();
        assert!(matches!(err, DvlsError::ResultCode { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_certificate_file_upload() {
        let mock = MockDvls::start().await;
        Mock::given(method("POST"))
            .and(path("/api/connections/partial/save"))
            .and(body_partial_json(json!({
                "connectionType": 45,
                "data": {"dataMode": 2, "documentSize": 5, "fileName": "tls.bin"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::connection_envelope(
                &fixtures::certificate_row("c1", "tls.bin", 5),
            )))
            .expect(1)
            .mount(mock.server())
            .await;
        Mock::given(method("POST"))
            .and(path("/api/attachment/save"))
            .and(query_param("useSensitiveMode", "true"))
            .and(body_partial_json(json!({"connectionID": "c1", "size": 5})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(fixtures::ok_envelope(json!({"id": "a1"}))),
            )
            .expect(1)
            .mount(mock.server())
            .await;
        Mock::given(method("POST"))
            .and(path("/api/attachment/a1/document"))
            .and(header("content-type", "application/octet-stream"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 1})))
            .expect(1)
            .mount(mock.server())
            .await;

        let entry = CertificateEntry::new(VAULT_ID, "tls", "tls.bin").with_password("pfx-pass");
        let saved = mock
            .client()
            .entries()
            .certificate()
            .new_file(&entry, &[0x30, 0x82, 0x00, 0x01, 0x00])
            .await
            .unwrap();

        assert_eq!(saved.id, "c1");
        assert_eq!(saved.data_mode(), CertificateDataMode::File);
        assert_eq!(saved.file_size(), 5);
    }
}

mod server {
    use super::*;

    #[tokio::test]
    async fn test_public_info() {
        let mock = MockDvls::start().await;
        mock.mount_json("GET", "/api/public-instance-information", fixtures::server_info())
            .await;

        let info = mock.client().public_server_info().await.unwrap();

        assert_eq!(info.server_name, "dvls-test");
        assert_eq!(info.version, "2024.3.8.0");
        assert_eq!(info.system_message, "maintenance on sunday");
    }
}
