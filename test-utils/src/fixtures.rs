//! Test fixtures with sample data.
//!
//! Bodies are shaped like DVLS responses so they can be mounted on a mock
//! server as-is.

use serde_json::{Value, json};

/// Application key accepted by [`crate::MockDvls`].
pub const APP_KEY: &str = "test-app-key";
/// Application secret accepted by [`crate::MockDvls`].
pub const APP_SECRET: &str = "test-app-secret";
/// Vault id used by most fixtures.
pub const VAULT_ID: &str = "00000000-0000-0000-0000-0000000000aa";

/// Default credential entry document.
#[must_use]
pub fn credential_entry(id: &str, name: &str, path: &str) -> Value {
    json!({
        "id": id,
        "vaultId": VAULT_ID,
        "name": name,
        "path": path,
        "description": null,
        "type": "Credential",
        "subType": "Default",
        "tags": ["prod"],
        "createdOn": "2024-05-01T10:00:00.0000000Z",
        "createdBy": "admin",
        "modifiedOn": "2024-05-02T11:30:00.1234567Z",
        "modifiedBy": "admin",
        "data": {"username": "svc", "password": "s3cr3t", "domain": "corp"}
    })
}

/// Folder entry document.
#[must_use]
pub fn folder_entry(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "vaultId": VAULT_ID,
        "name": name,
        "path": "",
        "type": "Folder",
        "subType": "Folder",
        "data": null
    })
}

/// Entry of a kind the client does not model.
#[must_use]
pub fn unsupported_entry(id: &str) -> Value {
    json!({
        "id": id,
        "vaultId": VAULT_ID,
        "name": "remote desktop",
        "type": "Session",
        "subType": "RDP",
        "data": {}
    })
}

/// Vault document.
#[must_use]
pub fn vault(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": "",
        "contentType": "Everything",
        "type": "Shared",
        "securityLevel": "Standard",
        "visibility": "Default"
    })
}

/// One page of a paginated listing.
#[must_use]
pub fn page(data: Vec<Value>, current_page: u32, total_page: u32) -> Value {
    let count = data.len();
    json!({
        "data": data,
        "currentPage": current_page,
        "pageSize": count,
        "totalCount": count,
        "totalPage": total_page
    })
}

/// Legacy connection row wrapped in a result envelope, with `data` as a
/// JSON string.
#[must_use]
pub fn connection_envelope(row: &Value) -> Value {
    json!({"result": 1, "data": row.to_string()})
}

/// Host connection row.
#[must_use]
pub fn host_row(id: &str, name: &str, host: &str) -> Value {
    json!({
        "id": id,
        "repositoryId": VAULT_ID,
        "name": name,
        "group": "servers",
        "keywords": "linux \"data center\"",
        "connectionType": 53,
        "data": json!({"host": host, "username": "root"}).to_string()
    })
}

/// Certificate connection row in file mode.
#[must_use]
pub fn certificate_row(id: &str, file_name: &str, size: u64) -> Value {
    json!({
        "id": id,
        "repositoryId": VAULT_ID,
        "name": "tls",
        "connectionType": 45,
        "connectionSubType": "Certificate",
        "data": json!({
            "dataMode": 2,
            "documentSize": size,
            "fileName": file_name,
            "password": {"hasSensitiveData": true}
        }).to_string()
    })
}

/// Successful result envelope with a payload.
#[must_use]
pub fn ok_envelope(data: Value) -> Value {
    json!({"result": 1, "data": data})
}

/// Public instance information envelope.
#[must_use]
pub fn server_info() -> Value {
    ok_envelope(json!({
        "AccessUri": "https://dvls.example.com",
        "SelectedTimeZoneId": "UTC",
        "ServerName": "dvls-test",
        "Version": "2024.3.8.0",
        "SystemMessage": "maintenance on sunday"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_entry_decodes() {
        let entry: dvls::Entry = serde_json::from_value(credential_entry("e1", "db", "prod")).unwrap();
        assert_eq!(entry.vault_id, VAULT_ID);
        assert_eq!(entry.credential_default_data().unwrap().username, "svc");
    }

    #[test]
    fn test_page_counts() {
        let body = page(vec![vault("v1", "a"), vault("v2", "b")], 1, 3);
        assert_eq!(body["pageSize"], 2);
        assert_eq!(body["totalPage"], 3);
    }
}
