//! Shared proptest generators for DVLS domain types.

use dvls::{
    CredentialData, Entry, FolderData, FolderSubType, Vault, VaultContentType,
    VaultSecurityLevel, VaultVisibility,
    entry::{
        CredentialAccessCodeData, CredentialApiKeyData, CredentialAzureServicePrincipalData,
        CredentialConnectionStringData, CredentialDefaultData, CredentialPasskeyData,
        CredentialPrivateKeyData,
    },
};
use proptest::prelude::*;

/// Generate server style ids.
pub fn id_strategy() -> impl Strategy<Value = String> {
    any::<u128>().prop_map(|n| uuid::Uuid::from_u128(n).to_string())
}

/// Generate entry and vault names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 _-]{0,23}".prop_map(|s| s.trim_end().to_string())
}

/// Generate secret values.
pub fn secret_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9!@#$%^&*]{16,48}"
}

/// Generate folder paths separated by backslashes, possibly empty.
pub fn path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9]{1,8}", 0..4).prop_map(|segments| segments.join("\\"))
}

/// Generate tags, some containing a space.
pub fn tag_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z0-9]{1,10}",
        ("[a-z0-9]{1,6}", "[a-z0-9]{1,6}").prop_map(|(a, b)| format!("{a} {b}")),
    ]
}

/// Generate credential payloads with a single secret field.
pub fn credential_data_strategy() -> impl Strategy<Value = CredentialData> {
    prop_oneof![
        ("[a-z]{0,8}", secret_strategy(), "[a-z]{1,12}").prop_map(|(domain, password, username)| {
            CredentialData::from(CredentialDefaultData {
                domain,
                password,
                username,
            })
        }),
        secret_strategy().prop_map(|password| CredentialData::from(CredentialAccessCodeData { password })),
        ("[a-z0-9]{8}", secret_strategy(), "[a-z0-9]{0,8}").prop_map(|(api_id, api_key, tenant_id)| {
            CredentialData::from(CredentialApiKeyData {
                api_id,
                api_key,
                tenant_id,
            })
        }),
        ("[a-z0-9]{8}", secret_strategy(), "[a-z0-9]{8}").prop_map(
            |(client_id, client_secret, tenant_id)| {
                CredentialData::from(CredentialAzureServicePrincipalData {
                    client_id,
                    client_secret,
                    tenant_id,
                })
            }
        ),
        secret_strategy().prop_map(|connection_string| {
            CredentialData::from(CredentialConnectionStringData { connection_string })
        }),
        ("[a-z]{1,8}", secret_strategy()).prop_map(|(username, private_key)| {
            CredentialData::from(CredentialPrivateKeyData {
                username,
                private_key,
                ..CredentialPrivateKeyData::default()
            })
        }),
        (secret_strategy(), "[a-z]{3,10}").prop_map(|(private_key, rp_id)| {
            CredentialData::from(CredentialPasskeyData { private_key, rp_id })
        }),
    ]
}

/// Generate credential entries that were already created.
pub fn credential_entry_strategy() -> impl Strategy<Value = Entry> {
    (
        id_strategy(),
        id_strategy(),
        name_strategy(),
        path_strategy(),
        prop::collection::vec(tag_strategy(), 0..4),
        credential_data_strategy(),
    )
        .prop_map(|(id, vault_id, name, path, tags, data)| {
            Entry::credential(vault_id, name, data)
                .with_id(id)
                .with_path(path)
                .with_tags(tags)
        })
}

/// Generate folder entries that were already created.
pub fn folder_entry_strategy() -> impl Strategy<Value = Entry> {
    (
        id_strategy(),
        name_strategy(),
        prop::sample::select(FolderSubType::ALL),
        "[a-z]{0,10}",
        "[a-z]{0,10}",
    )
        .prop_map(|(id, name, sub_type, domain, username)| {
            Entry::folder("vault-1", name, sub_type, FolderData { domain, username }).with_id(id)
        })
}

/// Generate vaults with any settings.
pub fn vault_strategy() -> impl Strategy<Value = Vault> {
    (
        id_strategy(),
        name_strategy(),
        prop_oneof![
            Just(VaultContentType::Everything),
            Just(VaultContentType::Secrets),
            Just(VaultContentType::Credentials),
        ],
        prop_oneof![Just(VaultSecurityLevel::Standard), Just(VaultSecurityLevel::High)],
        prop_oneof![
            Just(VaultVisibility::Default),
            Just(VaultVisibility::Private),
            Just(VaultVisibility::Public),
        ],
    )
        .prop_map(|(id, name, content_type, security_level, visibility)| {
            let mut vault = Vault::new(name)
                .with_content_type(content_type)
                .with_security_level(security_level)
                .with_visibility(visibility);
            vault.id = id;
            vault
        })
}
