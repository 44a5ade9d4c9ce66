#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests for `KeyfileStorage` driven through `AccountStorage`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use presence_accounts_backends::{InMemoryStorage, KeyfileStorage, KEYFILE_PROVIDER};
use presence_accounts_core::{
    AccountManager, AccountStorage, Codec, CoreError, SimplePresence, StoragePlugin, Value,
    ValueType,
};

fn temp_keyfile() -> (tempfile::TempDir, PathBuf) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let path = tmp.path().join("presence").join("accounts.cfg");
    (tmp, path)
}

async fn open(path: &Path) -> AccountStorage {
    let mut storage = AccountStorage::default();
    storage.register_plugin(Arc::new(KeyfileStorage::new(path, ',')));
    storage.load().await.expect("load failed");
    storage
}

#[tokio::test]
async fn missing_file_means_no_accounts() {
    let (_tmp, path) = temp_keyfile();
    let storage = open(&path).await;

    assert!(storage.accounts().is_empty());
    storage.commit(None).await.unwrap();
    assert!(!path.exists(), "an unchanged store must not create the file");
}

#[tokio::test]
async fn values_survive_commit_and_reload() {
    let (_tmp, path) = temp_keyfile();

    let account = {
        let mut storage = open(&path).await;
        let account = storage
            .create_account(None, "gabble", "jabber", "alice@example.com")
            .await
            .unwrap();
        assert_eq!(storage.plugin_name(&account).unwrap(), "keyfile");

        storage
            .set_string(&account, "DisplayName", Some("  Alice, from work"))
            .await
            .unwrap();
        storage
            .set_attribute(&account, "Enabled", Some(&Value::Boolean(true)))
            .await
            .unwrap();
        storage
            .set_attribute(
                &account,
                "AutomaticPresence",
                Some(&Value::from(SimplePresence::new(2, "available", "hi, all"))),
            )
            .await
            .unwrap();
        storage
            .set_strv(
                &account,
                "URISchemes",
                Some(&["xmpp".to_string(), "a,b".to_string()]),
            )
            .await
            .unwrap();
        storage
            .set_parameter(&account, "account", Some(&Value::from("alice@example.com")))
            .await
            .unwrap();
        storage
            .set_parameter(&account, "port", Some(&Value::UInt32(5222)))
            .await
            .unwrap();
        storage.commit(Some(&account)).await.unwrap();
        account
    };

    let data = std::fs::read_to_string(&path).unwrap();
    assert!(data.contains("[gabble/jabber/alice_40example_2ecom0]"));
    assert!(data.contains("DisplayName=\\s\\sAlice, from work"));
    assert!(data.contains("URISchemes=xmpp,a\\,b,"));
    assert!(data.contains("param-port=5222"));

    let storage = open(&path).await;
    assert_eq!(storage.accounts(), vec![account.clone()]);
    assert_eq!(
        storage.get_string(&account, "DisplayName").as_deref(),
        Some("  Alice, from work")
    );
    assert!(storage.get_boolean(&account, "Enabled"));
    assert_eq!(
        storage
            .get_attribute(&account, "AutomaticPresence", None)
            .unwrap(),
        Value::from(SimplePresence::new(2, "available", "hi, all"))
    );
    assert_eq!(
        storage.get_attribute(&account, "URISchemes", None).unwrap(),
        Value::StringArray(vec!["xmpp".into(), "a,b".into()])
    );
    assert_eq!(
        storage
            .get_parameter(&account, "port", Some(ValueType::UInt32))
            .unwrap(),
        Value::UInt32(5222)
    );
    assert_eq!(
        storage.get_parameter(&account, "account", None).unwrap(),
        Value::from("alice@example.com")
    );
    assert!(storage.owns(&account).await);
}

#[tokio::test]
async fn deletions_are_persisted() {
    let (_tmp, path) = temp_keyfile();

    let (keep, drop) = {
        let mut storage = open(&path).await;
        let keep = storage
            .create_account(None, "idle", "irc", "bob")
            .await
            .unwrap();
        let drop = storage
            .create_account(None, "idle", "irc", "bob")
            .await
            .unwrap();
        for account in [&keep, &drop] {
            storage
                .set_string(account, "Nickname", Some("bob"))
                .await
                .unwrap();
            storage
                .set_parameter(account, "password", Some(&Value::from("pw")))
                .await
                .unwrap();
        }
        storage.commit(None).await.unwrap();

        storage.set_parameter(&keep, "password", None).await.unwrap();
        storage.delete_account(&drop).await.unwrap();
        storage.commit(None).await.unwrap();
        (keep, drop)
    };

    assert_eq!(keep, "idle/irc/bob0");
    assert_eq!(drop, "idle/irc/bob1");

    let storage = open(&path).await;
    assert_eq!(storage.accounts(), vec![keep.clone()]);
    assert!(matches!(
        storage.get_parameter(&keep, "password", None),
        Err(CoreError::NotStored { .. })
    ));
    assert!(!storage.contains(&drop));
}

#[tokio::test]
async fn corrupt_file_does_not_block_other_backends() {
    let (_tmp, path) = temp_keyfile();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let corrupt = "[idle/irc/bob0]\nNickname=bob\ngarbage line\n";
    std::fs::write(&path, corrupt).unwrap();

    let mut storage = AccountStorage::default();
    storage.register_plugin(Arc::new(KeyfileStorage::new(&path, ',')));
    storage.register_plugin(Arc::new(
        InMemoryStorage::new("memory", 100).with_attribute("a/b/c0", "Nickname", Value::from("c")),
    ));
    storage.load().await.unwrap();

    assert_eq!(storage.accounts(), vec!["a/b/c0"]);
    assert!(!storage.contains("idle/irc/bob0"));

    // the unreadable file is left alone
    storage.commit(None).await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), corrupt);
}

#[tokio::test]
async fn list_parameters_keep_their_escaped_form_after_reload() {
    let (_tmp, path) = temp_keyfile();
    let servers = Value::StringArray(vec!["a,b".into(), "c".into()]);

    let account = {
        let mut storage = open(&path).await;
        let account = storage
            .create_account(None, "gabble", "jabber", "x")
            .await
            .unwrap();
        storage
            .set_parameter(&account, "servers", Some(&servers))
            .await
            .unwrap();
        assert_eq!(
            storage.get_parameter(&account, "servers", None).unwrap(),
            servers
        );
        storage.commit(None).await.unwrap();
        account
    };

    let storage = open(&path).await;
    assert!(matches!(
        storage.get_parameter(&account, "servers", None),
        Err(CoreError::Codec(_))
    ));
    assert_eq!(
        storage
            .get_parameter(&account, "servers", Some(ValueType::StringArray))
            .unwrap(),
        servers
    );
    assert_eq!(
        storage.get_value(&account, "param-servers").as_deref(),
        Some("a\\,b,c,")
    );
}

#[tokio::test]
async fn attributes_outside_the_schema_can_be_unset() {
    let (_tmp, path) = temp_keyfile();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "[g/j/x0]\nCustomThing=legacy\nNickname=x\n").unwrap();

    {
        let mut storage = open(&path).await;
        assert_eq!(
            storage.get_attribute("g/j/x0", "CustomThing", None).unwrap(),
            Value::from("legacy")
        );
        assert!(storage
            .set_attribute("g/j/x0", "CustomThing", None)
            .await
            .unwrap());
        storage.commit(Some("g/j/x0")).await.unwrap();
    }

    assert!(!std::fs::read_to_string(&path).unwrap().contains("CustomThing"));
    let storage = open(&path).await;
    assert!(matches!(
        storage.get_attribute("g/j/x0", "CustomThing", None),
        Err(CoreError::NotStored { .. })
    ));
}

#[tokio::test]
async fn hand_written_files_are_read() {
    let (_tmp, path) = temp_keyfile();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        "# written by hand\n\
         [haze/msn/carol0]\n\
         manager=haze\n\
         Enabled=1\n\
         AutomaticPresenceType=4294967296\n\
         param-server=\\sspaced\n",
    )
    .unwrap();

    let storage = open(&path).await;
    assert!(storage.get_boolean("haze/msn/carol0", "Enabled"));
    // out of range for the schema type, dropped on load
    assert_eq!(storage.get_uint32("haze/msn/carol0", "AutomaticPresenceType"), 0);
    assert_eq!(
        storage
            .get_parameter("haze/msn/carol0", "server", None)
            .unwrap(),
        Value::from(" spaced")
    );
}

#[tokio::test]
async fn explicit_provider_selects_the_keyfile() {
    let (_tmp, path) = temp_keyfile();
    let mut storage = AccountStorage::default();
    storage.register_plugin(Arc::new(KeyfileStorage::new(&path, ',')));
    storage.register_plugin(Arc::new(InMemoryStorage::new("memory", 100)));
    storage.load().await.unwrap();

    let preferred = storage
        .create_account(None, "gabble", "jabber", "x")
        .await
        .unwrap();
    assert_eq!(storage.plugin_name(&preferred).unwrap(), "memory");

    let pinned = storage
        .create_account(Some(KEYFILE_PROVIDER), "gabble", "jabber", "x")
        .await
        .unwrap();
    assert_eq!(pinned, "gabble/jabber/x1");
    assert_eq!(storage.plugin_name(&pinned).unwrap(), "keyfile");
}

#[tokio::test]
async fn custom_separator_is_used_on_disk() {
    let (_tmp, path) = temp_keyfile();
    {
        let mut storage = AccountStorage::new(Codec::new(';'));
        let keyfile = Arc::new(KeyfileStorage::new(&path, ';'));
        assert_eq!(keyfile.provider(), Some(KEYFILE_PROVIDER));
        storage.register_plugin(keyfile);
        storage.load().await.unwrap();

        let account = storage
            .create_account(None, "m", "p", "id")
            .await
            .unwrap();
        storage
            .set_strv(&account, "URISchemes", Some(&["a;b".to_string(), "c".to_string()]))
            .await
            .unwrap();
        storage.commit(None).await.unwrap();
    }

    let data = std::fs::read_to_string(&path).unwrap();
    assert!(data.contains("URISchemes=a\\;b;c;"));
}
