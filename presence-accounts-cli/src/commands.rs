//! Command implementations

use anyhow::{bail, Context, Result};
use presence_accounts_core::types::{attribute_type, parameter_key, AccountKey};
use presence_accounts_core::{
    AccountManager, AccountStorage, CancellationToken, CoreError, Parameters, Value, ValueType,
};
use serde_json::json;

const REDACTED: &str = "***";

pub fn list(storage: &AccountStorage) -> Result<()> {
    for account in storage.accounts() {
        println!("{account}");
    }
    Ok(())
}

pub fn show(storage: &AccountStorage, account: &str) -> Result<()> {
    let mut attributes = serde_json::Map::new();
    for name in storage.attributes(account)? {
        let value = storage.get_attribute(account, &name, None)?;
        attributes.insert(name, serde_json::to_value(value)?);
    }

    let mut parameters = serde_json::Map::new();
    for key in storage.list_keys(account) {
        let AccountKey::Parameter(name) = AccountKey::parse(&key) else {
            continue;
        };
        let value = if storage.parameter_is_secret(account, name) {
            json!(REDACTED)
        } else {
            parameter_json(storage, account, name)?
        };
        parameters.insert(name.to_string(), value);
    }

    let output = json!({
        "account": account,
        "storage": storage.plugin_name(account)?,
        "attributes": attributes,
        "parameters": parameters,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn get(storage: &AccountStorage, account: &str, key: &str, ty: Option<&str>) -> Result<()> {
    let ty = parse_type(ty)?;
    println!("{}", value_text(storage, account, key, ty)?);
    Ok(())
}

/// Escaped text of one value. Without a type, parameters that only decode
/// with one (lists, presence structs) are returned as stored.
fn value_text(
    storage: &AccountStorage,
    account: &str,
    key: &str,
    ty: Option<ValueType>,
) -> Result<String> {
    let codec = storage.codec();
    match AccountKey::parse(key) {
        AccountKey::Attribute(attribute) => {
            Ok(codec.escape(&storage.get_attribute(account, attribute, ty)?))
        }
        AccountKey::Parameter(parameter) => match storage.get_parameter(account, parameter, ty) {
            Ok(value) => Ok(codec.escape(&value)),
            Err(CoreError::Codec(_)) if ty.is_none() => stored_parameter(storage, account, parameter),
            Err(e) => Err(e.into()),
        },
    }
}

fn parameter_json(storage: &AccountStorage, account: &str, name: &str) -> Result<serde_json::Value> {
    match storage.get_parameter(account, name, None) {
        Ok(value) => Ok(serde_json::to_value(value)?),
        Err(CoreError::Codec(e)) => {
            tracing::debug!("{account}: param-{name} is not a plain string ({e})");
            Ok(json!({
                "type": "escaped",
                "value": stored_parameter(storage, account, name)?,
            }))
        }
        Err(e) => Err(e.into()),
    }
}

fn stored_parameter(storage: &AccountStorage, account: &str, name: &str) -> Result<String> {
    storage
        .get_value(account, &parameter_key(name))
        .with_context(|| format!("{account} has no parameter {name}"))
}

pub async fn set(
    storage: &mut AccountStorage,
    account: &str,
    key: &str,
    text: &str,
    ty: Option<&str>,
    secret: bool,
) -> Result<()> {
    let explicit = parse_type(ty)?;
    let codec = storage.codec();

    match AccountKey::parse(key) {
        AccountKey::Attribute(attribute) => {
            if secret {
                bail!("--secret only applies to parameters");
            }
            let ty = explicit
                .or_else(|| attribute_type(attribute))
                .unwrap_or(ValueType::String);
            let value = codec.unescape(text, ty)?;
            storage.set_attribute(account, attribute, Some(&value)).await?;
        }
        AccountKey::Parameter(parameter) => {
            if secret {
                storage.parameter_make_secret(account, parameter);
            }
            let value = codec.unescape(text, explicit.unwrap_or(ValueType::String))?;
            storage.set_parameter(account, parameter, Some(&value)).await?;
        }
    }

    storage.commit(Some(account)).await?;
    Ok(())
}

pub async fn unset(storage: &mut AccountStorage, account: &str, key: &str) -> Result<()> {
    match AccountKey::parse(key) {
        AccountKey::Attribute(attribute) => {
            storage.set_attribute(account, attribute, None).await?;
        }
        AccountKey::Parameter(parameter) => {
            storage.set_parameter(account, parameter, None).await?;
        }
    }
    storage.commit(Some(account)).await?;
    Ok(())
}

pub fn keys(storage: &AccountStorage, account: &str) -> Result<()> {
    if !storage.contains(account) {
        return Err(CoreError::AccountNotFound(account.to_string()).into());
    }
    for key in storage.list_keys(account) {
        println!("{key}");
    }
    Ok(())
}

pub async fn create(
    storage: &mut AccountStorage,
    provider: Option<&str>,
    manager: &str,
    protocol: &str,
    params: &[String],
) -> Result<()> {
    let parameters = parse_parameters(params)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let created = storage
        .create_account_with_parameters(provider, manager, protocol, &parameters, &cancel)
        .await;
    interrupt.abort();

    let account = created?;
    storage.commit(Some(&account)).await?;
    tracing::info!("Created {account} in {}", storage.plugin_name(&account)?);
    println!("{account}");
    Ok(())
}

pub async fn delete(storage: &mut AccountStorage, account: &str) -> Result<()> {
    storage.delete_account(account).await?;
    storage.commit(None).await?;
    Ok(())
}

fn parse_type(signature: Option<&str>) -> Result<Option<ValueType>> {
    signature
        .map(|sig| {
            ValueType::from_signature(sig).with_context(|| format!("unknown type signature {sig:?}"))
        })
        .transpose()
}

/// `KEY=VALUE` pairs as string parameters.
fn parse_parameters(params: &[String]) -> Result<Parameters> {
    let mut parameters = Parameters::new();
    for param in params {
        let (key, value) = param
            .split_once('=')
            .with_context(|| format!("expected KEY=VALUE, got {param:?}"))?;
        if key.is_empty() {
            bail!("empty parameter name in {param:?}");
        }
        parameters.insert(key.to_string(), Value::from(value));
    }
    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use presence_accounts_backends::KeyfileStorage;

    use super::*;

    async fn hand_written(data: &str) -> (AccountStorage, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("accounts.cfg");
        std::fs::write(&path, data).unwrap();

        let mut storage = AccountStorage::default();
        storage.register_plugin(Arc::new(KeyfileStorage::new(path, ',')));
        storage.load().await.unwrap();
        (storage, tmp)
    }

    #[tokio::test]
    async fn list_parameters_are_shown_as_stored() {
        let (storage, _tmp) =
            hand_written("[g/j/x0]\nNickname=x\nparam-servers=a\\,b,c,\nparam-port=5222\n").await;

        assert_eq!(
            value_text(&storage, "g/j/x0", "param-servers", None).unwrap(),
            "a\\,b,c,"
        );
        assert_eq!(
            value_text(&storage, "g/j/x0", "param-servers", Some(ValueType::StringArray))
                .unwrap(),
            "a\\,b,c,"
        );
        assert!(value_text(&storage, "g/j/x0", "param-servers", Some(ValueType::UInt32)).is_err());

        assert_eq!(
            parameter_json(&storage, "g/j/x0", "servers").unwrap(),
            json!({ "type": "escaped", "value": "a\\,b,c," })
        );
        assert_eq!(
            parameter_json(&storage, "g/j/x0", "port").unwrap(),
            json!({ "type": "string", "value": "5222" })
        );
        assert!(show(&storage, "g/j/x0").is_ok());
    }

    #[tokio::test]
    async fn missing_values_are_errors() {
        let (storage, _tmp) = hand_written("[g/j/x0]\nNickname=x\n").await;

        assert_eq!(value_text(&storage, "g/j/x0", "Nickname", None).unwrap(), "x");
        assert!(value_text(&storage, "g/j/x0", "param-servers", None).is_err());
        assert!(value_text(&storage, "nobody", "Nickname", None).is_err());
    }

    #[test]
    fn parameters_split_on_first_equals() {
        let parameters =
            parse_parameters(&["account=bob".to_string(), "password=a=b".to_string()]).unwrap();
        assert_eq!(parameters.get("account"), Some(&Value::from("bob")));
        assert_eq!(parameters.get("password"), Some(&Value::from("a=b")));
    }

    #[test]
    fn malformed_parameters_are_rejected() {
        assert!(parse_parameters(&["account".to_string()]).is_err());
        assert!(parse_parameters(&["=bob".to_string()]).is_err());
    }

    #[test]
    fn type_signatures() {
        assert_eq!(parse_type(Some("u")).unwrap(), Some(ValueType::UInt32));
        assert_eq!(parse_type(Some("as")).unwrap(), Some(ValueType::StringArray));
        assert_eq!(parse_type(None).unwrap(), None);
        assert!(parse_type(Some("zz")).is_err());
    }
}
