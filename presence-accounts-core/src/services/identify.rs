//! Account identification and parameterised creation

use tokio_util::sync::CancellationToken;

use super::AccountStorage;
use crate::error::{CoreError, CoreResult};
use crate::types::{Parameters, Value, KEY_MANAGER, KEY_PROTOCOL};

/// Parameter whose value stands in for an identifier the connection
/// manager could not produce.
const ACCOUNT_PARAMETER: &str = "account";

impl AccountStorage {
    /// Derive the identification used to name a new account.
    ///
    /// Asks the configured [`ProtocolIdentifier`](crate::traits::ProtocolIdentifier).
    /// When there is none, or it reports the operation as unimplemented or
    /// unavailable, the `account` string parameter is returned instead (or
    /// the literal `"account"` when that is missing too). Other failures
    /// propagate. Returns [`CoreError::Cancelled`] once `cancel` fires.
    pub async fn identify_account(
        &self,
        manager: &str,
        protocol: &str,
        parameters: &Parameters,
        cancel: &CancellationToken,
    ) -> CoreResult<String> {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        let Some(identifier) = self.identifier.clone() else {
            return Ok(fallback_identification(parameters));
        };

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CoreError::Cancelled),
            result = identifier.identify_account(manager, protocol, parameters) => result,
        };

        match result {
            Ok(identification) => Ok(identification),
            Err(e) if e.is_unsupported() => {
                log::debug!("{manager} cannot identify {protocol} accounts ({e}), using 'account'");
                Ok(fallback_identification(parameters))
            }
            Err(e) => Err(e),
        }
    }

    /// Identify, create and populate a new account in one step.
    ///
    /// The cache is untouched if `cancel` fires before identification
    /// completes. The new account gets its `manager` and `protocol`
    /// attributes plus every entry of `parameters`; nothing is committed.
    pub async fn create_account_with_parameters(
        &mut self,
        provider: Option<&str>,
        manager: &str,
        protocol: &str,
        parameters: &Parameters,
        cancel: &CancellationToken,
    ) -> CoreResult<String> {
        let identification = self
            .identify_account(manager, protocol, parameters, cancel)
            .await?;
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        let account = self
            .create_account(provider, manager, protocol, &identification)
            .await?;

        self.set_string(&account, KEY_MANAGER, Some(manager)).await?;
        self.set_string(&account, KEY_PROTOCOL, Some(protocol)).await?;
        for (name, value) in parameters {
            self.set_parameter(&account, name, Some(value)).await?;
        }
        Ok(account)
    }
}

fn fallback_identification(parameters: &Parameters) -> String {
    match parameters.get(ACCOUNT_PARAMETER) {
        Some(Value::String(account)) => account.clone(),
        _ => ACCOUNT_PARAMETER.to_string(),
    }
}
