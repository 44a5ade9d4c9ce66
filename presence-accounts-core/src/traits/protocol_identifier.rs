//! Account identifier normalization Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::Parameters;

/// Derives a canonical identifier for a new account from its connection
/// parameters, typically by asking the protocol's connection manager.
///
/// Return [`CoreError::NotImplemented`](crate::CoreError::NotImplemented) or
/// [`CoreError::ServiceUnavailable`](crate::CoreError::ServiceUnavailable)
/// when the remote side cannot answer; callers then fall back to the raw
/// `account` parameter.
#[async_trait]
pub trait ProtocolIdentifier: Send + Sync {
    /// Normalize the identity described by `parameters`
    ///
    /// # Arguments
    /// * `manager` - Connection manager name, e.g. `gabble`
    /// * `protocol` - Protocol name, e.g. `jabber`
    /// * `parameters` - Connection parameters without the `param-` prefix
    async fn identify_account(
        &self,
        manager: &str,
        protocol: &str,
        parameters: &Parameters,
    ) -> CoreResult<String>;
}
