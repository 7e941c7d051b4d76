//! Typed registry client

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use super::{ContractCall, ContractQuery, ContractTransport, QueryOutput, TransportError, TxReceipt};
use crate::address::Address;
use crate::content::ContentId;
use crate::error::{AccessError, AccessResult};

/// Safety margin added on top of every gas estimate
pub const GAS_MARGIN_PERCENT: u64 = 20;

/// Gas limit for a transaction whose estimate is `estimate`, rounded up
pub fn with_gas_margin(estimate: u64) -> u64 {
    let scaled = u128::from(estimate) * u128::from(100 + GAS_MARGIN_PERCENT);
    u64::try_from(scaled.div_ceil(100)).unwrap_or(u64::MAX)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegistrationReceipt {
    pub file: ContentId,
    pub owner: Address,
    pub receipt: TxReceipt,
}

/// Typed wrapper over the registry contract's read/write surface
#[derive(Clone)]
pub struct RegistryClient {
    transport: Arc<dyn ContractTransport>,
}

impl RegistryClient {
    pub fn new(transport: Arc<dyn ContractTransport>) -> Self {
        Self { transport }
    }

    // Writes

    pub async fn register_file(
        &self,
        file: &ContentId,
        as_identity: &Address,
    ) -> AccessResult<RegistrationReceipt> {
        let call = ContractCall::RegisterFile { file: file.clone() };
        // Registration can only fail pre-flight when the file already has an owner
        let receipt = self
            .submit_with(&call, as_identity, |reason| {
                AccessError::AlreadyRegistered(format!("{file}: {reason}"))
            })
            .await?;

        Ok(RegistrationReceipt {
            file: file.clone(),
            owner: *as_identity,
            receipt,
        })
    }

    pub async fn grant_access(
        &self,
        file: &ContentId,
        grantee: &Address,
        as_identity: &Address,
    ) -> AccessResult<TxReceipt> {
        let call = ContractCall::GrantAccess {
            file: file.clone(),
            user: *grantee,
        };
        self.submit(&call, as_identity).await
    }

    pub async fn revoke_access(
        &self,
        file: &ContentId,
        grantee: &Address,
        as_identity: &Address,
    ) -> AccessResult<TxReceipt> {
        let call = ContractCall::RevokeAccess {
            file: file.clone(),
            user: *grantee,
        };
        self.submit(&call, as_identity).await
    }

    pub async fn add_to_blacklist(
        &self,
        file: &ContentId,
        identity: &Address,
        as_identity: &Address,
    ) -> AccessResult<TxReceipt> {
        let call = ContractCall::AddToBlacklist {
            file: file.clone(),
            user: *identity,
        };
        self.submit(&call, as_identity).await
    }

    pub async fn remove_from_blacklist(
        &self,
        file: &ContentId,
        identity: &Address,
        as_identity: &Address,
    ) -> AccessResult<TxReceipt> {
        let call = ContractCall::RemoveFromBlacklist {
            file: file.clone(),
            user: *identity,
        };
        self.submit(&call, as_identity).await
    }

    pub async fn add_to_whitelist(
        &self,
        file: &ContentId,
        identity: &Address,
        as_identity: &Address,
    ) -> AccessResult<TxReceipt> {
        let call = ContractCall::AddToWhitelist {
            file: file.clone(),
            user: *identity,
        };
        self.submit(&call, as_identity).await
    }

    pub async fn remove_from_whitelist(
        &self,
        file: &ContentId,
        identity: &Address,
        as_identity: &Address,
    ) -> AccessResult<TxReceipt> {
        let call = ContractCall::RemoveFromWhitelist {
            file: file.clone(),
            user: *identity,
        };
        self.submit(&call, as_identity).await
    }

    pub async fn toggle_whitelist_mode(
        &self,
        file: &ContentId,
        as_identity: &Address,
    ) -> AccessResult<TxReceipt> {
        let call = ContractCall::ToggleWhitelistMode { file: file.clone() };
        self.submit(&call, as_identity).await
    }

    /// The deployed contract has no unregister method
    pub async fn unregister_file(
        &self,
        _file: &ContentId,
        _as_identity: &Address,
    ) -> AccessResult<TxReceipt> {
        Err(AccessError::NotSupported("unregister file"))
    }

    // Reads

    /// Owner of `file`, or `None` when the registry reports the zero address
    pub async fn get_owner(&self, file: &ContentId) -> AccessResult<Option<Address>> {
        let query = ContractQuery::FileOwner { file: file.clone() };
        match self.read(&query).await? {
            QueryOutput::Address(owner) if owner.is_zero() => Ok(None),
            QueryOutput::Address(owner) => Ok(Some(owner)),
            other => Err(unexpected(&query, &other)),
        }
    }

    pub async fn has_access(&self, file: &ContentId, identity: &Address) -> AccessResult<bool> {
        let query = ContractQuery::HasAccess {
            file: file.clone(),
            user: *identity,
        };
        self.read_bool(&query).await
    }

    pub async fn get_granted_identities(&self, file: &ContentId) -> AccessResult<BTreeSet<Address>> {
        self.read_set(&ContractQuery::AuthorizedUsers { file: file.clone() })
            .await
    }

    pub async fn get_blacklisted(&self, file: &ContentId) -> AccessResult<BTreeSet<Address>> {
        self.read_set(&ContractQuery::BlacklistedUsers { file: file.clone() })
            .await
    }

    pub async fn get_whitelisted(&self, file: &ContentId) -> AccessResult<BTreeSet<Address>> {
        self.read_set(&ContractQuery::WhitelistedUsers { file: file.clone() })
            .await
    }

    pub async fn is_whitelist_mode_on(&self, file: &ContentId) -> AccessResult<bool> {
        self.read_bool(&ContractQuery::WhitelistMode { file: file.clone() })
            .await
    }

    async fn submit(&self, call: &ContractCall, from: &Address) -> AccessResult<TxReceipt> {
        self.submit_with(call, from, AccessError::Reverted).await
    }

    /// Estimate, then send with the safety margin.
    ///
    /// `on_estimate_revert` classifies a pre-flight revert. Nothing is sent
    /// when estimation fails.
    async fn submit_with<F>(
        &self,
        call: &ContractCall,
        from: &Address,
        on_estimate_revert: F,
    ) -> AccessResult<TxReceipt>
    where
        F: FnOnce(String) -> AccessError + Send,
    {
        let estimate = self
            .transport
            .estimate_gas(call, from)
            .await
            .map_err(|e| match e {
                TransportError::Reverted(reason) => on_estimate_revert(reason),
                TransportError::NoSigner | TransportError::Unreachable(_) => {
                    AccessError::Connection(e.to_string())
                }
                other => AccessError::EstimationFailed(other.to_string()),
            })?;

        let gas_limit = with_gas_margin(estimate);
        tracing::debug!(
            method = call.method(),
            file = %call.file(),
            from = %from.short(),
            estimate,
            gas_limit,
            "submitting registry transaction"
        );

        let receipt = self
            .transport
            .send_transaction(call, from, gas_limit)
            .await
            .map_err(|e| match e {
                TransportError::Timeout => AccessError::SubmissionTimedOut,
                TransportError::NoSigner | TransportError::Unreachable(_) => {
                    AccessError::Connection(e.to_string())
                }
                TransportError::Reverted(reason) => AccessError::Reverted(reason),
                other => AccessError::Reverted(other.to_string()),
            })?;

        tracing::info!(
            method = call.method(),
            file = %call.file(),
            tx = %receipt.tx_hash,
            block = receipt.block_number,
            "registry transaction mined"
        );
        Ok(receipt)
    }

    async fn read(&self, query: &ContractQuery) -> AccessResult<QueryOutput> {
        self.transport
            .call(query)
            .await
            .map_err(|e| AccessError::RegistryUnavailable(format!("{:?}: {e}", query.kind())))
    }

    async fn read_bool(&self, query: &ContractQuery) -> AccessResult<bool> {
        match self.read(query).await? {
            QueryOutput::Bool(b) => Ok(b),
            other => Err(unexpected(query, &other)),
        }
    }

    async fn read_set(&self, query: &ContractQuery) -> AccessResult<BTreeSet<Address>> {
        match self.read(query).await? {
            QueryOutput::Addresses(list) => Ok(list.into_iter().collect()),
            other => Err(unexpected(query, &other)),
        }
    }
}

fn unexpected(query: &ContractQuery, output: &QueryOutput) -> AccessError {
    AccessError::RegistryUnavailable(format!(
        "{:?}: unexpected output {output:?}",
        query.kind()
    ))
}
