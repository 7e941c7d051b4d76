//! On-chain registry access
//!
//! [`ContractTransport`] is the narrow RPC seam to the deployed contract;
//! [`RegistryClient`] wraps it with typed operations, the two-phase write
//! protocol, and error normalisation. [`SimulatedContract`] is an in-process
//! transport with the contract's semantics for tests and local runs.

mod client;
mod simulated;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::content::ContentId;

pub use client::{GAS_MARGIN_PERCENT, RegistrationReceipt, RegistryClient, with_gas_margin};
pub use simulated::{QueryKind, SimulatedContract};

/// State-changing contract methods
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContractCall {
    RegisterFile { file: ContentId },
    GrantAccess { file: ContentId, user: Address },
    RevokeAccess { file: ContentId, user: Address },
    AddToBlacklist { file: ContentId, user: Address },
    RemoveFromBlacklist { file: ContentId, user: Address },
    AddToWhitelist { file: ContentId, user: Address },
    RemoveFromWhitelist { file: ContentId, user: Address },
    ToggleWhitelistMode { file: ContentId },
}

impl ContractCall {
    pub fn file(&self) -> &ContentId {
        match self {
            ContractCall::RegisterFile { file }
            | ContractCall::GrantAccess { file, .. }
            | ContractCall::RevokeAccess { file, .. }
            | ContractCall::AddToBlacklist { file, .. }
            | ContractCall::RemoveFromBlacklist { file, .. }
            | ContractCall::AddToWhitelist { file, .. }
            | ContractCall::RemoveFromWhitelist { file, .. }
            | ContractCall::ToggleWhitelistMode { file } => file,
        }
    }

    /// Contract method name, for logs
    pub fn method(&self) -> &'static str {
        match self {
            ContractCall::RegisterFile { .. } => "uploadFile",
            ContractCall::GrantAccess { .. } => "grantAccess",
            ContractCall::RevokeAccess { .. } => "revokeAccess",
            ContractCall::AddToBlacklist { .. } => "addToBlacklist",
            ContractCall::RemoveFromBlacklist { .. } => "removeFromBlacklist",
            ContractCall::AddToWhitelist { .. } => "addToWhitelist",
            ContractCall::RemoveFromWhitelist { .. } => "removeFromWhitelist",
            ContractCall::ToggleWhitelistMode { .. } => "toggleWhitelistMode",
        }
    }
}

/// Read-only contract methods
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContractQuery {
    FileOwner { file: ContentId },
    HasAccess { file: ContentId, user: Address },
    AuthorizedUsers { file: ContentId },
    BlacklistedUsers { file: ContentId },
    WhitelistedUsers { file: ContentId },
    WhitelistMode { file: ContentId },
}

impl ContractQuery {
    pub fn kind(&self) -> QueryKind {
        match self {
            ContractQuery::FileOwner { .. } => QueryKind::FileOwner,
            ContractQuery::HasAccess { .. } => QueryKind::HasAccess,
            ContractQuery::AuthorizedUsers { .. } => QueryKind::AuthorizedUsers,
            ContractQuery::BlacklistedUsers { .. } => QueryKind::BlacklistedUsers,
            ContractQuery::WhitelistedUsers { .. } => QueryKind::WhitelistedUsers,
            ContractQuery::WhitelistMode { .. } => QueryKind::WhitelistMode,
        }
    }
}

/// Decoded return value of a read call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryOutput {
    Address(Address),
    Bool(bool),
    Addresses(Vec<Address>),
}

/// Result of a mined transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub gas_used: u64,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("no signer available")]
    NoSigner,

    /// The node could not be reached at all
    #[error("node unreachable: {0}")]
    Unreachable(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("execution reverted: {0}")]
    Reverted(String),

    #[error("timed out waiting for transaction")]
    Timeout,

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// RPC seam to the registry contract
#[async_trait]
pub trait ContractTransport: Send + Sync {
    /// Execute a read call
    async fn call(&self, query: &ContractQuery) -> Result<QueryOutput, TransportError>;

    /// Estimate the gas a write would consume if sent by `from`
    async fn estimate_gas(&self, call: &ContractCall, from: &Address)
    -> Result<u64, TransportError>;

    /// Submit a write and wait for its receipt
    async fn send_transaction(
        &self,
        call: &ContractCall,
        from: &Address,
        gas_limit: u64,
    ) -> Result<TxReceipt, TransportError>;
}
