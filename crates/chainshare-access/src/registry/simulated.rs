//! In-process registry contract
//!
//! Mirrors the deployed contract's observable behaviour: single owner set at
//! registration, owner-only writes, idempotent set membership, and a
//! per-file whitelist-mode flag. Faults and read lag can be injected to
//! reproduce RPC outages and eventual-consistency windows.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ContractCall, ContractQuery, ContractTransport, QueryOutput, TransportError, TxReceipt};
use crate::address::Address;
use crate::content::ContentId;

/// Read method selector, used to inject per-method faults
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryKind {
    FileOwner,
    HasAccess,
    AuthorizedUsers,
    BlacklistedUsers,
    WhitelistedUsers,
    WhitelistMode,
}

#[derive(Clone, Debug, Default)]
struct FileAcl {
    owner: Address,
    /// Insertion order is preserved, as the contract's array is
    authorized: Vec<Address>,
    blacklist: Vec<Address>,
    whitelist: Vec<Address>,
    whitelist_mode: bool,
}

#[derive(Clone, Debug, Default)]
struct ContractState {
    files: HashMap<ContentId, FileAcl>,
}

impl ContractState {
    fn check(&self, call: &ContractCall, from: &Address) -> Result<(), TransportError> {
        if let ContractCall::RegisterFile { file } = call {
            if self.files.contains_key(file) {
                return Err(TransportError::Reverted("File already registered".into()));
            }
            return Ok(());
        }

        match self.files.get(call.file()) {
            None => Err(TransportError::Reverted("File not registered".into())),
            Some(acl) if acl.owner != *from => {
                Err(TransportError::Reverted("Only file owner".into()))
            }
            Some(_) => Ok(()),
        }
    }

    fn apply(&mut self, call: &ContractCall, from: &Address) {
        if let ContractCall::RegisterFile { file } = call {
            self.files.insert(
                file.clone(),
                FileAcl {
                    owner: *from,
                    ..Default::default()
                },
            );
            return;
        }

        let Some(acl) = self.files.get_mut(call.file()) else {
            return;
        };
        match call {
            ContractCall::RegisterFile { .. } => {}
            ContractCall::GrantAccess { user, .. } => insert_unique(&mut acl.authorized, *user),
            ContractCall::RevokeAccess { user, .. } => acl.authorized.retain(|a| a != user),
            ContractCall::AddToBlacklist { user, .. } => insert_unique(&mut acl.blacklist, *user),
            ContractCall::RemoveFromBlacklist { user, .. } => acl.blacklist.retain(|a| a != user),
            ContractCall::AddToWhitelist { user, .. } => insert_unique(&mut acl.whitelist, *user),
            ContractCall::RemoveFromWhitelist { user, .. } => acl.whitelist.retain(|a| a != user),
            ContractCall::ToggleWhitelistMode { .. } => acl.whitelist_mode = !acl.whitelist_mode,
        }
    }

    fn query(&self, query: &ContractQuery) -> QueryOutput {
        match query {
            ContractQuery::FileOwner { file } => QueryOutput::Address(
                self.files.get(file).map(|acl| acl.owner).unwrap_or(Address::ZERO),
            ),
            ContractQuery::HasAccess { file, user } => {
                let allowed = self.files.get(file).is_some_and(|acl| {
                    if acl.owner == *user {
                        return true;
                    }
                    if acl.blacklist.contains(user) {
                        return false;
                    }
                    if acl.whitelist_mode {
                        acl.whitelist.contains(user)
                    } else {
                        acl.authorized.contains(user)
                    }
                });
                QueryOutput::Bool(allowed)
            }
            ContractQuery::AuthorizedUsers { file } => {
                QueryOutput::Addresses(self.list(file, |acl| &acl.authorized))
            }
            ContractQuery::BlacklistedUsers { file } => {
                QueryOutput::Addresses(self.list(file, |acl| &acl.blacklist))
            }
            ContractQuery::WhitelistedUsers { file } => {
                QueryOutput::Addresses(self.list(file, |acl| &acl.whitelist))
            }
            ContractQuery::WhitelistMode { file } => {
                QueryOutput::Bool(self.files.get(file).is_some_and(|acl| acl.whitelist_mode))
            }
        }
    }

    fn list(&self, file: &ContentId, pick: impl Fn(&FileAcl) -> &Vec<Address>) -> Vec<Address> {
        self.files.get(file).map(|acl| pick(acl).clone()).unwrap_or_default()
    }
}

fn insert_unique(list: &mut Vec<Address>, user: Address) {
    if !list.contains(&user) {
        list.push(user);
    }
}

fn gas_cost(call: &ContractCall) -> u64 {
    match call {
        ContractCall::RegisterFile { .. } => 92_000,
        ContractCall::GrantAccess { .. } => 54_000,
        ContractCall::AddToBlacklist { .. } | ContractCall::AddToWhitelist { .. } => 51_000,
        ContractCall::RevokeAccess { .. }
        | ContractCall::RemoveFromBlacklist { .. }
        | ContractCall::RemoveFromWhitelist { .. } => 31_000,
        ContractCall::ToggleWhitelistMode { .. } => 28_500,
    }
}

#[derive(Default)]
struct Inner {
    /// State every write is validated against
    head: ContractState,
    /// State reads observe; trails `head` by `lagging.len()` transactions
    visible: ContractState,
    lagging: VecDeque<(ContractCall, Address)>,
    read_lag: usize,
    nonce: u64,
    block: u64,
    offline: bool,
    no_signer: bool,
    failing: HashSet<QueryKind>,
}

impl Inner {
    fn settle(&mut self) {
        while self.lagging.len() > self.read_lag {
            if let Some((call, from)) = self.lagging.pop_front() {
                self.visible.apply(&call, &from);
            }
        }
    }
}

/// In-process registry contract
#[derive(Default)]
pub struct SimulatedContract {
    inner: Mutex<Inner>,
}

impl SimulatedContract {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every RPC fail as if the node were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    /// Make writes fail as if no wallet were connected
    pub fn set_signer_available(&self, available: bool) {
        self.inner.lock().no_signer = !available;
    }

    /// Make one read method fail until faults are cleared
    pub fn fail_query(&self, kind: QueryKind) {
        self.inner.lock().failing.insert(kind);
    }

    pub fn clear_faults(&self) {
        let mut inner = self.inner.lock();
        inner.offline = false;
        inner.no_signer = false;
        inner.failing.clear();
    }

    /// Delay visibility of writes to reads by `transactions` transactions
    pub fn set_read_lag(&self, transactions: usize) {
        let mut inner = self.inner.lock();
        inner.read_lag = transactions;
        inner.settle();
    }

    /// Make every mined write visible to reads
    pub fn sync(&self) {
        let mut inner = self.inner.lock();
        let lag = inner.read_lag;
        inner.read_lag = 0;
        inner.settle();
        inner.read_lag = lag;
    }

    /// Number of registered files (as of the latest write)
    pub fn file_count(&self) -> usize {
        self.inner.lock().head.files.len()
    }

    /// Latest mined block
    pub fn block_number(&self) -> u64 {
        self.inner.lock().block
    }
}

#[async_trait]
impl ContractTransport for SimulatedContract {
    async fn call(&self, query: &ContractQuery) -> Result<QueryOutput, TransportError> {
        let inner = self.inner.lock();
        if inner.offline {
            return Err(TransportError::Unreachable("connection refused".into()));
        }
        if inner.failing.contains(&query.kind()) {
            return Err(TransportError::Rpc(format!("{:?} call failed", query.kind())));
        }
        Ok(inner.visible.query(query))
    }

    async fn estimate_gas(
        &self,
        call: &ContractCall,
        from: &Address,
    ) -> Result<u64, TransportError> {
        let inner = self.inner.lock();
        if inner.offline {
            return Err(TransportError::Unreachable("connection refused".into()));
        }
        if inner.no_signer {
            return Err(TransportError::NoSigner);
        }
        inner.head.check(call, from)?;
        Ok(gas_cost(call))
    }

    async fn send_transaction(
        &self,
        call: &ContractCall,
        from: &Address,
        gas_limit: u64,
    ) -> Result<TxReceipt, TransportError> {
        let mut inner = self.inner.lock();
        if inner.offline {
            return Err(TransportError::Unreachable("connection refused".into()));
        }
        if inner.no_signer {
            return Err(TransportError::NoSigner);
        }
        inner.head.check(call, from)?;

        let cost = gas_cost(call);
        if gas_limit < cost {
            return Err(TransportError::Reverted("out of gas".into()));
        }

        inner.head.apply(call, from);
        inner.lagging.push_back((call.clone(), *from));
        inner.settle();

        inner.nonce += 1;
        inner.block += 1;

        let mut hasher = blake3::Hasher::new();
        hasher.update(from.as_bytes());
        hasher.update(call.method().as_bytes());
        hasher.update(call.file().as_str().as_bytes());
        hasher.update(&inner.nonce.to_le_bytes());

        Ok(TxReceipt {
            tx_hash: format!("0x{}", hasher.finalize().to_hex()),
            block_number: inner.block,
            gas_used: cost,
        })
    }
}
