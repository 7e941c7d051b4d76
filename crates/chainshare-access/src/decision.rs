//! Access decisions and the pure policy that produces them

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// What the requester wants to do with the file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    View,
    Download,
    ManageSharing,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::View => "view",
            Operation::Download => "download",
            Operation::ManageSharing => "manage_sharing",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "view" => Some(Operation::View),
            "download" => Some(Operation::Download),
            "manage_sharing" | "manage" => Some(Operation::ManageSharing),
            _ => None,
        }
    }
}

/// Registration status of a file as far as this process knows
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegistrationState {
    /// No source could be reached
    Unknown,
    Unregistered,
    /// Submitted by this process but not yet visible to registry reads
    Pending { owner: Address },
    /// Confirmed by a registry read
    Registered { owner: Address },
}

impl RegistrationState {
    pub fn owner(&self) -> Option<Address> {
        match self {
            RegistrationState::Unknown | RegistrationState::Unregistered => None,
            RegistrationState::Pending { owner } | RegistrationState::Registered { owner } => {
                Some(*owner)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    Owner,
    Granted,
    Whitelisted,
    Blacklisted,
    WhitelistModeExclusion,
    NotGranted,
    NotOwner,
    /// No access control is active for the file
    Unregistered,
    RegistryError,
}

/// Where the owner used for a decision came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerSource {
    Registry,
    Cache,
}

/// The engine's verdict for one (file, identity, operation)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
    pub state: RegistrationState,
    pub owner_source: OwnerSource,
}

impl AccessDecision {
    pub fn allow(reason: DecisionReason, state: RegistrationState, source: OwnerSource) -> Self {
        Self {
            allowed: true,
            reason,
            state,
            owner_source: source,
        }
    }

    pub fn deny(reason: DecisionReason, state: RegistrationState, source: OwnerSource) -> Self {
        Self {
            allowed: false,
            reason,
            state,
            owner_source: source,
        }
    }
}

/// Per-identity facts needed to decide a non-owner request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantFacts {
    pub whitelist_mode: bool,
    /// Member of the whitelist when the mode is on, of the grant set otherwise
    pub listed: bool,
    pub blacklisted: bool,
}

/// Decide a request against a registered file.
///
/// `facts` is only consulted for non-owners; pass `None` when it could not be
/// read and the result fails closed.
pub fn decide(
    owner: Address,
    requester: Address,
    operation: Operation,
    facts: Option<GrantFacts>,
) -> (bool, DecisionReason) {
    if requester == owner {
        return (true, DecisionReason::Owner);
    }
    if operation == Operation::ManageSharing {
        return (false, DecisionReason::NotOwner);
    }

    let Some(facts) = facts else {
        return (false, DecisionReason::RegistryError);
    };

    if facts.blacklisted {
        return (false, DecisionReason::Blacklisted);
    }

    match (facts.whitelist_mode, facts.listed) {
        (true, true) => (true, DecisionReason::Whitelisted),
        (true, false) => (false, DecisionReason::WhitelistModeExclusion),
        (false, true) => (true, DecisionReason::Granted),
        (false, false) => (false, DecisionReason::NotGranted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    #[test]
    fn test_owner_always_allowed() {
        let facts = GrantFacts {
            whitelist_mode: true,
            listed: false,
            blacklisted: true,
        };
        assert_eq!(
            decide(addr(1), addr(1), Operation::ManageSharing, Some(facts)),
            (true, DecisionReason::Owner)
        );
        assert_eq!(
            decide(addr(1), addr(1), Operation::Download, None),
            (true, DecisionReason::Owner)
        );
    }

    #[test]
    fn test_manage_requires_owner() {
        let facts = GrantFacts {
            whitelist_mode: false,
            listed: true,
            blacklisted: false,
        };
        assert_eq!(
            decide(addr(1), addr(2), Operation::ManageSharing, Some(facts)),
            (false, DecisionReason::NotOwner)
        );
    }

    #[test]
    fn test_blacklist_beats_whitelist() {
        let facts = GrantFacts {
            whitelist_mode: true,
            listed: true,
            blacklisted: true,
        };
        assert_eq!(
            decide(addr(1), addr(2), Operation::View, Some(facts)),
            (false, DecisionReason::Blacklisted)
        );
    }

    #[test]
    fn test_missing_facts_fail_closed() {
        assert_eq!(
            decide(addr(1), addr(2), Operation::View, None),
            (false, DecisionReason::RegistryError)
        );
    }

    #[test]
    fn test_operation_parse() {
        assert_eq!(Operation::parse("view"), Some(Operation::View));
        assert_eq!(Operation::parse("manage"), Some(Operation::ManageSharing));
        assert_eq!(Operation::parse("delete"), None);
        assert_eq!(
            Operation::parse(Operation::Download.as_str()),
            Some(Operation::Download)
        );
    }

    fn any_operation() -> impl Strategy<Value = Operation> {
        prop_oneof![Just(Operation::View), Just(Operation::Download)]
    }

    proptest! {
        /// Whitelist mode on: allowed iff whitelisted and not blacklisted
        #[test]
        fn prop_whitelist_mode(listed in any::<bool>(), blacklisted in any::<bool>(), op in any_operation()) {
            let facts = GrantFacts { whitelist_mode: true, listed, blacklisted };
            let (allowed, _) = decide(addr(1), addr(2), op, Some(facts));
            prop_assert_eq!(allowed, listed && !blacklisted);
        }

        /// Whitelist mode off: allowed iff granted and not blacklisted
        #[test]
        fn prop_grant_mode(listed in any::<bool>(), blacklisted in any::<bool>(), op in any_operation()) {
            let facts = GrantFacts { whitelist_mode: false, listed, blacklisted };
            let (allowed, _) = decide(addr(1), addr(2), op, Some(facts));
            prop_assert_eq!(allowed, listed && !blacklisted);
        }

        /// The owner is allowed whatever the facts say
        #[test]
        fn prop_owner_allowed(
            mode in any::<bool>(),
            listed in any::<bool>(),
            blacklisted in any::<bool>(),
            owner in any::<[u8; 20]>()
        ) {
            let owner = Address::from_bytes(owner);
            let facts = GrantFacts { whitelist_mode: mode, listed, blacklisted };
            prop_assert_eq!(
                decide(owner, owner, Operation::Download, Some(facts)),
                (true, DecisionReason::Owner)
            );
        }
    }
}
