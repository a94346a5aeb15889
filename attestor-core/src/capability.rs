//! Governance capabilities and the proxy binding.

use crate::identity::{Address, Word};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role identifier checked by privileged contract entry points.
///
/// Roles are granted and revoked entirely by the external governance
/// subsystem; the coordinator only checks possession before acting and fails
/// closed otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(pub Word);

impl RoleId {
    pub fn named(label: &str) -> Self {
        RoleId(Word::named(label))
    }

    pub fn as_word(&self) -> Word {
        self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The capability required to invoke upgrade or migration entry points.
pub static GOVERNANCE_ROLE: Lazy<RoleId> =
    Lazy::new(|| RoleId::named("attestor.v1.role.governance"));

/// Storage slot holding the proxy's current logic address. Derived outside
/// the contract's sequential slot numbering so application state cannot
/// collide with it.
pub static IMPLEMENTATION_SLOT: Lazy<Word> =
    Lazy::new(|| Word::named("attestor.v1.proxy.implementation-slot"));

/// The relation {proxy address, current logic address}.
///
/// The proxy address is stable for the life of the deployment; the logic
/// address is swapped by the upgrade executor. Declared storage slots used
/// by both old and new logic must read identically immediately after a swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyBinding {
    pub proxy: Address,
    pub logic: Address,
}

impl ProxyBinding {
    pub fn new(proxy: Address, logic: Address) -> Self {
        Self { proxy, logic }
    }

    /// The binding after a logic swap; the proxy address never changes.
    pub fn rebound(&self, new_logic: Address) -> Self {
        Self {
            proxy: self.proxy,
            logic: new_logic,
        }
    }
}

impl fmt::Display for ProxyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.proxy, self.logic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebound_keeps_proxy_address() {
        let binding = ProxyBinding::new(Address::derived("proxy"), Address::derived("logic-v1"));
        let new_logic = Address::derived("logic-v2");
        let rebound = binding.rebound(new_logic);
        assert_eq!(rebound.proxy, binding.proxy);
        assert_eq!(rebound.logic, new_logic);
    }

    #[test]
    fn test_governance_role_is_stable() {
        assert_eq!(*GOVERNANCE_ROLE, RoleId::named("attestor.v1.role.governance"));
        assert_ne!(GOVERNANCE_ROLE.as_word(), *IMPLEMENTATION_SLOT);
    }
}
