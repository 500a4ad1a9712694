//! Order keepers: identities allowed to mutate orders on behalf of parties.
//!
//! Exchange logic instances register here, which decouples the ledger from
//! any single logic version.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use shibui_types::Address;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeeperRegistry {
    keepers: BTreeSet<Address>,
}

impl KeeperRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `keeper`. Returns `false` if it was already registered;
    /// adding twice is not an error.
    pub fn add(&mut self, keeper: Address) -> bool {
        self.keepers.insert(keeper)
    }

    /// Unregister `keeper`. Returns `false` if it was not registered.
    pub fn remove(&mut self, keeper: &Address) -> bool {
        self.keepers.remove(keeper)
    }

    #[must_use]
    pub fn is_keeper(&self, identity: &Address) -> bool {
        self.keepers.contains(identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.keepers.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keepers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keepers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent() {
        let mut registry = KeeperRegistry::new();
        let keeper = Address::random();
        assert!(registry.add(keeper));
        assert!(!registry.add(keeper));
        assert_eq!(registry.len(), 1);
        assert!(registry.is_keeper(&keeper));
    }

    #[test]
    fn remove_unregisters() {
        let mut registry = KeeperRegistry::new();
        let keeper = Address::random();
        registry.add(keeper);
        assert!(registry.remove(&keeper));
        assert!(!registry.remove(&keeper));
        assert!(!registry.is_keeper(&keeper));
        assert!(registry.is_empty());
    }

    #[test]
    fn iteration_is_ordered() {
        let mut registry = KeeperRegistry::new();
        registry.add(Address::from_low_u64(3));
        registry.add(Address::from_low_u64(1));
        registry.add(Address::from_low_u64(2));
        let listed: Vec<_> = registry.iter().copied().collect();
        assert_eq!(
            listed,
            vec![
                Address::from_low_u64(1),
                Address::from_low_u64(2),
                Address::from_low_u64(3)
            ]
        );
    }
}
