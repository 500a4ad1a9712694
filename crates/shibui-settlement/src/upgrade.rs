//! Versioned settlement logic.
//!
//! Logic modules are trait objects selected through a [`LogicTable`]; the
//! storage they run against lives in [`ExchangeStorage`] and is handed to
//! each new module's `migrate` once, when it is installed.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use shibui_types::{Amount, FeeRate, FeeSplit, LogicVersion, Result, constants};

use crate::storage::ExchangeStorage;

/// One release of the settlement logic.
pub trait ExchangeLogic: Send + Sync + fmt::Debug {
    /// Release tag reported by `Exchange::release`.
    fn release(&self) -> &'static str;

    /// Divide a trade price between seller, fee wallet, and royalty.
    fn split(&self, price: Amount, system_fee: FeeRate, royalty: FeeRate) -> Result<FeeSplit> {
        FeeSplit::compute(price, system_fee, royalty)
    }

    /// Adjust storage when this module is installed. Must leave orders,
    /// keepers, royalties, fee wallet and owner as they are.
    fn migrate(&self, _storage: &mut ExchangeStorage) -> Result<()> {
        Ok(())
    }
}

/// The logic an exchange is deployed with.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaseLogic;

impl ExchangeLogic for BaseLogic {
    fn release(&self) -> &'static str {
        constants::BASE_RELEASE
    }
}

/// First patch release.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchLogic;

impl ExchangeLogic for PatchLogic {
    fn release(&self) -> &'static str {
        constants::PATCH_RELEASE
    }

    fn migrate(&self, storage: &mut ExchangeStorage) -> Result<()> {
        // Deployments from before config validation existed.
        storage.config.validate()
    }
}

/// Dispatch table from version marker to logic module.
#[derive(Clone)]
pub struct LogicTable {
    modules: BTreeMap<LogicVersion, Arc<dyn ExchangeLogic>>,
    active: LogicVersion,
}

impl LogicTable {
    /// Table with `logic` installed at `version`.
    #[must_use]
    pub fn new(version: LogicVersion, logic: Arc<dyn ExchangeLogic>) -> Self {
        let mut modules = BTreeMap::new();
        modules.insert(version, logic);
        Self {
            modules,
            active: version,
        }
    }

    #[must_use]
    pub fn active_version(&self) -> LogicVersion {
        self.active
    }

    /// The module calls are dispatched to.
    #[must_use]
    pub fn active(&self) -> &dyn ExchangeLogic {
        self.modules
            .get(&self.active)
            .map_or(&BaseLogic as &dyn ExchangeLogic, |logic| &**logic)
    }

    /// Install `logic` at `version` and make it active. Earlier modules stay
    /// in the table as history.
    pub fn install(&mut self, version: LogicVersion, logic: Arc<dyn ExchangeLogic>) {
        self.modules.insert(version, logic);
        self.active = version;
    }

    #[must_use]
    pub fn get(&self, version: LogicVersion) -> Option<&dyn ExchangeLogic> {
        self.modules.get(&version).map(|logic| &**logic)
    }

    /// `(version, release)` for every installed module, oldest first.
    pub fn history(&self) -> impl Iterator<Item = (LogicVersion, &'static str)> + '_ {
        self.modules.iter().map(|(v, logic)| (*v, logic.release()))
    }
}

impl Default for LogicTable {
    fn default() -> Self {
        Self::new(LogicVersion::INITIAL, Arc::new(BaseLogic))
    }
}

impl fmt::Debug for LogicTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.history()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_runs_base_release() {
        let table = LogicTable::default();
        assert_eq!(table.active_version(), LogicVersion::INITIAL);
        assert_eq!(table.active().release(), "v1.0.0");
    }

    #[test]
    fn install_switches_dispatch() {
        let mut table = LogicTable::default();
        table.install(LogicVersion(2), Arc::new(PatchLogic));

        assert_eq!(table.active().release(), "v1.0.1");
        assert_eq!(table.get(LogicVersion::INITIAL).map(|l| l.release()), Some("v1.0.0"));
        let history: Vec<_> = table.history().collect();
        assert_eq!(
            history,
            vec![(LogicVersion(1), "v1.0.0"), (LogicVersion(2), "v1.0.1")]
        );
    }

    #[test]
    fn default_split_uses_thousandths() {
        let split = BaseLogic
            .split(10_000, FeeRate::new(29).unwrap(), FeeRate::new(150).unwrap())
            .unwrap();
        assert_eq!(split.system_fee, 290);
        assert_eq!(split.royalty, 1_500);
        assert_eq!(split.seller_proceeds, 8_210);
    }
}
