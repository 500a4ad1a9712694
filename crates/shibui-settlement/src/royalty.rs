//! Owner-managed royalty terms and the effective-royalty lookup.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shibui_types::{Address, FeeRate, Result, RoyaltyInfo, ShibuiError};

use crate::host::RoyaltyResolver;

/// Royalty terms keyed by asset contract. An absent entry pays no royalty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoyaltyRegistry {
    entries: BTreeMap<Address, RoyaltyInfo>,
}

impl RoyaltyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the royalty for `asset`.
    ///
    /// # Errors
    /// `FeeRateTooHigh` if `system_fee + info.rate` exceeds 100%;
    /// `InvalidParameter` for a zero asset or a rate with no beneficiary.
    pub fn set(&mut self, asset: Address, info: RoyaltyInfo, system_fee: FeeRate) -> Result<()> {
        if asset.is_zero() {
            return Err(ShibuiError::InvalidParameter {
                reason: "royalty asset is the zero address".into(),
            });
        }
        if info.beneficiary.is_zero() && !info.rate.is_zero() {
            return Err(ShibuiError::InvalidParameter {
                reason: "royalty rate without a beneficiary".into(),
            });
        }
        if system_fee.checked_add(info.rate).is_none() {
            return Err(ShibuiError::FeeRateTooHigh {
                total: u32::from(system_fee.thousandths()) + u32::from(info.rate.thousandths()),
            });
        }
        self.entries.insert(asset, info);
        Ok(())
    }

    pub fn remove(&mut self, asset: &Address) -> Option<RoyaltyInfo> {
        self.entries.remove(asset)
    }

    #[must_use]
    pub fn get(&self, asset: &Address) -> Option<RoyaltyInfo> {
        self.entries.get(asset).copied()
    }

    /// Highest configured rate, used to re-check a system fee change.
    #[must_use]
    pub fn max_rate(&self) -> FeeRate {
        self.entries
            .values()
            .map(|info| info.rate)
            .max()
            .unwrap_or(FeeRate::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &RoyaltyInfo)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The royalty a settlement of `asset` pays.
///
/// A registry entry wins over the external resolver. Whatever the resolver
/// returns is dropped to "no royalty" if it fails, is zero, or would push
/// the combined rate past 100%.
pub fn effective_royalty(
    registry: &RoyaltyRegistry,
    resolver: &dyn RoyaltyResolver,
    asset: Address,
    system_fee: FeeRate,
) -> RoyaltyInfo {
    if let Some(info) = registry.get(&asset) {
        return info.normalized();
    }
    match resolver.resolve_royalty(asset) {
        Ok(info) if info.is_none() => RoyaltyInfo::none(),
        Ok(info) if system_fee.checked_add(info.rate).is_none() => {
            tracing::warn!(
                asset = %asset,
                rate = %info.rate,
                system_fee = %system_fee,
                "Resolved royalty exceeds fee headroom, paying none"
            );
            RoyaltyInfo::none()
        }
        Ok(info) => info,
        Err(e) => {
            tracing::warn!(asset = %asset, error = %e, "Royalty resolution failed, paying none");
            RoyaltyInfo::none()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NoRoyaltyResolver;

    struct Fixed(Result<RoyaltyInfo>);

    impl RoyaltyResolver for Fixed {
        fn resolve_royalty(&self, _asset: Address) -> Result<RoyaltyInfo> {
            self.0.clone()
        }
    }

    fn rate(v: u16) -> FeeRate {
        FeeRate::new(v).unwrap()
    }

    #[test]
    fn set_checks_combined_rate() {
        let mut registry = RoyaltyRegistry::new();
        let asset = Address::random();
        let info = RoyaltyInfo::new(Address::random(), rate(972));

        let err = registry.set(asset, info, rate(29)).unwrap_err();
        assert_eq!(err, ShibuiError::FeeRateTooHigh { total: 1001 });
        assert!(registry.is_empty());

        let info = RoyaltyInfo::new(Address::random(), rate(971));
        registry.set(asset, info, rate(29)).unwrap();
        assert_eq!(registry.get(&asset), Some(info));
        assert_eq!(registry.max_rate(), rate(971));
    }

    #[test]
    fn registry_overrides_resolver() {
        let mut registry = RoyaltyRegistry::new();
        let asset = Address::random();
        let configured = RoyaltyInfo::new(Address::random(), rate(150));
        registry.set(asset, configured, rate(29)).unwrap();

        let external = Fixed(Ok(RoyaltyInfo::new(Address::random(), rate(50))));
        assert_eq!(effective_royalty(&registry, &external, asset, rate(29)), configured);
        assert_eq!(
            effective_royalty(&registry, &external, Address::random(), rate(29)).rate,
            rate(50)
        );
    }

    #[test]
    fn resolver_failures_mean_no_royalty() {
        let registry = RoyaltyRegistry::new();
        let asset = Address::random();

        let failing = Fixed(Err(ShibuiError::Internal("offline".into())));
        assert!(effective_royalty(&registry, &failing, asset, rate(29)).is_none());

        let greedy = Fixed(Ok(RoyaltyInfo::new(Address::random(), rate(990))));
        assert!(effective_royalty(&registry, &greedy, asset, rate(29)).is_none());

        let zero = Fixed(Ok(RoyaltyInfo::new(Address::random(), FeeRate::ZERO)));
        assert!(effective_royalty(&registry, &zero, asset, rate(29)).is_none());

        assert!(effective_royalty(&registry, &NoRoyaltyResolver, asset, rate(29)).is_none());
    }

    #[test]
    fn remove_returns_previous_entry() {
        let mut registry = RoyaltyRegistry::new();
        let asset = Address::random();
        let info = RoyaltyInfo::new(Address::random(), rate(10));
        registry.set(asset, info, FeeRate::ZERO).unwrap();
        assert_eq!(registry.remove(&asset), Some(info));
        assert_eq!(registry.remove(&asset), None);
    }
}
