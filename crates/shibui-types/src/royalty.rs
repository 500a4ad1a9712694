//! Royalty terms for an asset contract.

use serde::{Deserialize, Serialize};

use crate::{Address, FeeRate};

/// Who receives a royalty on sales of an asset contract, and at what rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoyaltyInfo {
    pub beneficiary: Address,
    pub rate: FeeRate,
}

impl RoyaltyInfo {
    #[must_use]
    pub fn new(beneficiary: Address, rate: FeeRate) -> Self {
        Self { beneficiary, rate }
    }

    /// The all-zero "no royalty" value.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// A royalty with no beneficiary or no rate pays nothing.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.beneficiary.is_zero() || self.rate.is_zero()
    }

    /// Collapse degenerate terms to [`RoyaltyInfo::none`].
    #[must_use]
    pub fn normalized(self) -> Self {
        if self.is_none() { Self::none() } else { self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_beneficiary_means_none() {
        let info = RoyaltyInfo::new(Address::ZERO, FeeRate::new(150).unwrap());
        assert!(info.is_none());
        assert_eq!(info.normalized(), RoyaltyInfo::none());
    }

    #[test]
    fn zero_rate_means_none() {
        let info = RoyaltyInfo::new(Address::from_low_u64(9), FeeRate::ZERO);
        assert!(info.is_none());
    }

    #[test]
    fn real_royalty_survives_normalization() {
        let info = RoyaltyInfo::new(Address::from_low_u64(9), FeeRate::new(150).unwrap());
        assert!(!info.is_none());
        assert_eq!(info.normalized(), info);
    }
}
