//! Fee arithmetic.
//!
//! All rates are expressed in **thousandths** of the trade price
//! ([`FEE_DENOMINATOR`](crate::constants::FEE_DENOMINATOR) = 1000): a rate of
//! `29` is 2.9%. System fee and royalty are both floored; the seller receives
//! whatever is left, so the three legs of a [`FeeSplit`] always sum to the
//! price exactly.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Amount, Result, ShibuiError, constants::FEE_DENOMINATOR};

/// A rate in parts per thousand, bounded to `0..=1000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct FeeRate(u16);

impl FeeRate {
    pub const ZERO: Self = Self(0);
    pub const FULL: Self = Self(FEE_DENOMINATOR);

    /// # Errors
    /// `FeeRateTooHigh` if `thousandths > 1000`.
    pub fn new(thousandths: u16) -> Result<Self> {
        if thousandths > FEE_DENOMINATOR {
            return Err(ShibuiError::FeeRateTooHigh {
                total: u32::from(thousandths),
            });
        }
        Ok(Self(thousandths))
    }

    #[must_use]
    pub const fn thousandths(self) -> u16 {
        self.0
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Sum of two rates, or `None` if it would exceed 100%.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        let sum = self.0.checked_add(other.0)?;
        (sum <= FEE_DENOMINATOR).then_some(Self(sum))
    }

    /// `floor(amount * rate / 1000)`, computed without intermediate overflow.
    #[must_use]
    pub fn apply(self, amount: Amount) -> Amount {
        let denominator = Amount::from(FEE_DENOMINATOR);
        let rate = Amount::from(self.0);
        (amount / denominator) * rate + (amount % denominator) * rate / denominator
    }

    /// The rate as an exact fraction of one (`29` → `0.029`).
    #[must_use]
    pub fn as_fraction(self) -> Decimal {
        Decimal::new(i64::from(self.0), 3)
    }
}

impl TryFrom<u16> for FeeRate {
    type Error = ShibuiError;

    fn try_from(value: u16) -> Result<Self> {
        Self::new(value)
    }
}

impl From<FeeRate> for u16 {
    fn from(rate: FeeRate) -> Self {
        rate.0
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let percent = Decimal::new(i64::from(self.0), 1).normalize();
        write!(f, "{percent}%")
    }
}

/// How a trade price is divided between seller, fee wallet, and royalty
/// beneficiary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub price: Amount,
    pub seller_proceeds: Amount,
    pub system_fee: Amount,
    pub royalty: Amount,
}

impl FeeSplit {
    /// Split `price` using the thousandths convention.
    ///
    /// # Errors
    /// `FeeRateTooHigh` if `system_fee_rate + royalty_rate > 1000`.
    pub fn compute(price: Amount, system_fee_rate: FeeRate, royalty_rate: FeeRate) -> Result<Self> {
        if system_fee_rate.checked_add(royalty_rate).is_none() {
            return Err(ShibuiError::FeeRateTooHigh {
                total: u32::from(system_fee_rate.0) + u32::from(royalty_rate.0),
            });
        }

        let system_fee = system_fee_rate.apply(price);
        let royalty = royalty_rate.apply(price);
        // floor(p*a/1000) + floor(p*b/1000) <= p*(a+b)/1000 <= p
        let seller_proceeds = price - system_fee - royalty;

        Ok(Self {
            price,
            seller_proceeds,
            system_fee,
            royalty,
        })
    }

    /// Sum of the three legs. Always equals `price`.
    #[must_use]
    pub fn total(&self) -> Amount {
        self.seller_proceeds + self.system_fee + self.royalty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(v: u16) -> FeeRate {
        FeeRate::new(v).unwrap()
    }

    #[test]
    fn system_fee_exactness() {
        let split = FeeSplit::compute(10_000_000_000_000_000, rate(29), FeeRate::ZERO).unwrap();
        assert_eq!(split.system_fee, 290_000_000_000_000);
        assert_eq!(split.seller_proceeds, 9_710_000_000_000_000);
        assert_eq!(split.royalty, 0);
        assert_eq!(split.total(), split.price);
    }

    #[test]
    fn royalty_and_fee_together() {
        let split = FeeSplit::compute(10_000_000_000_000_000, rate(29), rate(150)).unwrap();
        assert_eq!(split.system_fee, 290_000_000_000_000);
        assert_eq!(split.royalty, 1_500_000_000_000_000);
        assert_eq!(split.seller_proceeds, 8_210_000_000_000_000);
        assert_eq!(split.total(), split.price);
    }

    #[test]
    fn remainder_goes_to_seller() {
        // 999 * 29 / 1000 = 28.971 -> 28; 999 * 3 / 1000 = 2.997 -> 2
        let split = FeeSplit::compute(999, rate(29), rate(3)).unwrap();
        assert_eq!(split.system_fee, 28);
        assert_eq!(split.royalty, 2);
        assert_eq!(split.seller_proceeds, 969);
        assert_eq!(split.total(), 999);
    }

    #[test]
    fn combined_rate_above_full_rejected() {
        let err = FeeSplit::compute(1_000, rate(600), rate(401)).unwrap_err();
        assert!(matches!(err, ShibuiError::FeeRateTooHigh { total: 1001 }));
    }

    #[test]
    fn full_rate_leaves_nothing_for_seller() {
        let split = FeeSplit::compute(12_345, rate(1000), FeeRate::ZERO).unwrap();
        assert_eq!(split.system_fee, 12_345);
        assert_eq!(split.seller_proceeds, 0);
    }

    #[test]
    fn apply_does_not_overflow_at_max() {
        let fee = FeeRate::FULL.apply(Amount::MAX);
        assert_eq!(fee, Amount::MAX);
        let fee = rate(500).apply(Amount::MAX);
        assert_eq!(fee, Amount::MAX / 2);
    }

    #[test]
    fn rate_bounds() {
        assert!(FeeRate::new(1000).is_ok());
        assert!(matches!(
            FeeRate::new(1001),
            Err(ShibuiError::FeeRateTooHigh { total: 1001 })
        ));
        assert_eq!(rate(600).checked_add(rate(400)), Some(FeeRate::FULL));
        assert_eq!(rate(600).checked_add(rate(401)), None);
    }

    #[test]
    fn rate_display_as_percent() {
        assert_eq!(rate(29).to_string(), "2.9%");
        assert_eq!(rate(5).to_string(), "0.5%");
        assert_eq!(FeeRate::FULL.to_string(), "100%");
        assert_eq!(rate(29).as_fraction(), Decimal::new(29, 3));
    }

    #[test]
    fn rate_serde_validates() {
        let ok: FeeRate = serde_json::from_str("29").unwrap();
        assert_eq!(ok, rate(29));
        assert!(serde_json::from_str::<FeeRate>("1500").is_err());
        assert_eq!(serde_json::to_string(&rate(29)).unwrap(), "29");
    }
}
