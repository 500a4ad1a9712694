//! Order records.
//!
//! A sell order is keyed by `(seller, asset, token_id)` and a buy order by
//! `(buyer, asset, token_id)`. At most one record exists per key; booking
//! again overwrites it. Records never hold funds: payment is pulled from the
//! payer only when the order is exercised.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, PaymentToken, Result, ShibuiError, Timestamp, TokenId, constants};

/// Which kind of intent a record expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderSide {
    Sell,
    Buy,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sell => write!(f, "SELL"),
            Self::Buy => write!(f, "BUY"),
        }
    }
}

/// Storage key of an order: the party who booked it plus the asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OrderKey {
    pub party: Address,
    pub asset: Address,
    pub token_id: TokenId,
}

impl OrderKey {
    #[must_use]
    pub fn new(party: Address, asset: Address, token_id: TokenId) -> Self {
        Self {
            party,
            asset,
            token_id,
        }
    }
}

impl std::fmt::Display for OrderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}{}", self.party.short(), self.asset.short(), self.token_id)
    }
}

// ---------------------------------------------------------------------------
// SellOrder
// ---------------------------------------------------------------------------

/// An intent to sell one asset at a fixed price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SellOrder {
    pub seller: Address,
    pub asset: Address,
    pub token_id: TokenId,
    pub expiration: Timestamp,
    pub price: Amount,
    pub payment_token: PaymentToken,
}

impl SellOrder {
    #[must_use]
    pub fn key(&self) -> OrderKey {
        OrderKey::new(self.seller, self.asset, self.token_id)
    }

    /// The zero-valued record returned by reads that miss.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    /// Live orders have not yet reached their expiration.
    #[must_use]
    pub fn is_live_at(&self, now: Timestamp) -> bool {
        now < self.expiration
    }

    /// Booking-time checks: a real seller, a positive price, and an
    /// expiration in the future.
    pub fn validate_terms(&self, now: Timestamp) -> Result<()> {
        if self.seller.is_zero() {
            return Err(ShibuiError::InvalidParameter {
                reason: "seller must not be the zero address".into(),
            });
        }
        if self.price == 0 {
            return Err(ShibuiError::ZeroPrice);
        }
        if !self.is_live_at(now) {
            return Err(ShibuiError::ExpirationInPast {
                expiration: self.expiration,
                now,
            });
        }
        Ok(())
    }

    /// Canonical bytes a seller signs to publish this intent.
    ///
    /// Format: `"shibui:sell:v1:" || seller || asset || token_id || expiration || price || payment_token`
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(128);
        payload.extend_from_slice(constants::SELL_INTENT_DOMAIN);
        payload.extend_from_slice(self.seller.as_bytes());
        payload.extend_from_slice(self.asset.as_bytes());
        payload.extend_from_slice(&self.token_id.0.to_be_bytes());
        payload.extend_from_slice(&self.expiration.0.to_be_bytes());
        payload.extend_from_slice(&self.price.to_be_bytes());
        payload.extend_from_slice(self.payment_token.0.as_bytes());
        payload
    }
}

// ---------------------------------------------------------------------------
// BuyOrder
// ---------------------------------------------------------------------------

/// An offer to buy one asset from a named seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuyOrder {
    pub buyer: Address,
    pub seller: Address,
    pub asset: Address,
    pub token_id: TokenId,
    pub expiration: Timestamp,
    pub offer: Amount,
    pub payment_token: PaymentToken,
}

impl BuyOrder {
    #[must_use]
    pub fn key(&self) -> OrderKey {
        OrderKey::new(self.buyer, self.asset, self.token_id)
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    #[must_use]
    pub fn is_live_at(&self, now: Timestamp) -> bool {
        now < self.expiration
    }

    pub fn validate_terms(&self, now: Timestamp) -> Result<()> {
        if self.buyer.is_zero() || self.seller.is_zero() {
            return Err(ShibuiError::InvalidParameter {
                reason: "buyer and seller must not be the zero address".into(),
            });
        }
        if self.offer == 0 {
            return Err(ShibuiError::ZeroPrice);
        }
        if !self.is_live_at(now) {
            return Err(ShibuiError::ExpirationInPast {
                expiration: self.expiration,
                now,
            });
        }
        Ok(())
    }

    /// Format: `"shibui:buy:v1:" || buyer || seller || asset || token_id || expiration || offer || payment_token`
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(160);
        payload.extend_from_slice(constants::BUY_INTENT_DOMAIN);
        payload.extend_from_slice(self.buyer.as_bytes());
        payload.extend_from_slice(self.seller.as_bytes());
        payload.extend_from_slice(self.asset.as_bytes());
        payload.extend_from_slice(&self.token_id.0.to_be_bytes());
        payload.extend_from_slice(&self.expiration.0.to_be_bytes());
        payload.extend_from_slice(&self.offer.to_be_bytes());
        payload.extend_from_slice(self.payment_token.0.as_bytes());
        payload
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl SellOrder {
    pub fn dummy(seller: Address, asset: Address, token_id: u128, price: Amount) -> Self {
        Self {
            seller,
            asset,
            token_id: TokenId(token_id),
            expiration: Timestamp(u64::MAX),
            price,
            payment_token: PaymentToken::NATIVE,
        }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl BuyOrder {
    pub fn dummy(
        buyer: Address,
        seller: Address,
        asset: Address,
        token_id: u128,
        offer: Amount,
        payment_token: PaymentToken,
    ) -> Self {
        Self {
            buyer,
            seller,
            asset,
            token_id: TokenId(token_id),
            expiration: Timestamp(u64::MAX),
            offer,
            payment_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sentinel() {
        assert!(SellOrder::empty().is_empty());
        assert!(BuyOrder::empty().is_empty());
        let order = SellOrder::dummy(Address::random(), Address::random(), 1, 10);
        assert!(!order.is_empty());
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let mut order = SellOrder::dummy(Address::random(), Address::random(), 1, 10);
        order.expiration = Timestamp(100);
        assert!(order.is_live_at(Timestamp(99)));
        assert!(!order.is_live_at(Timestamp(100)));
    }

    #[test]
    fn validate_rejects_zero_price() {
        let order = SellOrder::dummy(Address::random(), Address::random(), 1, 0);
        assert!(matches!(
            order.validate_terms(Timestamp(1)),
            Err(ShibuiError::ZeroPrice)
        ));
    }

    #[test]
    fn validate_rejects_past_expiration() {
        let mut order = BuyOrder::dummy(
            Address::random(),
            Address::random(),
            Address::random(),
            1,
            10,
            PaymentToken(Address::random()),
        );
        order.expiration = Timestamp(5);
        assert!(matches!(
            order.validate_terms(Timestamp(5)),
            Err(ShibuiError::ExpirationInPast { .. })
        ));
    }

    #[test]
    fn signing_payload_binds_terms() {
        let order = SellOrder::dummy(Address::random(), Address::random(), 7, 1_000);
        let mut repriced = order;
        repriced.price = 999;
        assert_eq!(order.signing_payload(), order.signing_payload());
        assert_ne!(order.signing_payload(), repriced.signing_payload());
        assert!(order.signing_payload().starts_with(constants::SELL_INTENT_DOMAIN));
    }

    #[test]
    fn keys_use_party_asset_and_token() {
        let buyer = Address::random();
        let asset = Address::random();
        let order = BuyOrder::dummy(buyer, Address::random(), asset, 3, 10, PaymentToken::NATIVE);
        assert_eq!(order.key(), OrderKey::new(buyer, asset, TokenId(3)));
    }

    #[test]
    fn serde_roundtrip() {
        let order = SellOrder::dummy(Address::random(), Address::random(), 7, 1_000);
        let json = serde_json::to_string(&order).unwrap();
        let back: SellOrder = serde_json::from_str(&json).unwrap();
        assert_eq!(order, back);
    }
}
