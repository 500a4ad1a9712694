//! Exchange events.
//!
//! Events are immutable records of committed state changes. A failed call
//! emits nothing: any events produced before the failure are discarded with
//! the rest of the call's effects.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, FeeRate, LogicVersion, PaymentToken, Timestamp, TokenId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeEvent {
    // --- Order lifecycle ---------------------------------------------------
    SellOrderBooked {
        seller: Address,
        asset: Address,
        token_id: TokenId,
        expiration: Timestamp,
        price: Amount,
        payment_token: PaymentToken,
    },
    SellOrderCanceled {
        seller: Address,
        asset: Address,
        token_id: TokenId,
    },
    SellOrderExercised {
        seller: Address,
        buyer: Address,
        recipient: Address,
        asset: Address,
        token_id: TokenId,
        price: Amount,
        payment_token: PaymentToken,
    },
    BuyOrderBooked {
        buyer: Address,
        seller: Address,
        asset: Address,
        token_id: TokenId,
        expiration: Timestamp,
        offer: Amount,
        payment_token: PaymentToken,
    },
    BuyOrderCanceled {
        buyer: Address,
        asset: Address,
        token_id: TokenId,
    },
    BuyOrderExercised {
        buyer: Address,
        seller: Address,
        asset: Address,
        token_id: TokenId,
        offer: Amount,
        payment_token: PaymentToken,
    },

    // --- Administration ----------------------------------------------------
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
    OrderKeeperAdded {
        keeper: Address,
    },
    OrderKeeperRemoved {
        keeper: Address,
    },
    SystemFeeWalletSet {
        wallet: Address,
    },
    SystemFeeRateSet {
        rate: FeeRate,
    },
    RoyaltySet {
        asset: Address,
        beneficiary: Address,
        rate: FeeRate,
    },
    RoyaltyRemoved {
        asset: Address,
    },
    Upgraded {
        from: LogicVersion,
        to: LogicVersion,
        release: String,
    },
}

impl ExchangeEvent {
    /// Stable event name, for logs and indexing.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SellOrderBooked { .. } => "SellOrderBooked",
            Self::SellOrderCanceled { .. } => "SellOrderCanceled",
            Self::SellOrderExercised { .. } => "SellOrderExercised",
            Self::BuyOrderBooked { .. } => "BuyOrderBooked",
            Self::BuyOrderCanceled { .. } => "BuyOrderCanceled",
            Self::BuyOrderExercised { .. } => "BuyOrderExercised",
            Self::OwnershipTransferred { .. } => "OwnershipTransferred",
            Self::OrderKeeperAdded { .. } => "OrderKeeperAdded",
            Self::OrderKeeperRemoved { .. } => "OrderKeeperRemoved",
            Self::SystemFeeWalletSet { .. } => "SystemFeeWalletSet",
            Self::SystemFeeRateSet { .. } => "SystemFeeRateSet",
            Self::RoyaltySet { .. } => "RoyaltySet",
            Self::RoyaltyRemoved { .. } => "RoyaltyRemoved",
            Self::Upgraded { .. } => "Upgraded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names() {
        let event = ExchangeEvent::SellOrderCanceled {
            seller: Address::from_low_u64(1),
            asset: Address::from_low_u64(2),
            token_id: TokenId(1),
        };
        assert_eq!(event.name(), "SellOrderCanceled");
    }

    #[test]
    fn event_serialization() {
        let event = ExchangeEvent::BuyOrderBooked {
            buyer: Address::from_low_u64(1),
            seller: Address::from_low_u64(2),
            asset: Address::from_low_u64(3),
            token_id: TokenId(9),
            expiration: Timestamp(1_000),
            offer: 5_000,
            payment_token: PaymentToken(Address::from_low_u64(4)),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("BuyOrderBooked"));
        let back: ExchangeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
