//! Settlement receipts.

use serde::{Deserialize, Serialize};
use shibui_types::{
    Address, FeeSplit, LogicVersion, OrderSide, PaymentToken, ReceiptId, Timestamp, TokenId,
};

/// Record of one completed swap: who got the asset, and where every unit of
/// the price went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub id: ReceiptId,
    pub side: OrderSide,
    pub seller: Address,
    pub buyer: Address,
    /// Receiver of the asset. Equals `buyer` for buy orders.
    pub recipient: Address,
    pub asset: Address,
    pub token_id: TokenId,
    pub payment_token: PaymentToken,
    pub split: FeeSplit,
    /// Where the system fee went; zero if no fee was due.
    pub fee_wallet: Address,
    pub royalty_beneficiary: Address,
    pub logic_version: LogicVersion,
    pub settled_at: Timestamp,
}
