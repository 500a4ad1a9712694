//! Error types for the Shibui exchange.
//!
//! All errors use the `SHB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order lookup errors
//! - 2xx: Authorization errors
//! - 3xx: Payment errors
//! - 4xx: Parameter errors
//! - 5xx: Transfer errors
//! - 6xx: Upgrade errors
//! - 9xx: General / internal errors
//!
//! Every variant maps onto one [`ErrorKind`]; callers that only care about
//! the class of failure match on [`ShibuiError::kind`].

use thiserror::Error;

use crate::{Address, Amount, OrderKey, PaymentToken, Timestamp, TokenId};

/// Caller-observable class of a failed call. A failed call never has a
/// partial effect, whatever its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The order is missing, expired, or already settled/canceled.
    NotFound,
    /// The caller may not perform this action.
    Unauthorized,
    /// Attached value, allowance, or payment token is wrong.
    InvalidPayment,
    /// A supplied parameter or configuration value is invalid.
    InvalidParameter,
    /// An asset or payment transfer did not complete.
    TransferFailure,
    /// Invariant breach or unexpected internal state.
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Unauthorized => write!(f, "UNAUTHORIZED"),
            Self::InvalidPayment => write!(f, "INVALID_PAYMENT"),
            Self::InvalidParameter => write!(f, "INVALID_PARAMETER"),
            Self::TransferFailure => write!(f, "TRANSFER_FAILURE"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Central error enum for all Shibui operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShibuiError {
    // =================================================================
    // Order Errors (1xx)
    // =================================================================
    /// No sell order is stored under this key.
    #[error("SHB_ERR_100: Sell order not found: {0}")]
    SellOrderNotFound(OrderKey),

    /// No buy order is stored under this key.
    #[error("SHB_ERR_101: Buy order not found: {0}")]
    BuyOrderNotFound(OrderKey),

    /// The order exists but its expiration has passed.
    #[error("SHB_ERR_102: Order {key} expired at {expiration}")]
    OrderExpired { key: OrderKey, expiration: Timestamp },

    /// The caller's expected terms differ from the stored order.
    #[error("SHB_ERR_103: Order {key} does not match the supplied terms")]
    OrderTermsMismatch { key: OrderKey },

    // =================================================================
    // Authorization Errors (2xx)
    // =================================================================
    /// Owner-only operation called by someone else.
    #[error("SHB_ERR_200: Caller {caller} is not the owner")]
    NotOwner { caller: Address },

    /// Caller is neither the order's party nor a registered keeper.
    #[error("SHB_ERR_201: Caller {caller} may not act for {party}")]
    NotOrderParty { caller: Address, party: Address },

    /// Keeper-only operation called by an unregistered identity.
    #[error("SHB_ERR_202: Caller {caller} is not an order keeper")]
    NotKeeper { caller: Address },

    /// Caller does not own the asset it is trying to sell.
    #[error("SHB_ERR_203: {caller} does not own {asset}{token_id}")]
    NotAssetOwner {
        caller: Address,
        asset: Address,
        token_id: TokenId,
    },

    /// The asset owner has not approved the exchange as operator.
    #[error("SHB_ERR_204: {owner} has not approved the exchange for {asset}")]
    ExchangeNotApproved { owner: Address, asset: Address },

    /// The signing key does not belong to the order's party.
    #[error("SHB_ERR_205: Intent signed by {actual}, expected {expected}")]
    IntentSignerMismatch { expected: Address, actual: Address },

    /// Malformed or non-verifying ed25519 signature.
    #[error("SHB_ERR_206: Invalid intent signature: {0}")]
    InvalidSignature(String),

    /// The signed intent was already booked once on this ledger.
    #[error("SHB_ERR_207: Intent {intent} from {party} was already used")]
    IntentReplayed { party: Address, intent: String },

    // =================================================================
    // Payment Errors (3xx)
    // =================================================================
    /// Attached native value differs from the amount required.
    #[error("SHB_ERR_300: Attached value {attached} does not equal required {expected}")]
    PaymentMismatch { expected: Amount, attached: Amount },

    /// Payer's allowance to the exchange is below the amount required.
    #[error("SHB_ERR_301: Allowance {approved} is below required {needed}")]
    InsufficientAllowance { needed: Amount, approved: Amount },

    /// Payer's balance is below the amount required.
    #[error("SHB_ERR_302: Balance {available} is below required {needed}")]
    InsufficientFunds { needed: Amount, available: Amount },

    /// Supplied payment token differs from the stored one.
    #[error("SHB_ERR_303: Payment token {supplied} does not match order token {expected}")]
    PaymentTokenMismatch {
        expected: PaymentToken,
        supplied: PaymentToken,
    },

    /// Buy orders are always paid with a pulled fungible token.
    #[error("SHB_ERR_304: Buy orders cannot be paid in native currency")]
    NativeBuyOrder,

    // =================================================================
    // Parameter Errors (4xx)
    // =================================================================
    /// Price or offer of zero.
    #[error("SHB_ERR_400: Price must be greater than zero")]
    ZeroPrice,

    /// Expiration not in the future at booking time.
    #[error("SHB_ERR_401: Expiration {expiration} is not after {now}")]
    ExpirationInPast { expiration: Timestamp, now: Timestamp },

    /// Fee plus royalty rate above 100%.
    #[error("SHB_ERR_402: Combined fee rate {total}/1000 exceeds 100%")]
    FeeRateTooHigh { total: u32 },

    /// Any other rejected parameter.
    #[error("SHB_ERR_403: Invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    /// The deployment fixes the system fee rate.
    #[error("SHB_ERR_404: System fee rate is fixed for this deployment")]
    FeeRateFixed,

    // =================================================================
    // Transfer Errors (5xx)
    // =================================================================
    /// An asset or payment leg did not complete.
    #[error("SHB_ERR_500: Transfer failed ({leg}): {reason}")]
    TransferFailed { leg: String, reason: String },

    /// A system fee is due but no fee wallet is configured.
    #[error("SHB_ERR_501: System fee wallet is unset")]
    FeeWalletUnset,

    // =================================================================
    // Upgrade Errors (6xx)
    // =================================================================
    /// A migration touched preserved storage.
    #[error("SHB_ERR_600: Upgrade to {release} would alter preserved state")]
    UpgradeAltersState { release: String },

    /// The version marker cannot be incremented further.
    #[error("SHB_ERR_601: Logic version exhausted")]
    VersionExhausted,

    /// The logic module handed to a restore is not the release the storage
    /// was last upgraded to.
    #[error("SHB_ERR_602: Storage runs {expected}, got logic {actual}")]
    ReleaseMismatch { expected: String, actual: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("SHB_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("SHB_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("SHB_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// A nested call tried to enter a ledger this thread is already inside.
    #[error("SHB_ERR_903: Reentrant call into the order ledger")]
    ReentrantCall,
}

impl ShibuiError {
    /// The failure class this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SellOrderNotFound(_)
            | Self::BuyOrderNotFound(_)
            | Self::OrderExpired { .. }
            | Self::OrderTermsMismatch { .. } => ErrorKind::NotFound,

            Self::NotOwner { .. }
            | Self::NotOrderParty { .. }
            | Self::NotKeeper { .. }
            | Self::NotAssetOwner { .. }
            | Self::ExchangeNotApproved { .. }
            | Self::IntentSignerMismatch { .. }
            | Self::InvalidSignature(_)
            | Self::IntentReplayed { .. } => ErrorKind::Unauthorized,

            Self::PaymentMismatch { .. }
            | Self::InsufficientAllowance { .. }
            | Self::InsufficientFunds { .. }
            | Self::PaymentTokenMismatch { .. }
            | Self::NativeBuyOrder => ErrorKind::InvalidPayment,

            Self::ZeroPrice
            | Self::ExpirationInPast { .. }
            | Self::FeeRateTooHigh { .. }
            | Self::InvalidParameter { .. }
            | Self::FeeRateFixed
            | Self::Configuration(_) => ErrorKind::InvalidParameter,

            Self::TransferFailed { .. } | Self::FeeWalletUnset => ErrorKind::TransferFailure,

            Self::UpgradeAltersState { .. }
            | Self::VersionExhausted
            | Self::ReleaseMismatch { .. }
            | Self::Internal(_)
            | Self::Serialization(_)
            | Self::ReentrantCall => ErrorKind::Internal,
        }
    }

    /// Shorthand for a failed transfer leg.
    pub fn transfer(leg: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TransferFailed {
            leg: leg.into(),
            reason: reason.into(),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, ShibuiError>;

impl From<serde_json::Error> for ShibuiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
