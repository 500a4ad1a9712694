//! Collaborator interfaces: the asset contract, the payment token, and the
//! royalty lookup service, plus the execution environment that hosts them.
//!
//! Every outbound transfer receives a [`CallContext`]. A transfer is where
//! control leaves the exchange: a receiver may run arbitrary code there, so
//! the context hands it a read-only view of the ledger as it stands at that
//! moment.

use shibui_orderbook::OrderBook;
use shibui_types::{Address, Amount, PaymentToken, Result, RoyaltyInfo, Timestamp, TokenId};

/// Caller identity plus any native value attached to the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    pub caller: Address,
    pub value: Amount,
}

impl Call {
    #[must_use]
    pub fn new(caller: Address) -> Self {
        Self { caller, value: 0 }
    }

    #[must_use]
    pub fn with_value(caller: Address, value: Amount) -> Self {
        Self { caller, value }
    }
}

/// What a collaborator sees while the exchange is calling out to it.
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    /// The exchange instance issuing the transfer (the spender/operator).
    pub exchange: Address,
    pub book: &'a OrderBook,
    pub now: Timestamp,
}

/// Ownership registry for unique assets.
pub trait AssetLedger {
    fn owner_of(&self, asset: Address, token_id: TokenId) -> Option<Address>;

    fn is_approved_for_all(&self, asset: Address, owner: Address, operator: Address) -> bool;

    /// Move `token_id` from `from` to `to`, with `ctx.exchange` as operator.
    fn transfer_asset(
        &mut self,
        ctx: &CallContext<'_>,
        asset: Address,
        from: Address,
        to: Address,
        token_id: TokenId,
    ) -> Result<()>;
}

/// Fungible payment tokens and native currency.
pub trait PaymentLedger {
    fn balance_of(&self, token: PaymentToken, holder: Address) -> Amount;

    fn allowance(&self, token: PaymentToken, owner: Address, spender: Address) -> Amount;

    /// Pull `amount` of `token` from `from` to `to`, spending the allowance
    /// `from` granted to `ctx.exchange`.
    fn transfer_from(
        &mut self,
        ctx: &CallContext<'_>,
        token: PaymentToken,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()>;

    /// Credit native value attached to a call to the exchange.
    fn receive_native(&mut self, ctx: &CallContext<'_>, from: Address, amount: Amount) -> Result<()>;

    /// Pay native value held by the exchange out to `to`.
    fn send_native(&mut self, ctx: &CallContext<'_>, to: Address, amount: Amount) -> Result<()>;
}

/// The execution environment an exchange runs in.
///
/// `checkpoint`/`revert_to` extend the all-or-nothing rule to collaborator
/// state: a failed call reverts every transfer it already made.
pub trait Host: AssetLedger + PaymentLedger {
    type Checkpoint;

    fn now(&self) -> Timestamp;

    fn checkpoint(&self) -> Self::Checkpoint;

    fn revert_to(&mut self, checkpoint: Self::Checkpoint);
}

/// External royalty lookup.
///
/// An error or a zero result is read as "no royalty"; the settlement goes
/// ahead either way.
pub trait RoyaltyResolver: Send + Sync {
    fn resolve_royalty(&self, asset: Address) -> Result<RoyaltyInfo>;
}

/// Resolver for deployments without an external royalty service.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRoyaltyResolver;

impl RoyaltyResolver for NoRoyaltyResolver {
    fn resolve_royalty(&self, _asset: Address) -> Result<RoyaltyInfo> {
        Ok(RoyaltyInfo::none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_defaults_to_no_value() {
        let caller = Address::from_low_u64(7);
        assert_eq!(Call::new(caller).value, 0);
        assert_eq!(Call::with_value(caller, 42).value, 42);
    }

    #[test]
    fn null_resolver_pays_nothing() {
        let info = NoRoyaltyResolver
            .resolve_royalty(Address::from_low_u64(1))
            .unwrap();
        assert!(info.is_none());
    }
}
