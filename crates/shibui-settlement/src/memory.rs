//! In-memory host: asset ownership, fungible balances, native currency and
//! a clock, with receive hooks standing in for receiver contracts.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use shibui_types::{
    Address, Amount, Clock, ManualClock, PaymentToken, Result, ShibuiError, Timestamp, TokenId,
};

use crate::host::{AssetLedger, CallContext, Host, PaymentLedger};

/// What arrived at a recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Asset {
        asset: Address,
        token_id: TokenId,
        from: Address,
    },
    Payment {
        token: PaymentToken,
        from: Address,
        amount: Amount,
    },
    Native {
        from: Address,
        amount: Amount,
    },
}

/// One completed transfer, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub to: Address,
    pub delivery: Delivery,
}

/// Code run when `recipient` receives something. Returning an error makes
/// the transfer fail.
pub type ReceiveHook = Arc<dyn Fn(&CallContext<'_>, &Transfer) -> Result<()> + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LedgerState {
    owners: BTreeMap<(Address, TokenId), Address>,
    /// (asset, owner, operator)
    operators: BTreeSet<(Address, Address, Address)>,
    balances: BTreeMap<(PaymentToken, Address), Amount>,
    /// (token, owner, spender)
    allowances: BTreeMap<(PaymentToken, Address, Address), Amount>,
    native: BTreeMap<Address, Amount>,
    transfers: Vec<Transfer>,
}

/// Saved collaborator state, restored by [`Host::revert_to`].
#[derive(Debug, Clone)]
pub struct LedgerSnapshot(LedgerState);

pub struct InMemoryHost<C: Clock = ManualClock> {
    state: LedgerState,
    clock: C,
    hooks: BTreeMap<Address, ReceiveHook>,
}

impl InMemoryHost<ManualClock> {
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self::with_clock(ManualClock::new(start))
    }

    /// Move the manual clock forward.
    pub fn advance(&self, secs: u64) {
        self.clock.advance(secs);
    }

    pub fn set_time(&self, at: Timestamp) {
        self.clock.set(at);
    }
}

impl<C: Clock> InMemoryHost<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            state: LedgerState::default(),
            clock,
            hooks: BTreeMap::new(),
        }
    }

    // ───────────────────────── Setup ─────────────────────────

    pub fn mint_asset(&mut self, asset: Address, token_id: TokenId, owner: Address) {
        self.state.owners.insert((asset, token_id), owner);
    }

    pub fn set_approval_for_all(&mut self, asset: Address, owner: Address, operator: Address, approved: bool) {
        if approved {
            self.state.operators.insert((asset, owner, operator));
        } else {
            self.state.operators.remove(&(asset, owner, operator));
        }
    }

    pub fn mint_tokens(&mut self, token: PaymentToken, holder: Address, amount: Amount) {
        *self.state.balances.entry((token, holder)).or_default() += amount;
    }

    pub fn approve(&mut self, token: PaymentToken, owner: Address, spender: Address, amount: Amount) {
        self.state.allowances.insert((token, owner, spender), amount);
    }

    pub fn deal_native(&mut self, holder: Address, amount: Amount) {
        *self.state.native.entry(holder).or_default() += amount;
    }

    pub fn set_hook(&mut self, recipient: Address, hook: ReceiveHook) {
        self.hooks.insert(recipient, hook);
    }

    pub fn clear_hook(&mut self, recipient: &Address) {
        self.hooks.remove(recipient);
    }

    // ───────────────────────── Inspection ─────────────────────────

    #[must_use]
    pub fn native_balance(&self, holder: Address) -> Amount {
        self.state.native.get(&holder).copied().unwrap_or(0)
    }

    /// Completed transfers, oldest first. Reverted transfers are gone.
    #[must_use]
    pub fn transfers(&self) -> &[Transfer] {
        &self.state.transfers
    }

    fn deliver(&mut self, ctx: &CallContext<'_>, leg: &str, transfer: Transfer) -> Result<()> {
        if let Some(hook) = self.hooks.get(&transfer.to) {
            hook(ctx, &transfer).map_err(|e| ShibuiError::transfer(leg, e.to_string()))?;
        }
        self.state.transfers.push(transfer);
        Ok(())
    }

    fn debit(map: &mut BTreeMap<(PaymentToken, Address), Amount>, key: (PaymentToken, Address), amount: Amount) -> Result<()> {
        let available = map.get(&key).copied().unwrap_or(0);
        if available < amount {
            return Err(ShibuiError::transfer(
                "payment",
                format!("balance {available} below {amount}"),
            ));
        }
        map.insert(key, available - amount);
        Ok(())
    }
}

impl<C: Clock> fmt::Debug for InMemoryHost<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryHost")
            .field("now", &self.clock.now())
            .field("assets", &self.state.owners.len())
            .field("transfers", &self.state.transfers.len())
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

impl<C: Clock> AssetLedger for InMemoryHost<C> {
    fn owner_of(&self, asset: Address, token_id: TokenId) -> Option<Address> {
        self.state.owners.get(&(asset, token_id)).copied()
    }

    fn is_approved_for_all(&self, asset: Address, owner: Address, operator: Address) -> bool {
        self.state.operators.contains(&(asset, owner, operator))
    }

    fn transfer_asset(
        &mut self,
        ctx: &CallContext<'_>,
        asset: Address,
        from: Address,
        to: Address,
        token_id: TokenId,
    ) -> Result<()> {
        if self.owner_of(asset, token_id) != Some(from) {
            return Err(ShibuiError::transfer(
                "asset",
                format!("{from} does not own {asset}{token_id}"),
            ));
        }
        if ctx.exchange != from && !self.is_approved_for_all(asset, from, ctx.exchange) {
            return Err(ShibuiError::transfer(
                "asset",
                format!("{} is not an approved operator for {from}", ctx.exchange),
            ));
        }
        if to.is_zero() {
            return Err(ShibuiError::transfer("asset", "transfer to the zero address"));
        }
        self.state.owners.insert((asset, token_id), to);
        self.deliver(
            ctx,
            "asset",
            Transfer {
                to,
                delivery: Delivery::Asset { asset, token_id, from },
            },
        )
    }
}

impl<C: Clock> PaymentLedger for InMemoryHost<C> {
    fn balance_of(&self, token: PaymentToken, holder: Address) -> Amount {
        self.state.balances.get(&(token, holder)).copied().unwrap_or(0)
    }

    fn allowance(&self, token: PaymentToken, owner: Address, spender: Address) -> Amount {
        self.state
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or(0)
    }

    fn transfer_from(
        &mut self,
        ctx: &CallContext<'_>,
        token: PaymentToken,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        let approved = self.allowance(token, from, ctx.exchange);
        if approved < amount {
            return Err(ShibuiError::transfer(
                "payment",
                format!("allowance {approved} below {amount}"),
            ));
        }
        Self::debit(&mut self.state.balances, (token, from), amount)?;
        self.state
            .allowances
            .insert((token, from, ctx.exchange), approved - amount);
        *self.state.balances.entry((token, to)).or_default() += amount;
        self.deliver(
            ctx,
            "payment",
            Transfer {
                to,
                delivery: Delivery::Payment { token, from, amount },
            },
        )
    }

    fn receive_native(&mut self, ctx: &CallContext<'_>, from: Address, amount: Amount) -> Result<()> {
        let available = self.native_balance(from);
        if available < amount {
            return Err(ShibuiError::transfer(
                "native",
                format!("{from} holds {available}, attached {amount}"),
            ));
        }
        self.state.native.insert(from, available - amount);
        *self.state.native.entry(ctx.exchange).or_default() += amount;
        self.deliver(
            ctx,
            "native",
            Transfer {
                to: ctx.exchange,
                delivery: Delivery::Native { from, amount },
            },
        )
    }

    fn send_native(&mut self, ctx: &CallContext<'_>, to: Address, amount: Amount) -> Result<()> {
        let held = self.native_balance(ctx.exchange);
        if held < amount {
            return Err(ShibuiError::transfer(
                "native",
                format!("exchange holds {held}, owes {amount}"),
            ));
        }
        self.state.native.insert(ctx.exchange, held - amount);
        *self.state.native.entry(to).or_default() += amount;
        self.deliver(
            ctx,
            "native",
            Transfer {
                to,
                delivery: Delivery::Native {
                    from: ctx.exchange,
                    amount,
                },
            },
        )
    }
}

impl<C: Clock> Host for InMemoryHost<C> {
    type Checkpoint = LedgerSnapshot;

    fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn checkpoint(&self) -> LedgerSnapshot {
        LedgerSnapshot(self.state.clone())
    }

    fn revert_to(&mut self, checkpoint: LedgerSnapshot) {
        self.state = checkpoint.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shibui_orderbook::OrderBook;

    fn ctx(book: &OrderBook, exchange: Address) -> CallContext<'_> {
        CallContext {
            exchange,
            book,
            now: Timestamp(0),
        }
    }

    #[test]
    fn asset_transfer_requires_operator_approval() {
        let book = OrderBook::new(Address::random());
        let exchange = Address::random();
        let (asset, alice, bob) = (Address::random(), Address::random(), Address::random());
        let mut host = InMemoryHost::new(Timestamp(0));
        host.mint_asset(asset, TokenId(1), alice);

        let err = host
            .transfer_asset(&ctx(&book, exchange), asset, alice, bob, TokenId(1))
            .unwrap_err();
        assert!(matches!(err, ShibuiError::TransferFailed { .. }));

        host.set_approval_for_all(asset, alice, exchange, true);
        host.transfer_asset(&ctx(&book, exchange), asset, alice, bob, TokenId(1))
            .unwrap();
        assert_eq!(host.owner_of(asset, TokenId(1)), Some(bob));
    }

    #[test]
    fn transfer_from_spends_allowance() {
        let book = OrderBook::new(Address::random());
        let exchange = Address::random();
        let token = PaymentToken(Address::random());
        let (alice, bob) = (Address::random(), Address::random());
        let mut host = InMemoryHost::new(Timestamp(0));
        host.mint_tokens(token, alice, 1_000);
        host.approve(token, alice, exchange, 600);

        host.transfer_from(&ctx(&book, exchange), token, alice, bob, 400)
            .unwrap();
        assert_eq!(host.balance_of(token, alice), 600);
        assert_eq!(host.balance_of(token, bob), 400);
        assert_eq!(host.allowance(token, alice, exchange), 200);

        assert!(host
            .transfer_from(&ctx(&book, exchange), token, alice, bob, 300)
            .is_err());
    }

    #[test]
    fn hook_rejection_fails_transfer() {
        let book = OrderBook::new(Address::random());
        let exchange = Address::random();
        let bob = Address::random();
        let mut host = InMemoryHost::new(Timestamp(0));
        host.deal_native(exchange, 50);
        host.set_hook(
            bob,
            Arc::new(|_: &CallContext<'_>, _: &Transfer| {
                Err(ShibuiError::Internal("refused".into()))
            }),
        );

        let err = host.send_native(&ctx(&book, exchange), bob, 50).unwrap_err();
        assert!(matches!(err, ShibuiError::TransferFailed { .. }));
    }

    #[test]
    fn revert_restores_balances_and_log() {
        let book = OrderBook::new(Address::random());
        let exchange = Address::random();
        let alice = Address::random();
        let mut host = InMemoryHost::new(Timestamp(0));
        host.deal_native(alice, 100);

        let checkpoint = host.checkpoint();
        host.receive_native(&ctx(&book, exchange), alice, 100).unwrap();
        assert_eq!(host.native_balance(exchange), 100);
        assert_eq!(host.transfers().len(), 1);

        host.revert_to(checkpoint);
        assert_eq!(host.native_balance(alice), 100);
        assert_eq!(host.native_balance(exchange), 0);
        assert!(host.transfers().is_empty());
    }

    #[test]
    fn manual_clock_drives_now() {
        let host = InMemoryHost::new(Timestamp(10));
        host.advance(5);
        assert_eq!(host.now(), Timestamp(15));
        host.set_time(Timestamp(3));
        assert_eq!(host.now(), Timestamp(3));
    }
}
