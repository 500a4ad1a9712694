//! The order ledger.
//!
//! Who may do what:
//!
//! | Operation            | Allowed operator                 |
//! |----------------------|----------------------------------|
//! | `book_*`, `cancel_*` | the order's party, or a keeper   |
//! | `book_signed_*`      | a keeper holding a valid intent  |
//! | `take_*`             | a keeper (settling exchange)     |
//! | keeper management    | the owner                        |
//!
//! Expiration is checked lazily: an expired record stays stored but every
//! read, cancel, or take treats it as absent.
//!
//! A signed intent books at most once. Its id stays recorded after the order
//! is canceled or settled, so a relayer cannot bring the order back.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use shibui_types::{
    Address, BuyOrder, ExchangeEvent, OrderKey, Result, SellOrder, ShibuiError, SignedIntent,
    Timestamp,
};

use crate::shared::SharedOrderBook;
use crate::{access::Ownable, keeper::KeeperRegistry, store::OrderStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    access: Ownable,
    keepers: KeeperRegistry,
    store: OrderStore,
    /// Ids of every signed intent booked so far.
    #[serde(default)]
    used_intents: BTreeSet<String>,
}

impl OrderBook {
    #[must_use]
    pub fn new(owner: Address) -> Self {
        Self {
            access: Ownable::new(owner),
            keepers: KeeperRegistry::new(),
            store: OrderStore::new(),
            used_intents: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn into_shared(self) -> SharedOrderBook {
        SharedOrderBook::new(self)
    }

    // ───────────────────────── Administration ─────────────────────────

    #[must_use]
    pub fn owner(&self) -> Address {
        self.access.owner()
    }

    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<ExchangeEvent> {
        self.access.transfer_ownership(caller, new_owner)
    }

    /// Register a keeper. Owner-only; returns `None` when the keeper was
    /// already registered (a no-op, not an error).
    pub fn add_order_keeper(&mut self, caller: Address, keeper: Address) -> Result<Option<ExchangeEvent>> {
        self.access.only_owner(caller)?;
        if keeper.is_zero() {
            return Err(ShibuiError::InvalidParameter {
                reason: "keeper is the zero address".into(),
            });
        }
        if !self.keepers.add(keeper) {
            return Ok(None);
        }
        tracing::info!(keeper = %keeper, "Order keeper added");
        Ok(Some(ExchangeEvent::OrderKeeperAdded { keeper }))
    }

    /// Unregister a keeper. Owner-only; `None` if it was not registered.
    pub fn remove_order_keeper(&mut self, caller: Address, keeper: Address) -> Result<Option<ExchangeEvent>> {
        self.access.only_owner(caller)?;
        if !self.keepers.remove(&keeper) {
            return Ok(None);
        }
        tracing::info!(keeper = %keeper, "Order keeper removed");
        Ok(Some(ExchangeEvent::OrderKeeperRemoved { keeper }))
    }

    #[must_use]
    pub fn is_keeper(&self, identity: &Address) -> bool {
        self.keepers.is_keeper(identity)
    }

    #[must_use]
    pub fn keepers(&self) -> &KeeperRegistry {
        &self.keepers
    }

    fn authorize(&self, operator: Address, party: Address) -> Result<()> {
        if (!operator.is_zero() && operator == party) || self.keepers.is_keeper(&operator) {
            Ok(())
        } else {
            Err(ShibuiError::NotOrderParty {
                caller: operator,
                party,
            })
        }
    }

    fn only_keeper(&self, operator: Address) -> Result<()> {
        if self.keepers.is_keeper(&operator) {
            Ok(())
        } else {
            Err(ShibuiError::NotKeeper { caller: operator })
        }
    }

    // ───────────────────────── Booking ─────────────────────────

    /// Book (or re-book) a sell order. Any existing record for the same key
    /// is replaced entirely.
    pub fn book_sell_order(&mut self, operator: Address, order: SellOrder, now: Timestamp) -> Result<ExchangeEvent> {
        self.authorize(operator, order.seller)?;
        order.validate_terms(now)?;
        Ok(self.insert_sell(order))
    }

    pub fn book_buy_order(&mut self, operator: Address, order: BuyOrder, now: Timestamp) -> Result<ExchangeEvent> {
        self.authorize(operator, order.buyer)?;
        order.validate_terms(now)?;
        Ok(self.insert_buy(order))
    }

    /// Book a sell order relayed by a keeper on the strength of the
    /// seller's signature.
    pub fn book_signed_sell_order(
        &mut self,
        operator: Address,
        intent: &SignedIntent<SellOrder>,
        now: Timestamp,
    ) -> Result<ExchangeEvent> {
        self.only_keeper(operator)?;
        intent.verify()?;
        let id = self.unused_intent(intent.signer(), intent.id())?;
        intent.order.validate_terms(now)?;
        self.used_intents.insert(id);
        Ok(self.insert_sell(intent.order))
    }

    pub fn book_signed_buy_order(
        &mut self,
        operator: Address,
        intent: &SignedIntent<BuyOrder>,
        now: Timestamp,
    ) -> Result<ExchangeEvent> {
        self.only_keeper(operator)?;
        intent.verify()?;
        let id = self.unused_intent(intent.signer(), intent.id())?;
        intent.order.validate_terms(now)?;
        self.used_intents.insert(id);
        Ok(self.insert_buy(intent.order))
    }

    fn unused_intent(&self, party: Address, id: String) -> Result<String> {
        if self.used_intents.contains(&id) {
            tracing::warn!(party = %party, intent = %id, "Replayed intent rejected");
            return Err(ShibuiError::IntentReplayed { party, intent: id });
        }
        Ok(id)
    }

    /// Whether the signed intent with this id has been booked.
    #[must_use]
    pub fn is_intent_used(&self, id: &str) -> bool {
        self.used_intents.contains(id)
    }

    fn insert_sell(&mut self, order: SellOrder) -> ExchangeEvent {
        let replaced = self.store.upsert_sell(order).is_some();
        tracing::info!(
            seller = %order.seller,
            asset = %order.asset,
            token_id = %order.token_id,
            price = order.price,
            expiration = order.expiration.0,
            replaced,
            "Sell order booked"
        );
        ExchangeEvent::SellOrderBooked {
            seller: order.seller,
            asset: order.asset,
            token_id: order.token_id,
            expiration: order.expiration,
            price: order.price,
            payment_token: order.payment_token,
        }
    }

    fn insert_buy(&mut self, order: BuyOrder) -> ExchangeEvent {
        let replaced = self.store.upsert_buy(order).is_some();
        tracing::info!(
            buyer = %order.buyer,
            seller = %order.seller,
            asset = %order.asset,
            token_id = %order.token_id,
            offer = order.offer,
            expiration = order.expiration.0,
            replaced,
            "Buy order booked"
        );
        ExchangeEvent::BuyOrderBooked {
            buyer: order.buyer,
            seller: order.seller,
            asset: order.asset,
            token_id: order.token_id,
            expiration: order.expiration,
            offer: order.offer,
            payment_token: order.payment_token,
        }
    }

    // ───────────────────────── Cancellation ─────────────────────────

    /// Delete a live sell order.
    ///
    /// # Errors
    /// `NotOrderParty` for a foreign caller; `SellOrderNotFound` /
    /// `OrderExpired` if there is no live record to cancel.
    pub fn cancel_sell_order(&mut self, operator: Address, key: OrderKey, now: Timestamp) -> Result<ExchangeEvent> {
        self.authorize(operator, key.party)?;
        self.live_sell(&key, now)?;
        self.store.remove_sell(&key);
        tracing::info!(seller = %key.party, asset = %key.asset, token_id = %key.token_id, "Sell order canceled");
        Ok(ExchangeEvent::SellOrderCanceled {
            seller: key.party,
            asset: key.asset,
            token_id: key.token_id,
        })
    }

    pub fn cancel_buy_order(&mut self, operator: Address, key: OrderKey, now: Timestamp) -> Result<ExchangeEvent> {
        self.authorize(operator, key.party)?;
        self.live_buy(&key, now)?;
        self.store.remove_buy(&key);
        tracing::info!(buyer = %key.party, asset = %key.asset, token_id = %key.token_id, "Buy order canceled");
        Ok(ExchangeEvent::BuyOrderCanceled {
            buyer: key.party,
            asset: key.asset,
            token_id: key.token_id,
        })
    }

    // ───────────────────────── Settlement support ─────────────────────────

    /// Remove and return a live sell order. Keeper-only: this is how a
    /// settling exchange consumes an order before moving any value.
    pub fn take_sell_order(&mut self, operator: Address, key: &OrderKey, now: Timestamp) -> Result<SellOrder> {
        self.only_keeper(operator)?;
        self.live_sell(key, now)?;
        self.store
            .remove_sell(key)
            .ok_or(ShibuiError::SellOrderNotFound(*key))
    }

    pub fn take_buy_order(&mut self, operator: Address, key: &OrderKey, now: Timestamp) -> Result<BuyOrder> {
        self.only_keeper(operator)?;
        self.live_buy(key, now)?;
        self.store
            .remove_buy(key)
            .ok_or(ShibuiError::BuyOrderNotFound(*key))
    }

    // ───────────────────────── Reads ─────────────────────────

    /// The live sell order under `key`, if any. Never fails.
    #[must_use]
    pub fn sell_order(&self, key: &OrderKey, now: Timestamp) -> Option<&SellOrder> {
        self.store.sell(key).filter(|o| o.is_live_at(now))
    }

    #[must_use]
    pub fn buy_order(&self, key: &OrderKey, now: Timestamp) -> Option<&BuyOrder> {
        self.store.buy(key).filter(|o| o.is_live_at(now))
    }

    /// The live sell order under `key`, distinguishing a missing record
    /// from an expired one.
    pub fn live_sell(&self, key: &OrderKey, now: Timestamp) -> Result<&SellOrder> {
        let order = self
            .store
            .sell(key)
            .ok_or(ShibuiError::SellOrderNotFound(*key))?;
        if !order.is_live_at(now) {
            return Err(ShibuiError::OrderExpired {
                key: *key,
                expiration: order.expiration,
            });
        }
        Ok(order)
    }

    pub fn live_buy(&self, key: &OrderKey, now: Timestamp) -> Result<&BuyOrder> {
        let order = self
            .store
            .buy(key)
            .ok_or(ShibuiError::BuyOrderNotFound(*key))?;
        if !order.is_live_at(now) {
            return Err(ShibuiError::OrderExpired {
                key: *key,
                expiration: order.expiration,
            });
        }
        Ok(order)
    }

    #[must_use]
    pub fn store(&self) -> &OrderStore {
        &self.store
    }
}
