//! Keyed order storage.
//!
//! Pure storage: no authorization, no validation, no events. Booking is an
//! upsert, removal is the only way a record leaves, and records are never
//! partially updated.
//!
//! Serialized as two flat lists sorted by key, which keeps the persisted
//! layout independent of the in-memory map type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shibui_types::{BuyOrder, OrderKey, SellOrder};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoreLayout", into = "StoreLayout")]
pub struct OrderStore {
    sell_orders: BTreeMap<OrderKey, SellOrder>,
    buy_orders: BTreeMap<OrderKey, BuyOrder>,
}

/// On-disk shape of an [`OrderStore`].
#[derive(Serialize, Deserialize)]
struct StoreLayout {
    sell_orders: Vec<SellOrder>,
    buy_orders: Vec<BuyOrder>,
}

impl From<StoreLayout> for OrderStore {
    fn from(layout: StoreLayout) -> Self {
        Self {
            sell_orders: layout.sell_orders.into_iter().map(|o| (o.key(), o)).collect(),
            buy_orders: layout.buy_orders.into_iter().map(|o| (o.key(), o)).collect(),
        }
    }
}

impl From<OrderStore> for StoreLayout {
    fn from(store: OrderStore) -> Self {
        Self {
            sell_orders: store.sell_orders.into_values().collect(),
            buy_orders: store.buy_orders.into_values().collect(),
        }
    }
}

impl OrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the sell order under its key. Returns the record it
    /// replaced, if any.
    pub fn upsert_sell(&mut self, order: SellOrder) -> Option<SellOrder> {
        self.sell_orders.insert(order.key(), order)
    }

    pub fn upsert_buy(&mut self, order: BuyOrder) -> Option<BuyOrder> {
        self.buy_orders.insert(order.key(), order)
    }

    pub fn remove_sell(&mut self, key: &OrderKey) -> Option<SellOrder> {
        self.sell_orders.remove(key)
    }

    pub fn remove_buy(&mut self, key: &OrderKey) -> Option<BuyOrder> {
        self.buy_orders.remove(key)
    }

    /// Stored record regardless of expiration.
    #[must_use]
    pub fn sell(&self, key: &OrderKey) -> Option<&SellOrder> {
        self.sell_orders.get(key)
    }

    #[must_use]
    pub fn buy(&self, key: &OrderKey) -> Option<&BuyOrder> {
        self.buy_orders.get(key)
    }

    pub fn sell_orders(&self) -> impl Iterator<Item = &SellOrder> {
        self.sell_orders.values()
    }

    pub fn buy_orders(&self) -> impl Iterator<Item = &BuyOrder> {
        self.buy_orders.values()
    }

    /// Number of stored sell records, expired ones included.
    #[must_use]
    pub fn sell_count(&self) -> usize {
        self.sell_orders.len()
    }

    #[must_use]
    pub fn buy_count(&self) -> usize {
        self.buy_orders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shibui_types::{Address, PaymentToken};

    #[test]
    fn upsert_replaces_terms() {
        let mut store = OrderStore::new();
        let seller = Address::random();
        let asset = Address::random();

        let first = SellOrder::dummy(seller, asset, 1, 100);
        assert!(store.upsert_sell(first).is_none());

        let second = SellOrder::dummy(seller, asset, 1, 250);
        assert_eq!(store.upsert_sell(second), Some(first));
        assert_eq!(store.sell(&second.key()), Some(&second));
        assert_eq!(store.sell_count(), 1);
    }

    #[test]
    fn sell_and_buy_keys_are_independent() {
        let mut store = OrderStore::new();
        let party = Address::random();
        let asset = Address::random();
        store.upsert_sell(SellOrder::dummy(party, asset, 1, 100));
        store.upsert_buy(BuyOrder::dummy(
            party,
            Address::random(),
            asset,
            1,
            90,
            PaymentToken(Address::random()),
        ));
        assert_eq!(store.sell_count(), 1);
        assert_eq!(store.buy_count(), 1);

        let key = OrderKey::new(party, asset, shibui_types::TokenId(1));
        assert!(store.remove_sell(&key).is_some());
        assert!(store.buy(&key).is_some());
    }

    #[test]
    fn remove_is_single_shot() {
        let mut store = OrderStore::new();
        let order = SellOrder::dummy(Address::random(), Address::random(), 5, 10);
        store.upsert_sell(order);
        assert_eq!(store.remove_sell(&order.key()), Some(order));
        assert_eq!(store.remove_sell(&order.key()), None);
    }

    #[test]
    fn layout_roundtrip() {
        let mut store = OrderStore::new();
        for id in 0..3 {
            store.upsert_sell(SellOrder::dummy(Address::random(), Address::random(), id, 10 + id));
        }
        store.upsert_buy(BuyOrder::dummy(
            Address::random(),
            Address::random(),
            Address::random(),
            9,
            77,
            PaymentToken(Address::random()),
        ));

        let json = serde_json::to_string(&store).unwrap();
        let back: OrderStore = serde_json::from_str(&json).unwrap();
        assert_eq!(store, back);
    }
}
