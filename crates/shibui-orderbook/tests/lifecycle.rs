//! Order lifecycle across a shared ledger.

use std::sync::Once;

use shibui_orderbook::OrderBook;
use shibui_types::{
    Address, BuyOrder, ExchangeEvent, OrderKey, PaymentToken, SellOrder, ShibuiError, Timestamp, TokenId,
};

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

const NOW: Timestamp = Timestamp(10_000);

struct Fixture {
    owner: Address,
    exchange_a: Address,
    exchange_b: Address,
    seller: Address,
    buyer: Address,
    asset: Address,
}

impl Fixture {
    fn new() -> (Self, OrderBook) {
        init_tracing();
        let fixture = Self {
            owner: Address::random(),
            exchange_a: Address::random(),
            exchange_b: Address::random(),
            seller: Address::random(),
            buyer: Address::random(),
            asset: Address::random(),
        };
        let mut book = OrderBook::new(fixture.owner);
        book.add_order_keeper(fixture.owner, fixture.exchange_a).unwrap();
        book.add_order_keeper(fixture.owner, fixture.exchange_b).unwrap();
        (fixture, book)
    }

    fn sell(&self, token_id: u128, price: u128) -> SellOrder {
        SellOrder {
            seller: self.seller,
            asset: self.asset,
            token_id: TokenId(token_id),
            expiration: NOW.plus_secs(3_600),
            price,
            payment_token: PaymentToken::NATIVE,
        }
    }

    fn buy(&self, token_id: u128, offer: u128) -> BuyOrder {
        BuyOrder {
            buyer: self.buyer,
            seller: self.seller,
            asset: self.asset,
            token_id: TokenId(token_id),
            expiration: NOW.plus_secs(3_600),
            offer,
            payment_token: PaymentToken(Address::from_low_u64(0xe20)),
        }
    }
}

#[test]
fn order_booked_through_one_keeper_is_taken_by_another() {
    let (fx, book) = Fixture::new();
    let shared = book.into_shared();

    let order = fx.sell(7, 1_000);
    shared.enter().unwrap().book_sell_order(fx.exchange_a, order, NOW).unwrap();

    let taken = shared
        .enter()
        .unwrap()
        .take_sell_order(fx.exchange_b, &order.key(), NOW)
        .unwrap();
    assert_eq!(taken, order);
    assert!(shared.read(|book| book.sell_order(&order.key(), NOW).is_none()).unwrap());
}

#[test]
fn second_handle_waits_for_the_first_across_threads() {
    let (fx, book) = Fixture::new();
    let shared = book.into_shared();
    let order = fx.sell(8, 1_000);

    let mut guard = shared.enter().unwrap();
    let other = shared.clone();
    let exchange_b = fx.exchange_b;
    let worker = std::thread::spawn(move || {
        other
            .enter()
            .map(|mut book| book.take_sell_order(exchange_b, &order.key(), NOW))
    });
    guard.book_sell_order(fx.exchange_a, order, NOW).unwrap();
    drop(guard);

    let taken = worker.join().unwrap().unwrap().unwrap();
    assert_eq!(taken, order);
}

#[test]
fn removed_keeper_loses_access() {
    let (fx, mut book) = Fixture::new();
    let order = fx.buy(3, 500);
    book.book_buy_order(fx.buyer, order, NOW).unwrap();

    let event = book.remove_order_keeper(fx.owner, fx.exchange_a).unwrap();
    assert_eq!(
        event,
        Some(ExchangeEvent::OrderKeeperRemoved {
            keeper: fx.exchange_a
        })
    );
    assert!(matches!(
        book.take_buy_order(fx.exchange_a, &order.key(), NOW),
        Err(ShibuiError::NotKeeper { .. })
    ));
    assert!(book.take_buy_order(fx.exchange_b, &order.key(), NOW).is_ok());
}

#[test]
fn rebook_after_cancel_starts_fresh() {
    let (fx, mut book) = Fixture::new();
    let order = fx.sell(1, 100);
    book.book_sell_order(fx.seller, order, NOW).unwrap();
    book.cancel_sell_order(fx.seller, order.key(), NOW).unwrap();

    let repriced = fx.sell(1, 175);
    book.book_sell_order(fx.seller, repriced, NOW).unwrap();
    assert_eq!(book.sell_order(&order.key(), NOW).map(|o| o.price), Some(175));
}

#[test]
fn expired_record_can_be_rebooked() {
    let (fx, mut book) = Fixture::new();
    let order = fx.sell(2, 100);
    book.book_sell_order(fx.seller, order, NOW).unwrap();

    let later = order.expiration.plus_secs(1);
    assert!(book.sell_order(&order.key(), later).is_none());
    assert!(matches!(
        book.take_sell_order(fx.exchange_a, &order.key(), later),
        Err(ShibuiError::OrderExpired { .. })
    ));

    let mut fresh = order;
    fresh.expiration = later.plus_secs(60);
    book.book_sell_order(fx.seller, fresh, later).unwrap();
    assert_eq!(book.sell_order(&order.key(), later), Some(&fresh));
}

#[test]
fn keeper_cancels_on_behalf_of_party() {
    let (fx, mut book) = Fixture::new();
    let order = fx.buy(4, 90);
    book.book_buy_order(fx.buyer, order, NOW).unwrap();

    let key = OrderKey::new(fx.buyer, fx.asset, TokenId(4));
    let event = book.cancel_buy_order(fx.exchange_b, key, NOW).unwrap();
    assert_eq!(event.name(), "BuyOrderCanceled");
    assert_eq!(book.store().buy_count(), 0);
}

#[test]
fn ownership_transfer_moves_keeper_administration() {
    let (fx, mut book) = Fixture::new();
    let next = Address::random();
    book.transfer_ownership(fx.owner, next).unwrap();

    assert!(matches!(
        book.add_order_keeper(fx.owner, Address::random()),
        Err(ShibuiError::NotOwner { .. })
    ));
    assert!(book.add_order_keeper(next, Address::random()).unwrap().is_some());
    assert_eq!(book.keepers().len(), 3);
}
