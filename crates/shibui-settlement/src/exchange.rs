//! The exchange: one logic instance bound to a shared order ledger.
//!
//! Every mutating call runs as a transaction:
//! 1. Enter the shared ledger for the whole call
//! 2. Snapshot ledger, storage, event log, and host state
//! 3. Run the call
//! 4. On error, restore all four and return the error unchanged
//!
//! Settlement deletes the order and publishes the ledger view before the
//! first outbound transfer. A receiver reading the ledger mid-call, directly
//! or through any exchange instance sharing it, already sees the order gone.
//! A nested mutating call on a ledger already entered fails with
//! `ReentrantCall`.

use std::sync::Arc;

use shibui_orderbook::{LedgerGuard, OrderBook, SharedOrderBook};
use shibui_types::{
    Address, Amount, BuyOrder, ExchangeConfig, ExchangeEvent, FeeRate, FeeSplit, FeeWalletPolicy,
    LogicVersion, OrderKey, OrderSide, PaymentToken, ReadMissPolicy, ReceiptId, Result,
    RoyaltyInfo, SellOrder, ShibuiError, SignedIntent, Timestamp, TokenId,
};

use crate::host::{Call, CallContext, Host, RoyaltyResolver};
use crate::receipt::SettlementReceipt;
use crate::royalty::effective_royalty;
use crate::storage::ExchangeStorage;
use crate::upgrade::{BaseLogic, ExchangeLogic, LogicTable};

/// State captured at the start of a call.
struct Snapshot {
    book: OrderBook,
    storage: ExchangeStorage,
    events: usize,
}

/// Fee split plus resolved recipients, fixed before the order is deleted.
struct Payout {
    split: FeeSplit,
    fee_wallet: Address,
    royalty: RoyaltyInfo,
}

pub struct Exchange {
    address: Address,
    storage: ExchangeStorage,
    book: SharedOrderBook,
    resolver: Arc<dyn RoyaltyResolver>,
    logic: LogicTable,
    events: Vec<ExchangeEvent>,
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("address", &self.address)
            .field("storage", &self.storage)
            .field("logic", &self.logic)
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl Exchange {
    /// Deploy an exchange at `address`, owned by `owner`, running the base
    /// logic against `book`.
    ///
    /// Settling orders requires `address` to be a keeper of `book`.
    pub fn new(
        address: Address,
        owner: Address,
        config: ExchangeConfig,
        book: SharedOrderBook,
        resolver: Arc<dyn RoyaltyResolver>,
    ) -> Result<Self> {
        if address.is_zero() || owner.is_zero() {
            return Err(ShibuiError::InvalidParameter {
                reason: "exchange and owner must be non-zero".into(),
            });
        }
        config.validate()?;
        tracing::info!(
            exchange = %address,
            owner = %owner,
            system_fee = %config.system_fee_rate,
            read_miss = ?config.read_miss,
            "Exchange deployed"
        );
        Ok(Self {
            address,
            storage: ExchangeStorage::new(owner, config),
            book,
            resolver,
            logic: LogicTable::new(LogicVersion::INITIAL, Arc::new(BaseLogic)),
            events: Vec::new(),
        })
    }

    /// Rebuild an exchange from exported storage, running `logic` at the
    /// stored version.
    ///
    /// # Errors
    /// `ReleaseMismatch` unless `logic` is the release the storage was last
    /// migrated by.
    pub fn restore(
        address: Address,
        storage_json: &str,
        book: SharedOrderBook,
        resolver: Arc<dyn RoyaltyResolver>,
        logic: Arc<dyn ExchangeLogic>,
    ) -> Result<Self> {
        let storage = ExchangeStorage::from_json(storage_json)?;
        if logic.release() != storage.release {
            tracing::warn!(
                exchange = %address,
                version = %storage.version,
                expected = %storage.release,
                actual = logic.release(),
                "Restore with foreign logic refused"
            );
            return Err(ShibuiError::ReleaseMismatch {
                expected: storage.release,
                actual: logic.release().to_string(),
            });
        }
        tracing::info!(
            exchange = %address,
            version = %storage.version,
            release = logic.release(),
            "Exchange restored"
        );
        Ok(Self {
            address,
            logic: LogicTable::new(storage.version, logic),
            storage,
            book,
            resolver,
            events: Vec::new(),
        })
    }

    /// Serialize the persisted layout.
    pub fn export_storage(&self) -> Result<String> {
        self.storage.to_json()
    }

    // ───────────────────────── Accessors ─────────────────────────

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn owner(&self) -> Address {
        self.storage.access.owner()
    }

    #[must_use]
    pub fn config(&self) -> &ExchangeConfig {
        &self.storage.config
    }

    #[must_use]
    pub fn system_fee_wallet(&self) -> Address {
        self.storage.fee_wallet
    }

    #[must_use]
    pub fn system_fee_rate(&self) -> FeeRate {
        self.storage.config.system_fee_rate
    }

    /// Royalty a sale of `asset` would pay right now.
    #[must_use]
    pub fn royalty(&self, asset: Address) -> RoyaltyInfo {
        effective_royalty(
            &self.storage.royalties,
            self.resolver.as_ref(),
            asset,
            self.storage.config.system_fee_rate,
        )
    }

    #[must_use]
    pub fn version(&self) -> LogicVersion {
        self.storage.version
    }

    /// Release tag of the active logic module.
    #[must_use]
    pub fn release(&self) -> &'static str {
        self.logic.active().release()
    }

    #[must_use]
    pub fn logic(&self) -> &LogicTable {
        &self.logic
    }

    #[must_use]
    pub fn book(&self) -> SharedOrderBook {
        self.book.clone()
    }

    /// Events committed so far, oldest first.
    #[must_use]
    pub fn events(&self) -> &[ExchangeEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<ExchangeEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: ExchangeEvent) {
        self.events.push(event);
    }

    // ───────────────────────── Transactions ─────────────────────────

    fn snapshot(&self, book: &OrderBook) -> Snapshot {
        Snapshot {
            book: book.clone(),
            storage: self.storage.clone(),
            events: self.events.len(),
        }
    }

    fn rollback(&mut self, book: &mut OrderBook, snapshot: Snapshot, action: &str, error: &ShibuiError) {
        *book = snapshot.book;
        self.storage = snapshot.storage;
        self.events.truncate(snapshot.events);
        tracing::warn!(
            exchange = %self.address,
            action,
            code = %error.kind(),
            error = %error,
            "Call reverted"
        );
    }

    /// Run `f` with all-or-nothing semantics over ledger, storage, events,
    /// and host.
    fn transact<H, T, F>(&mut self, host: &mut H, action: &str, f: F) -> Result<T>
    where
        H: Host,
        F: FnOnce(&mut Self, &mut LedgerGuard<'_>, &mut H) -> Result<T>,
    {
        let shared = self.book.clone();
        let mut book = shared.enter()?;
        let snapshot = self.snapshot(&book);
        let checkpoint = host.checkpoint();
        match f(&mut *self, &mut book, &mut *host) {
            Ok(value) => Ok(value),
            Err(e) => {
                host.revert_to(checkpoint);
                self.rollback(&mut book, snapshot, action, &e);
                Err(e)
            }
        }
    }

    /// [`Exchange::transact`] for calls that never touch the host.
    fn administer<T, F>(&mut self, action: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self, &mut OrderBook) -> Result<T>,
    {
        let shared = self.book.clone();
        let mut book = shared.enter()?;
        let snapshot = self.snapshot(&book);
        match f(&mut *self, &mut *book) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.rollback(&mut book, snapshot, action, &e);
                Err(e)
            }
        }
    }

    // ───────────────────────── Administration ─────────────────────────

    pub fn transfer_ownership(&mut self, call: Call, new_owner: Address) -> Result<()> {
        self.administer("transfer_ownership", |ex, _| {
            let event = ex.storage.access.transfer_ownership(call.caller, new_owner)?;
            ex.emit(event);
            Ok(())
        })
    }

    /// Set the system fee recipient. Setting zero unsets it.
    pub fn set_system_fee_wallet(&mut self, call: Call, wallet: Address) -> Result<()> {
        self.administer("set_system_fee_wallet", |ex, _| {
            ex.storage.access.only_owner(call.caller)?;
            ex.storage.fee_wallet = wallet;
            tracing::info!(exchange = %ex.address, wallet = %wallet, "System fee wallet set");
            ex.emit(ExchangeEvent::SystemFeeWalletSet { wallet });
            Ok(())
        })
    }

    /// Change the system fee rate, if the deployment allows it.
    ///
    /// # Errors
    /// `FeeRateFixed` unless `fee_rate_settable`; `FeeRateTooHigh` if the
    /// new rate plus any configured royalty exceeds 100%.
    pub fn set_system_fee_rate(&mut self, call: Call, rate: FeeRate) -> Result<()> {
        self.administer("set_system_fee_rate", |ex, _| {
            ex.storage.access.only_owner(call.caller)?;
            if !ex.storage.config.fee_rate_settable {
                return Err(ShibuiError::FeeRateFixed);
            }
            ex.storage.config.system_fee_rate = rate;
            ex.storage.check_fee_headroom()?;
            ex.storage.config.validate()?;
            tracing::info!(exchange = %ex.address, rate = %rate, "System fee rate set");
            ex.emit(ExchangeEvent::SystemFeeRateSet { rate });
            Ok(())
        })
    }

    pub fn set_royalty(&mut self, call: Call, asset: Address, beneficiary: Address, rate: FeeRate) -> Result<()> {
        self.administer("set_royalty", |ex, _| {
            ex.storage.access.only_owner(call.caller)?;
            let info = RoyaltyInfo::new(beneficiary, rate);
            ex.storage
                .royalties
                .set(asset, info, ex.storage.config.system_fee_rate)?;
            tracing::info!(
                exchange = %ex.address,
                asset = %asset,
                beneficiary = %beneficiary,
                rate = %rate,
                "Royalty set"
            );
            ex.emit(ExchangeEvent::RoyaltySet {
                asset,
                beneficiary,
                rate,
            });
            Ok(())
        })
    }

    /// Drop the configured royalty for `asset`. A no-op if none is set.
    pub fn remove_royalty(&mut self, call: Call, asset: Address) -> Result<()> {
        self.administer("remove_royalty", |ex, _| {
            ex.storage.access.only_owner(call.caller)?;
            if ex.storage.royalties.remove(&asset).is_some() {
                tracing::info!(exchange = %ex.address, asset = %asset, "Royalty removed");
                ex.emit(ExchangeEvent::RoyaltyRemoved { asset });
            }
            Ok(())
        })
    }

    /// Register a keeper on the shared ledger. The caller must own the
    /// ledger.
    pub fn add_order_keeper(&mut self, call: Call, keeper: Address) -> Result<()> {
        self.administer("add_order_keeper", |ex, book| {
            if let Some(event) = book.add_order_keeper(call.caller, keeper)? {
                ex.emit(event);
            }
            Ok(())
        })
    }

    pub fn remove_order_keeper(&mut self, call: Call, keeper: Address) -> Result<()> {
        self.administer("remove_order_keeper", |ex, book| {
            if let Some(event) = book.remove_order_keeper(call.caller, keeper)? {
                ex.emit(event);
            }
            Ok(())
        })
    }

    // ───────────────────────── Booking ─────────────────────────

    fn reject_value(call: Call) -> Result<()> {
        if call.value == 0 {
            Ok(())
        } else {
            Err(ShibuiError::PaymentMismatch {
                expected: 0,
                attached: call.value,
            })
        }
    }

    /// The seller must own the asset and have approved this exchange.
    fn check_listing<H: Host>(&self, host: &H, order: &SellOrder) -> Result<()> {
        if host.owner_of(order.asset, order.token_id) != Some(order.seller) {
            return Err(ShibuiError::NotAssetOwner {
                caller: order.seller,
                asset: order.asset,
                token_id: order.token_id,
            });
        }
        if !host.is_approved_for_all(order.asset, order.seller, self.address) {
            return Err(ShibuiError::ExchangeNotApproved {
                owner: order.seller,
                asset: order.asset,
            });
        }
        Ok(())
    }

    /// The payer must be able to cover `amount` of `token` through this
    /// exchange.
    fn check_funding<H: Host>(&self, host: &H, token: PaymentToken, payer: Address, amount: Amount) -> Result<()> {
        let available = host.balance_of(token, payer);
        if available < amount {
            return Err(ShibuiError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        let approved = host.allowance(token, payer, self.address);
        if approved < amount {
            return Err(ShibuiError::InsufficientAllowance {
                needed: amount,
                approved,
            });
        }
        Ok(())
    }

    fn check_bid<H: Host>(&self, host: &H, order: &BuyOrder) -> Result<()> {
        if order.payment_token == self.storage.config.native_payment_token {
            return Err(ShibuiError::NativeBuyOrder);
        }
        self.check_funding(host, order.payment_token, order.buyer, order.offer)
    }

    /// Book a sell order. The caller must be the seller or a ledger keeper;
    /// either way the seller must own the asset and have approved this
    /// exchange.
    pub fn book_sell_order<H: Host>(&mut self, host: &mut H, call: Call, order: SellOrder) -> Result<()> {
        self.transact(host, "book_sell_order", |ex, book, host| {
            Self::reject_value(call)?;
            ex.check_listing(&*host, &order)?;
            let event = book.book_sell_order(call.caller, order, host.now())?;
            ex.emit(event);
            Ok(())
        })
    }

    /// Book a buy order, paid in a fungible token the buyer has approved.
    /// The caller must be the buyer or a ledger keeper.
    pub fn book_buy_order<H: Host>(&mut self, host: &mut H, call: Call, order: BuyOrder) -> Result<()> {
        self.transact(host, "book_buy_order", |ex, book, host| {
            Self::reject_value(call)?;
            ex.check_bid(&*host, &order)?;
            let event = book.book_buy_order(call.caller, order, host.now())?;
            ex.emit(event);
            Ok(())
        })
    }

    /// Relay a seller-signed intent. The caller must be a ledger keeper.
    pub fn book_signed_sell_order<H: Host>(
        &mut self,
        host: &mut H,
        call: Call,
        intent: &SignedIntent<SellOrder>,
    ) -> Result<()> {
        self.transact(host, "book_signed_sell_order", |ex, book, host| {
            Self::reject_value(call)?;
            ex.check_listing(&*host, &intent.order)?;
            let event = book.book_signed_sell_order(call.caller, intent, host.now())?;
            ex.emit(event);
            Ok(())
        })
    }

    /// Relay a buyer-signed intent. The caller must be a ledger keeper.
    pub fn book_signed_buy_order<H: Host>(
        &mut self,
        host: &mut H,
        call: Call,
        intent: &SignedIntent<BuyOrder>,
    ) -> Result<()> {
        self.transact(host, "book_signed_buy_order", |ex, book, host| {
            Self::reject_value(call)?;
            ex.check_bid(&*host, &intent.order)?;
            let event = book.book_signed_buy_order(call.caller, intent, host.now())?;
            ex.emit(event);
            Ok(())
        })
    }

    /// Cancel `seller`'s order for the asset. The caller must be the seller
    /// or a ledger keeper.
    pub fn cancel_sell_order<H: Host>(
        &mut self,
        host: &mut H,
        call: Call,
        seller: Address,
        asset: Address,
        token_id: TokenId,
    ) -> Result<()> {
        self.transact(host, "cancel_sell_order", |ex, book, host| {
            let key = OrderKey::new(seller, asset, token_id);
            let event = book.cancel_sell_order(call.caller, key, host.now())?;
            ex.emit(event);
            Ok(())
        })
    }

    pub fn cancel_buy_order<H: Host>(
        &mut self,
        host: &mut H,
        call: Call,
        buyer: Address,
        asset: Address,
        token_id: TokenId,
    ) -> Result<()> {
        self.transact(host, "cancel_buy_order", |ex, book, host| {
            let key = OrderKey::new(buyer, asset, token_id);
            let event = book.cancel_buy_order(call.caller, key, host.now())?;
            ex.emit(event);
            Ok(())
        })
    }

    // ───────────────────────── Reads ─────────────────────────

    /// The live sell order under the key. A miss returns
    /// [`SellOrder::empty`] or fails, per `read_miss`.
    ///
    /// Called from inside a settlement on the same ledger, this reads the
    /// ledger as it stood once the order was deleted.
    pub fn get_sell_order(&self, now: Timestamp, seller: Address, asset: Address, token_id: TokenId) -> Result<SellOrder> {
        let key = OrderKey::new(seller, asset, token_id);
        let live = self.book.read(|book| book.live_sell(&key, now).copied())?;
        match (live, self.storage.config.read_miss) {
            (Ok(order), _) => Ok(order),
            (Err(_), ReadMissPolicy::Sentinel) => Ok(SellOrder::empty()),
            (Err(e), ReadMissPolicy::Revert) => Err(e),
        }
    }

    pub fn get_buy_order(&self, now: Timestamp, buyer: Address, asset: Address, token_id: TokenId) -> Result<BuyOrder> {
        let key = OrderKey::new(buyer, asset, token_id);
        let live = self.book.read(|book| book.live_buy(&key, now).copied())?;
        match (live, self.storage.config.read_miss) {
            (Ok(order), _) => Ok(order),
            (Err(_), ReadMissPolicy::Sentinel) => Ok(BuyOrder::empty()),
            (Err(e), ReadMissPolicy::Revert) => Err(e),
        }
    }

    // ───────────────────────── Settlement ─────────────────────────

    fn fee_recipient(&self, fee: Amount) -> Result<Address> {
        if fee == 0 {
            return Ok(Address::ZERO);
        }
        if !self.storage.fee_wallet.is_zero() {
            return Ok(self.storage.fee_wallet);
        }
        match self.storage.config.fee_wallet_policy {
            FeeWalletPolicy::Reject => Err(ShibuiError::FeeWalletUnset),
            FeeWalletPolicy::RedirectToOwner => Ok(self.storage.access.owner()),
        }
    }

    fn plan_payout(&self, asset: Address, price: Amount) -> Result<Payout> {
        let system_fee = self.storage.config.system_fee_rate;
        let royalty = self.royalty(asset);
        let split = self.logic.active().split(price, system_fee, royalty.rate)?;
        Ok(Payout {
            fee_wallet: self.fee_recipient(split.system_fee)?,
            split,
            royalty,
        })
    }

    /// Pay proceeds, fee, and royalty, in that order. Zero legs are skipped.
    fn pay_out<H: Host>(
        host: &mut H,
        ctx: &CallContext<'_>,
        token: PaymentToken,
        native: bool,
        payer: Address,
        seller: Address,
        payout: &Payout,
    ) -> Result<()> {
        let legs = [
            ("proceeds", seller, payout.split.seller_proceeds),
            ("system_fee", payout.fee_wallet, payout.split.system_fee),
            ("royalty", payout.royalty.beneficiary, payout.split.royalty),
        ];
        for (leg, to, amount) in legs {
            if amount == 0 {
                continue;
            }
            tracing::debug!(leg, to = %to, amount, token = %token, "Payment leg");
            if native {
                host.send_native(ctx, to, amount)?;
            } else {
                host.transfer_from(ctx, token, payer, to, amount)?;
            }
        }
        Ok(())
    }

    /// Buy the asset listed by `expected.seller`, delivering it to
    /// `recipient`.
    ///
    /// `expected` must carry the stored expiration, price and payment token.
    /// Native payments attach exactly `price`; token payments pull `price`
    /// from the caller.
    ///
    /// # Errors
    /// Fails with no effect on the ledger, storage, or host if the order is
    /// not live, the terms differ, payment is wrong, or any transfer fails.
    pub fn exercise_sell_order<H: Host>(
        &mut self,
        host: &mut H,
        call: Call,
        expected: &SellOrder,
        recipient: Address,
    ) -> Result<SettlementReceipt> {
        self.transact(host, "exercise_sell_order", |ex, book, host| {
            let now = host.now();
            let key = expected.key();
            let order = *book.live_sell(&key, now)?;
            if order.expiration != expected.expiration || order.price != expected.price {
                return Err(ShibuiError::OrderTermsMismatch { key });
            }
            if order.payment_token != expected.payment_token {
                return Err(ShibuiError::PaymentTokenMismatch {
                    expected: order.payment_token,
                    supplied: expected.payment_token,
                });
            }
            if recipient.is_zero() {
                return Err(ShibuiError::InvalidParameter {
                    reason: "recipient is the zero address".into(),
                });
            }

            let native = order.payment_token == ex.storage.config.native_payment_token;
            if native {
                if call.value != order.price {
                    return Err(ShibuiError::PaymentMismatch {
                        expected: order.price,
                        attached: call.value,
                    });
                }
            } else {
                Self::reject_value(call)?;
                ex.check_funding(&*host, order.payment_token, call.caller, order.price)?;
            }
            let payout = ex.plan_payout(order.asset, order.price)?;

            book.take_sell_order(ex.address, &key, now)?;
            book.publish();

            let ctx = CallContext {
                exchange: ex.address,
                book: &**book,
                now,
            };
            if native {
                host.receive_native(&ctx, call.caller, order.price)?;
            }
            host.transfer_asset(&ctx, order.asset, order.seller, recipient, order.token_id)?;
            Self::pay_out(host, &ctx, order.payment_token, native, call.caller, order.seller, &payout)?;

            ex.emit(ExchangeEvent::SellOrderExercised {
                seller: order.seller,
                buyer: call.caller,
                recipient,
                asset: order.asset,
                token_id: order.token_id,
                price: order.price,
                payment_token: order.payment_token,
            });
            ex.emit(ExchangeEvent::SellOrderCanceled {
                seller: order.seller,
                asset: order.asset,
                token_id: order.token_id,
            });
            tracing::info!(
                exchange = %ex.address,
                seller = %order.seller,
                buyer = %call.caller,
                asset = %order.asset,
                token_id = %order.token_id,
                price = order.price,
                fee = payout.split.system_fee,
                royalty = payout.split.royalty,
                "Sell order exercised"
            );
            let terms = Terms {
                seller: order.seller,
                buyer: call.caller,
                recipient,
                asset: order.asset,
                token_id: order.token_id,
                payment_token: order.payment_token,
            };
            Ok(ex.receipt(OrderSide::Sell, &terms, &payout, now))
        })
    }

    /// Accept a buy order for an asset the caller sells.
    ///
    /// The caller must be the seller named in the order and still own the
    /// asset. The offer is pulled from the buyer's allowance.
    pub fn accept_buy_order<H: Host>(&mut self, host: &mut H, call: Call, expected: &BuyOrder) -> Result<SettlementReceipt> {
        self.transact(host, "accept_buy_order", |ex, book, host| {
            let now = host.now();
            let key = expected.key();
            let order = *book.live_buy(&key, now)?;
            if call.caller != order.seller {
                return Err(ShibuiError::NotOrderParty {
                    caller: call.caller,
                    party: order.seller,
                });
            }
            if order.expiration != expected.expiration
                || order.offer != expected.offer
                || order.seller != expected.seller
            {
                return Err(ShibuiError::OrderTermsMismatch { key });
            }
            if order.payment_token != expected.payment_token {
                return Err(ShibuiError::PaymentTokenMismatch {
                    expected: order.payment_token,
                    supplied: expected.payment_token,
                });
            }
            Self::reject_value(call)?;
            ex.check_bid(&*host, &order)?;
            let payout = ex.plan_payout(order.asset, order.offer)?;

            book.take_buy_order(ex.address, &key, now)?;
            book.publish();

            let ctx = CallContext {
                exchange: ex.address,
                book: &**book,
                now,
            };
            host.transfer_asset(&ctx, order.asset, order.seller, order.buyer, order.token_id)?;
            Self::pay_out(host, &ctx, order.payment_token, false, order.buyer, order.seller, &payout)?;

            ex.emit(ExchangeEvent::BuyOrderExercised {
                buyer: order.buyer,
                seller: order.seller,
                asset: order.asset,
                token_id: order.token_id,
                offer: order.offer,
                payment_token: order.payment_token,
            });
            ex.emit(ExchangeEvent::BuyOrderCanceled {
                buyer: order.buyer,
                asset: order.asset,
                token_id: order.token_id,
            });
            tracing::info!(
                exchange = %ex.address,
                buyer = %order.buyer,
                seller = %order.seller,
                asset = %order.asset,
                token_id = %order.token_id,
                offer = order.offer,
                fee = payout.split.system_fee,
                royalty = payout.split.royalty,
                "Buy order accepted"
            );
            let terms = Terms {
                seller: order.seller,
                buyer: order.buyer,
                recipient: order.buyer,
                asset: order.asset,
                token_id: order.token_id,
                payment_token: order.payment_token,
            };
            Ok(ex.receipt(OrderSide::Buy, &terms, &payout, now))
        })
    }

    /// Same as [`Exchange::accept_buy_order`].
    pub fn exercise_buy_order<H: Host>(&mut self, host: &mut H, call: Call, expected: &BuyOrder) -> Result<SettlementReceipt> {
        self.accept_buy_order(host, call, expected)
    }

    fn receipt(&self, side: OrderSide, terms: &Terms, payout: &Payout, now: Timestamp) -> SettlementReceipt {
        SettlementReceipt {
            id: ReceiptId::new(),
            side,
            seller: terms.seller,
            buyer: terms.buyer,
            recipient: terms.recipient,
            asset: terms.asset,
            token_id: terms.token_id,
            payment_token: terms.payment_token,
            split: payout.split,
            fee_wallet: payout.fee_wallet,
            royalty_beneficiary: if payout.split.royalty == 0 {
                Address::ZERO
            } else {
                payout.royalty.beneficiary
            },
            logic_version: self.storage.version,
            settled_at: now,
        }
    }

    // ───────────────────────── Upgrade ─────────────────────────

    /// Install `logic` as the next version.
    ///
    /// # Errors
    /// `NotOwner` for anyone but the owner; `UpgradeAltersState` if the
    /// module's migration touched preserved state; `FeeRateTooHigh` or
    /// `Configuration` if the migrated configuration is invalid;
    /// `VersionExhausted` at the top of the version range.
    pub fn upgrade(&mut self, call: Call, logic: Arc<dyn ExchangeLogic>) -> Result<LogicVersion> {
        self.administer("upgrade", |ex, book| {
            ex.storage.access.only_owner(call.caller)?;
            let from = ex.storage.version;
            let to = from.next().ok_or(ShibuiError::VersionExhausted)?;
            let before = ex.storage.preserved_digest(book)?;

            logic.migrate(&mut ex.storage)?;
            ex.storage.version = to;
            ex.storage.release = logic.release().to_string();
            if ex.storage.preserved_digest(book)? != before {
                return Err(ShibuiError::UpgradeAltersState {
                    release: logic.release().to_string(),
                });
            }
            ex.storage.config.validate()?;
            ex.storage.check_fee_headroom()?;

            ex.logic.install(to, Arc::clone(&logic));
            tracing::info!(
                exchange = %ex.address,
                from = %from,
                to = %to,
                release = logic.release(),
                state_digest = %before,
                "Logic upgraded"
            );
            ex.emit(ExchangeEvent::Upgraded {
                from,
                to,
                release: logic.release().to_string(),
            });
            Ok(to)
        })
    }
}

/// Parties and asset of a settled order.
struct Terms {
    seller: Address,
    buyer: Address,
    recipient: Address,
    asset: Address,
    token_id: TokenId,
    payment_token: PaymentToken,
}
