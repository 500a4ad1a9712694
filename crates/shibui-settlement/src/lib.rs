//! # shibui-settlement
//!
//! **Settlement logic**: the exchange that turns booked orders into atomic
//! asset-for-payment swaps.
//!
//! ## Architecture
//!
//! An [`Exchange`] is one logic instance bound to a [`SharedOrderBook`]:
//! 1. Validates the caller's expected terms against the live order
//! 2. Validates payment (attached native value, or balance + allowance)
//! 3. Resolves royalty and computes the fee split
//! 4. Deletes the order from the ledger
//! 5. Transfers the asset, then proceeds, fee, and royalty
//! 6. Emits the settlement event followed by the cancellation event
//!
//! Any failure rolls back ledger, storage, event log, and host together.
//!
//! ## Collaborators
//!
//! Asset ownership, payment tokens, and native currency live behind the
//! [`Host`] trait. [`InMemoryHost`] implements it for tests and
//! simulations.
//!
//! ## Upgrades
//!
//! Logic modules ([`ExchangeLogic`]) are dispatched through a
//! [`LogicTable`]. [`Exchange::upgrade`] installs the next module,
//! bumps the version by one, and refuses any migration that would change
//! orders, keepers, royalties, fee wallet, or owner.
//!
//! [`SharedOrderBook`]: shibui_orderbook::SharedOrderBook

pub mod exchange;
pub mod host;
pub mod memory;
pub mod receipt;
pub mod royalty;
pub mod storage;
pub mod upgrade;

pub use exchange::Exchange;
pub use host::{AssetLedger, Call, CallContext, Host, NoRoyaltyResolver, PaymentLedger, RoyaltyResolver};
pub use memory::{Delivery, InMemoryHost, LedgerSnapshot, ReceiveHook, Transfer};
pub use receipt::SettlementReceipt;
pub use royalty::{RoyaltyRegistry, effective_royalty};
pub use storage::ExchangeStorage;
pub use upgrade::{BaseLogic, ExchangeLogic, LogicTable, PatchLogic};
