//! # shibui-orderbook
//!
//! **Order ledger**: the storage every exchange logic version shares.
//!
//! ## Architecture
//!
//! The ledger is deliberately ignorant of payments and assets:
//! 1. **Ownable**: single-owner gate for administrative calls
//! 2. **KeeperRegistry**: identities allowed to mutate orders for others
//! 3. **OrderStore**: keyed sell/buy records with upsert/remove semantics
//! 4. **OrderBook**: the public surface tying the three together,
//!    enforcing who may book, cancel, or take an order
//!
//! ## Call Flow
//!
//! ```text
//! party  ─────────────────────────────▶ OrderBook.book_*/cancel_*
//! Exchange (registered keeper) ───────▶ OrderBook.book_*/take_*
//! relayer (keeper) + SignedIntent ────▶ OrderBook.book_signed_*
//! ```
//!
//! Several exchange instances can hold one [`SharedOrderBook`], which is
//! how orders survive a move from one logic version to the next. A call
//! holds the ledger through a [`LedgerGuard`]; nested calls on the same
//! thread read its published view instead of blocking.

pub mod access;
pub mod book;
pub mod keeper;
pub mod shared;
pub mod store;

pub use access::Ownable;
pub use book::OrderBook;
pub use shared::{LedgerGuard, SharedOrderBook};
pub use keeper::KeeperRegistry;
pub use store::OrderStore;
