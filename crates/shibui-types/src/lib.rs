//! # shibui-types
//!
//! Shared types, errors, and configuration for the **Shibui** exchange.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`TokenId`], [`PaymentToken`], [`LogicVersion`], [`ReceiptId`]
//! - **Order model**: [`SellOrder`], [`BuyOrder`], [`OrderKey`], [`OrderSide`]
//! - **Fee model**: [`FeeRate`], [`FeeSplit`], [`RoyaltyInfo`]
//! - **Signed intents**: [`SignedIntent`], [`Intent`]
//! - **Events**: [`ExchangeEvent`]
//! - **Configuration**: [`ExchangeConfig`], [`ReadMissPolicy`], [`FeeWalletPolicy`]
//! - **Logical time**: [`Timestamp`], [`Clock`]
//! - **Errors**: [`ShibuiError`] with `SHB_ERR_` prefix codes and [`ErrorKind`]
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod fee;
pub mod ids;
pub mod intent;
pub mod order;
pub mod royalty;
pub mod time;

// Re-export all primary types at crate root for ergonomic imports:
//   use shibui_types::{SellOrder, Address, FeeSplit, ...};

pub use config::*;
pub use error::*;
pub use event::*;
pub use fee::*;
pub use ids::*;
pub use intent::*;
pub use order::*;
pub use royalty::*;
pub use time::*;

// Constants are accessed via `shibui_types::constants::FOO`
// (not re-exported to avoid name collisions).
