//! System-wide constants for the Shibui exchange.

/// Denominator of every fee and royalty rate: rates are parts per thousand.
/// A rate of `29` is 2.9% of the trade price.
pub const FEE_DENOMINATOR: u16 = 1000;

/// Default system fee rate in thousandths (2.9%).
pub const DEFAULT_SYSTEM_FEE_RATE: u16 = 29;

/// Version marker of the first installed logic module.
pub const INITIAL_LOGIC_VERSION: u64 = 1;

/// Release tag of the base logic module.
pub const BASE_RELEASE: &str = "v1.0.0";

/// Release tag of the first patch logic module.
pub const PATCH_RELEASE: &str = "v1.0.1";

/// Domain separator for sell-intent signing payloads.
pub const SELL_INTENT_DOMAIN: &[u8] = b"shibui:sell:v1:";

/// Domain separator for buy-intent signing payloads.
pub const BUY_INTENT_DOMAIN: &[u8] = b"shibui:buy:v1:";
