//! Exchange storage: the state that outlives any one logic version.
//!
//! Layout is append-only. New logic versions may add fields (with serde
//! defaults) but never reinterpret existing ones.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shibui_orderbook::{OrderBook, Ownable};
use shibui_types::{Address, ExchangeConfig, LogicVersion, Result, ShibuiError, constants};

use crate::royalty::RoyaltyRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeStorage {
    pub access: Ownable,
    pub config: ExchangeConfig,
    /// Recipient of system fees. Zero until the owner sets it.
    pub fee_wallet: Address,
    pub royalties: RoyaltyRegistry,
    pub version: LogicVersion,
    /// Release tag of the logic module that last ran a migration.
    #[serde(default = "base_release")]
    pub release: String,
}

fn base_release() -> String {
    constants::BASE_RELEASE.to_string()
}

/// The part of the state an upgrade must leave untouched.
#[derive(Serialize)]
struct Preserved<'a> {
    book: &'a OrderBook,
    owner: Address,
    fee_wallet: Address,
    royalties: &'a RoyaltyRegistry,
}

impl ExchangeStorage {
    #[must_use]
    pub fn new(owner: Address, config: ExchangeConfig) -> Self {
        Self {
            access: Ownable::new(owner),
            config,
            fee_wallet: Address::ZERO,
            royalties: RoyaltyRegistry::new(),
            version: LogicVersion::INITIAL,
            release: base_release(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let storage: Self = serde_json::from_str(json)?;
        storage.config.validate()?;
        storage.check_fee_headroom()?;
        Ok(storage)
    }

    /// The system fee plus the highest configured royalty must not exceed
    /// 100%.
    ///
    /// # Errors
    /// `FeeRateTooHigh` with the combined rate otherwise.
    pub fn check_fee_headroom(&self) -> Result<()> {
        let fee = self.config.system_fee_rate;
        let max_royalty = self.royalties.max_rate();
        if fee.checked_add(max_royalty).is_none() {
            return Err(ShibuiError::FeeRateTooHigh {
                total: u32::from(fee.thousandths()) + u32::from(max_royalty.thousandths()),
            });
        }
        Ok(())
    }

    /// SHA-256 over orders, keepers, royalties, fee wallet and owner,
    /// hex-encoded.
    pub fn preserved_digest(&self, book: &OrderBook) -> Result<String> {
        let preserved = Preserved {
            book,
            owner: self.access.owner(),
            fee_wallet: self.fee_wallet,
            royalties: &self.royalties,
        };
        let bytes = serde_json::to_vec(&preserved)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}
