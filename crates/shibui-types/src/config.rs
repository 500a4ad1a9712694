//! Deployment configuration for an exchange instance.

use serde::{Deserialize, Serialize};

use crate::{FeeRate, PaymentToken, Result, ShibuiError, constants};

/// What a plain read returns when no live order exists for the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadMissPolicy {
    /// Return the zero-valued record.
    #[default]
    Sentinel,
    /// Fail with a NotFound error.
    Revert,
}

/// Where a system fee goes while no fee wallet is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeWalletPolicy {
    /// Fail the settlement.
    #[default]
    Reject,
    /// Pay the fee to the current owner.
    RedirectToOwner,
}

/// Initialization parameters of an exchange instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// System fee in thousandths of the trade price.
    pub system_fee_rate: FeeRate,
    /// Payment-token identifier treated as native currency.
    pub native_payment_token: PaymentToken,
    pub read_miss: ReadMissPolicy,
    pub fee_wallet_policy: FeeWalletPolicy,
    /// Whether the owner may change `system_fee_rate` after construction.
    pub fee_rate_settable: bool,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            system_fee_rate: FeeRate::new(constants::DEFAULT_SYSTEM_FEE_RATE)
                .unwrap_or(FeeRate::ZERO),
            native_payment_token: PaymentToken::NATIVE,
            read_miss: ReadMissPolicy::default(),
            fee_wallet_policy: FeeWalletPolicy::default(),
            fee_rate_settable: false,
        }
    }
}

impl ExchangeConfig {
    /// Config with the given system fee rate and defaults elsewhere.
    pub fn with_fee_rate(thousandths: u16) -> Result<Self> {
        Ok(Self {
            system_fee_rate: FeeRate::new(thousandths)?,
            ..Self::default()
        })
    }

    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ShibuiError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// A system fee of 100% would leave sellers nothing, which no
    /// deployment intends.
    pub fn validate(&self) -> Result<()> {
        if self.system_fee_rate == FeeRate::FULL {
            return Err(ShibuiError::Configuration(
                "system fee rate must be below 100%".into(),
            ));
        }
        Ok(())
    }
}
