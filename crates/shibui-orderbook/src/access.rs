//! Single-owner access control.

use serde::{Deserialize, Serialize};
use shibui_types::{Address, ExchangeEvent, Result, ShibuiError};

/// Holds the one identity allowed to perform administrative calls.
///
/// Ownership moves atomically: once `transfer_ownership` returns, the new
/// owner is the only identity `only_owner` accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownable {
    owner: Address,
}

impl Ownable {
    /// Ownership starts with the deploying identity.
    #[must_use]
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    #[must_use]
    pub fn owner(&self) -> Address {
        self.owner
    }

    #[must_use]
    pub fn is_owner(&self, caller: Address) -> bool {
        !caller.is_zero() && caller == self.owner
    }

    /// # Errors
    /// `NotOwner` unless `caller` is the current owner.
    pub fn only_owner(&self, caller: Address) -> Result<()> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(ShibuiError::NotOwner { caller })
        }
    }

    /// Hand ownership to `new_owner`.
    ///
    /// # Errors
    /// `NotOwner` if `caller` is not the owner; `InvalidParameter` if
    /// `new_owner` is the zero address.
    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<ExchangeEvent> {
        self.only_owner(caller)?;
        if new_owner.is_zero() {
            return Err(ShibuiError::InvalidParameter {
                reason: "new owner is the zero address".into(),
            });
        }
        let previous_owner = self.owner;
        self.owner = new_owner;
        tracing::info!(previous = %previous_owner, new = %new_owner, "Ownership transferred");
        Ok(ExchangeEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
        })
    }
}
