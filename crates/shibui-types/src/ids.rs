//! Identifiers used throughout Shibui.
//!
//! Parties, asset contracts, payment tokens and exchange instances are all
//! identified by a 20-byte [`Address`]. Settlement receipts use UUIDv7 so
//! they sort by issue time.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{ShibuiError, constants};

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte caller / contract identity.
///
/// [`Address::ZERO`] is the unset sentinel: it never owns anything, never
/// signs anything, and is never a valid fee wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The unset sentinel.
    pub const ZERO: Self = Self([0u8; 20]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Address whose low 8 bytes are `n` (big-endian). Handy for fixed,
    /// human-readable identities such as contract deployments.
    #[must_use]
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    /// Derive the identity controlled by an ed25519 public key:
    /// the last 20 bytes of `SHA-256(public_key)`.
    #[must_use]
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let hash = Sha256::digest(public_key);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[12..]);
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// First four bytes in hex, for compact log fields.
    #[must_use]
    pub fn short(&self) -> String {
        format!("0x{}", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ShibuiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|e| ShibuiError::InvalidParameter {
            reason: format!("malformed address {s:?}: {e}"),
        })?;
        Ok(Self(bytes))
    }
}

// Hex strings rather than byte arrays, so addresses can key JSON maps.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// TokenId
// ---------------------------------------------------------------------------

/// Identifier of a unique asset inside its asset contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub u128);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PaymentToken
// ---------------------------------------------------------------------------

/// Identifier of the fungible unit an order is priced in.
///
/// Which identifier means "native currency" is a deployment setting
/// (`ExchangeConfig::native_payment_token`); [`PaymentToken::NATIVE`] is the
/// default choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentToken(pub Address);

impl PaymentToken {
    /// Default native-currency sentinel.
    pub const NATIVE: Self = Self(Address::ZERO);

    #[must_use]
    pub fn address(&self) -> Address {
        self.0
    }
}

impl fmt::Display for PaymentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Amount in the smallest unit of a payment token.
pub type Amount = u128;

// ---------------------------------------------------------------------------
// LogicVersion
// ---------------------------------------------------------------------------

/// Monotonic version marker of the installed settlement logic.
///
/// Incremented by exactly one on every upgrade, never decremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicVersion(pub u64);

impl LogicVersion {
    pub const INITIAL: Self = Self(constants::INITIAL_LOGIC_VERSION);

    /// The next version, or `None` once the marker is exhausted.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl Default for LogicVersion {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for LogicVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "logic:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ReceiptId
// ---------------------------------------------------------------------------

/// Unique identifier of a settlement receipt. UUIDv7 for time ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ReceiptId(pub Uuid);

impl ReceiptId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ReceiptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rcpt:{}", self.0)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    /// A random, non-zero address.
    pub fn random() -> Self {
        loop {
            let candidate = Self(rand::random::<[u8; 20]>());
            if !candidate.is_zero() {
                return candidate;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_display_and_parse() {
        let addr = Address::from_low_u64(0xdead_beef);
        let text = addr.to_string();
        assert_eq!(text, "0x00000000000000000000000000000000deadbeef");
        assert_eq!(text.parse::<Address>().unwrap(), addr);
        assert_eq!("00000000000000000000000000000000deadbeef".parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn malformed_address_rejected() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("zz".repeat(20).parse::<Address>().is_err());
    }

    #[test]
    fn zero_sentinel() {
        assert!(Address::ZERO.is_zero());
        assert!(Address::default().is_zero());
        assert!(!Address::random().is_zero());
        assert_eq!(PaymentToken::NATIVE.address(), Address::ZERO);
    }

    #[test]
    fn public_key_derivation_is_deterministic() {
        let key = [7u8; 32];
        assert_eq!(Address::from_public_key(&key), Address::from_public_key(&key));
        assert_ne!(Address::from_public_key(&key), Address::from_public_key(&[8u8; 32]));
    }

    #[test]
    fn logic_version_next() {
        assert_eq!(LogicVersion::INITIAL.next(), Some(LogicVersion(2)));
        assert_eq!(LogicVersion(u64::MAX).next(), None);
    }

    #[test]
    fn receipt_id_ordering() {
        let a = ReceiptId::new();
        let b = ReceiptId::new();
        assert!(a < b);
    }

    #[test]
    fn address_serializes_as_hex_string() {
        let addr = Address::from_low_u64(1);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x0000000000000000000000000000000000000001\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }

    #[test]
    fn token_id_display() {
        assert_eq!(TokenId(42).to_string(), "#42");
    }
}
