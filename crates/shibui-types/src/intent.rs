//! Signed intents.
//!
//! A party publishes an order by signing its canonical payload with an
//! ed25519 key. Any relayer holding the signed intent can submit it; the
//! ledger books it only if the key's derived [`Address`] is the order's party
//! and the signature verifies.
//!
//! The signature covers the order payload followed by a party-chosen nonce.
//! A ledger books each signed message at most once; re-listing the same
//! terms takes a fresh nonce.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Address, BuyOrder, Result, SellOrder, ShibuiError};

/// An order record that can be signed by its party.
pub trait Intent {
    /// The identity that must have signed the intent.
    fn signer(&self) -> Address;
    fn signing_payload(&self) -> Vec<u8>;
}

impl Intent for SellOrder {
    fn signer(&self) -> Address {
        self.seller
    }

    fn signing_payload(&self) -> Vec<u8> {
        SellOrder::signing_payload(self)
    }
}

impl Intent for BuyOrder {
    fn signer(&self) -> Address {
        self.buyer
    }

    fn signing_payload(&self) -> Vec<u8> {
        BuyOrder::signing_payload(self)
    }
}

/// An order plus the ed25519 proof that its party authorized it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedIntent<T> {
    pub order: T,
    pub nonce: u64,
    pub public_key: [u8; 32],
    pub signature: Vec<u8>,
}

impl<T: Intent> SignedIntent<T> {
    /// Check that `public_key` belongs to the order's party and that
    /// `signature` covers the order's signing payload.
    ///
    /// # Errors
    /// `IntentSignerMismatch` if the key does not derive the party's address,
    /// `InvalidSignature` if the key or signature is malformed or does not verify.
    pub fn verify(&self) -> Result<()> {
        let signer = self.order.signer();
        let derived = Address::from_public_key(&self.public_key);
        if derived != signer {
            return Err(ShibuiError::IntentSignerMismatch {
                expected: signer,
                actual: derived,
            });
        }

        let key = VerifyingKey::from_bytes(&self.public_key)
            .map_err(|e| ShibuiError::InvalidSignature(e.to_string()))?;
        let signature = Signature::from_slice(&self.signature)
            .map_err(|e| ShibuiError::InvalidSignature(e.to_string()))?;
        key.verify(&self.message(), &signature)
            .map_err(|e| ShibuiError::InvalidSignature(e.to_string()))
    }

    /// The bytes the party signs.
    #[must_use]
    pub fn message(&self) -> Vec<u8> {
        signed_message(&self.order, self.nonce)
    }

    /// Hex SHA-256 of the signed message. Identifies the intent for replay
    /// protection.
    #[must_use]
    pub fn id(&self) -> String {
        hex::encode(Sha256::digest(self.message()))
    }

    #[must_use]
    pub fn signer(&self) -> Address {
        self.order.signer()
    }
}

fn signed_message<T: Intent>(order: &T, nonce: u64) -> Vec<u8> {
    let mut message = order.signing_payload();
    message.extend_from_slice(&nonce.to_be_bytes());
    message
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing {
    use ed25519_dalek::{Signer, SigningKey};

    use super::{Intent, SignedIntent, signed_message};
    use crate::Address;

    /// A fresh random signing key.
    pub fn signing_key() -> SigningKey {
        SigningKey::generate(&mut rand::rngs::OsRng)
    }

    /// The address controlled by `key`.
    pub fn address_of(key: &SigningKey) -> Address {
        Address::from_public_key(&key.verifying_key().to_bytes())
    }

    /// Sign `order` with `key` under nonce 0.
    pub fn sign<T: Intent>(order: T, key: &SigningKey) -> SignedIntent<T> {
        sign_with_nonce(order, 0, key)
    }

    pub fn sign_with_nonce<T: Intent>(order: T, nonce: u64, key: &SigningKey) -> SignedIntent<T> {
        let signature = key.sign(&signed_message(&order, nonce));
        SignedIntent {
            order,
            nonce,
            public_key: key.verifying_key().to_bytes(),
            signature: signature.to_bytes().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{address_of, sign, sign_with_nonce, signing_key};
    use super::*;
    use crate::PaymentToken;

    #[test]
    fn valid_signature_verifies() {
        let key = signing_key();
        let order = SellOrder::dummy(address_of(&key), Address::random(), 1, 1_000);
        let intent = sign(order, &key);
        assert!(intent.verify().is_ok());
        assert_eq!(intent.signer(), address_of(&key));
    }

    #[test]
    fn tampered_terms_fail() {
        let key = signing_key();
        let order = SellOrder::dummy(address_of(&key), Address::random(), 1, 1_000);
        let mut intent = sign(order, &key);
        intent.order.price = 1;
        assert!(matches!(
            intent.verify(),
            Err(ShibuiError::InvalidSignature(_))
        ));
    }

    #[test]
    fn nonce_is_covered_by_signature() {
        let key = signing_key();
        let order = SellOrder::dummy(address_of(&key), Address::random(), 1, 1_000);
        let first = sign(order, &key);
        let second = sign_with_nonce(order, 1, &key);
        assert!(second.verify().is_ok());
        assert_ne!(first.id(), second.id());

        let mut bumped = first.clone();
        bumped.nonce = 7;
        assert!(matches!(
            bumped.verify(),
            Err(ShibuiError::InvalidSignature(_))
        ));
    }

    #[test]
    fn wrong_signer_fails() {
        let key = signing_key();
        let other = signing_key();
        let order = BuyOrder::dummy(
            address_of(&key),
            Address::random(),
            Address::random(),
            1,
            1_000,
            PaymentToken(Address::random()),
        );
        let intent = sign(order, &other);
        assert!(matches!(
            intent.verify(),
            Err(ShibuiError::IntentSignerMismatch { .. })
        ));
    }

    #[test]
    fn truncated_signature_fails() {
        let key = signing_key();
        let order = SellOrder::dummy(address_of(&key), Address::random(), 1, 1_000);
        let mut intent = sign(order, &key);
        intent.signature.truncate(10);
        assert!(matches!(
            intent.verify(),
            Err(ShibuiError::InvalidSignature(_))
        ));
    }
}
