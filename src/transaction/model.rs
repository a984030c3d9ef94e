use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::wallet::{Signer, verify_signature_hex};

/// A transfer of `amount` from one address to another.
///
/// Field order is part of the block hash preimage: the JSON encoding is always
/// `{"from":..,"to":..,"amount":..,"signature":..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    pub amount: u64,
    /// Hex-encoded DER ECDSA signature, empty until signed.
    #[serde(default)]
    pub signature: String,
}

impl Transaction {
    /// Build an unsigned transaction.
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: u64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
            signature: String::new(),
        }
    }

    /// Field rules only: non-empty parties, positive amount, and `from == to`
    /// reserved for the minter. Signature and chain state are not consulted.
    pub fn validate_fields(from: &str, to: &str, amount: u64, minter_address: &str) -> Result<()> {
        if from.is_empty() || to.is_empty() {
            return Err(LedgerError::EmptyAddress);
        }
        if from == to && from != minter_address {
            return Err(LedgerError::SelfTransfer);
        }
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn is_valid(from: &str, to: &str, amount: u64, minter_address: &str) -> bool {
        Self::validate_fields(from, to, amount, minter_address).is_ok()
    }

    /// Bytes covered by the signature: plain concatenation of the three fields.
    pub fn signing_payload(&self) -> Vec<u8> {
        format!("{}{}{}", self.from, self.to, self.amount).into_bytes()
    }

    /// Sign in place. A signer whose address is not `from` leaves the
    /// transaction untouched; check `validate` afterwards.
    pub fn sign(&mut self, signer: &Signer) {
        if signer.address() == self.from {
            self.signature = signer.sign(&self.signing_payload());
        }
    }

    /// Field rules plus a signature that verifies against `from`'s public key.
    pub fn validate(&self, minter_address: &str) -> Result<()> {
        Self::validate_fields(&self.from, &self.to, self.amount, minter_address)?;
        if self.signature.is_empty() {
            return Err(LedgerError::BadSignature);
        }
        match verify_signature_hex(&self.from, &self.signature, &self.signing_payload()) {
            Ok(true) => Ok(()),
            _ => Err(LedgerError::BadSignature),
        }
    }

    #[cfg(test)]
    pub fn is_valid_with_signature(&self, minter_address: &str) -> bool {
        self.validate(minter_address).is_ok()
    }
}
