use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{LedgerError, Result};
use crate::transaction::Transaction;

/// How many nonces to try between checks of the cancel flag.
const CANCEL_POLL_INTERVAL: u64 = 1024;

/// A batch of transactions sealed by Proof-of-Work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub data: Vec<Transaction>,
    pub previous: String,
    pub author: String,
    pub nonce: u64,
    pub timestamp: i64, // Unix milliseconds (UTC)
    pub difficulty: u32,
    pub hash: String,
}

/// True when `hash` starts with at least `difficulty` hex zeros.
pub fn hash_is_solved(hash: &str, difficulty: u32) -> bool {
    hash.len() >= difficulty as usize && hash.chars().take(difficulty as usize).all(|c| c == '0')
}

impl Block {
    /// Create a new block (not mined yet). Call `mine()` to perform PoW.
    pub fn new(
        data: Vec<Transaction>,
        previous: impl Into<String>,
        author: impl Into<String>,
        difficulty: u32,
    ) -> Self {
        Self::with_timestamp(
            data,
            previous,
            author,
            difficulty,
            Utc::now().timestamp_millis(),
        )
    }

    pub fn with_timestamp(
        data: Vec<Transaction>,
        previous: impl Into<String>,
        author: impl Into<String>,
        difficulty: u32,
        timestamp: i64,
    ) -> Self {
        let mut block = Self {
            data,
            previous: previous.into(),
            author: author.into(),
            nonce: 0,
            timestamp,
            difficulty,
            hash: String::new(),
        };
        block.hash = block.generate_hash();
        block
    }

    /// SHA-256 over `json(data) ++ previous ++ author ++ nonce ++ timestamp`, hex encoded.
    /// `difficulty` and `hash` are not part of the preimage.
    pub fn generate_hash(&self) -> String {
        // Transactions hold only strings and integers; encoding cannot fail.
        let txs_json = serde_json::to_string(&self.data).expect("serialize txs");
        let mut hasher = Sha256::new();
        hasher.update(txs_json.as_bytes());
        hasher.update(self.previous.as_bytes());
        hasher.update(self.author.as_bytes());
        hasher.update(self.nonce.to_string().as_bytes());
        hasher.update(self.timestamp.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_solved(&self) -> bool {
        hash_is_solved(&self.hash, self.difficulty)
    }

    /// Search nonces from the current one until the hash meets `difficulty`.
    /// Returns `false` if `cancel` was raised before a solution was found;
    /// the block is then left unsolved.
    pub fn mine(&mut self, cancel: &AtomicBool) -> bool {
        while !self.is_solved() {
            if self.nonce % CANCEL_POLL_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                return false;
            }
            self.nonce = self.nonce.wrapping_add(1);
            self.hash = self.generate_hash();
        }
        true
    }

    /// Standalone validity at instant `now_ms`. Does NOT check chain linkage.
    pub fn validate_at(&self, minter_address: &str, now_ms: i64) -> Result<()> {
        if self.data.is_empty() {
            return Err(LedgerError::EmptyBlock);
        }
        for tx in &self.data {
            tx.validate(minter_address)?;
        }
        if self.timestamp > now_ms {
            return Err(LedgerError::FutureTimestamp(self.timestamp));
        }
        if self.previous.is_empty() || self.author.is_empty() {
            return Err(LedgerError::MissingLinkage);
        }
        let computed = self.generate_hash();
        if self.hash != computed {
            return Err(LedgerError::HashMismatch {
                stored: self.hash.clone(),
                computed,
            });
        }
        if !self.is_solved() {
            return Err(LedgerError::DifficultyUnsolved {
                hash: self.hash.clone(),
                difficulty: self.difficulty,
            });
        }
        Ok(())
    }

    pub fn validate(&self, minter_address: &str) -> Result<()> {
        self.validate_at(minter_address, Utc::now().timestamp_millis())
    }

    #[cfg(test)]
    pub fn is_valid(&self, minter_address: &str) -> bool {
        self.validate(minter_address).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::{Block, hash_is_solved};
    use crate::error::LedgerError;
    use crate::transaction::Transaction;
    use crate::wallet::Signer;

    fn signed_tx(minter: &Signer, to: &str) -> Transaction {
        let mut tx = Transaction::new(minter.address(), to, 10);
        tx.sign(minter);
        tx
    }

    #[test]
    fn solved_pattern() {
        assert!(hash_is_solved("00ab", 2));
        assert!(hash_is_solved("abcd", 0));
        assert!(!hash_is_solved("0a0b", 2));
        assert!(!hash_is_solved("00", 3));
    }

    #[test]
    fn hash_is_reproducible_from_fields() {
        let tx = Transaction::new("a", "b", 3);
        let b = Block::with_timestamp(vec![tx], "prev", "author", 1, 1_700_000_000_000);
        let again = Block::with_timestamp(b.data.clone(), "prev", "author", 1, 1_700_000_000_000);
        assert_eq!(b.hash, again.hash);
        assert_eq!(b.hash, b.generate_hash());
        assert_eq!(b.hash.len(), 64);
    }

    #[test]
    fn mining_produces_leading_zeros() {
        let minter = Signer::new();
        let mut b = Block::new(vec![signed_tx(&minter, "addr")], "prev", "miner", 2);
        assert!(b.mine(&AtomicBool::new(false)));
        assert!(b.hash.starts_with("00"));
        assert_eq!(b.hash, b.generate_hash());
        assert!(b.is_valid(minter.address()));
    }

    #[test]
    fn identical_contents_converge_on_identical_nonce() {
        let minter = Signer::new();
        let tx = signed_tx(&minter, "addr");
        let mut a = Block::with_timestamp(vec![tx.clone()], "prev", "miner", 2, 42);
        let mut b = Block::with_timestamp(vec![tx], "prev", "miner", 2, 42);
        let never = AtomicBool::new(false);
        a.mine(&never);
        b.mine(&never);
        assert_eq!(a.nonce, b.nonce);
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn cancelled_mining_stops_unsolved() {
        let minter = Signer::new();
        let mut b = Block::new(vec![signed_tx(&minter, "addr")], "prev", "miner", 64);
        assert!(!b.mine(&AtomicBool::new(true)));
        assert!(!b.is_solved());
    }

    #[test]
    fn invalid_when_mutated() {
        let minter = Signer::new();
        let mut b = Block::new(vec![signed_tx(&minter, "addr")], "prev", "miner", 1);
        b.mine(&AtomicBool::new(false));
        b.data.push(signed_tx(&minter, "other"));
        assert!(matches!(
            b.validate(minter.address()),
            Err(LedgerError::HashMismatch { .. })
        ));
    }

    #[test]
    fn forged_leading_zeros_are_rejected() {
        let minter = Signer::new();
        let mut b = Block::new(vec![signed_tx(&minter, "addr")], "prev", "miner", 2);
        b.hash = format!("00{}", "f".repeat(62));
        assert!(b.is_solved());
        assert!(matches!(
            b.validate(minter.address()),
            Err(LedgerError::HashMismatch { .. })
        ));
    }

    #[test]
    fn structural_rejections() {
        let minter = Signer::new();
        let never = AtomicBool::new(false);

        let mut empty = Block::new(vec![], "prev", "miner", 1);
        empty.mine(&never);
        assert!(matches!(
            empty.validate(minter.address()),
            Err(LedgerError::EmptyBlock)
        ));

        let mut orphan = Block::new(vec![signed_tx(&minter, "addr")], "", "miner", 1);
        orphan.mine(&never);
        assert!(matches!(
            orphan.validate(minter.address()),
            Err(LedgerError::MissingLinkage)
        ));

        let mut unsigned = Block::new(vec![Transaction::new("a", "b", 1)], "prev", "miner", 1);
        unsigned.mine(&never);
        assert!(matches!(
            unsigned.validate(minter.address()),
            Err(LedgerError::BadSignature)
        ));

        let unsolved = Block::with_timestamp(vec![signed_tx(&minter, "addr")], "p", "m", 64, 0);
        assert!(matches!(
            unsolved.validate(minter.address()),
            Err(LedgerError::DifficultyUnsolved { .. })
        ));
    }

    #[test]
    fn future_timestamp_is_rejected() {
        let minter = Signer::new();
        let mut b = Block::with_timestamp(vec![signed_tx(&minter, "addr")], "p", "m", 1, 5_000);
        b.mine(&AtomicBool::new(false));
        assert!(b.validate_at(minter.address(), 5_000).is_ok());
        assert!(matches!(
            b.validate_at(minter.address(), 4_999),
            Err(LedgerError::FutureTimestamp(5_000))
        ));
    }
}
