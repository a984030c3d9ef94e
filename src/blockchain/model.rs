use std::collections::BTreeSet;

use log::{debug, info, warn};

use super::Block;
use crate::error::{LedgerError, Result};
use crate::transaction::Transaction;
use crate::wallet::Signer;

/// Economic parameters a ledger is created with.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub initial_difficulty: u32,
    pub miner_reward: u64,
    /// The only key allowed to issue value; it signs every block reward.
    pub minter: Signer,
}

/// In-memory account ledger with Proof-of-Work blocks.
///
/// All mutation goes through `&mut self`; see `SharedLedger` for the
/// thread-safe wrapper that mines outside the lock.
#[derive(Debug, Clone)]
pub struct Blockchain {
    blocks: Vec<Block>,
    addresses: BTreeSet<String>,
    transactions_pool: Vec<Transaction>,
    current_difficulty: u32,
    miner_reward: u64,
    minter: Signer,
}

impl Blockchain {
    /// Empty ledger: no blocks, no addresses, empty pool.
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            blocks: Vec::new(),
            addresses: BTreeSet::new(),
            transactions_pool: Vec::new(),
            current_difficulty: config.initial_difficulty,
            miner_reward: config.miner_reward,
            minter: config.minter,
        }
    }

    /// Ledger whose chain starts with `genesis`.
    pub fn with_genesis(config: LedgerConfig, genesis: Block) -> Self {
        let mut bc = Self::new(config);
        bc.blocks.push(genesis);
        bc
    }

    pub fn minter_address(&self) -> &str {
        self.minter.address()
    }

    pub fn difficulty(&self) -> u32 {
        self.current_difficulty
    }

    pub fn set_difficulty(&mut self, difficulty: u32) {
        // NOTE: Changing difficulty affects future blocks only.
        self.current_difficulty = difficulty;
    }

    pub fn miner_reward(&self) -> u64 {
        self.miner_reward
    }

    pub fn chain(&self) -> &[Block] {
        &self.blocks
    }

    pub fn chain_size(&self) -> usize {
        self.blocks.len()
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn pool(&self) -> &[Transaction] {
        &self.transactions_pool
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.addresses.iter().map(String::as_str)
    }

    pub fn is_registered(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }

    /// Register an address. Returns `false` if it was already known (or empty).
    pub fn add_address(&mut self, address: impl Into<String>) -> bool {
        let address = address.into();
        if address.is_empty() {
            return false;
        }
        let inserted = self.addresses.insert(address);
        if inserted {
            debug!("LEDGER - registered address ({} known)", self.addresses.len());
        }
        inserted
    }

    /// Credits minus debits for `address` across every committed block.
    /// Unknown addresses simply have balance 0; the minter's balance is negative.
    pub fn get_address_amount(&self, address: &str) -> i128 {
        let mut amount: i128 = 0;
        for tx in self.blocks.iter().flat_map(|b| b.data.iter()) {
            if tx.to == address {
                amount += tx.amount as i128;
            }
            if tx.from == address {
                amount -= tx.amount as i128;
            }
        }
        amount
    }

    /// Committed balance minus what `address` already has pending in the pool.
    pub fn spendable_amount(&self, address: &str) -> i128 {
        let pending: i128 = self
            .transactions_pool
            .iter()
            .filter(|tx| tx.from == address)
            .map(|tx| tx.amount as i128)
            .sum();
        self.get_address_amount(address) - pending
    }

    /// Sum of everything the minter has put into circulation on chain.
    pub fn total_issued(&self) -> u128 {
        let minter = self.minter_address();
        self.blocks
            .iter()
            .flat_map(|b| b.data.iter())
            .filter(|tx| tx.from == minter && tx.to != minter)
            .map(|tx| tx.amount as u128)
            .sum()
    }

    /// Validate, sign and admit a transaction into the pool.
    ///
    /// Gates, in order: field rules, spendable balance, registered parties,
    /// signature by `signer`. The minter is exempt from the balance and
    /// registration checks on `from`.
    pub fn create_transaction(
        &mut self,
        mut transaction: Transaction,
        signer: &Signer,
    ) -> Result<Transaction> {
        let minter = self.minter_address().to_string();
        if let Err(e) = self.admit(&mut transaction, signer, &minter) {
            warn!("LEDGER - transaction rejected: {e}");
            return Err(e);
        }
        let before = self.transactions_pool.len();
        self.transactions_pool.push(transaction.clone());
        info!(
            "LEDGER - transaction {} -> {} ({}) admitted (pool: {} -> {})",
            short(&transaction.from),
            short(&transaction.to),
            transaction.amount,
            before,
            self.transactions_pool.len()
        );
        Ok(transaction)
    }

    fn admit(&self, tx: &mut Transaction, signer: &Signer, minter: &str) -> Result<()> {
        Transaction::validate_fields(&tx.from, &tx.to, tx.amount, minter)?;

        let from_minter = tx.from == minter;
        if !from_minter {
            let available = self.spendable_amount(&tx.from);
            if available < tx.amount as i128 {
                return Err(LedgerError::InsufficientBalance {
                    address: tx.from.clone(),
                    available,
                    requested: tx.amount,
                });
            }
            if !self.is_registered(&tx.from) {
                return Err(LedgerError::UnknownParticipant(tx.from.clone()));
            }
        }
        // The minter receives only on the self-mint path.
        let self_mint = from_minter && tx.to == minter;
        if !self.is_registered(&tx.to) && !self_mint {
            return Err(LedgerError::UnknownParticipant(tx.to.clone()));
        }

        tx.sign(signer);
        tx.validate(minter)
    }

    /// Minter-issued transfer into the pool.
    pub fn grant(&mut self, to: &str, amount: u64) -> Result<Transaction> {
        let minter = self.minter.clone();
        self.create_transaction(Transaction::new(minter.address(), to, amount), &minter)
    }

    /// Snapshot the pool into an unmined block that pays `miner` the reward.
    pub fn prepare_block(&self, miner: &Signer) -> Result<Block> {
        if self.transactions_pool.is_empty() {
            return Err(LedgerError::EmptyPool);
        }
        let mut reward = Transaction::new(self.minter_address(), miner.address(), self.miner_reward);
        reward.sign(&self.minter);

        let mut data = self.transactions_pool.clone();
        data.push(reward);

        let previous = self.last_block().map(|b| b.hash.clone()).unwrap_or_default();
        Ok(Block::new(
            data,
            previous,
            miner.address(),
            self.current_difficulty,
        ))
    }

    /// Append a mined block built from this ledger's pool.
    ///
    /// Rejected when the tip moved since the block was prepared or the pool
    /// has been emptied meanwhile. The block's pool transactions leave the
    /// pool; anything admitted while mining stays pending.
    pub fn commit_block(&mut self, block: Block) -> Result<&Block> {
        if self.transactions_pool.is_empty() {
            warn!("LEDGER - discarding block {}: pool emptied", short(&block.hash));
            return Err(LedgerError::EmptyPool);
        }
        let expected = self.last_block().map(|b| b.hash.clone()).unwrap_or_default();
        if block.previous != expected {
            warn!("LEDGER - discarding stale block {}", short(&block.hash));
            return Err(LedgerError::StaleBlock {
                expected,
                found: block.previous,
            });
        }
        // A plain ledger's first block has no predecessor and is exempt like genesis.
        if !self.blocks.is_empty() {
            block.validate(self.minter_address())?;
        }

        // The block carries the pool prefix it was prepared from, then the reward.
        let taken = block.data.len().saturating_sub(1);
        if self.transactions_pool.len() < taken
            || self.transactions_pool[..taken] != block.data[..taken]
        {
            warn!("LEDGER - discarding block {}: pool diverged", short(&block.hash));
            return Err(LedgerError::PoolMismatch);
        }

        let before = self.transactions_pool.len();
        self.transactions_pool.drain(..taken);
        info!(
            "LEDGER - sealed block #{} (hash={}, nonce={}, txs={}, pool: {} -> {})",
            self.blocks.len(),
            block.hash,
            block.nonce,
            block.data.len(),
            before,
            self.transactions_pool.len()
        );
        self.blocks.push(block);
        Ok(self.blocks.last().expect("block just pushed"))
    }

    /// Prepare, mine and commit on the calling thread.
    #[cfg(test)]
    pub fn create_block(
        &mut self,
        miner: &Signer,
        cancel: &std::sync::atomic::AtomicBool,
    ) -> Result<&Block> {
        let mut block = self.prepare_block(miner)?;
        if !block.mine(cancel) {
            return Err(LedgerError::MiningCancelled);
        }
        self.commit_block(block)
    }

    /// Full validation of a standalone chain. Index 0 is accepted as genesis;
    /// every later block must be valid on its own and link to its predecessor.
    pub fn validate_chain(blocks: &[Block], minter_address: &str) -> Result<()> {
        if blocks.is_empty() {
            return Err(LedgerError::EmptyChain);
        }
        for (index, pair) in blocks.windows(2).enumerate() {
            let (prev, current) = (&pair[0], &pair[1]);
            let index = index + 1;
            current
                .validate(minter_address)
                .map_err(|e| LedgerError::BlockRejected {
                    index,
                    source: Box::new(e),
                })?;
            if current.previous != prev.hash {
                return Err(LedgerError::ChainLinkageBroken(index));
            }
        }
        Ok(())
    }

    pub fn is_chain_valid(blocks: &[Block], minter_address: &str) -> bool {
        Self::validate_chain(blocks, minter_address).is_ok()
    }

    /// Validate the local chain.
    pub fn is_valid(&self) -> bool {
        Self::is_chain_valid(&self.blocks, self.minter_address())
    }

    /// Index of the first block whose `previous` does not match its predecessor.
    pub fn chain_broken_index(&self) -> Option<usize> {
        self.blocks
            .windows(2)
            .position(|pair| pair[1].previous != pair[0].hash)
            .map(|i| i + 1)
    }

    /// Longest valid chain wins: adopt `candidate` only if it is strictly
    /// longer than the local chain and valid end to end. Adoption clears the pool.
    pub fn set_chain(&mut self, candidate: Vec<Block>) -> Result<()> {
        let local = self.blocks.len();
        if candidate.len() <= local {
            debug!(
                "LEDGER - ignoring chain of {} blocks (local {local})",
                candidate.len()
            );
            return Err(LedgerError::ChainNotLonger {
                local,
                candidate: candidate.len(),
            });
        }
        if let Err(e) = Self::validate_chain(&candidate, self.minter_address()) {
            warn!("LEDGER - candidate chain rejected: {e}");
            return Err(e);
        }
        info!(
            "LEDGER - replacing chain: {local} -> {} blocks, dropping {} pooled txs",
            candidate.len(),
            self.transactions_pool.len()
        );
        self.blocks = candidate;
        self.transactions_pool.clear();
        Ok(())
    }
}

fn short(s: &str) -> &str {
    s.get(..12).unwrap_or(s)
}
