use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use log::{debug, info};
use uuid::Uuid;

use super::{Block, Blockchain};
use crate::error::{LedgerError, Result};
use crate::transaction::Transaction;
use crate::wallet::Signer;

/// Thread-safe ledger: one lock guards chain, pool and addresses together,
/// and Proof-of-Work runs outside of it.
///
/// Every in-flight mining attempt is registered with a cancel flag. A commit
/// or a chain replacement cancels all remaining attempts, since they now
/// build on a stale tip.
#[derive(Debug)]
pub struct SharedLedger {
    ledger: Mutex<Blockchain>,
    jobs: Mutex<HashMap<Uuid, Arc<AtomicBool>>>,
}

impl SharedLedger {
    pub fn new(ledger: Blockchain) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Blockchain> {
        self.ledger.lock().expect("mutex poisoned")
    }

    fn lock_jobs(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<AtomicBool>>> {
        self.jobs.lock().expect("mutex poisoned")
    }

    /// Run `f` against a consistent snapshot of the ledger.
    pub fn read<R>(&self, f: impl FnOnce(&Blockchain) -> R) -> R {
        f(&self.lock())
    }

    pub fn set_difficulty(&self, difficulty: u32) {
        self.lock().set_difficulty(difficulty);
    }

    pub fn add_address(&self, address: impl Into<String>) -> bool {
        self.lock().add_address(address)
    }

    pub fn create_transaction(&self, transaction: Transaction, signer: &Signer) -> Result<Transaction> {
        self.lock().create_transaction(transaction, signer)
    }

    pub fn grant(&self, to: &str, amount: u64) -> Result<Transaction> {
        self.lock().grant(to, amount)
    }

    /// Mine a block from the current pool for `miner`.
    ///
    /// Blocks the calling thread for the whole search; run it on a worker.
    /// Fails with `MiningCancelled` if `cancel_mining` (or a competing commit)
    /// interrupts the search.
    pub fn create_block(&self, miner: &Signer) -> Result<Block> {
        let job_id = Uuid::new_v4();
        let cancel = Arc::new(AtomicBool::new(false));

        let (mut block, height) = {
            let ledger = self.lock();
            let block = ledger.prepare_block(miner)?;
            self.lock_jobs().insert(job_id, cancel.clone());
            (block, ledger.chain_size())
        };
        debug!(
            "MINER - job {job_id} started: height={height} txs={} diff={}",
            block.data.len(),
            block.difficulty
        );

        let t0 = Instant::now();
        let solved = block.mine(&cancel);

        let mut ledger = self.lock();
        self.lock_jobs().remove(&job_id);
        if !solved {
            info!("MINER - job {job_id} cancelled after nonce {}", block.nonce);
            return Err(LedgerError::MiningCancelled);
        }
        debug!(
            "MINER - job {job_id} solved nonce={} in {} ms",
            block.nonce,
            t0.elapsed().as_millis()
        );

        let committed = ledger.commit_block(block)?.clone();
        // Jobs registered so far were prepared against the previous tip.
        self.cancel_mining();
        Ok(committed)
    }

    /// Adopt `candidate` if it is longer and valid. Returns the new chain size.
    pub fn set_chain(&self, candidate: Vec<Block>) -> Result<usize> {
        let mut ledger = self.lock();
        ledger.set_chain(candidate)?;
        self.cancel_mining();
        Ok(ledger.chain_size())
    }

    /// Raise the cancel flag of every in-flight mining job.
    pub fn cancel_mining(&self) -> usize {
        let jobs = self.lock_jobs();
        for (id, flag) in jobs.iter() {
            flag.store(true, Ordering::Relaxed);
            debug!("MINER - job {id} cancel requested");
        }
        jobs.len()
    }

    pub fn active_jobs(&self) -> usize {
        self.lock_jobs().len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::SharedLedger;
    use crate::blockchain::genesis::genesis_ledger;
    use crate::error::LedgerError;
    use crate::transaction::Transaction;
    use crate::wallet::Signer;

    fn shared(difficulty: u32) -> SharedLedger {
        let mut bc = genesis_ledger(Signer::new());
        bc.set_difficulty(difficulty);
        SharedLedger::new(bc)
    }

    #[test]
    fn mines_and_commits() {
        let ledger = shared(1);
        let alice = Signer::new();
        let miner = Signer::new();
        ledger.add_address(alice.address());
        ledger.grant(alice.address(), 10).unwrap();

        let block = ledger.create_block(&miner).unwrap();
        assert!(block.hash.starts_with('0'));
        assert_eq!(ledger.active_jobs(), 0);
        ledger.read(|bc| {
            assert_eq!(bc.chain_size(), 2);
            assert_eq!(bc.last_block(), Some(&block));
            assert_eq!(bc.get_address_amount(miner.address()), 50);
            assert!(bc.pool().is_empty());
        });
    }

    #[test]
    fn second_miner_finds_empty_pool() {
        let ledger = shared(1);
        let alice = Signer::new();
        ledger.add_address(alice.address());
        ledger.grant(alice.address(), 10).unwrap();

        ledger.create_block(&Signer::new()).unwrap();
        let err = ledger.create_block(&Signer::new()).unwrap_err();
        assert!(matches!(err, LedgerError::EmptyPool));
        assert_eq!(ledger.read(|bc| bc.chain_size()), 2);
    }

    #[test]
    fn cancel_interrupts_in_flight_mining() {
        let ledger = Arc::new(shared(64));
        let alice = Signer::new();
        ledger.add_address(alice.address());
        ledger.grant(alice.address(), 10).unwrap();

        let worker = {
            let ledger = ledger.clone();
            thread::spawn(move || ledger.create_block(&Signer::new()))
        };
        while ledger.active_jobs() == 0 {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(ledger.cancel_mining(), 1);

        let result = worker.join().expect("miner thread");
        assert!(matches!(result, Err(LedgerError::MiningCancelled)));
        assert_eq!(ledger.active_jobs(), 0);
        ledger.read(|bc| {
            assert_eq!(bc.chain_size(), 1);
            assert_eq!(bc.pool().len(), 1);
        });
    }

    #[test]
    fn chain_replacement_cancels_mining() {
        let minter = Signer::new();
        let alice = Signer::new();

        let mut remote = genesis_ledger(minter.clone());
        remote.set_difficulty(1);
        remote.add_address(alice.address());
        remote.grant(alice.address(), 7).unwrap();
        remote
            .create_block(&Signer::new(), &std::sync::atomic::AtomicBool::new(false))
            .unwrap();

        let mut local = genesis_ledger(minter);
        local.set_difficulty(64);
        local.add_address(alice.address());
        let ledger = Arc::new(SharedLedger::new(local));
        ledger.grant(alice.address(), 1).unwrap();

        let worker = {
            let ledger = ledger.clone();
            thread::spawn(move || ledger.create_block(&Signer::new()))
        };
        while ledger.active_jobs() == 0 {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(ledger.set_chain(remote.chain().to_vec()).unwrap(), 2);

        let result = worker.join().expect("miner thread");
        assert!(matches!(result, Err(LedgerError::MiningCancelled)));
        ledger.read(|bc| {
            assert_eq!(bc.chain(), remote.chain());
            assert!(bc.pool().is_empty());
            assert_eq!(bc.get_address_amount(alice.address()), 7);
        });
    }

    #[test]
    fn concurrent_admissions_cannot_overspend() {
        let ledger = Arc::new(shared(1));
        let alice = Signer::new();
        let bob = Signer::new();
        ledger.add_address(alice.address());
        ledger.add_address(bob.address());
        ledger.grant(alice.address(), 10).unwrap();
        ledger.create_block(&Signer::new()).unwrap();

        let handles: Vec<_> = (1..=4)
            .map(|amount| {
                let ledger = ledger.clone();
                let alice = alice.clone();
                let to = bob.address().to_string();
                thread::spawn(move || {
                    ledger
                        .create_transaction(Transaction::new(alice.address(), to, amount * 2), &alice)
                        .is_ok()
                })
            })
            .collect();
        for h in handles {
            h.join().expect("admission thread");
        }

        let pending: u64 = ledger.read(|bc| bc.pool().iter().map(|tx| tx.amount).sum());
        assert!(pending <= 10);
    }
}
