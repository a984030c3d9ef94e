use crate::blockchain::{Block, Blockchain, SharedLedger};
use crate::transaction::Transaction;
use crate::wallet::Signer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Shared application state: the ledger plus the signers this node holds.
/// Private keys stay in `wallets`; handlers only ever return addresses.
pub struct AppState {
    pub ledger: SharedLedger,
    pub wallets: Mutex<HashMap<String, Signer>>,
}

impl AppState {
    pub fn new(ledger: Blockchain) -> Self {
        Self {
            ledger: SharedLedger::new(ledger),
            wallets: Mutex::new(HashMap::new()),
        }
    }

    /// Clone of the node-held signer for `address`, if any.
    pub fn signer(&self, address: &str) -> Option<Signer> {
        let wallets = self.wallets.lock().expect("mutex poisoned");
        wallets.get(address).cloned()
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse<'a> {
    pub length: usize,
    pub difficulty: u32,
    pub chain: &'a [Block],
}

#[derive(Serialize)]
pub struct ReplaceChainResponse {
    pub replaced: bool,
    pub length: usize,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub broken_index: Option<usize>,
}

#[derive(Serialize)]
pub struct DifficultyResponse {
    pub difficulty: u32,
}

#[derive(Deserialize)]
pub struct SetDifficultyRequest {
    pub difficulty: u32,
}

/* ---------- Mining API Models ---------- */

#[derive(Deserialize)]
pub struct MineRequest {
    pub miner_address: String,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub mined_index: usize,
    pub hash: String,
    pub nonce: u64,
    pub difficulty: u32,
    pub transactions: usize,
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub cancelled: usize,
}

/* ---------- TX API Models ---------- */

#[derive(Deserialize)]
pub struct NewTxRequest {
    pub from: String,
    pub to: String,
    pub amount: u64,
}

#[derive(Serialize)]
pub struct NewTxResponse {
    pub transaction: Transaction,
    pub pool_size: usize,
}

#[derive(Serialize)]
pub struct PoolResponse<'a> {
    pub size: usize,
    pub transactions: &'a [Transaction],
}

/* ---------- Faucet API Models (dev) ---------- */

#[derive(Deserialize)]
pub struct FaucetRequest {
    pub address: String,
    pub amount: u64,
}

/* ---------- Wallet / address API Models ---------- */

#[derive(Serialize)]
pub struct NewWalletResponse {
    pub address: String,
}

#[derive(Deserialize)]
pub struct RegisterAddressRequest {
    pub address: String,
}

#[derive(Serialize)]
pub struct RegisterAddressResponse {
    pub address: String,
    pub added: bool,
}

#[derive(Serialize)]
pub struct AddressesResponse<'a> {
    pub size: usize,
    pub addresses: Vec<&'a str>,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: i128,
    pub spendable: i128,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub height: usize,
    pub difficulty: u32,
    pub miner_reward: u64,
    pub last_hash: Option<String>,
    pub pool_size: usize,
    pub addresses: usize,
    pub active_mining_jobs: usize,
    pub total_issued: u128,
}
