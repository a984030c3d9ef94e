use super::{Block, Blockchain, LedgerConfig};
use crate::wallet::Signer;

/// Starting Proof-of-Work difficulty of the genesis ledger.
pub const GENESIS_DIFFICULTY: u32 = 3;

/// Reward minted to the author of every block.
pub const GENESIS_MINER_REWARD: u64 = 50;

/// 2024-01-01T00:00:00Z in Unix milliseconds.
pub const GENESIS_TIMESTAMP: i64 = 1_704_067_200_000;

pub const GENESIS_AUTHOR: &str = "genesis";

/// The fixed first block. Its fields never change, so neither does its hash.
pub fn genesis_block() -> Block {
    Block::with_timestamp(Vec::new(), "", GENESIS_AUTHOR, 0, GENESIS_TIMESTAMP)
}

/// A ledger seeded with the genesis block and the fixed economics above.
pub fn genesis_ledger(minter: Signer) -> Blockchain {
    Blockchain::with_genesis(
        LedgerConfig {
            initial_difficulty: GENESIS_DIFFICULTY,
            miner_reward: GENESIS_MINER_REWARD,
            minter,
        },
        genesis_block(),
    )
}
