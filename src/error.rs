use thiserror::Error;

/// Every reason the ledger can refuse a transaction, a block or a chain.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transaction addresses must not be empty")]
    EmptyAddress,

    #[error("transaction amount must be > 0")]
    InvalidAmount,

    #[error("only the minter may send to itself")]
    SelfTransfer,

    #[error("address {0} is not registered")]
    UnknownParticipant(String),

    #[error("address {address} has {available} available, {requested} requested")]
    InsufficientBalance {
        address: String,
        available: i128,
        requested: u64,
    },

    #[error("missing or invalid signature")]
    BadSignature,

    #[error("transaction pool is empty")]
    EmptyPool,

    #[error("block builds on {found} but the tip is {expected}")]
    StaleBlock { expected: String, found: String },

    #[error("block transactions no longer match the pending pool")]
    PoolMismatch,

    #[error("mining was cancelled")]
    MiningCancelled,

    #[error("block carries no transactions")]
    EmptyBlock,

    #[error("block is missing its previous hash or author")]
    MissingLinkage,

    #[error("block timestamp {0} is in the future")]
    FutureTimestamp(i64),

    #[error("hash {hash} does not meet difficulty {difficulty}")]
    DifficultyUnsolved { hash: String, difficulty: u32 },

    #[error("stored hash {stored} does not match computed {computed}")]
    HashMismatch { stored: String, computed: String },

    #[error("chain is empty")]
    EmptyChain,

    #[error("block #{0} does not link to its predecessor")]
    ChainLinkageBroken(usize),

    #[error("block #{index} is invalid: {source}")]
    BlockRejected {
        index: usize,
        #[source]
        source: Box<LedgerError>,
    },

    #[error("candidate chain ({candidate} blocks) is not longer than local ({local} blocks)")]
    ChainNotLonger { local: usize, candidate: usize },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
