pub mod block;
pub mod genesis;
pub mod model;
pub mod shared;

pub use block::Block;
pub use model::{Blockchain, LedgerConfig};
pub use shared::SharedLedger;

/// Upper bound for a configurable difficulty: a SHA-256 hex digest has 64 digits.
pub const DIFF_MAX: u32 = 64;
