//! Ledger constants

/// Maximum height difference below the tip at which a block may still be extended
pub const CUTOFF_AGE: u64 = 10;

/// Height of the genesis block
pub const GENESIS_HEIGHT: u64 = 1;

/// Maximum number of inputs per transaction
pub const MAX_INPUTS: usize = 1000;

/// Maximum number of outputs per transaction
pub const MAX_OUTPUTS: usize = 1000;
