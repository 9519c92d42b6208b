//! # UTXO-Chain
//!
//! Validation and bookkeeping core of a single-node UTXO ledger.
//!
//! It decides which proposed transactions may be applied to an unspent-output
//! set, and which chain of blocks built on top of that set is canonical, while
//! bounding memory by discarding state more than a fixed depth below the tip.
//!
//! ## Architecture
//!
//! Layered bottom-up:
//! - UTXO pool (`utxo`): the ledger snapshot every other layer reads and copies
//! - Transaction validation (`transaction`, `handler`): single-transaction
//!   checks, and resolution of a batch whose members may spend each other's
//!   outputs
//! - Block application (`block`) and the bounded chain index (`chain`)
//!
//! ## Usage
//!
//! ```rust
//! use secp256k1::SecretKey;
//! use utxo_chain::crypto::public_key_bytes;
//! use utxo_chain::{Block, BlockChain, Transaction};
//!
//! let alice = SecretKey::from_slice(&[1; 32]).unwrap();
//! let bob = SecretKey::from_slice(&[2; 32]).unwrap();
//!
//! let genesis = Block::genesis(Transaction::coinbase(100, public_key_bytes(&alice)));
//! let chain = BlockChain::new(genesis.clone());
//!
//! let mut payment = Transaction::new();
//! payment.add_input(genesis.coinbase.hash(), 0);
//! payment.add_output(40, public_key_bytes(&bob));
//! payment.add_output(60, public_key_bytes(&alice));
//! payment.sign_input(0, &alice).unwrap();
//!
//! let mut block = Block::new(genesis.hash(), Transaction::coinbase(25, public_key_bytes(&alice)));
//! block.add_transaction(payment.clone());
//!
//! assert!(chain.add_block(&block));
//! assert_eq!(chain.max_height(), 2);
//! assert_eq!(chain.max_height_utxo_pool().get(&payment.outpoint(0)).unwrap().value, 40);
//! ```

pub mod types;
pub mod constants;
pub mod crypto;
pub mod utxo;
pub mod transaction;
pub mod handler;
pub mod block;
pub mod mempool;
pub mod chain;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use utxo::UtxoPool;
pub use handler::{handle_txs, TxHandler};
pub use transaction::is_valid_tx;
pub use mempool::TransactionPool;
pub use chain::BlockChain;
pub use config::ChainConfig;
pub use error::{BlockError, ConsensusError, Result, TransactionError};
