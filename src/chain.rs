//! Bounded-depth block chain index
//!
//! Tracks, for every retained block, its height and the UTXO pool resulting
//! from applying it. Blocks may fork; the tip is the first block recorded at
//! the maximum height. Only heights in `(max_height - cutoff_age - 1, max_height]`
//! are retained, and a block may only extend a parent at height
//! `>= max_height - cutoff_age`.
//!
//! All state lives behind one `RwLock`: block and transaction submission take
//! the write lock for the whole operation, queries take the read lock and
//! return owned copies, so a reader never observes a half-applied block.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::block::{connect_block, genesis_utxo_pool};
use crate::config::ChainConfig;
use crate::constants::GENESIS_HEIGHT;
use crate::error::{hex, BlockError};
use crate::mempool::TransactionPool;
use crate::types::*;
use crate::utxo::UtxoPool;

#[derive(Debug, Clone)]
struct BlockNode {
    block: Block,
    height: Natural,
    utxo_pool: UtxoPool,
}

#[derive(Debug)]
struct ChainState {
    config: ChainConfig,
    max_height: Natural,
    /// First block recorded at `max_height`
    tip: Hash,
    nodes: HashMap<Hash, BlockNode>,
    /// Block hashes per height, in the order they were recorded
    heights: HashMap<Natural, Vec<Hash>>,
    tx_pool: TransactionPool,
}

impl ChainState {
    fn new(genesis: Block, config: ChainConfig) -> Self {
        let genesis_hash = genesis.hash();
        let utxo_pool = genesis_utxo_pool(&genesis);

        let mut nodes = HashMap::new();
        nodes.insert(
            genesis_hash,
            BlockNode {
                block: genesis,
                height: GENESIS_HEIGHT,
                utxo_pool,
            },
        );

        let mut heights = HashMap::new();
        heights.insert(GENESIS_HEIGHT, vec![genesis_hash]);

        Self {
            config,
            max_height: GENESIS_HEIGHT,
            tip: genesis_hash,
            nodes,
            heights,
            tx_pool: TransactionPool::new(),
        }
    }

    fn tip(&self) -> &BlockNode {
        // The tip sits at max height and is never evicted
        &self.nodes[&self.tip]
    }

    fn add_block(&mut self, block: &Block) -> Result<Hash, BlockError> {
        let block_hash = block.hash();
        let prev_hash = block.prev_block_hash.ok_or(BlockError::MissingParent)?;

        if self.nodes.contains_key(&block_hash) {
            return Err(BlockError::DuplicateBlock(block_hash));
        }

        let parent = self
            .nodes
            .get(&prev_hash)
            .ok_or(BlockError::UnknownParent(prev_hash))?;

        if parent.height.saturating_add(self.config.cutoff_age) < self.max_height {
            return Err(BlockError::ParentTooOld {
                parent_height: parent.height,
                max_height: self.max_height,
            });
        }

        let utxo_pool = connect_block(block, &parent.utxo_pool)?;
        let height = parent.height + 1;

        // Every check passed; commit
        self.nodes.insert(
            block_hash,
            BlockNode {
                block: block.clone(),
                height,
                utxo_pool,
            },
        );
        self.heights.entry(height).or_default().push(block_hash);

        if height > self.max_height {
            self.max_height = height;
            self.tip = block_hash;
            self.evict_expired();
        }

        for tx in &block.transactions {
            self.tx_pool.remove_transaction(&tx.hash());
        }

        Ok(block_hash)
    }

    /// Drop the height that just fell out of reach of any future parent
    fn evict_expired(&mut self) {
        let Some(expired) = self.max_height.checked_sub(self.config.cutoff_age.saturating_add(1)) else {
            return;
        };

        if let Some(hashes) = self.heights.remove(&expired) {
            for hash in &hashes {
                self.nodes.remove(hash);
            }
            debug!(height = expired, blocks = hashes.len(), "evicted blocks");
        }
    }
}

/// Chain index over a genesis block; every instance is fully independent
#[derive(Debug)]
pub struct BlockChain {
    state: RwLock<ChainState>,
}

impl BlockChain {
    /// Chain holding only `genesis` at height 1. The genesis block is assumed valid.
    pub fn new(genesis: Block) -> Self {
        Self::with_config(genesis, ChainConfig::default())
    }

    pub fn with_config(genesis: Block, config: ChainConfig) -> Self {
        info!(
            genesis = %hex(&genesis.hash()),
            cutoff_age = config.cutoff_age,
            "chain initialized"
        );
        Self {
            state: RwLock::new(ChainState::new(genesis, config)),
        }
    }

    // State is only mutated after every check has passed, so a poisoned lock
    // still guards consistent state.
    fn read(&self) -> RwLockReadGuard<'_, ChainState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ChainState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The first block recorded at the maximum height
    pub fn max_height_block(&self) -> Block {
        self.read().tip().block.clone()
    }

    /// UTXO pool for mining a new block on top of the max height block
    pub fn max_height_utxo_pool(&self) -> UtxoPool {
        self.read().tip().utxo_pool.clone()
    }

    /// Copy of the pending-transaction inbox, for assembling a new block
    pub fn transaction_pool(&self) -> TransactionPool {
        self.read().tx_pool.clone()
    }

    pub fn max_height(&self) -> Natural {
        self.read().max_height
    }

    pub fn cutoff_age(&self) -> Natural {
        self.read().config.cutoff_age
    }

    /// Height of a retained block
    pub fn height_of(&self, block_hash: &Hash) -> Option<Natural> {
        self.read().nodes.get(block_hash).map(|node| node.height)
    }

    /// UTXO pool after applying a retained block
    pub fn utxo_pool_at(&self, block_hash: &Hash) -> Option<UtxoPool> {
        self.read()
            .nodes
            .get(block_hash)
            .map(|node| node.utxo_pool.clone())
    }

    pub fn contains_block(&self, block_hash: &Hash) -> bool {
        self.read().nodes.contains_key(block_hash)
    }

    /// Number of retained blocks, forks included
    pub fn block_count(&self) -> usize {
        self.read().nodes.len()
    }

    /// Add `block` if its parent is retained and not too old, and every
    /// transaction in it is valid. Returns `true` if the block was accepted.
    pub fn add_block(&self, block: &Block) -> bool {
        self.try_add_block(block).is_ok()
    }

    /// `add_block` with the rejection reason. Nothing is committed on `Err`.
    pub fn try_add_block(&self, block: &Block) -> Result<Hash, BlockError> {
        let mut state = self.write();
        match state.add_block(block) {
            Ok(block_hash) => {
                info!(
                    block = %hex(&block_hash),
                    height = state.nodes[&block_hash].height,
                    max_height = state.max_height,
                    txs = block.transactions.len(),
                    "block accepted"
                );
                Ok(block_hash)
            }
            Err(reason) => {
                debug!(block = %hex(&block.hash()), %reason, "block rejected");
                Err(reason)
            }
        }
    }

    /// Add a transaction to the inbox; it is validated only when a block includes it
    pub fn add_transaction(&self, tx: Transaction) {
        self.write().tx_pool.add_transaction(tx);
    }
}
