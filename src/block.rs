//! Block application against a parent UTXO pool

use tracing::trace;

use crate::error::BlockError;
use crate::handler::TxHandler;
use crate::types::*;
use crate::utxo::UtxoPool;

/// ConnectBlock: ℬ × 𝒰𝒮 → {valid, invalid} × 𝒰𝒮
///
/// For block b = (parent, coinbase, txs) with parent pool us:
/// 1. Resolve txs against a copy of us
/// 2. If any tx is rejected: return invalid (a block is atomic)
/// 3. Add the coinbase outputs unconditionally
/// 4. Return (valid, us')
///
/// The parent pool is never modified.
pub fn connect_block(block: &Block, parent_pool: &UtxoPool) -> Result<UtxoPool, BlockError> {
    let mut handler = TxHandler::new(parent_pool.clone());
    let resolution = handler.resolve(&block.transactions);

    if !resolution.all_accepted() {
        return Err(BlockError::InvalidTransactionSet {
            accepted: resolution.accepted.len(),
            total: block.transactions.len(),
        });
    }

    let mut utxo_pool = handler.into_utxo_pool();
    apply_coinbase(&block.coinbase, &mut utxo_pool);

    trace!(utxos = utxo_pool.len(), "block connected");
    Ok(utxo_pool)
}

/// ApplyCoinbase: 𝒯𝒳 × 𝒰𝒮 → 𝒰𝒮
///
/// Minting is not subject to input or signature checks.
pub fn apply_coinbase(coinbase: &Transaction, utxo_pool: &mut UtxoPool) {
    utxo_pool.add_outputs(coinbase.hash(), &coinbase.outputs);
}

/// The genesis pool holds the genesis coinbase outputs and nothing else
pub fn genesis_utxo_pool(genesis: &Block) -> UtxoPool {
    let mut utxo_pool = UtxoPool::new();
    apply_coinbase(&genesis.coinbase, &mut utxo_pool);
    utxo_pool
}
