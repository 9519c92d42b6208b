//! UTXO pool: the ledger snapshot
//!
//! UTXO Set: 𝒰𝒮 = 𝒪 → 𝒯
//!
//! A pure associative store with no validation logic. `Clone` is a full value
//! copy, so a block's pool never shares state with its parent's or a sibling's.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::*;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoPool {
    utxos: HashMap<OutPoint, TransactionOutput>,
}

impl UtxoPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.utxos.contains_key(outpoint)
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&TransactionOutput> {
        self.utxos.get(outpoint)
    }

    pub fn put(&mut self, outpoint: OutPoint, output: TransactionOutput) {
        self.utxos.insert(outpoint, output);
    }

    pub fn remove(&mut self, outpoint: &OutPoint) -> Option<TransactionOutput> {
        self.utxos.remove(outpoint)
    }

    /// Insert every output of the transaction `tx_hash` at its position
    pub fn add_outputs(&mut self, tx_hash: Hash, outputs: &[TransactionOutput]) {
        for (i, output) in outputs.iter().enumerate() {
            self.put(OutPoint::new(tx_hash, i as Natural), output.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutPoint, &TransactionOutput)> {
        self.utxos.iter()
    }

    pub fn outpoints(&self) -> Vec<OutPoint> {
        self.utxos.keys().copied().collect()
    }

    /// Sum of all unspent values, `None` on overflow
    pub fn total_value(&self) -> Option<Integer> {
        self.utxos
            .values()
            .try_fold(0i64, |acc, output| acc.checked_add(output.value))
    }
}
