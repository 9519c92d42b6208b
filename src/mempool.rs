//! Pending-transaction inbox
//!
//! Holding area for transactions not yet included in an accepted block. Keyed
//! by transaction hash and not validated; validation happens when a block
//! carrying the transaction is applied.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionPool {
    pool: HashMap<Hash, Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adding a transaction already present replaces it with an identical copy
    pub fn add_transaction(&mut self, tx: Transaction) {
        self.pool.insert(tx.hash(), tx);
    }

    pub fn remove_transaction(&mut self, tx_hash: &Hash) -> Option<Transaction> {
        self.pool.remove(tx_hash)
    }

    pub fn get(&self, tx_hash: &Hash) -> Option<&Transaction> {
        self.pool.get(tx_hash)
    }

    pub fn contains(&self, tx_hash: &Hash) -> bool {
        self.pool.contains_key(tx_hash)
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.pool.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(value: Integer) -> Transaction {
        let mut tx = Transaction::new();
        tx.add_input([1; 32], 0);
        tx.add_output(value, vec![]);
        tx
    }

    #[test]
    fn test_add_and_remove() {
        let mut pool = TransactionPool::new();
        let a = tx(1);
        let b = tx(2);

        pool.add_transaction(a.clone());
        pool.add_transaction(b.clone());
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(&a.hash()), Some(&a));

        assert_eq!(pool.remove_transaction(&a.hash()), Some(a.clone()));
        assert!(!pool.contains(&a.hash()));
        assert!(pool.contains(&b.hash()));
        assert!(pool.remove_transaction(&a.hash()).is_none());
    }

    #[test]
    fn test_add_is_keyed_by_hash() {
        let mut pool = TransactionPool::new();
        pool.add_transaction(tx(1));
        pool.add_transaction(tx(1));

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.transactions(), vec![tx(1)]);
    }

    #[test]
    fn test_no_validation_on_add() {
        let mut pool = TransactionPool::new();
        pool.add_transaction(tx(-50));
        assert!(!pool.is_empty());
    }
}
