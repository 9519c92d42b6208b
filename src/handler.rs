//! Batch transaction handling
//!
//! A batch may spend outputs created by other transactions in the same batch.
//! Each transaction is resolved with a depth-first walk over its in-batch
//! producers, driven by an explicit stack so adversarial dependency chains
//! cannot exhaust the call stack.
//!
//! Loop invariant: whenever the transaction on top of the stack is examined,
//! its inputs are scanned from the first one. Finishing a producer therefore
//! always leads to a full rescan of the dependent transaction, which is where
//! cycles, missing outputs and rejected producers are detected.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{hex, TransactionError};
use crate::transaction::{apply_transaction, check_tx_inputs};
use crate::types::*;
use crate::utxo::UtxoPool;

/// Resolution state of one batch transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Unvisited,
    InProgress,
    Valid,
    Invalid,
}

/// Outcome of resolving one batch
#[derive(Debug, Clone)]
pub struct BatchResolution {
    /// Final state per batch position
    pub states: Vec<TxState>,
    /// Batch positions of accepted transactions, in the order they were applied
    pub accepted: Vec<usize>,
    /// Batch positions of rejected transactions with the reason
    pub rejected: Vec<(usize, TransactionError)>,
}

impl BatchResolution {
    pub fn all_accepted(&self) -> bool {
        self.accepted.len() == self.states.len()
    }
}

enum Step {
    Descend(usize),
    Ready,
    Reject(TransactionError),
}

struct DependencyWalk<'a> {
    txs: &'a [Transaction],
    hashes: Vec<Hash>,
    producers: HashMap<OutPoint, usize>,
    resolution: BatchResolution,
}

impl<'a> DependencyWalk<'a> {
    fn new(txs: &'a [Transaction]) -> Self {
        Self::with_hashes(txs, txs.iter().map(Transaction::hash).collect())
    }

    fn with_hashes(txs: &'a [Transaction], hashes: Vec<Hash>) -> Self {
        let mut producers = HashMap::new();
        for (position, tx) in txs.iter().enumerate() {
            for index in 0..tx.outputs.len() {
                producers.insert(OutPoint::new(hashes[position], index as Natural), position);
            }
        }

        Self {
            txs,
            hashes,
            producers,
            resolution: BatchResolution {
                states: vec![TxState::Unvisited; txs.len()],
                accepted: Vec::new(),
                rejected: Vec::new(),
            },
        }
    }

    fn run(mut self, utxo_pool: &mut UtxoPool) -> BatchResolution {
        for root in 0..self.txs.len() {
            if self.resolution.states[root] == TxState::Unvisited {
                self.resolve(root, utxo_pool);
            }
        }
        self.resolution
    }

    fn resolve(&mut self, root: usize, utxo_pool: &mut UtxoPool) {
        let mut stack = vec![root];
        self.resolution.states[root] = TxState::InProgress;

        while let Some(&current) = stack.last() {
            match self.next_step(current, utxo_pool) {
                Step::Descend(producer) => {
                    self.resolution.states[producer] = TxState::InProgress;
                    stack.push(producer);
                }
                Step::Ready => {
                    stack.pop();
                    self.finish(current, utxo_pool);
                }
                Step::Reject(reason) => {
                    stack.pop();
                    self.reject(current, reason);
                }
            }
        }
    }

    /// Scan `current`'s inputs from the first and report what blocks it, if anything
    fn next_step(&self, current: usize, utxo_pool: &UtxoPool) -> Step {
        for input in &self.txs[current].inputs {
            if utxo_pool.contains(&input.prevout) {
                continue;
            }

            let Some(&producer) = self.producers.get(&input.prevout) else {
                return Step::Reject(TransactionError::MissingOutput(input.prevout));
            };

            match self.resolution.states[producer] {
                TxState::Unvisited => return Step::Descend(producer),
                TxState::InProgress => return Step::Reject(TransactionError::CyclicDependency),
                TxState::Invalid => {
                    return Step::Reject(TransactionError::MissingOutput(input.prevout))
                }
                // Producer applied but this output already consumed; check_tx_inputs reports it.
                TxState::Valid => continue,
            }
        }
        Step::Ready
    }

    fn finish(&mut self, current: usize, utxo_pool: &mut UtxoPool) {
        let txs = self.txs;
        let tx = &txs[current];
        match check_tx_inputs(tx, utxo_pool) {
            Ok(consumed) => {
                apply_transaction(tx, &consumed, utxo_pool);
                self.resolution.states[current] = TxState::Valid;
                self.resolution.accepted.push(current);
            }
            Err(reason) => self.reject(current, reason),
        }
    }

    fn reject(&mut self, current: usize, reason: TransactionError) {
        debug!(
            tx = %hex(&self.hashes[current]),
            position = current,
            %reason,
            "transaction rejected"
        );
        self.resolution.states[current] = TxState::Invalid;
        self.resolution.rejected.push((current, reason));
    }
}

/// Handles one epoch of proposed transactions against an owned UTXO pool
#[derive(Debug, Clone)]
pub struct TxHandler {
    utxo_pool: UtxoPool,
}

impl TxHandler {
    /// The handler works on its own copy; the caller's pool is never touched
    pub fn new(utxo_pool: UtxoPool) -> Self {
        Self { utxo_pool }
    }

    pub fn utxo_pool(&self) -> &UtxoPool {
        &self.utxo_pool
    }

    pub fn into_utxo_pool(self) -> UtxoPool {
        self.utxo_pool
    }

    /// Validity of `tx` against the handler's current pool
    pub fn is_valid_tx(&self, tx: &Transaction) -> bool {
        crate::transaction::is_valid_tx(tx, &self.utxo_pool)
    }

    /// Resolve `possible_txs`, applying every accepted transaction to the pool
    pub fn resolve(&mut self, possible_txs: &[Transaction]) -> BatchResolution {
        DependencyWalk::new(possible_txs).run(&mut self.utxo_pool)
    }

    /// Returns the mutually valid subset of `possible_txs` in the order applied
    pub fn handle_txs(&mut self, possible_txs: &[Transaction]) -> Vec<Transaction> {
        let resolution = self.resolve(possible_txs);
        resolution
            .accepted
            .iter()
            .map(|&position| possible_txs[position].clone())
            .collect()
    }
}

/// HandleTxs: 𝒯𝒳* × 𝒰𝒮 → 𝒯𝒳* × 𝒰𝒮
pub fn handle_txs(possible_txs: &[Transaction], utxo_pool: UtxoPool) -> (Vec<Transaction>, UtxoPool) {
    let mut handler = TxHandler::new(utxo_pool);
    let accepted = handler.handle_txs(possible_txs);
    (accepted, handler.into_utxo_pool())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::public_key_bytes;
    use secp256k1::SecretKey;

    fn key(byte: u8) -> SecretKey {
        SecretKey::from_slice(&[byte; 32]).unwrap()
    }

    fn pool_with(owner: &SecretKey, value: Integer) -> (UtxoPool, OutPoint) {
        let mut pool = UtxoPool::new();
        let outpoint = OutPoint::new([1; 32], 0);
        pool.put(
            outpoint,
            TransactionOutput {
                value,
                recipient: public_key_bytes(owner),
            },
        );
        (pool, outpoint)
    }

    fn spend(from: &SecretKey, prevout: OutPoint, value: Integer, to: &SecretKey) -> Transaction {
        let mut tx = Transaction::new();
        tx.add_input(prevout.hash, prevout.index);
        tx.add_output(value, public_key_bytes(to));
        tx.sign_input(0, from).unwrap();
        tx
    }

    #[test]
    fn test_empty_batch() {
        let (pool, _) = pool_with(&key(1), 10);
        let (accepted, after) = handle_txs(&[], pool.clone());

        assert!(accepted.is_empty());
        assert_eq!(after, pool);
    }

    #[test]
    fn test_chain_in_reverse_order() {
        let a = key(1);
        let b = key(2);
        let c = key(3);
        let (pool, funding) = pool_with(&a, 100);

        let first = spend(&a, funding, 100, &b);
        let second = spend(&b, first.outpoint(0), 90, &c);
        let third = spend(&c, second.outpoint(0), 80, &a);

        let mut handler = TxHandler::new(pool);
        let resolution = handler.resolve(&[third.clone(), second.clone(), first.clone()]);

        assert_eq!(resolution.states, vec![TxState::Valid; 3]);
        // Producers are applied before their dependents
        assert_eq!(resolution.accepted, vec![2, 1, 0]);

        let pool = handler.into_utxo_pool();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(&third.outpoint(0)).unwrap().value, 80);
    }

    #[test]
    fn test_missing_producer() {
        let a = key(1);
        let (pool, _) = pool_with(&a, 100);
        let orphan = spend(&a, OutPoint::new([8; 32], 0), 10, &a);

        let mut handler = TxHandler::new(pool);
        let resolution = handler.resolve(&[orphan]);

        assert_eq!(resolution.states, vec![TxState::Invalid]);
        assert_eq!(
            resolution.rejected,
            vec![(0, TransactionError::MissingOutput(OutPoint::new([8; 32], 0)))]
        );
    }

    #[test]
    fn test_conflicting_spends_first_wins() {
        let a = key(1);
        let b = key(2);
        let c = key(3);
        let (pool, funding) = pool_with(&a, 100);

        let to_b = spend(&a, funding, 100, &b);
        let to_c = spend(&a, funding, 100, &c);

        let (accepted, pool) = handle_txs(&[to_b.clone(), to_c.clone()], pool);

        assert_eq!(accepted, vec![to_b.clone()]);
        assert!(pool.contains(&to_b.outpoint(0)));
        assert!(!pool.contains(&to_c.outpoint(0)));
    }

    #[test]
    fn test_dependent_of_rejected_transaction_is_rejected() {
        let a = key(1);
        let b = key(2);
        let (pool, funding) = pool_with(&a, 100);

        // Overspends, so its output never exists
        let bad = spend(&a, funding, 500, &b);
        let child = spend(&b, bad.outpoint(0), 10, &a);

        let mut handler = TxHandler::new(pool);
        let resolution = handler.resolve(&[bad, child]);

        assert_eq!(resolution.states, vec![TxState::Invalid, TxState::Invalid]);
        assert!(resolution.accepted.is_empty());
    }

    /// Content hashes make a real cycle infeasible, so identities are assigned directly
    fn resolve_with_hashes(
        txs: &[Transaction],
        hashes: Vec<Hash>,
        utxo_pool: &mut UtxoPool,
    ) -> BatchResolution {
        DependencyWalk::with_hashes(txs, hashes).run(utxo_pool)
    }

    #[test]
    fn test_two_cycle() {
        let a = key(1);
        let b = key(2);
        let (mut pool, funding) = pool_with(&a, 100);

        let (hx, hy) = ([0xaa; 32], [0xbb; 32]);
        let mut x = Transaction::new();
        x.add_input(hy, 0);
        x.add_output(5, public_key_bytes(&a));
        let mut y = Transaction::new();
        y.add_input(hx, 0);
        y.add_output(5, public_key_bytes(&a));

        let unrelated = spend(&a, funding, 100, &b);
        let hu = unrelated.hash();

        let resolution =
            resolve_with_hashes(&[x, y, unrelated.clone()], vec![hx, hy, hu], &mut pool);

        assert_eq!(
            resolution.states,
            vec![TxState::Invalid, TxState::Invalid, TxState::Valid]
        );
        assert!(resolution
            .rejected
            .contains(&(1, TransactionError::CyclicDependency)));
        assert!(pool.contains(&unrelated.outpoint(0)));
    }

    #[test]
    fn test_self_spend_is_cyclic() {
        let a = key(1);
        let (mut pool, _) = pool_with(&a, 1);

        let own = [0xcc; 32];
        let mut tx = Transaction::new();
        tx.add_input(own, 0);
        tx.add_output(5, public_key_bytes(&a));

        let resolution = resolve_with_hashes(&[tx], vec![own], &mut pool);

        assert_eq!(resolution.states, vec![TxState::Invalid]);
        assert_eq!(resolution.rejected, vec![(0, TransactionError::CyclicDependency)]);
    }

    #[test]
    fn test_handler_pool_mutates_only_copy() {
        let a = key(1);
        let b = key(2);
        let (pool, funding) = pool_with(&a, 100);

        let mut handler = TxHandler::new(pool.clone());
        assert!(handler.is_valid_tx(&spend(&a, funding, 100, &b)));
        handler.handle_txs(&[spend(&a, funding, 100, &b)]);

        assert!(pool.contains(&funding));
        assert!(!handler.utxo_pool().contains(&funding));
    }

    #[test]
    fn test_long_chain_does_not_recurse() {
        let a = key(1);
        let (pool, funding) = pool_with(&a, 1_000_000);

        let mut txs = Vec::new();
        let mut prevout = funding;
        for i in 0..2000 {
            let tx = spend(&a, prevout, 1_000_000 - i, &a);
            prevout = tx.outpoint(0);
            txs.push(tx);
        }
        txs.reverse();

        let (accepted, pool) = handle_txs(&txs, pool);
        assert_eq!(accepted.len(), 2000);
        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&prevout));
    }
}
