//! Core ledger types
//!
//! Identities are content-derived: a transaction hashes its inputs (signatures
//! included) and outputs, a block hashes its parent reference, its coinbase and
//! every transaction hash in order.

use secp256k1::SecretKey;
use serde::{Deserialize, Serialize};

use crate::crypto::{sha256d_hash, sign_message};
use crate::error::{Result, TransactionError};

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Natural number type
pub type Natural = u64;

/// Integer type
pub type Integer = i64;

/// OutPoint: 𝒪 = ℍ × ℕ
///
/// The producing transaction's hash and the output's position in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: Natural,
}

impl OutPoint {
    pub fn new(hash: Hash, index: Natural) -> Self {
        Self { hash, index }
    }
}

/// Transaction Input: ℐ = 𝒪 × 𝕊
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub prevout: OutPoint,
    pub signature: ByteString,
}

/// Transaction Output: 𝒯 = ℤ × 𝕂
///
/// `recipient` is the SEC1-encoded public key allowed to spend the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: Integer,
    pub recipient: ByteString,
}

/// Transaction: 𝒯𝒳 = ℐ* × 𝒯*
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minting transaction: no inputs, a single output of `value` to `recipient`
    pub fn coinbase(value: Integer, recipient: ByteString) -> Self {
        let mut tx = Self::new();
        tx.add_output(value, recipient);
        tx
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Append an unsigned input spending `(prev_hash, index)`
    pub fn add_input(&mut self, prev_hash: Hash, index: Natural) {
        self.inputs.push(TransactionInput {
            prevout: OutPoint::new(prev_hash, index),
            signature: Vec::new(),
        });
    }

    pub fn add_output(&mut self, value: Integer, recipient: ByteString) {
        self.outputs.push(TransactionOutput { value, recipient });
    }

    /// Attach a signature to input `index`
    pub fn add_signature(&mut self, index: usize, signature: ByteString) -> Result<()> {
        let input = self.inputs.get_mut(index).ok_or_else(|| {
            TransactionError::Malformed(format!("no input at index {}", index))
        })?;
        input.signature = signature;
        Ok(())
    }

    /// Sign input `index` with `secret_key` over its signing payload
    pub fn sign_input(&mut self, index: usize, secret_key: &SecretKey) -> Result<()> {
        let payload = self.raw_data_to_sign(index).ok_or_else(|| {
            TransactionError::Malformed(format!("no input at index {}", index))
        })?;
        self.add_signature(index, sign_message(secret_key, &payload))
    }

    /// Signing payload for input `index`: its prevout followed by every output.
    ///
    /// Signatures are excluded so that signing one input does not change the
    /// payload of another.
    pub fn raw_data_to_sign(&self, index: usize) -> Option<ByteString> {
        let input = self.inputs.get(index)?;
        let mut data = Vec::new();
        encode_outpoint(&mut data, &input.prevout);
        encode_outputs(&mut data, &self.outputs);
        Some(data)
    }

    /// Canonical encoding of the whole transaction, signatures included
    pub fn raw_tx(&self) -> ByteString {
        let mut data = Vec::new();

        data.extend_from_slice(&encode_varint(self.inputs.len() as u64));
        for input in &self.inputs {
            encode_outpoint(&mut data, &input.prevout);
            data.extend_from_slice(&encode_varint(input.signature.len() as u64));
            data.extend_from_slice(&input.signature);
        }

        encode_outputs(&mut data, &self.outputs);
        data
    }

    /// Transaction identity: SHA256d(raw_tx)
    pub fn hash(&self) -> Hash {
        sha256d_hash(&self.raw_tx())
    }

    /// OutPoint naming output `index` of this transaction
    pub fn outpoint(&self, index: Natural) -> OutPoint {
        OutPoint::new(self.hash(), index)
    }
}

/// Block: ℬ = ℍ? × 𝒯𝒳 × 𝒯𝒳*
///
/// Only the genesis block has no parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub prev_block_hash: Option<Hash>,
    pub coinbase: Transaction,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn genesis(coinbase: Transaction) -> Self {
        Self {
            prev_block_hash: None,
            coinbase,
            transactions: Vec::new(),
        }
    }

    pub fn new(prev_block_hash: Hash, coinbase: Transaction) -> Self {
        Self {
            prev_block_hash: Some(prev_block_hash),
            coinbase,
            transactions: Vec::new(),
        }
    }

    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    /// Block identity: SHA256d(parent ‖ coinbase hash ‖ tx hashes)
    pub fn hash(&self) -> Hash {
        let mut data = Vec::new();

        match &self.prev_block_hash {
            Some(prev) => {
                data.push(1);
                data.extend_from_slice(prev);
            }
            None => data.push(0),
        }

        data.extend_from_slice(&self.coinbase.hash());
        data.extend_from_slice(&encode_varint(self.transactions.len() as u64));
        for tx in &self.transactions {
            data.extend_from_slice(&tx.hash());
        }

        sha256d_hash(&data)
    }
}

fn encode_outpoint(data: &mut Vec<u8>, outpoint: &OutPoint) {
    data.extend_from_slice(&outpoint.hash);
    data.extend_from_slice(&outpoint.index.to_le_bytes());
}

fn encode_outputs(data: &mut Vec<u8>, outputs: &[TransactionOutput]) {
    data.extend_from_slice(&encode_varint(outputs.len() as u64));
    for output in outputs {
        data.extend_from_slice(&output.value.to_le_bytes());
        data.extend_from_slice(&encode_varint(output.recipient.len() as u64));
        data.extend_from_slice(&output.recipient);
    }
}

/// Encode a number as a Bitcoin-style varint
fn encode_varint(value: u64) -> Vec<u8> {
    if value < 0xfd {
        vec![value as u8]
    } else if value <= 0xffff {
        let mut result = vec![0xfd];
        result.extend_from_slice(&(value as u16).to_le_bytes());
        result
    } else if value <= 0xffffffff {
        let mut result = vec![0xfe];
        result.extend_from_slice(&(value as u32).to_le_bytes());
        result
    } else {
        let mut result = vec![0xff];
        result.extend_from_slice(&value.to_le_bytes());
        result
    }
}
