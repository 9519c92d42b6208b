//! Transaction validation against a single UTXO pool

use std::collections::HashSet;

use tracing::trace;

use crate::constants::*;
use crate::crypto::verify_signature;
use crate::error::TransactionError;
use crate::types::*;
use crate::utxo::UtxoPool;

/// CheckTransaction: 𝒯𝒳 → {valid, invalid}
///
/// Pool-independent well-formedness:
/// 1. |ins| ≤ M_max_inputs ∧ |outs| ≤ M_max_outputs
/// 2. ∀o ∈ outs: o.value ≥ 0
pub fn check_transaction(tx: &Transaction) -> Result<(), TransactionError> {
    if tx.inputs.len() > MAX_INPUTS {
        return Err(TransactionError::Malformed(format!(
            "Too many inputs: {}",
            tx.inputs.len()
        )));
    }

    if tx.outputs.len() > MAX_OUTPUTS {
        return Err(TransactionError::Malformed(format!(
            "Too many outputs: {}",
            tx.outputs.len()
        )));
    }

    for (index, output) in tx.outputs.iter().enumerate() {
        if output.value < 0 {
            return Err(TransactionError::NegativeOutputValue {
                index,
                value: output.value,
            });
        }
    }

    Ok(())
}

/// CheckTxInputs: 𝒯𝒳 × 𝒰𝒮 → {valid, invalid} × 𝒪*
///
/// For transaction tx against pool us:
/// 1. tx is well-formed (`check_transaction`)
/// 2. ∀i ∈ ins: i.prevout ∈ us, and no earlier input claimed the same prevout
/// 3. ∀i ∈ ins: verify(us(i.prevout).recipient, payload(i), i.signature)
/// 4. Σ us(i.prevout).value ≥ Σ o.value
///
/// Returns the consumed outpoints in input order. Fails on the first violation.
pub fn check_tx_inputs(
    tx: &Transaction,
    utxo_pool: &UtxoPool,
) -> Result<Vec<OutPoint>, TransactionError> {
    check_transaction(tx)?;

    let mut seen: HashSet<OutPoint> = HashSet::with_capacity(tx.inputs.len());
    let mut consumed = Vec::with_capacity(tx.inputs.len());
    let mut total_input_value: Integer = 0;

    for (index, input) in tx.inputs.iter().enumerate() {
        let utxo = utxo_pool
            .get(&input.prevout)
            .ok_or(TransactionError::MissingOutput(input.prevout))?;

        if !seen.insert(input.prevout) {
            return Err(TransactionError::DoubleSpend(input.prevout));
        }

        let payload = tx
            .raw_data_to_sign(index)
            .ok_or(TransactionError::BadSignature { index })?;
        if !verify_signature(&utxo.recipient, &payload, &input.signature) {
            return Err(TransactionError::BadSignature { index });
        }

        if utxo.value < 0 {
            return Err(TransactionError::Malformed(format!(
                "Negative value spent by input {}",
                index
            )));
        }
        total_input_value = total_input_value
            .checked_add(utxo.value)
            .ok_or(TransactionError::ValueOverflow)?;

        consumed.push(input.prevout);
    }

    let total_output_value = tx
        .outputs
        .iter()
        .try_fold(0i64, |acc, o| acc.checked_add(o.value))
        .ok_or(TransactionError::ValueOverflow)?;

    if total_input_value < total_output_value {
        return Err(TransactionError::ValueConservationViolation {
            inputs: total_input_value,
            outputs: total_output_value,
        });
    }

    trace!(
        inputs = total_input_value,
        outputs = total_output_value,
        "transaction inputs valid"
    );
    Ok(consumed)
}

/// IsValidTx: 𝒯𝒳 × 𝒰𝒮 → {true, false}
pub fn is_valid_tx(tx: &Transaction, utxo_pool: &UtxoPool) -> bool {
    check_tx_inputs(tx, utxo_pool).is_ok()
}

/// ApplyTransaction: 𝒯𝒳 × 𝒰𝒮 → 𝒰𝒮
///
/// us' = (us \ consumed) ∪ {(tx.id, i) ↦ tx.outputs[i]}. Only called with the
/// outpoints `check_tx_inputs` returned for the same pool.
pub fn apply_transaction(tx: &Transaction, consumed: &[OutPoint], utxo_pool: &mut UtxoPool) {
    for outpoint in consumed {
        utxo_pool.remove(outpoint);
    }
    utxo_pool.add_outputs(tx.hash(), &tx.outputs);
}
