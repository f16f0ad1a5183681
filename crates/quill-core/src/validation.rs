//! Best-effort self-check of authored and signed transactions.
//!
//! Two levels:
//!
//! - **Structural** ([`validate_transaction_structure`]): context-free format
//!   checks. Unsigned inputs fail here.
//! - **Spend** ([`validate_spend`]): given the script and value of every spent
//!   output, verifies each signature and checks value conservation.
//!
//! This is not consensus validation; it exists so callers and tests can
//! confirm that a signed transaction is internally consistent.

use std::collections::HashSet;

use crate::constants::MAX_TX_SIZE;
use crate::crypto;
use crate::error::TransactionError;
use crate::types::{Script, Transaction};

/// Summary of a successfully validated transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransaction {
    /// Total value of all spent outputs.
    pub total_input: u64,
    /// Total value of all created outputs.
    pub total_output: u64,
    /// `total_input - total_output`.
    pub fee: u64,
}

/// Validate transaction structure.
///
/// - Non-empty inputs and outputs
/// - All output values are non-zero and their sum does not overflow
/// - Encoded size is within [`MAX_TX_SIZE`]
/// - No null or duplicate outpoints
/// - Each input carries a 64-byte signature and 32-byte public key
pub fn validate_transaction_structure(tx: &Transaction) -> Result<(), TransactionError> {
    if tx.inputs.is_empty() || tx.outputs.is_empty() {
        return Err(TransactionError::EmptyInputsOrOutputs);
    }

    for (i, output) in tx.outputs.iter().enumerate() {
        if output.value == 0 {
            return Err(TransactionError::ZeroValueOutput(i));
        }
    }

    if tx.total_output_value().is_none() {
        return Err(TransactionError::ValueOverflow);
    }

    let size = tx.encode()?.len();
    if size > MAX_TX_SIZE {
        return Err(TransactionError::OversizedTransaction {
            size,
            max: MAX_TX_SIZE,
        });
    }

    let mut seen = HashSet::with_capacity(tx.inputs.len());
    for (i, input) in tx.inputs.iter().enumerate() {
        if input.previous_output.is_null() {
            return Err(TransactionError::NullOutpoint(i));
        }

        if !seen.insert(&input.previous_output) {
            return Err(TransactionError::DuplicateInput(
                input.previous_output.to_string(),
            ));
        }

        if input.signature.len() != 64 || input.public_key.len() != 32 {
            return Err(TransactionError::InvalidSignature { index: i });
        }
    }

    Ok(())
}

/// Validate a signed transaction against the outputs it spends.
///
/// `prev_scripts[i]` and `prev_values[i]` describe the output spent by input
/// `i`.
pub fn validate_spend(
    tx: &Transaction,
    prev_scripts: &[Script],
    prev_values: &[u64],
) -> Result<ValidatedTransaction, TransactionError> {
    if prev_scripts.len() != tx.inputs.len() || prev_values.len() != tx.inputs.len() {
        return Err(TransactionError::PrevoutMismatch {
            inputs: tx.inputs.len(),
            scripts: prev_scripts.len(),
            values: prev_values.len(),
        });
    }

    validate_transaction_structure(tx)?;

    for (i, (script, value)) in prev_scripts.iter().zip(prev_values).enumerate() {
        crypto::verify_transaction_input(tx, i, script, *value)
            .map_err(|_| TransactionError::InvalidSignature { index: i })?;
    }

    let total_input = prev_values
        .iter()
        .try_fold(0u64, |acc, v| acc.checked_add(*v))
        .ok_or(TransactionError::ValueOverflow)?;
    let total_output = tx
        .total_output_value()
        .ok_or(TransactionError::ValueOverflow)?;

    if total_input < total_output {
        return Err(TransactionError::InsufficientFunds {
            have: total_input,
            need: total_output,
        });
    }

    Ok(ValidatedTransaction {
        total_input,
        total_output,
        fee: total_input - total_output,
    })
}
