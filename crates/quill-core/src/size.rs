//! Virtual-size estimation for fee computation.
//!
//! Sizes follow the segregated-witness accounting model: non-witness bytes
//! count fully, witness bytes count a quarter (rounded up over the whole
//! transaction). Estimates assume worst-case (73-byte) DER signatures so a
//! fee computed from them never underpays.

use crate::types::{ScriptKind, TxOutput};

/// Fixed transaction overhead: version (4) + lock time (4).
pub const TX_OVERHEAD_SIZE: usize = 8;

/// Witness bytes weigh a quarter of non-witness bytes.
pub const WITNESS_SCALE_FACTOR: usize = 4;

/// Segwit marker and flag bytes, counted as witness weight.
pub const WITNESS_HEADER_WEIGHT: usize = 2;

/// Outpoint (36) + signature script length (1) + signature script (108) + sequence (4).
pub const P2PKH_INPUT_SIZE: usize = 149;

/// Outpoint (36) + empty signature script length (1) + sequence (4).
pub const WITNESS_INPUT_BASE_SIZE: usize = 41;

/// Witness input base plus the 23-byte push of the nested redeem script.
pub const NESTED_WITNESS_INPUT_BASE_SIZE: usize = 64;

/// Item count (1) + signature push (1 + 73) + pubkey push (1 + 33).
pub const P2WPKH_WITNESS_WEIGHT: usize = 109;

/// Item count (1) + schnorr signature push (1 + 64).
pub const P2TR_KEY_SPEND_WITNESS_WEIGHT: usize = 66;

/// Value (8) + script length (1) + script.
pub const P2PKH_OUTPUT_SIZE: usize = 34;
pub const P2WPKH_OUTPUT_SIZE: usize = 31;
pub const P2SH_OUTPUT_SIZE: usize = 32;
pub const P2TR_OUTPUT_SIZE: usize = 43;

impl ScriptKind {
    /// Non-witness bytes of an input spending this kind.
    pub fn input_base_size(&self) -> usize {
        match self {
            Self::P2pkh => P2PKH_INPUT_SIZE,
            Self::P2wpkh | Self::P2tr => WITNESS_INPUT_BASE_SIZE,
            Self::Np2wpkh => NESTED_WITNESS_INPUT_BASE_SIZE,
        }
    }

    /// Witness weight units of an input spending this kind.
    pub fn input_witness_weight(&self) -> usize {
        match self {
            Self::P2pkh => 0,
            Self::P2wpkh | Self::Np2wpkh => P2WPKH_WITNESS_WEIGHT,
            Self::P2tr => P2TR_KEY_SPEND_WITNESS_WEIGHT,
        }
    }

    /// Serialized size of an output locked to this kind.
    pub fn output_size(&self) -> usize {
        match self {
            Self::P2pkh => P2PKH_OUTPUT_SIZE,
            Self::P2wpkh => P2WPKH_OUTPUT_SIZE,
            Self::Np2wpkh => P2SH_OUTPUT_SIZE,
            Self::P2tr => P2TR_OUTPUT_SIZE,
        }
    }

    /// Virtual size one input of this kind adds to a transaction.
    ///
    /// P2PKH 149, P2WPKH 69, nested P2WPKH 92, P2TR 58.
    pub fn min_input_vsize(&self) -> usize {
        self.input_base_size() + self.input_witness_weight().div_ceil(WITNESS_SCALE_FACTOR)
    }
}

/// Length of the compact-size prefix encoding `n`.
pub fn compact_size_len(n: usize) -> usize {
    match n as u64 {
        0..=0xFC => 1,
        0xFD..=0xFFFF => 3,
        0x1_0000..=0xFFFF_FFFF => 5,
        _ => 9,
    }
}

/// Estimate the signed virtual size of a transaction.
///
/// `inputs` lists the script kind of every spent output, `outputs` the
/// requested outputs, and `change` the kind of an optional change output
/// that is not yet part of `outputs`.
pub fn estimate_virtual_size(
    inputs: &[ScriptKind],
    outputs: &[TxOutput],
    change: Option<ScriptKind>,
) -> usize {
    let output_count = outputs.len() + usize::from(change.is_some());

    let mut base = TX_OVERHEAD_SIZE
        + compact_size_len(inputs.len())
        + compact_size_len(output_count);
    base += inputs.iter().map(ScriptKind::input_base_size).sum::<usize>();
    base += outputs
        .iter()
        .map(|o| o.script.kind().output_size())
        .sum::<usize>();
    base += change.map_or(0, |k| k.output_size());

    let mut witness: usize = inputs.iter().map(ScriptKind::input_witness_weight).sum();
    if inputs.iter().any(ScriptKind::is_witness) {
        witness += WITNESS_HEADER_WEIGHT;
    }

    base + witness.div_ceil(WITNESS_SCALE_FACTOR)
}
