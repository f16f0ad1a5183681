//! Whether a credit is worth spending at a given fee rate.

use quill_core::fees::FeeRate;
use quill_core::types::Credit;

/// True iff `credit`'s amount exceeds the fee for its own smallest spending
/// input at `fee_rate`.
///
/// The fee is the rounded-down marginal cost of the input, so a zero rate
/// accepts every positive amount.
pub fn input_yields_positively(credit: &Credit, fee_rate: FeeRate) -> bool {
    let min_vsize = credit.script().kind().min_input_vsize();
    credit.amount() > fee_rate.floor_fee_for_vsize(min_vsize)
}
