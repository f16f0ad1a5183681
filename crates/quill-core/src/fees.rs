//! Fee rates and the dust rule.
//!
//! A [`FeeRate`] is always expressed in minor units per 1000 virtual bytes.
//! Every conversion from a size to a fee goes through this type, so the
//! per-input yield check and the whole-transaction fee can never disagree
//! on units.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::MAX_MONEY;
use crate::types::ScriptKind;

/// Size of a typical legacy input, used by the dust rule.
const DUST_SPEND_INPUT_SIZE: u64 = 148;

/// Fee rate in minor units per 1000 virtual bytes.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct FeeRate(u64);

impl FeeRate {
    pub const ZERO: Self = Self(0);

    pub fn from_per_kvb(per_kvb: u64) -> Self {
        Self(per_kvb)
    }

    pub fn from_per_vbyte(per_vbyte: u64) -> Self {
        Self(per_vbyte.saturating_mul(1_000))
    }

    pub fn per_kvb(&self) -> u64 {
        self.0
    }

    /// `per_kvb * vsize / 1000`, rounded down.
    ///
    /// This is the marginal cost used when judging a single input.
    pub fn floor_fee_for_vsize(&self, vsize: usize) -> u64 {
        let fee = (self.0 as u128) * (vsize as u128) / 1_000;
        fee.min(MAX_MONEY as u128) as u64
    }

    /// Fee for a whole transaction of `vsize` virtual bytes.
    ///
    /// Like [`floor_fee_for_vsize`](Self::floor_fee_for_vsize), except that a
    /// positive rate never produces a zero fee: the floor is raised to one
    /// kilobyte's worth. Capped at [`MAX_MONEY`].
    pub fn fee_for_vsize(&self, vsize: usize) -> u64 {
        let fee = self.floor_fee_for_vsize(vsize);
        if fee == 0 && self.0 > 0 {
            return self.0.min(MAX_MONEY);
        }
        fee
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/kvB", self.0)
    }
}

/// Whether `amount` locked to `kind` costs more to spend than it is worth
/// at `relay_fee`.
///
/// An output is dust when the fee to create and later spend it exceeds a
/// third of its value.
pub fn is_dust(amount: u64, kind: ScriptKind, relay_fee: FeeRate) -> bool {
    let total_size = kind.output_size() as u64 + DUST_SPEND_INPUT_SIZE;
    (amount as u128) * 1_000 / (3 * total_size as u128) < relay_fee.per_kvb() as u128
}
