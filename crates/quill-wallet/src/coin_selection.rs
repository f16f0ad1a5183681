//! Fee-aware coin selection.
//!
//! Both strategies first discard credits that would cost more to spend than
//! they are worth at the active fee rate, then accumulate the remainder until
//! the target is met:
//!
//! - [`SelectionStrategy::Largest`] takes the biggest credits first and is
//!   fully deterministic.
//! - [`SelectionStrategy::Random`] shuffles with a fresh OS-seeded RNG on
//!   every call.

use std::fmt;
use std::str::FromStr;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use quill_core::fees::FeeRate;
use quill_core::types::Credit;

use crate::error::WalletError;
use crate::input_yield::input_yields_positively;

/// How candidate credits are ordered before accumulation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SelectionStrategy {
    #[default]
    Largest,
    Random,
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionStrategy::Largest => f.write_str("largest"),
            SelectionStrategy::Random => f.write_str("random"),
        }
    }
}

impl FromStr for SelectionStrategy {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "largest" => Ok(SelectionStrategy::Largest),
            "random" => Ok(SelectionStrategy::Random),
            other => Err(WalletError::InvalidRequest(format!(
                "unknown selection strategy: {other}"
            ))),
        }
    }
}

/// Credits chosen to fund a transaction, in the order they were taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSelection {
    pub selected: Vec<Credit>,
    /// Sum of the selected amounts.
    pub total: u64,
}

pub struct CoinSelector;

impl CoinSelector {
    /// Pick credits from `eligible` whose sum reaches `target`.
    ///
    /// Fails with [`WalletError::InsufficientFunds`] when every
    /// positive-yield credit together falls short.
    pub fn select(
        strategy: SelectionStrategy,
        eligible: &[Credit],
        target: u64,
        fee_rate: FeeRate,
    ) -> Result<CoinSelection, WalletError> {
        let mut candidates: Vec<&Credit> = eligible
            .iter()
            .filter(|c| input_yields_positively(c, fee_rate))
            .collect();

        match strategy {
            // Stable: equal amounts keep discovery order.
            SelectionStrategy::Largest => candidates.sort_by(|a, b| b.amount().cmp(&a.amount())),
            SelectionStrategy::Random => candidates.shuffle(&mut StdRng::from_entropy()),
        }

        let mut selected = Vec::new();
        let mut total: u64 = 0;
        for credit in candidates.iter().copied() {
            if total >= target {
                break;
            }
            total = total.saturating_add(credit.amount());
            selected.push(credit.clone());
        }

        if total < target {
            return Err(WalletError::InsufficientFunds {
                have: total,
                need: target,
            });
        }

        debug!(
            %strategy,
            target,
            total,
            inputs = selected.len(),
            skipped = eligible.len() - candidates.len(),
            "coins selected"
        );
        Ok(CoinSelection { selected, total })
    }
}
