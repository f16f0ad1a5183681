//! In-memory credit ledger.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use quill_core::error::LedgerError;
use quill_core::traits::Ledger;
use quill_core::types::{AccountId, Credit, OutPoint};

/// Serializable ledger contents.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    /// Height of the best known block.
    pub tip_height: u64,
    /// Unspent credits in discovery order.
    pub credits: Vec<Credit>,
}

/// Unspent credits held in memory behind a read-write lock.
///
/// Readers never block each other; recording and spending take the write
/// lock briefly.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: RwLock<LedgerSnapshot>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.read().clone()
    }

    /// Record a new unspent credit. Returns `false` if the outpoint is
    /// already known.
    pub fn record_credit(&self, credit: Credit) -> bool {
        let mut state = self.state.write();
        if state.credits.iter().any(|c| c.outpoint == credit.outpoint) {
            return false;
        }
        state.credits.push(credit);
        true
    }

    /// Remove the credit at `outpoint`, returning it if it was unspent.
    pub fn mark_spent(&self, outpoint: &OutPoint) -> Option<Credit> {
        let mut state = self.state.write();
        let pos = state.credits.iter().position(|c| &c.outpoint == outpoint)?;
        Some(state.credits.remove(pos))
    }

    pub fn set_tip_height(&self, height: u64) {
        self.state.write().tip_height = height;
    }

    /// Number of unspent credits across all accounts.
    pub fn len(&self) -> usize {
        self.state.read().credits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Ledger for MemoryLedger {
    fn tip_height(&self) -> Result<u64, LedgerError> {
        Ok(self.state.read().tip_height)
    }

    fn list_unspent(&self, account: AccountId, min_conf: u32) -> Result<Vec<Credit>, LedgerError> {
        let state = self.state.read();
        Ok(state
            .credits
            .iter()
            .filter(|c| c.account == account)
            .filter(|c| c.confirmations(state.tip_height) >= u64::from(min_conf))
            .cloned()
            .collect())
    }
}
