//! Narrowing the ledger's credits to those spendable by one request.

use std::collections::HashSet;

use tracing::{debug, warn};

use quill_core::traits::Ledger;
use quill_core::types::{AccountId, Credit, ScriptKind};

use crate::error::WalletError;

/// Filters a [`Ledger`]'s unspent credits for one account.
pub struct EligibilityFilter<'a> {
    ledger: &'a dyn Ledger,
    input_kind: Option<ScriptKind>,
}

impl<'a> EligibilityFilter<'a> {
    pub fn new(ledger: &'a dyn Ledger) -> Self {
        Self {
            ledger,
            input_kind: None,
        }
    }

    /// Only admit credits locked to `kind`, or any kind for `None`.
    pub fn with_input_kind(mut self, kind: Option<ScriptKind>) -> Self {
        self.input_kind = kind;
        self
    }

    /// Credits of `account` with at least `min_conf` confirmations, in the
    /// order the ledger discovered them.
    ///
    /// The ledger's answer is rechecked: foreign accounts, shallow or
    /// immature coinbase credits and repeated outpoints are dropped.
    pub fn eligible(&self, account: AccountId, min_conf: u32) -> Result<Vec<Credit>, WalletError> {
        let tip = self.ledger.tip_height()?;
        let listed = self.ledger.list_unspent(account, min_conf)?;
        let listed_len = listed.len();

        let mut seen = HashSet::with_capacity(listed_len);
        let mut eligible = Vec::with_capacity(listed_len);
        for credit in listed {
            if credit.account != account
                || credit.confirmations(tip) < u64::from(min_conf)
                || !credit.is_mature(tip)
            {
                continue;
            }
            if self.input_kind.is_some_and(|k| credit.script().kind() != k) {
                continue;
            }
            if !seen.insert(credit.outpoint.clone()) {
                warn!(outpoint = %credit.outpoint, "ledger listed a credit twice");
                continue;
            }
            eligible.push(credit);
        }

        debug!(%account, min_conf, tip, listed = listed_len, eligible = eligible.len(), "eligible credits");
        Ok(eligible)
    }
}
