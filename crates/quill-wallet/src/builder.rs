//! Transaction authoring with a bounded fee fixed point, and signing.
//!
//! A transaction's fee depends on its size, which depends on the inputs
//! selected to pay that fee. [`TransactionBuilder::build`] resolves the
//! cycle by iteration:
//!
//! 1. Estimate the fee for the requested outputs plus a change output.
//! 2. Select credits covering outputs and that fee.
//! 3. Re-estimate with the selected inputs. If the selection no longer
//!    covers the fee, raise the target and select again.
//!
//! The loop gives up with [`WalletError::InsufficientFunds`] after
//! `max_fee_iterations` rounds. Change below the dust threshold is left to
//! the fee. Only a non-dry-run build that keeps a change output allocates
//! an address.

use serde::{Deserialize, Serialize};
use tracing::debug;

use quill_core::constants::{MAX_MONEY, TX_VERSION};
use quill_core::crypto::sign_transaction_input;
use quill_core::fees::{FeeRate, is_dust};
use quill_core::size::estimate_virtual_size;
use quill_core::traits::{AddressManager, Ledger};
use quill_core::types::{AccountId, Credit, Script, ScriptKind, Transaction, TxInput, TxOutput};

use crate::address_book::AddressBook;
use crate::change::ChangeManager;
use crate::coin_selection::{CoinSelection, CoinSelector, SelectionStrategy};
use crate::config::AuthorConfig;
use crate::eligibility::EligibilityFilter;
use crate::error::WalletError;

/// A requested payment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OutputRequest {
    /// Destination locking script.
    pub script: Script,
    /// Amount in minor units. Must be positive.
    pub amount: u64,
}

impl OutputRequest {
    pub fn new(script: Script, amount: u64) -> Self {
        Self { script, amount }
    }
}

/// An unsigned transaction and what a signer needs to finish it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthoredTransaction {
    /// Transaction with empty signatures.
    pub tx: Transaction,
    /// Position of the change output, if one was kept.
    pub change_index: Option<usize>,
    /// Sum of the spent credits.
    pub total_input: u64,
    /// `total_input` minus every output.
    pub fee: u64,
    /// Locking script of the output spent by each input.
    pub prev_scripts: Vec<Script>,
    /// Value of the output spent by each input.
    pub prev_values: Vec<u64>,
}

impl AuthoredTransaction {
    /// The change output, if one was kept.
    pub fn change_output(&self) -> Option<&TxOutput> {
        self.change_index.and_then(|i| self.tx.outputs.get(i))
    }
}

/// Builder for authoring transactions against a ledger and address source.
///
/// # Example
/// ```ignore
/// let authored = TransactionBuilder::new()
///     .add_output(script, 10_000)
///     .set_fee_rate(FeeRate::from_per_kvb(2_000))
///     .set_dry_run(true)
///     .build(AccountId::DEFAULT, &ledger, &address_book)?;
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    outputs: Vec<OutputRequest>,
    fee_rate: FeeRate,
    min_conf: u32,
    strategy: SelectionStrategy,
    input_kind: Option<ScriptKind>,
    relay_fee: FeeRate,
    max_fee_iterations: usize,
    dry_run: bool,
    lock_time: u64,
}

impl TransactionBuilder {
    /// A builder with [`AuthorConfig::default`] settings.
    pub fn new() -> Self {
        Self::with_config(&AuthorConfig::default())
    }

    pub fn with_config(config: &AuthorConfig) -> Self {
        Self {
            outputs: Vec::new(),
            fee_rate: config.fee_rate,
            min_conf: config.min_conf,
            strategy: config.strategy,
            input_kind: None,
            relay_fee: config.relay_fee,
            max_fee_iterations: config.max_fee_iterations,
            dry_run: false,
            lock_time: 0,
        }
    }

    pub fn add_output(&mut self, script: Script, amount: u64) -> &mut Self {
        self.outputs.push(OutputRequest { script, amount });
        self
    }

    pub fn add_outputs(&mut self, outputs: impl IntoIterator<Item = OutputRequest>) -> &mut Self {
        self.outputs.extend(outputs);
        self
    }

    pub fn set_fee_rate(&mut self, fee_rate: FeeRate) -> &mut Self {
        self.fee_rate = fee_rate;
        self
    }

    pub fn set_min_conf(&mut self, min_conf: u32) -> &mut Self {
        self.min_conf = min_conf;
        self
    }

    pub fn set_strategy(&mut self, strategy: SelectionStrategy) -> &mut Self {
        self.strategy = strategy;
        self
    }

    /// Restrict inputs to credits locked to `kind`.
    pub fn set_input_kind(&mut self, kind: Option<ScriptKind>) -> &mut Self {
        self.input_kind = kind;
        self
    }

    /// Preview only: change uses the current address instead of a new one.
    pub fn set_dry_run(&mut self, dry_run: bool) -> &mut Self {
        self.dry_run = dry_run;
        self
    }

    pub fn set_lock_time(&mut self, lock_time: u64) -> &mut Self {
        self.lock_time = lock_time;
        self
    }

    /// Author an unsigned transaction paying the added outputs from
    /// `account`'s credits in `ledger`.
    pub fn build(
        &self,
        account: AccountId,
        ledger: &dyn Ledger,
        addresses: &dyn AddressManager,
    ) -> Result<AuthoredTransaction, WalletError> {
        let total_out = self.validate_outputs()?;

        let eligible = EligibilityFilter::new(ledger)
            .with_input_kind(self.input_kind)
            .eligible(account, self.min_conf)?;

        let change = ChangeManager::new(addresses);
        let change_kind = change.script_kind(account)?;

        let mut outputs: Vec<TxOutput> = self
            .outputs
            .iter()
            .map(|o| TxOutput {
                value: o.amount,
                script: o.script,
            })
            .collect();

        let (selection, fee) = self.fund(&eligible, &outputs, total_out, change_kind)?;

        let remaining = selection.total - total_out;
        let change_amount = remaining - fee;
        let dust = change_amount == 0 || is_dust(change_amount, change_kind, self.relay_fee);
        let change_index = if dust {
            debug!(change_amount, "change dropped into fee");
            None
        } else {
            let script = change.change_script(account, !self.dry_run)?;
            outputs.push(TxOutput {
                value: change_amount,
                script,
            });
            Some(outputs.len() - 1)
        };

        let inputs = selection
            .selected
            .iter()
            .map(|c| TxInput::unsigned(c.outpoint.clone()))
            .collect();
        let prev_scripts = selection.selected.iter().map(|c| *c.script()).collect();
        let prev_values = selection.selected.iter().map(|c| c.amount()).collect();

        let tx = Transaction {
            version: TX_VERSION,
            inputs,
            outputs,
            lock_time: self.lock_time,
        };
        let total_output = tx
            .total_output_value()
            .ok_or_else(|| WalletError::InvalidRequest("total output overflow".into()))?;

        Ok(AuthoredTransaction {
            change_index,
            total_input: selection.total,
            fee: selection.total - total_output,
            prev_scripts,
            prev_values,
            tx,
        })
    }

    /// Sum of the requested amounts, rejecting empty, zero and overflowing
    /// requests.
    fn validate_outputs(&self) -> Result<u64, WalletError> {
        if self.outputs.is_empty() {
            return Err(WalletError::InvalidRequest("no outputs".into()));
        }

        let mut total: u64 = 0;
        for (i, o) in self.outputs.iter().enumerate() {
            if o.amount == 0 {
                return Err(WalletError::InvalidRequest(format!(
                    "output {i} has zero amount"
                )));
            }
            total = total
                .checked_add(o.amount)
                .filter(|t| *t <= MAX_MONEY)
                .ok_or_else(|| WalletError::InvalidRequest("total amount overflow".into()))?;
        }
        Ok(total)
    }

    /// Select inputs until they cover the outputs plus the fee of the
    /// transaction they form. Returns the selection and that fee.
    fn fund(
        &self,
        eligible: &[Credit],
        outputs: &[TxOutput],
        total_out: u64,
        change_kind: ScriptKind,
    ) -> Result<(CoinSelection, u64), WalletError> {
        let mut target_fee = self
            .fee_rate
            .fee_for_vsize(estimate_virtual_size(&[], outputs, Some(change_kind)));
        let mut have = 0;

        for round in 0..self.max_fee_iterations {
            let target = total_out.saturating_add(target_fee);
            let selection = CoinSelector::select(self.strategy, eligible, target, self.fee_rate)?;

            let kinds: Vec<ScriptKind> = selection.selected.iter().map(|c| c.script().kind()).collect();
            let vsize = estimate_virtual_size(&kinds, outputs, Some(change_kind));
            let required = self.fee_rate.fee_for_vsize(vsize);

            debug!(
                round,
                target,
                selected = selection.total,
                vsize,
                required,
                fee_rate = %self.fee_rate,
                "fee estimate"
            );

            if selection.total - total_out >= required {
                return Ok((selection, required));
            }
            have = selection.total;
            target_fee = required;
        }

        Err(WalletError::InsufficientFunds {
            have,
            need: total_out.saturating_add(target_fee),
        })
    }

    /// Sign every input of `authored` with the keys in `book`.
    ///
    /// Each signature commits to the prior script and value of its input.
    pub fn sign(
        authored: &AuthoredTransaction,
        book: &AddressBook,
    ) -> Result<Transaction, WalletError> {
        let mut tx = authored.tx.clone();

        for (i, (script, value)) in authored
            .prev_scripts
            .iter()
            .zip(&authored.prev_values)
            .enumerate()
        {
            let kp = book
                .keypair_for_script(script)
                .ok_or_else(|| WalletError::KeyNotFound(format!("script {script}")))?;
            sign_transaction_input(&mut tx, i, script, *value, &kp)?;
        }

        Ok(tx)
    }
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
