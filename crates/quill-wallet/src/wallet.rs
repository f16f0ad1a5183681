//! Wallet composition: addresses, credits and transaction authoring.
//!
//! The [`Wallet`] ties an [`AddressBook`] to a [`MemoryLedger`] and the
//! authoring defaults in [`AuthorConfig`]. Previews (`dry_run`) leave both
//! untouched; commits allocate change through the address book's store.

use std::path::Path;

use tracing::{debug, info};

use quill_core::fees::FeeRate;
use quill_core::traits::Ledger;
use quill_core::types::{AccountId, Credit, OutPoint, Script, ScriptKind, Transaction};
use quill_core::validation::validate_spend;

use crate::address_book::AddressBook;
use crate::builder::{AuthoredTransaction, OutputRequest, TransactionBuilder};
use crate::coin_selection::SelectionStrategy;
use crate::config::AuthorConfig;
use crate::eligibility::EligibilityFilter;
use crate::error::WalletError;
use crate::keys::Seed;
use crate::ledger::MemoryLedger;
use crate::store::{FileAccountStore, MemoryAccountStore};

/// A wallet over one seed.
pub struct Wallet {
    book: AddressBook,
    ledger: MemoryLedger,
    config: AuthorConfig,
    input_kind: Option<ScriptKind>,
}

impl Wallet {
    pub fn new(book: AddressBook, ledger: MemoryLedger, config: AuthorConfig) -> Self {
        Self {
            book,
            ledger,
            config,
            input_kind: None,
        }
    }

    /// A wallet whose account state lives only in memory.
    pub fn in_memory(seed: Seed, kind: ScriptKind) -> Result<Self, WalletError> {
        let book = AddressBook::create(seed, kind, Box::new(MemoryAccountStore::new()))?;
        Ok(Self::new(book, MemoryLedger::new(), AuthorConfig::default()))
    }

    /// Create a new wallet file at `path`. Fails if one already exists.
    pub fn create_file(path: &Path, seed: Seed, kind: ScriptKind) -> Result<Self, WalletError> {
        if path.exists() {
            return Err(WalletError::IoError(format!(
                "wallet file already exists: {}",
                path.display()
            )));
        }
        let store = FileAccountStore::open(path)?;
        let book = AddressBook::create(seed, kind, Box::new(store))?;
        info!(path = %path.display(), %kind, "wallet created");
        Ok(Self::new(book, MemoryLedger::new(), AuthorConfig::default()))
    }

    /// Open the wallet file at `path` with `ledger` as its credit source.
    pub fn open_file(path: &Path, ledger: MemoryLedger) -> Result<Self, WalletError> {
        if !path.exists() {
            return Err(WalletError::IoError(format!(
                "wallet file not found: {}",
                path.display()
            )));
        }
        let store = FileAccountStore::open(path)?;
        let book = AddressBook::open(Box::new(store))?;
        Ok(Self::new(book, ledger, AuthorConfig::default()))
    }

    pub fn with_config(mut self, config: AuthorConfig) -> Self {
        self.config = config;
        self
    }

    /// Restrict future selections to credits locked to `kind`.
    pub fn set_input_kind(&mut self, kind: Option<ScriptKind>) {
        self.input_kind = kind;
    }

    pub fn config(&self) -> &AuthorConfig {
        &self.config
    }

    pub fn address_book(&self) -> &AddressBook {
        &self.book
    }

    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    pub fn create_account(&self, kind: ScriptKind) -> Result<AccountId, WalletError> {
        Ok(self.book.create_account(kind)?)
    }

    pub fn current_address(&self, account: AccountId) -> Result<Script, WalletError> {
        Ok(self.book.current_address(account)?)
    }

    pub fn new_address(&self, account: AccountId) -> Result<Script, WalletError> {
        Ok(self.book.new_address(account)?)
    }

    pub fn account_addresses(&self, account: AccountId) -> Result<Vec<Script>, WalletError> {
        Ok(self.book.account_addresses(account)?)
    }

    pub fn record_credit(&self, credit: Credit) -> bool {
        self.ledger.record_credit(credit)
    }

    pub fn set_tip_height(&self, height: u64) {
        self.ledger.set_tip_height(height);
    }

    /// Apply a transaction seen at `block_height` (`None` if unconfirmed):
    /// spend its inputs and credit every output paying a wallet address.
    ///
    /// Returns how many outputs were credited.
    pub fn record_transaction(
        &self,
        tx: &Transaction,
        block_height: Option<u64>,
    ) -> Result<usize, WalletError> {
        let txid = tx.txid()?;

        if !tx.is_coinbase() {
            for input in &tx.inputs {
                self.ledger.mark_spent(&input.previous_output);
            }
        }

        let mut credited = 0;
        for (index, output) in tx.outputs.iter().enumerate() {
            let Some(account) = self.book.account_of(&output.script) else {
                continue;
            };
            let recorded = self.ledger.record_credit(Credit {
                outpoint: OutPoint {
                    txid,
                    index: index as u64,
                },
                output: output.clone(),
                account,
                block_height,
                is_coinbase: tx.is_coinbase(),
            });
            if recorded {
                credited += 1;
            }
        }

        debug!(%txid, credited, "transaction recorded");
        Ok(credited)
    }

    /// Spendable value of `account` with at least `min_conf` confirmations.
    pub fn balance(&self, account: AccountId, min_conf: u32) -> Result<u64, WalletError> {
        let eligible = EligibilityFilter::new(&self.ledger)
            .with_input_kind(self.input_kind)
            .eligible(account, min_conf)?;
        Ok(eligible.iter().map(Credit::amount).sum())
    }

    /// Author an unsigned transaction paying `outputs` from `account`.
    ///
    /// With `dry_run` the result carries the account's current change
    /// address and no state changes; otherwise a kept change output consumes
    /// a fresh address.
    pub fn author_transaction(
        &self,
        outputs: &[OutputRequest],
        account: AccountId,
        min_conf: u32,
        fee_rate: FeeRate,
        strategy: SelectionStrategy,
        dry_run: bool,
    ) -> Result<AuthoredTransaction, WalletError> {
        let mut builder = TransactionBuilder::with_config(&self.config);
        builder
            .add_outputs(outputs.iter().cloned())
            .set_min_conf(min_conf)
            .set_fee_rate(fee_rate)
            .set_strategy(strategy)
            .set_input_kind(self.input_kind)
            .set_dry_run(dry_run);
        builder.build(account, &self.ledger, &self.book)
    }

    /// [`author_transaction`](Self::author_transaction) with the configured
    /// confirmation, fee and strategy defaults.
    pub fn author_with_defaults(
        &self,
        outputs: &[OutputRequest],
        account: AccountId,
        dry_run: bool,
    ) -> Result<AuthoredTransaction, WalletError> {
        self.author_transaction(
            outputs,
            account,
            self.config.min_conf,
            self.config.fee_rate,
            self.config.strategy,
            dry_run,
        )
    }

    pub fn sign_transaction(
        &self,
        authored: &AuthoredTransaction,
    ) -> Result<Transaction, WalletError> {
        TransactionBuilder::sign(authored, &self.book)
    }

    /// Author, sign and self-check a transaction in one step.
    ///
    /// Always commits: a kept change output consumes a fresh address.
    pub fn create_signed_transaction(
        &self,
        outputs: &[OutputRequest],
        account: AccountId,
        min_conf: u32,
        fee_rate: FeeRate,
        strategy: SelectionStrategy,
    ) -> Result<(AuthoredTransaction, Transaction), WalletError> {
        let authored =
            self.author_transaction(outputs, account, min_conf, fee_rate, strategy, false)?;
        let signed = self.sign_transaction(&authored)?;
        validate_spend(&signed, &authored.prev_scripts, &authored.prev_values)?;
        info!(
            txid = %signed.txid()?,
            inputs = signed.inputs.len(),
            fee = authored.fee,
            "transaction signed"
        );
        Ok((authored, signed))
    }

    /// Current chain tip known to the ledger.
    pub fn tip_height(&self) -> Result<u64, WalletError> {
        Ok(self.ledger.tip_height()?)
    }
}
