//! # quill-wallet: fee-aware coin selection and transaction authoring.
//!
//! Turns a list of requested payments into an unsigned transaction: it picks
//! the wallet's credits worth spending at the active fee rate, converges the
//! fee against the transaction's own size, and chooses a change destination
//! that is either previewed or durably allocated.
//!
//! # Modules
//!
//! - [`error`]: `WalletError` enum
//! - [`keys`]: Seed, KeyChain, BLAKE3-based key derivation
//! - [`store`]: Account records and their memory/file stores
//! - [`address_book`]: Address issuance, the `AddressManager` implementation
//! - [`ledger`]: In-memory credit ledger
//! - [`input_yield`]: Per-credit economic check
//! - [`eligibility`]: Spendable-credit filter
//! - [`coin_selection`]: Largest-first and random selection
//! - [`change`]: Change preview and allocation
//! - [`builder`]: Fee fixed-point authoring and signing
//! - [`config`]: Authoring defaults and wallet file locations
//! - [`wallet`]: High-level wallet composition

pub mod address_book;
pub mod builder;
pub mod change;
pub mod coin_selection;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod input_yield;
pub mod keys;
pub mod ledger;
pub mod store;
pub mod wallet;

// Re-exports for convenient access
pub use address_book::AddressBook;
pub use builder::{AuthoredTransaction, OutputRequest, TransactionBuilder};
pub use change::ChangeManager;
pub use coin_selection::{CoinSelection, CoinSelector, SelectionStrategy};
pub use config::{AuthorConfig, WalletConfig};
pub use eligibility::EligibilityFilter;
pub use error::WalletError;
pub use input_yield::input_yields_positively;
pub use keys::{Branch, KeyChain, KeyPath, Seed};
pub use ledger::{LedgerSnapshot, MemoryLedger};
pub use store::{AccountRecord, AccountStore, FileAccountStore, KeyChainData, MemoryAccountStore};
pub use wallet::Wallet;
