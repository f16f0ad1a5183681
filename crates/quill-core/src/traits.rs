//! Collaborator interfaces consumed by transaction authoring.
//!
//! - [`Ledger`]: read-only view of the wallet's unspent credits
//! - [`AddressManager`]: change-address lookup and allocation
//!
//! Authoring borrows implementations of these for the duration of one call
//! and never holds on to them.

use crate::error::{DerivationError, LedgerError};
use crate::types::{AccountId, Credit, Script, ScriptKind};

/// Read access to the wallet's recorded credits.
pub trait Ledger: Send + Sync {
    /// Height of the best block the ledger has seen.
    fn tip_height(&self) -> Result<u64, LedgerError>;

    /// Unspent credits of `account` with at least `min_conf` confirmations,
    /// in the order the ledger discovered them.
    fn list_unspent(&self, account: AccountId, min_conf: u32) -> Result<Vec<Credit>, LedgerError>;
}

/// Change-address source backed by the wallet's key derivation.
///
/// Implementations must make [`next_change_address`](Self::next_change_address)
/// atomic: either the new address is persisted and the index advanced, or
/// nothing changes. Concurrent calls for one account must never return the
/// same script.
pub trait AddressManager: Send + Sync {
    /// Script kind of the account's change outputs, needed for fee estimation
    /// before a change address is chosen.
    fn change_script_kind(&self, account: AccountId) -> Result<ScriptKind, DerivationError>;

    /// The account's current change address. Must not allocate or persist.
    fn current_change_address(&self, account: AccountId) -> Result<Script, DerivationError>;

    /// Allocate, persist and return a fresh change address.
    fn next_change_address(&self, account: AccountId) -> Result<Script, DerivationError>;
}
