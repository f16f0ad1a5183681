//! Wallet error types.

use quill_core::error::{CryptoError, DerivationError, LedgerError, StoreError, TransactionError};
use thiserror::Error;

/// Errors that can occur in wallet operations.
///
/// Authoring surfaces exactly four kinds to its callers: [`InvalidRequest`],
/// [`InsufficientFunds`], [`StoreUnavailable`] and [`AddressDerivationFailed`].
/// The remaining variants come from signing, persistence and the CLI.
///
/// [`InvalidRequest`]: WalletError::InvalidRequest
/// [`InsufficientFunds`]: WalletError::InsufficientFunds
/// [`StoreUnavailable`]: WalletError::StoreUnavailable
/// [`AddressDerivationFailed`]: WalletError::AddressDerivationFailed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Empty output list, non-positive amount, or overflowing total.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No subset of eligible, positive-yield credits covers the target.
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds {
        /// Value reachable with what was selectable.
        have: u64,
        /// Value required.
        need: u64,
    },

    /// The ledger could not be read.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A change address could not be produced or persisted.
    #[error("address derivation failed: {0}")]
    AddressDerivationFailed(String),

    /// Required key not found in the keychain.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Cryptographic error from quill-core.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Transaction validation error from quill-core.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// Wallet file is corrupted or has invalid format.
    #[error("corrupted file: {0}")]
    CorruptedFile(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<LedgerError> for WalletError {
    fn from(e: LedgerError) -> Self {
        WalletError::StoreUnavailable(e.to_string())
    }
}

impl From<DerivationError> for WalletError {
    fn from(e: DerivationError) -> Self {
        WalletError::AddressDerivationFailed(e.to_string())
    }
}

impl From<StoreError> for WalletError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Io(msg) => WalletError::IoError(msg),
            StoreError::Serialization(msg) | StoreError::Corrupt(msg) => {
                WalletError::CorruptedFile(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_insufficient_funds() {
        let e = WalletError::InsufficientFunds {
            have: 100,
            need: 200,
        };
        assert_eq!(e.to_string(), "insufficient funds: have 100, need 200");
    }

    #[test]
    fn ledger_errors_become_store_unavailable() {
        let e: WalletError = LedgerError::Unavailable("locked".into()).into();
        assert_eq!(
            e,
            WalletError::StoreUnavailable("ledger unavailable: locked".into())
        );
    }

    #[test]
    fn derivation_errors_become_address_failures() {
        let e: WalletError = DerivationError::UnknownAccount(7).into();
        assert_eq!(
            e,
            WalletError::AddressDerivationFailed("unknown account 7".into())
        );
    }

    #[test]
    fn store_errors_map_by_kind() {
        let io: WalletError = StoreError::Io("denied".into()).into();
        assert_eq!(io, WalletError::IoError("denied".into()));
        let bad: WalletError = StoreError::Corrupt("truncated".into()).into();
        assert!(matches!(bad, WalletError::CorruptedFile(_)));
    }

    #[test]
    fn from_transaction_error() {
        let tx = TransactionError::EmptyInputsOrOutputs;
        let wallet: WalletError = tx.into();
        assert_eq!(
            wallet,
            WalletError::Transaction(TransactionError::EmptyInputsOrOutputs)
        );
    }
}
