//! Error types shared by Quill crates.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("invalid signature on input {index}")] InvalidSignature { index: usize },
    #[error("duplicate input: {0}")] DuplicateInput(String),
    #[error("oversized: {size} > {max}")] OversizedTransaction { size: usize, max: usize },
    #[error("empty inputs or outputs")] EmptyInputsOrOutputs,
    #[error("value overflow")] ValueOverflow,
    #[error("serialization: {0}")] Serialization(String),
    #[error("zero-value output at index {0}")] ZeroValueOutput(usize),
    #[error("null outpoint in input {0}")] NullOutpoint(usize),
    #[error("prevout data mismatch: {inputs} inputs, {scripts} scripts, {values} values")]
    PrevoutMismatch { inputs: usize, scripts: usize, values: usize },
    #[error("outputs exceed inputs: have {have}, need {need}")] InsufficientFunds { have: u64, need: u64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid public key bytes")] InvalidPublicKey,
    #[error("invalid signature bytes")] InvalidSignature,
    #[error("signature verification failed")] VerificationFailed,
    #[error("pubkey hash does not match expected")] PubkeyHashMismatch,
    #[error("input index out of bounds: {index} >= {len}")] InputIndexOutOfBounds { index: usize, len: usize },
}

/// Failures reading the credit ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")] Unavailable(String),
    #[error("ledger corrupt: {0}")] Corrupt(String),
}

/// Failures persisting key and account state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("I/O: {0}")] Io(String),
    #[error("serialization: {0}")] Serialization(String),
    #[error("corrupt store: {0}")] Corrupt(String),
}

/// Failures deriving or allocating addresses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DerivationError {
    #[error("unknown account {0}")] UnknownAccount(u32),
    #[error("account {account} {branch} branch exhausted")] IndexExhausted { account: u32, branch: &'static str },
    #[error(transparent)] Store(#[from] StoreError),
}
