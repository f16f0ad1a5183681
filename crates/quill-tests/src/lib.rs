//! Cross-crate test suite for Quill transaction authoring.
//!
//! Integration tests under `tests/` drive a full [`quill_wallet::Wallet`]
//! through preview and commit paths, concurrent change allocation and
//! failing collaborators.

pub mod helpers;
