//! Seed management and deterministic key derivation.
//!
//! Keys are derived with BLAKE3's keyed derivation function from a 32-byte
//! master seed along an `(account, branch, index)` path. The same seed always
//! reproduces the same keys, so address allocation state is the only thing
//! that needs persisting besides the seed itself.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use quill_core::crypto::KeyPair;
use quill_core::types::{AccountId, Script, ScriptKind};

/// BLAKE3 KDF context for child key derivation.
const KDF_CONTEXT: &str = "quill-wallet-key-derivation-v1";

/// A 32-byte master seed for deterministic key derivation.
///
/// Secret material is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed {
    bytes: [u8; 32],
}

impl Seed {
    /// Generate a random seed from the OS cryptographic RNG.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Get the raw seed bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl Clone for Seed {
    fn clone(&self) -> Self {
        Self { bytes: self.bytes }
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derivation branch of an account.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Branch {
    /// Receive addresses handed out to payers.
    External,
    /// Change addresses used by the wallet's own transactions.
    Internal,
}

impl Branch {
    fn code(&self) -> u8 {
        match self {
            Branch::External => 0,
            Branch::Internal => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Branch::External => "external",
            Branch::Internal => "internal",
        }
    }
}

/// Full derivation path of one wallet key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyPath {
    pub account: AccountId,
    pub branch: Branch,
    pub index: u32,
}

/// Stateless key derivation from a master seed.
#[derive(Clone)]
pub struct KeyChain {
    seed: Seed,
}

impl KeyChain {
    pub fn new(seed: Seed) -> Self {
        Self { seed }
    }

    /// Derive the keypair at `path`.
    pub fn derive_keypair(&self, path: KeyPath) -> KeyPair {
        derive_child_keypair(&self.seed, path)
    }

    /// Locking script of kind `kind` for the key at `path`.
    pub fn script_at(&self, path: KeyPath, kind: ScriptKind) -> Script {
        let pkh = self.derive_keypair(path).public_key().pubkey_hash();
        Script::new(kind, pkh)
    }

    pub(crate) fn seed(&self) -> &Seed {
        &self.seed
    }
}

impl fmt::Debug for KeyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyChain").finish_non_exhaustive()
    }
}

/// Derive a child keypair from a seed and path using BLAKE3 KDF.
fn derive_child_keypair(seed: &Seed, path: KeyPath) -> KeyPair {
    let mut ikm = Vec::with_capacity(41);
    ikm.extend_from_slice(seed.as_bytes());
    ikm.extend_from_slice(&path.account.0.to_le_bytes());
    ikm.push(path.branch.code());
    ikm.extend_from_slice(&path.index.to_le_bytes());
    let derived = blake3::derive_key(KDF_CONTEXT, &ikm);
    ikm.zeroize();
    KeyPair::from_secret_bytes(derived)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(account: u32, branch: Branch, index: u32) -> KeyPath {
        KeyPath {
            account: AccountId(account),
            branch,
            index,
        }
    }

    #[test]
    fn seed_generate_unique() {
        let s1 = Seed::generate();
        let s2 = Seed::generate();
        assert_ne!(s1.as_bytes(), s2.as_bytes());
    }

    #[test]
    fn seed_debug_hides_bytes() {
        let seed = Seed::from_bytes([0xAB; 32]);
        let debug = format!("{seed:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("ab"));
    }

    #[test]
    fn derive_deterministic() {
        let kc1 = KeyChain::new(Seed::from_bytes([1u8; 32]));
        let kc2 = KeyChain::new(Seed::from_bytes([1u8; 32]));
        let p = path(0, Branch::External, 0);
        assert_eq!(kc1.derive_keypair(p).public_key(), kc2.derive_keypair(p).public_key());
    }

    #[test]
    fn derive_unique_per_path_component() {
        let kc = KeyChain::new(Seed::from_bytes([1u8; 32]));
        let base = kc.derive_keypair(path(0, Branch::External, 0)).public_key();
        for other in [
            path(1, Branch::External, 0),
            path(0, Branch::Internal, 0),
            path(0, Branch::External, 1),
        ] {
            assert_ne!(base, kc.derive_keypair(other).public_key(), "{other:?}");
        }
    }

    #[test]
    fn derive_unique_per_seed() {
        let p = path(0, Branch::External, 0);
        let kp1 = KeyChain::new(Seed::from_bytes([1u8; 32])).derive_keypair(p);
        let kp2 = KeyChain::new(Seed::from_bytes([2u8; 32])).derive_keypair(p);
        assert_ne!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn script_commits_to_derived_key() {
        let kc = KeyChain::new(Seed::from_bytes([3u8; 32]));
        let p = path(0, Branch::Internal, 4);
        let script = kc.script_at(p, ScriptKind::Np2wpkh);
        assert_eq!(script.kind(), ScriptKind::Np2wpkh);
        assert_eq!(script.pubkey_hash(), kc.derive_keypair(p).public_key().pubkey_hash());
    }

    #[test]
    fn branch_names() {
        assert_eq!(Branch::External.name(), "external");
        assert_eq!(Branch::Internal.name(), "internal");
    }
}
