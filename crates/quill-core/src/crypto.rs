//! Ed25519 keys and input signatures.
//!
//! An input signature commits to a **sighash** covering:
//! - transaction version and lock time
//! - every input outpoint
//! - every output (value + locking script)
//! - the index of the input being signed
//! - the locking script and value of the output that input spends
//!
//! Committing to the spent value means a signer that is lied to about an
//! input amount produces a signature that fails verification.

use ed25519_dalek::{Signer, Verifier};
use std::fmt;

use crate::error::CryptoError;
use crate::types::{Hash256, Script, Transaction};

/// Domain separator for the sighash.
const SIGHASH_CONTEXT: &[u8] = b"quill-sighash-v1";

/// Ed25519 keypair for signing transaction inputs.
///
/// The secret key is zeroized on drop by ed25519-dalek.
pub struct KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl KeyPair {
    /// Generate a random keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Create a keypair from 32-byte secret key material.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(&bytes),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// Sign a message, returning the raw 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl Clone for KeyPair {
    fn clone(&self) -> Self {
        Self::from_secret_bytes(self.signing_key.to_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Ed25519 public key.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: ed25519_dalek::VerifyingKey,
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let vk = ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self { verifying_key: vk })
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// BLAKE3 hash of the key, as committed to by locking scripts.
    pub fn pubkey_hash(&self) -> Hash256 {
        pubkey_hash(&self.to_bytes())
    }

    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> Result<(), CryptoError> {
        let sig = ed25519_dalek::Signature::from_bytes(signature);
        self.verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.to_bytes()))
    }
}

/// BLAKE3 pubkey hash from raw public key bytes.
pub fn pubkey_hash(pubkey_bytes: &[u8; 32]) -> Hash256 {
    Hash256(blake3::hash(pubkey_bytes).into())
}

/// Compute the sighash for input `input_index`, which spends an output
/// locked by `prev_script` and worth `prev_value`.
pub fn signing_hash(
    tx: &Transaction,
    input_index: usize,
    prev_script: &Script,
    prev_value: u64,
) -> Result<Hash256, CryptoError> {
    if input_index >= tx.inputs.len() {
        return Err(CryptoError::InputIndexOutOfBounds {
            index: input_index,
            len: tx.inputs.len(),
        });
    }

    let mut hasher = blake3::Hasher::new();
    hasher.update(SIGHASH_CONTEXT);
    hasher.update(&tx.version.to_le_bytes());

    hasher.update(&(tx.inputs.len() as u64).to_le_bytes());
    for input in &tx.inputs {
        hasher.update(input.previous_output.txid.as_bytes());
        hasher.update(&input.previous_output.index.to_le_bytes());
    }

    hasher.update(&(tx.outputs.len() as u64).to_le_bytes());
    for output in &tx.outputs {
        hasher.update(&output.value.to_le_bytes());
        hash_script(&mut hasher, &output.script);
    }

    hasher.update(&tx.lock_time.to_le_bytes());
    hasher.update(&(input_index as u64).to_le_bytes());
    hash_script(&mut hasher, prev_script);
    hasher.update(&prev_value.to_le_bytes());

    Ok(Hash256(hasher.finalize().into()))
}

fn hash_script(hasher: &mut blake3::Hasher, script: &Script) {
    hasher.update(script.kind().tag().as_bytes());
    hasher.update(script.pubkey_hash().as_bytes());
}

/// Sign input `input_index` in place, writing signature and public key.
///
/// Inputs can be signed in any order since the sighash excludes signatures.
pub fn sign_transaction_input(
    tx: &mut Transaction,
    input_index: usize,
    prev_script: &Script,
    prev_value: u64,
    keypair: &KeyPair,
) -> Result<(), CryptoError> {
    let sighash = signing_hash(tx, input_index, prev_script, prev_value)?;
    let signature = keypair.sign(sighash.as_bytes());

    let input = &mut tx.inputs[input_index];
    input.signature = signature.to_vec();
    input.public_key = keypair.public_key().to_bytes().to_vec();
    Ok(())
}

/// Verify input `input_index` against the output it spends.
///
/// The embedded public key must hash to `prev_script`'s pubkey hash and the
/// signature must verify over the sighash.
pub fn verify_transaction_input(
    tx: &Transaction,
    input_index: usize,
    prev_script: &Script,
    prev_value: u64,
) -> Result<(), CryptoError> {
    let sighash = signing_hash(tx, input_index, prev_script, prev_value)?;
    let input = &tx.inputs[input_index];

    let pk_bytes: [u8; 32] = input
        .public_key
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidPublicKey)?;
    let pk = PublicKey::from_bytes(&pk_bytes)?;

    if pk.pubkey_hash() != prev_script.pubkey_hash() {
        return Err(CryptoError::PubkeyHashMismatch);
    }

    let sig_bytes: [u8; 64] = input
        .signature
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidSignature)?;

    pk.verify(sighash.as_bytes(), &sig_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutPoint, ScriptKind, TxInput, TxOutput};

    fn script_for(kp: &KeyPair) -> Script {
        Script::new(ScriptKind::P2wpkh, kp.public_key().pubkey_hash())
    }

    fn sample_tx(n_inputs: usize) -> Transaction {
        Transaction {
            version: 2,
            inputs: (0..n_inputs)
                .map(|i| {
                    TxInput::unsigned(OutPoint {
                        txid: Hash256([i as u8 + 1; 32]),
                        index: 0,
                    })
                })
                .collect(),
            outputs: vec![TxOutput {
                value: 5_000,
                script: Script::new(ScriptKind::P2tr, Hash256([0xCC; 32])),
            }],
            lock_time: 0,
        }
    }

    #[test]
    fn sign_and_verify() {
        let kp = KeyPair::generate();
        let script = script_for(&kp);
        let mut tx = sample_tx(1);
        sign_transaction_input(&mut tx, 0, &script, 10_000, &kp).unwrap();
        assert!(tx.inputs[0].is_signed());
        verify_transaction_input(&tx, 0, &script, 10_000).unwrap();
    }

    #[test]
    fn verify_fails_for_wrong_prev_value() {
        let kp = KeyPair::generate();
        let script = script_for(&kp);
        let mut tx = sample_tx(1);
        sign_transaction_input(&mut tx, 0, &script, 10_000, &kp).unwrap();
        assert_eq!(
            verify_transaction_input(&tx, 0, &script, 9_999),
            Err(CryptoError::VerificationFailed)
        );
    }

    #[test]
    fn verify_fails_for_foreign_script() {
        let kp = KeyPair::generate();
        let mut tx = sample_tx(1);
        sign_transaction_input(&mut tx, 0, &script_for(&kp), 10_000, &kp).unwrap();
        let other = script_for(&KeyPair::generate());
        assert_eq!(
            verify_transaction_input(&tx, 0, &other, 10_000),
            Err(CryptoError::PubkeyHashMismatch)
        );
    }

    #[test]
    fn verify_unsigned_input_fails() {
        let kp = KeyPair::generate();
        let tx = sample_tx(1);
        assert_eq!(
            verify_transaction_input(&tx, 0, &script_for(&kp), 1),
            Err(CryptoError::InvalidPublicKey)
        );
    }

    #[test]
    fn sighash_differs_per_input() {
        let script = Script::new(ScriptKind::P2wpkh, Hash256::ZERO);
        let tx = sample_tx(2);
        let h0 = signing_hash(&tx, 0, &script, 1).unwrap();
        let h1 = signing_hash(&tx, 1, &script, 1).unwrap();
        assert_ne!(h0, h1);
    }

    #[test]
    fn sighash_commits_to_prev_script_kind() {
        let tx = sample_tx(1);
        let a = Script::new(ScriptKind::P2wpkh, Hash256::ZERO);
        let b = Script::new(ScriptKind::Np2wpkh, Hash256::ZERO);
        assert_ne!(
            signing_hash(&tx, 0, &a, 1).unwrap(),
            signing_hash(&tx, 0, &b, 1).unwrap()
        );
    }

    #[test]
    fn sighash_out_of_bounds() {
        let tx = sample_tx(1);
        let script = Script::new(ScriptKind::P2wpkh, Hash256::ZERO);
        assert_eq!(
            signing_hash(&tx, 3, &script, 1),
            Err(CryptoError::InputIndexOutOfBounds { index: 3, len: 1 })
        );
    }

    #[test]
    fn keypair_clone_keeps_identity() {
        let kp = KeyPair::from_secret_bytes([9; 32]);
        assert_eq!(kp.clone().public_key(), kp.public_key());
    }

    #[test]
    fn keypair_debug_hides_secret() {
        let kp = KeyPair::from_secret_bytes([9; 32]);
        let debug = format!("{kp:?}");
        assert!(debug.contains("public_key"));
        assert!(!debug.contains("signing_key"));
    }
}
