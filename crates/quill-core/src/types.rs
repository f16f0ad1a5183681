//! Core types: hashes, locking scripts, transactions and wallet credits.
//!
//! All monetary values are in minor units (1 QUILL = 10^8 units).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::TransactionError;

/// A 32-byte hash value.
///
/// Used for transaction IDs and as the program of a locking script
/// (the BLAKE3 hash of the owning public key).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash (32 zero bytes).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for Hash256 {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Wallet account number.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub struct AccountId(pub u32);

impl AccountId {
    /// The account every wallet starts with.
    pub const DEFAULT: Self = Self(0);
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a specific output of a previous transaction.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct OutPoint {
    /// Transaction ID containing the referenced output.
    pub txid: Hash256,
    /// Index of the output within the transaction.
    pub index: u64,
}

impl OutPoint {
    /// The null outpoint, used for coinbase transaction inputs.
    pub fn null() -> Self {
        Self {
            txid: Hash256::ZERO,
            index: u64::MAX,
        }
    }

    /// Check if this is the null outpoint (coinbase marker).
    pub fn is_null(&self) -> bool {
        self.txid.is_zero() && self.index == u64::MAX
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

/// The spending template of a locking script.
///
/// Determines how large the unlocking data of an input spending it will be,
/// and therefore what the input costs in fees.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
#[serde(rename_all = "lowercase")]
pub enum ScriptKind {
    /// Legacy pay-to-pubkey-hash; unlocked by a signature script.
    P2pkh,
    /// Native witness pubkey hash.
    P2wpkh,
    /// Witness pubkey hash nested in a script hash.
    Np2wpkh,
    /// Taproot key-path spend.
    P2tr,
}

impl ScriptKind {
    /// All kinds, in a fixed order.
    pub const ALL: [ScriptKind; 4] = [Self::P2pkh, Self::P2wpkh, Self::Np2wpkh, Self::P2tr];

    /// Short lowercase tag used in text encodings.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::P2pkh => "p2pkh",
            Self::P2wpkh => "p2wpkh",
            Self::Np2wpkh => "np2wpkh",
            Self::P2tr => "p2tr",
        }
    }

    /// Whether spending this kind carries witness data.
    pub fn is_witness(&self) -> bool {
        !matches!(self, Self::P2pkh)
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ScriptKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.tag() == s)
            .ok_or_else(|| format!("unknown script kind: {s}"))
    }
}

/// A locking script: a spending template plus the pubkey hash it commits to.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct Script {
    kind: ScriptKind,
    pubkey_hash: Hash256,
}

impl Script {
    /// Build a script of `kind` paying to `pubkey_hash`.
    pub fn new(kind: ScriptKind, pubkey_hash: Hash256) -> Self {
        Self { kind, pubkey_hash }
    }

    pub fn kind(&self) -> ScriptKind {
        self.kind
    }

    /// The BLAKE3 pubkey hash whose key can unlock this script.
    pub fn pubkey_hash(&self) -> Hash256 {
        self.pubkey_hash
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.pubkey_hash)
    }
}

impl FromStr for Script {
    type Err = String;

    /// Parse the `kind:hexhash` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, hash) = s
            .split_once(':')
            .ok_or_else(|| format!("missing ':' in script {s}"))?;
        let hash = hash
            .parse::<Hash256>()
            .map_err(|e| format!("invalid pubkey hash: {e}"))?;
        Ok(Self::new(kind.parse()?, hash))
    }
}

/// A transaction input, spending a previous output.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct TxInput {
    /// The outpoint being spent.
    pub previous_output: OutPoint,
    /// Ed25519 signature (64 bytes). Empty until signed.
    pub signature: Vec<u8>,
    /// Ed25519 public key (32 bytes). Empty until signed.
    pub public_key: Vec<u8>,
}

impl TxInput {
    /// An input spending `previous_output` with no unlocking data yet.
    pub fn unsigned(previous_output: OutPoint) -> Self {
        Self {
            previous_output,
            signature: Vec::new(),
            public_key: Vec::new(),
        }
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty() && !self.public_key.is_empty()
    }
}

/// A transaction output, creating a new spendable credit.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct TxOutput {
    /// Value in minor units.
    pub value: u64,
    /// Locking script of the recipient.
    pub script: Script,
}

/// A transaction transferring value between scripts.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    /// Protocol version.
    pub version: u64,
    /// Inputs consuming previous outputs.
    pub inputs: Vec<TxInput>,
    /// New outputs created by this transaction.
    pub outputs: Vec<TxOutput>,
    /// Block height before which this tx is invalid.
    pub lock_time: u64,
}

impl Transaction {
    /// Compute the transaction ID (BLAKE3 hash of the canonical encoding).
    pub fn txid(&self) -> Result<Hash256, TransactionError> {
        let encoded = self.encode()?;
        Ok(Hash256(blake3::hash(&encoded).into()))
    }

    /// Canonical bincode encoding.
    pub fn encode(&self) -> Result<Vec<u8>, TransactionError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| TransactionError::Serialization(e.to_string()))
    }

    /// Check if this is a coinbase transaction (single input with null outpoint).
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous_output.is_null()
    }

    /// Sum of all output values. Returns None on overflow.
    pub fn total_output_value(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
    }
}

/// An unspent output owned by the wallet, as recorded by the ledger.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Credit {
    /// The outpoint identifying this output.
    pub outpoint: OutPoint,
    /// The output itself: amount and locking script.
    pub output: TxOutput,
    /// Account owning the locking script.
    pub account: AccountId,
    /// Height of the confirming block, `None` while unconfirmed.
    pub block_height: Option<u64>,
    /// Whether this output was created by a coinbase transaction.
    pub is_coinbase: bool,
}

impl Credit {
    pub fn amount(&self) -> u64 {
        self.output.value
    }

    pub fn script(&self) -> &Script {
        &self.output.script
    }

    /// Confirmations at chain tip `tip_height`. A credit in the tip block has one.
    pub fn confirmations(&self, tip_height: u64) -> u64 {
        match self.block_height {
            Some(h) if h <= tip_height => tip_height - h + 1,
            _ => 0,
        }
    }

    /// Coinbase credits need [`COINBASE_MATURITY`](crate::constants::COINBASE_MATURITY)
    /// confirmations; everything else is always mature.
    pub fn is_mature(&self, tip_height: u64) -> bool {
        !self.is_coinbase
            || self.confirmations(tip_height) >= crate::constants::COINBASE_MATURITY
    }
}
