//! Persistent account state for the address book.
//!
//! An [`AccountStore`] holds the seed and, per account, the script kind and
//! next unused derivation index of each branch. Writes replace one account
//! record at a time and must be all-or-nothing: after a failed
//! [`save_account`](AccountStore::save_account) the store reads back exactly
//! as before.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use quill_core::constants::MAX_ADDRESS_INDEX;
use quill_core::error::{DerivationError, StoreError};
use quill_core::types::{AccountId, ScriptKind};

use crate::keys::Branch;

/// Magic string identifying a Quill wallet file.
pub const WALLET_MAGIC: &str = "QUIL";

/// Current wallet file format version.
pub const WALLET_VERSION: u32 = 1;

/// Derivation state of one account.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountRecord {
    /// Script kind of every address in the account.
    pub kind: ScriptKind,
    /// Next unused receive index.
    pub next_external: u32,
    /// Next unused change index.
    pub next_internal: u32,
}

impl AccountRecord {
    pub fn new(kind: ScriptKind) -> Self {
        Self {
            kind,
            next_external: 0,
            next_internal: 0,
        }
    }

    pub fn next_index(&self, branch: Branch) -> u32 {
        match branch {
            Branch::External => self.next_external,
            Branch::Internal => self.next_internal,
        }
    }

    /// The record after issuing the next index on `branch`.
    ///
    /// Fails once the branch has handed out [`MAX_ADDRESS_INDEX`].
    pub fn advanced(&self, account: AccountId, branch: Branch) -> Result<Self, DerivationError> {
        let index = self.next_index(branch);
        if index > MAX_ADDRESS_INDEX {
            return Err(DerivationError::IndexExhausted {
                account: account.0,
                branch: branch.name(),
            });
        }
        let mut next = *self;
        match branch {
            Branch::External => next.next_external = index + 1,
            Branch::Internal => next.next_internal = index + 1,
        }
        Ok(next)
    }
}

/// Everything needed to rebuild an address book.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct KeyChainData {
    /// Master seed bytes.
    pub seed: [u8; 32],
    /// Account number → derivation state.
    pub accounts: BTreeMap<u32, AccountRecord>,
}

/// Backend persisting [`KeyChainData`].
pub trait AccountStore: Send + Sync {
    /// Read the stored data, `None` if the store is empty.
    fn load(&self) -> Result<Option<KeyChainData>, StoreError>;

    /// Replace the whole stored data.
    fn initialize(&self, data: &KeyChainData) -> Result<(), StoreError>;

    /// Insert or replace one account record.
    fn save_account(&self, account: AccountId, record: &AccountRecord) -> Result<(), StoreError>;
}

/// Volatile store for tests and previews of throwaway wallets.
#[derive(Default)]
pub struct MemoryAccountStore {
    data: Mutex<Option<KeyChainData>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountStore for MemoryAccountStore {
    fn load(&self) -> Result<Option<KeyChainData>, StoreError> {
        Ok(self.data.lock().clone())
    }

    fn initialize(&self, data: &KeyChainData) -> Result<(), StoreError> {
        *self.data.lock() = Some(data.clone());
        Ok(())
    }

    fn save_account(&self, account: AccountId, record: &AccountRecord) -> Result<(), StoreError> {
        let mut guard = self.data.lock();
        let data = guard
            .as_mut()
            .ok_or_else(|| StoreError::Corrupt("store not initialized".into()))?;
        data.accounts.insert(account.0, *record);
        Ok(())
    }
}

/// On-disk JSON layout.
#[derive(Serialize, Deserialize)]
struct WalletFile {
    magic: String,
    version: u32,
    keychain: KeyChainData,
}

/// JSON file store.
///
/// Every write serializes the full data to a sibling temporary file, syncs
/// it, and renames it over the wallet file, so a crash leaves either the old
/// or the new contents. The in-memory copy is only updated after the rename
/// succeeds.
pub struct FileAccountStore {
    path: PathBuf,
    data: Mutex<Option<KeyChainData>>,
}

impl FileAccountStore {
    /// Open the store at `path`, reading it if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = if path.exists() {
            Some(read_wallet_file(&path)?)
        } else {
            None
        };
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, data: &KeyChainData) -> Result<(), StoreError> {
        let file = WalletFile {
            magic: WALLET_MAGIC.to_string(),
            version: WALLET_VERSION,
            keychain: data.clone(),
        };
        let json =
            serde_json::to_vec_pretty(&file).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        let mut f = fs::File::create(&tmp).map_err(|e| StoreError::Io(e.to_string()))?;
        f.write_all(&json).map_err(|e| StoreError::Io(e.to_string()))?;
        f.sync_all().map_err(|e| StoreError::Io(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::Io(e.to_string()))?;

        info!(path = %self.path.display(), accounts = data.accounts.len(), "wallet file written");
        Ok(())
    }
}

impl AccountStore for FileAccountStore {
    fn load(&self) -> Result<Option<KeyChainData>, StoreError> {
        Ok(self.data.lock().clone())
    }

    fn initialize(&self, data: &KeyChainData) -> Result<(), StoreError> {
        let mut guard = self.data.lock();
        self.write(data)?;
        *guard = Some(data.clone());
        Ok(())
    }

    fn save_account(&self, account: AccountId, record: &AccountRecord) -> Result<(), StoreError> {
        let mut guard = self.data.lock();
        let mut next = guard
            .clone()
            .ok_or_else(|| StoreError::Corrupt("store not initialized".into()))?;
        next.accounts.insert(account.0, *record);
        self.write(&next)?;
        *guard = Some(next);
        Ok(())
    }
}

fn read_wallet_file(path: &Path) -> Result<KeyChainData, StoreError> {
    let bytes = fs::read(path).map_err(|e| StoreError::Io(e.to_string()))?;
    let file: WalletFile = serde_json::from_slice(&bytes)
        .map_err(|e| StoreError::Corrupt(format!("invalid wallet file: {e}")))?;

    if file.magic != WALLET_MAGIC {
        return Err(StoreError::Corrupt("invalid magic".into()));
    }
    if file.version != WALLET_VERSION {
        return Err(StoreError::Corrupt(format!(
            "unsupported version: {}",
            file.version
        )));
    }
    Ok(file.keychain)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> KeyChainData {
        let mut accounts = BTreeMap::new();
        accounts.insert(0, AccountRecord::new(ScriptKind::Np2wpkh));
        KeyChainData {
            seed: [5u8; 32],
            accounts,
        }
    }

    #[test]
    fn advance_moves_only_one_branch() {
        let r = AccountRecord::new(ScriptKind::P2wpkh);
        let next = r.advanced(AccountId(0), Branch::Internal).unwrap();
        assert_eq!(next.next_internal, 1);
        assert_eq!(next.next_external, 0);
    }

    #[test]
    fn advance_stops_at_max_index() {
        let mut r = AccountRecord::new(ScriptKind::P2wpkh);
        r.next_external = MAX_ADDRESS_INDEX;
        let last = r.advanced(AccountId(2), Branch::External).unwrap();
        let err = last.advanced(AccountId(2), Branch::External).unwrap_err();
        assert_eq!(
            err,
            DerivationError::IndexExhausted {
                account: 2,
                branch: "external"
            }
        );
    }

    #[test]
    fn memory_store_requires_initialization() {
        let store = MemoryAccountStore::new();
        assert_eq!(store.load().unwrap(), None);
        let err = store
            .save_account(AccountId(0), &AccountRecord::new(ScriptKind::P2tr))
            .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");

        let store = FileAccountStore::open(&path).unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.initialize(&sample_data()).unwrap();

        let mut record = AccountRecord::new(ScriptKind::Np2wpkh);
        record.next_internal = 3;
        store.save_account(AccountId(0), &record).unwrap();

        let reopened = FileAccountStore::open(&path).unwrap();
        let data = reopened.load().unwrap().unwrap();
        assert_eq!(data.seed, [5u8; 32]);
        assert_eq!(data.accounts[&0].next_internal, 3);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn file_store_failed_write_keeps_old_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        let store = FileAccountStore::open(&path).unwrap();
        store.initialize(&sample_data()).unwrap();

        // A directory where the temp file should go makes the write fail.
        fs::create_dir(path.with_extension("tmp")).unwrap();
        let mut record = AccountRecord::new(ScriptKind::Np2wpkh);
        record.next_internal = 9;
        let err = store.save_account(AccountId(0), &record).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));

        assert_eq!(store.load().unwrap().unwrap().accounts[&0].next_internal, 0);
        let on_disk = FileAccountStore::open(&path).unwrap().load().unwrap().unwrap();
        assert_eq!(on_disk.accounts[&0].next_internal, 0);
    }

    #[test]
    fn corrupted_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        fs::write(&path, b"garbage").unwrap();
        assert!(matches!(
            FileAccountStore::open(&path),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn wrong_magic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        let file = WalletFile {
            magic: "NOPE".into(),
            version: WALLET_VERSION,
            keychain: sample_data(),
        };
        fs::write(&path, serde_json::to_vec(&file).unwrap()).unwrap();
        let err = FileAccountStore::open(&path).err().unwrap();
        assert_eq!(err, StoreError::Corrupt("invalid magic".into()));
    }
}
