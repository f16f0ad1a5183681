//! Seed-backed address book with persisted allocation state.
//!
//! The [`AddressBook`] owns the [`KeyChain`], the per-account derivation
//! records and the set of issued pubkey hashes. It is the wallet's
//! [`AddressManager`]: change lookups derive without recording, change
//! allocations advance the internal branch under the account's lock and are
//! persisted before anyone can observe them.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::info;

use quill_core::crypto::KeyPair;
use quill_core::error::{DerivationError, StoreError};
use quill_core::traits::AddressManager;
use quill_core::types::{AccountId, Hash256, Script, ScriptKind};

use crate::keys::{Branch, KeyChain, KeyPath, Seed};
use crate::store::{AccountRecord, AccountStore, KeyChainData};

/// Deterministic address book over an [`AccountStore`].
pub struct AddressBook {
    keychain: KeyChain,
    accounts: DashMap<AccountId, Arc<Mutex<AccountRecord>>>,
    owned: RwLock<HashMap<Hash256, KeyPath>>,
    store: Box<dyn AccountStore>,
    /// Serializes account creation so new ids are never handed out twice.
    creation: Mutex<()>,
}

impl AddressBook {
    /// Initialize `store` with `seed` and a default account of kind `kind`.
    pub fn create(
        seed: Seed,
        kind: ScriptKind,
        store: Box<dyn AccountStore>,
    ) -> Result<Self, StoreError> {
        let mut accounts = BTreeMap::new();
        accounts.insert(AccountId::DEFAULT.0, AccountRecord::new(kind));
        let data = KeyChainData {
            seed: *seed.as_bytes(),
            accounts,
        };
        store.initialize(&data)?;
        Ok(Self::from_data(data, store))
    }

    /// Rebuild the address book from a previously initialized store.
    pub fn open(store: Box<dyn AccountStore>) -> Result<Self, StoreError> {
        let data = store
            .load()?
            .ok_or_else(|| StoreError::Corrupt("account store is empty".into()))?;
        Ok(Self::from_data(data, store))
    }

    fn from_data(data: KeyChainData, store: Box<dyn AccountStore>) -> Self {
        let keychain = KeyChain::new(Seed::from_bytes(data.seed));
        let accounts = DashMap::new();
        let mut owned = HashMap::new();

        for (&number, record) in &data.accounts {
            let account = AccountId(number);
            for branch in [Branch::External, Branch::Internal] {
                for index in 0..record.next_index(branch) {
                    let path = KeyPath {
                        account,
                        branch,
                        index,
                    };
                    let script = keychain.script_at(path, record.kind);
                    owned.insert(script.pubkey_hash(), path);
                }
            }
            accounts.insert(account, Arc::new(Mutex::new(*record)));
        }

        Self {
            keychain,
            accounts,
            owned: RwLock::new(owned),
            store,
            creation: Mutex::new(()),
        }
    }

    /// Add an account whose addresses use `kind`. Returns its id.
    pub fn create_account(&self, kind: ScriptKind) -> Result<AccountId, DerivationError> {
        let _guard = self.creation.lock();
        let next = self
            .accounts
            .iter()
            .map(|entry| entry.key().0)
            .max()
            .map_or(0, |n| n + 1);
        let account = AccountId(next);
        let record = AccountRecord::new(kind);
        self.store.save_account(account, &record)?;
        self.accounts.insert(account, Arc::new(Mutex::new(record)));
        info!(%account, %kind, "account created");
        Ok(account)
    }

    /// Ids of all known accounts, ascending.
    pub fn accounts(&self) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = self.accounts.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    pub fn account_kind(&self, account: AccountId) -> Result<ScriptKind, DerivationError> {
        Ok(self.record(account)?.lock().kind)
    }

    /// Snapshot of an account's derivation state.
    pub fn account_record(&self, account: AccountId) -> Result<AccountRecord, DerivationError> {
        Ok(*self.record(account)?.lock())
    }

    /// The account's latest receive address, issuing index 0 on first use.
    pub fn current_address(&self, account: AccountId) -> Result<Script, DerivationError> {
        let slot = self.record(account)?;
        let mut record = slot.lock();
        if let Some(index) = record.next_external.checked_sub(1) {
            return Ok(self.script_for(account, Branch::External, index, record.kind));
        }
        self.issue_locked(account, Branch::External, &mut record)
    }

    /// Issue a fresh receive address.
    pub fn new_address(&self, account: AccountId) -> Result<Script, DerivationError> {
        self.issue(account, Branch::External)
    }

    /// Every address issued for `account`, receive branch first, in index order.
    pub fn account_addresses(&self, account: AccountId) -> Result<Vec<Script>, DerivationError> {
        let record = self.account_record(account)?;
        let mut scripts = Vec::new();
        for branch in [Branch::External, Branch::Internal] {
            for index in 0..record.next_index(branch) {
                scripts.push(self.script_for(account, branch, index, record.kind));
            }
        }
        Ok(scripts)
    }

    /// Account that issued `script`, if any.
    pub fn account_of(&self, script: &Script) -> Option<AccountId> {
        let path = *self.owned.read().get(&script.pubkey_hash())?;
        let kind = self.account_kind(path.account).ok()?;
        (kind == script.kind()).then_some(path.account)
    }

    /// Signing key for an issued `script`.
    pub fn keypair_for_script(&self, script: &Script) -> Option<KeyPair> {
        let path = *self.owned.read().get(&script.pubkey_hash())?;
        Some(self.keychain.derive_keypair(path))
    }

    fn record(&self, account: AccountId) -> Result<Arc<Mutex<AccountRecord>>, DerivationError> {
        self.accounts
            .get(&account)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(DerivationError::UnknownAccount(account.0))
    }

    fn script_for(&self, account: AccountId, branch: Branch, index: u32, kind: ScriptKind) -> Script {
        self.keychain.script_at(
            KeyPath {
                account,
                branch,
                index,
            },
            kind,
        )
    }

    /// Derive, persist, then publish the next address on `branch`.
    ///
    /// The account lock is held throughout, so concurrent callers are
    /// serialized and a failed write leaves the in-memory record untouched.
    fn issue(&self, account: AccountId, branch: Branch) -> Result<Script, DerivationError> {
        let slot = self.record(account)?;
        let mut record = slot.lock();
        self.issue_locked(account, branch, &mut record)
    }

    fn issue_locked(
        &self,
        account: AccountId,
        branch: Branch,
        record: &mut AccountRecord,
    ) -> Result<Script, DerivationError> {
        let index = record.next_index(branch);
        let advanced = record.advanced(account, branch)?;
        let path = KeyPath {
            account,
            branch,
            index,
        };
        let script = self.keychain.script_at(path, record.kind);

        self.store.save_account(account, &advanced)?;
        *record = advanced;
        self.owned.write().insert(script.pubkey_hash(), path);

        info!(%account, branch = branch.name(), index, "address issued");
        Ok(script)
    }
}

impl AddressManager for AddressBook {
    fn change_script_kind(&self, account: AccountId) -> Result<ScriptKind, DerivationError> {
        self.account_kind(account)
    }

    fn current_change_address(&self, account: AccountId) -> Result<Script, DerivationError> {
        let record = self.account_record(account)?;
        let index = record.next_internal.saturating_sub(1);
        Ok(self.script_for(account, Branch::Internal, index, record.kind))
    }

    fn next_change_address(&self, account: AccountId) -> Result<Script, DerivationError> {
        self.issue(account, Branch::Internal)
    }
}

impl fmt::Debug for AddressBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressBook")
            .field("accounts", &self.accounts.len())
            .finish_non_exhaustive()
    }
}
