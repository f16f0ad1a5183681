//! Change destinations: preview versus commit.

use tracing::info;

use quill_core::traits::AddressManager;
use quill_core::types::{AccountId, Script, ScriptKind};

use crate::error::WalletError;

/// Obtains change scripts from an [`AddressManager`].
///
/// [`peek`](Self::peek) never touches allocation state, so previews can be
/// repeated freely; [`allocate`](Self::allocate) consumes a fresh address.
pub struct ChangeManager<'a> {
    addresses: &'a dyn AddressManager,
}

impl<'a> ChangeManager<'a> {
    pub fn new(addresses: &'a dyn AddressManager) -> Self {
        Self { addresses }
    }

    /// Script kind change outputs of `account` will use.
    pub fn script_kind(&self, account: AccountId) -> Result<ScriptKind, WalletError> {
        Ok(self.addresses.change_script_kind(account)?)
    }

    /// The account's current change address, without allocating.
    pub fn peek(&self, account: AccountId) -> Result<Script, WalletError> {
        Ok(self.addresses.current_change_address(account)?)
    }

    /// A freshly allocated and persisted change address.
    pub fn allocate(&self, account: AccountId) -> Result<Script, WalletError> {
        let script = self.addresses.next_change_address(account)?;
        info!(%account, change = %script, "change address allocated");
        Ok(script)
    }

    pub fn change_script(&self, account: AccountId, commit: bool) -> Result<Script, WalletError> {
        if commit {
            self.allocate(account)
        } else {
            self.peek(account)
        }
    }
}
