//! Shared helpers for integration tests.

use quill_core::types::{AccountId, Credit, Hash256, OutPoint, Script, ScriptKind, TxOutput};
use quill_wallet::{OutputRequest, Seed, Wallet};

/// Fixed seed so failures reproduce.
pub const TEST_SEED: [u8; 32] = [0x5E; 32];

/// Tip height used by [`wallet_at_tip`] wallets.
pub const TEST_TIP: u64 = 1_000;

/// An in-memory wallet of `kind` whose ledger tip is [`TEST_TIP`].
pub fn wallet_at_tip(kind: ScriptKind) -> Wallet {
    let wallet = Wallet::in_memory(Seed::from_bytes(TEST_SEED), kind).unwrap();
    wallet.set_tip_height(TEST_TIP);
    wallet
}

/// A script no test wallet owns.
pub fn dest(kind: ScriptKind, n: u8) -> Script {
    Script::new(kind, Hash256([n; 32]))
}

pub fn pay(kind: ScriptKind, n: u8, amount: u64) -> OutputRequest {
    OutputRequest::new(dest(kind, n), amount)
}

/// Unique outpoint for test credit number `n`.
pub fn outpoint(n: u32) -> OutPoint {
    let bytes = txid_bytes(n);
    OutPoint {
        txid: Hash256(bytes),
        index: u64::from(n % 4),
    }
}

fn txid_bytes(n: u32) -> [u8; 32] {
    let mut bytes = [0xA0u8; 32];
    bytes[..4].copy_from_slice(&n.to_le_bytes());
    bytes
}

/// A confirmed, non-coinbase credit to `script`.
pub fn credit(n: u32, script: Script, value: u64, height: u64, account: AccountId) -> Credit {
    Credit {
        outpoint: outpoint(n),
        output: TxOutput { value, script },
        account,
        block_height: Some(height),
        is_coinbase: false,
    }
}

/// Credit each of `values` to the default account's current address, one
/// block below the tip.
pub fn fund_current(wallet: &Wallet, values: &[u64]) -> Script {
    let script = wallet.current_address(AccountId::DEFAULT).unwrap();
    let tip = wallet.tip_height().unwrap();
    for (i, &value) in values.iter().enumerate() {
        wallet.record_credit(credit(i as u32, script, value, tip - 1, AccountId::DEFAULT));
    }
    script
}
