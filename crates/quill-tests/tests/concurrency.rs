//! Concurrent commits must never share a change address.

use std::collections::HashSet;
use std::thread;

use quill_core::fees::FeeRate;
use quill_core::types::{AccountId, Script, ScriptKind};
use quill_tests::helpers::*;
use quill_wallet::{MemoryLedger, SelectionStrategy, Seed, Wallet};

const THREADS: usize = 8;
const COMMITS_PER_THREAD: usize = 10;

fn commit_change(wallet: &Wallet, account: AccountId) -> Script {
    let authored = wallet
        .author_transaction(
            &[pay(ScriptKind::P2wpkh, 1, 10_000)],
            account,
            1,
            FeeRate::from_per_kvb(1_000),
            SelectionStrategy::Random,
            false,
        )
        .unwrap();
    authored.change_output().unwrap().script
}

#[test]
fn parallel_commits_allocate_distinct_change() {
    let wallet = wallet_at_tip(ScriptKind::P2wpkh);
    fund_current(&wallet, &[100_000, 200_000, 300_000]);

    let scripts: Vec<Script> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    (0..COMMITS_PER_THREAD)
                        .map(|_| commit_change(&wallet, AccountId::DEFAULT))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let unique: HashSet<_> = scripts.iter().collect();
    assert_eq!(unique.len(), THREADS * COMMITS_PER_THREAD);

    let record = wallet.address_book().account_record(AccountId::DEFAULT).unwrap();
    assert_eq!(record.next_internal as usize, THREADS * COMMITS_PER_THREAD);
    // One receive address plus every change address.
    assert_eq!(
        wallet.account_addresses(AccountId::DEFAULT).unwrap().len(),
        1 + THREADS * COMMITS_PER_THREAD
    );
}

#[test]
fn previews_race_commits_without_allocating() {
    let wallet = wallet_at_tip(ScriptKind::Np2wpkh);
    fund_current(&wallet, &[500_000]);

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..COMMITS_PER_THREAD {
                    commit_change(&wallet, AccountId::DEFAULT);
                }
            });
        }
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..COMMITS_PER_THREAD {
                    wallet
                        .author_transaction(
                            &[pay(ScriptKind::P2wpkh, 2, 10_000)],
                            AccountId::DEFAULT,
                            1,
                            FeeRate::from_per_kvb(1_000),
                            SelectionStrategy::Largest,
                            true,
                        )
                        .unwrap();
                }
            });
        }
    });

    let record = wallet.address_book().account_record(AccountId::DEFAULT).unwrap();
    assert_eq!(record.next_internal as usize, 4 * COMMITS_PER_THREAD);
}

#[test]
fn accounts_allocate_in_parallel() {
    let wallet = wallet_at_tip(ScriptKind::P2wpkh);
    let accounts: Vec<AccountId> = (0..4)
        .map(|i| {
            if i == 0 {
                AccountId::DEFAULT
            } else {
                wallet.create_account(ScriptKind::P2tr).unwrap()
            }
        })
        .collect();
    for (i, &account) in accounts.iter().enumerate() {
        let script = wallet.current_address(account).unwrap();
        wallet.record_credit(credit(100 + i as u32, script, 250_000, TEST_TIP - 1, account));
    }

    let scripts: Vec<Script> = thread::scope(|s| {
        let handles: Vec<_> = accounts
            .iter()
            .map(|&account| {
                let wallet = &wallet;
                s.spawn(move || {
                    (0..COMMITS_PER_THREAD)
                        .map(|_| commit_change(wallet, account))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let unique: HashSet<_> = scripts.iter().map(|s| s.pubkey_hash()).collect();
    assert_eq!(unique.len(), accounts.len() * COMMITS_PER_THREAD);
    for account in accounts {
        let record = wallet.address_book().account_record(account).unwrap();
        assert_eq!(record.next_internal as usize, COMMITS_PER_THREAD);
    }
}

#[test]
fn concurrent_file_commits_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wallet.json");
    let wallet = Wallet::create_file(&path, Seed::from_bytes(TEST_SEED), ScriptKind::P2wpkh).unwrap();
    wallet.set_tip_height(TEST_TIP);
    fund_current(&wallet, &[1_000_000]);

    let scripts: HashSet<Script> = thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    (0..5)
                        .map(|_| commit_change(&wallet, AccountId::DEFAULT))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });
    assert_eq!(scripts.len(), 20);
    drop(wallet);

    let reopened = Wallet::open_file(&path, MemoryLedger::new()).unwrap();
    let record = reopened.address_book().account_record(AccountId::DEFAULT).unwrap();
    assert_eq!(record.next_internal, 20);
    let restored: HashSet<Script> = reopened
        .account_addresses(AccountId::DEFAULT)
        .unwrap()
        .into_iter()
        .collect();
    assert!(scripts.is_subset(&restored));
}
