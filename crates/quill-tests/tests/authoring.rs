//! End-to-end authoring scenarios against an in-memory wallet.

use std::collections::HashSet;

use quill_core::error::TransactionError;
use quill_core::fees::FeeRate;
use quill_core::traits::AddressManager;
use quill_core::types::{AccountId, ScriptKind};
use quill_core::validation::validate_spend;
use quill_tests::helpers::*;
use quill_wallet::{AuthorConfig, SelectionStrategy, WalletError, input_yields_positively};

#[test]
fn preview_twice_then_commit() {
    let wallet = wallet_at_tip(ScriptKind::Np2wpkh);
    fund_current(&wallet, &[100_000]);
    let outputs = [
        pay(ScriptKind::Np2wpkh, 0xA1, 10_000),
        pay(ScriptKind::Np2wpkh, 0xA2, 20_000),
    ];
    let rate = FeeRate::from_per_kvb(1_000);
    let author = |dry_run| {
        wallet.author_transaction(
            &outputs,
            AccountId::DEFAULT,
            1,
            rate,
            SelectionStrategy::Largest,
            dry_run,
        )
    };

    let first = author(true).unwrap();
    assert_eq!(wallet.account_addresses(AccountId::DEFAULT).unwrap().len(), 1);
    let second = author(true).unwrap();
    assert_eq!(wallet.account_addresses(AccountId::DEFAULT).unwrap().len(), 1);
    assert_eq!(first, second);

    for preview in [&first, &second] {
        assert_eq!(
            validate_spend(&preview.tx, &preview.prev_scripts, &preview.prev_values),
            Err(TransactionError::InvalidSignature { index: 0 })
        );
    }

    let committed = author(false).unwrap();
    assert_eq!(wallet.account_addresses(AccountId::DEFAULT).unwrap().len(), 2);

    let change = committed.change_output().unwrap();
    assert_eq!(Some(change), first.change_output());
    assert_eq!(Some(change), second.change_output());
    assert_eq!(committed.change_index, Some(2));
    assert_eq!(change.value, 69_802);
    assert_eq!(committed.fee, 198);
    assert_eq!(committed.total_input, 100_000);

    let signed = wallet.sign_transaction(&committed).unwrap();
    let checked = validate_spend(&signed, &committed.prev_scripts, &committed.prev_values).unwrap();
    assert_eq!(checked.fee, 198);
}

#[test]
fn preview_after_commit_shows_committed_change() {
    let wallet = wallet_at_tip(ScriptKind::P2wpkh);
    fund_current(&wallet, &[100_000]);
    let outputs = [pay(ScriptKind::P2wpkh, 1, 25_000)];
    let author = |dry_run| {
        wallet
            .author_transaction(
                &outputs,
                AccountId::DEFAULT,
                1,
                FeeRate::from_per_kvb(1_000),
                SelectionStrategy::Largest,
                dry_run,
            )
            .unwrap()
    };

    let first_commit = author(false);
    let preview = author(true);
    assert_eq!(preview.change_output(), first_commit.change_output());

    let second_commit = author(false);
    assert_ne!(second_commit.change_output(), first_commit.change_output());
    assert_eq!(author(true).change_output(), second_commit.change_output());
    assert_eq!(
        wallet
            .address_book()
            .current_change_address(AccountId::DEFAULT)
            .unwrap(),
        second_commit.change_output().unwrap().script
    );
}

#[test]
fn random_selection_skips_uneconomic_credit() {
    let wallet = wallet_at_tip(ScriptKind::Np2wpkh).with_config(AuthorConfig {
        strategy: SelectionStrategy::Random,
        ..AuthorConfig::default()
    });
    let values: Vec<u64> = (0..13).map(|i| 5_000 + i * 10_000).collect();
    assert_eq!(values.last(), Some(&125_000));
    fund_current(&wallet, &values);
    let small = outpoint(0);

    let outputs = [
        pay(ScriptKind::Np2wpkh, 1, 50_000),
        pay(ScriptKind::Np2wpkh, 2, 100_000),
    ];
    let rate = FeeRate::from_per_kvb(100_000);

    let mut totals = HashSet::new();
    for _ in 0..100 {
        let authored = wallet
            .author_transaction(
                &outputs,
                AccountId::DEFAULT,
                1,
                rate,
                SelectionStrategy::Random,
                true,
            )
            .unwrap();
        assert!(
            authored.tx.inputs.iter().all(|i| i.previous_output != small),
            "5000 credit selected"
        );
        let outs = authored.tx.total_output_value().unwrap();
        assert_eq!(authored.total_input, outs + authored.fee);
        totals.insert(authored.total_input);
    }
    assert!(totals.len() > 1, "random selection never varied");
    assert_eq!(wallet.account_addresses(AccountId::DEFAULT).unwrap().len(), 1);
}

#[test]
fn yield_threshold_for_p2wpkh() {
    let wallet = wallet_at_tip(ScriptKind::P2wpkh);
    let script = fund_current(&wallet, &[1_000]);
    let c = credit(0, script, 1_000, TEST_TIP - 1, AccountId::DEFAULT);
    assert!(input_yields_positively(&c, FeeRate::from_per_kvb(10_000)));
    assert!(!input_yields_positively(&c, FeeRate::from_per_kvb(20_000)));

    let outputs = [pay(ScriptKind::P2wpkh, 1, 100)];
    let err = wallet
        .author_transaction(
            &outputs,
            AccountId::DEFAULT,
            1,
            FeeRate::from_per_kvb(20_000),
            SelectionStrategy::Largest,
            true,
        )
        .unwrap_err();
    assert!(matches!(err, WalletError::InsufficientFunds { have: 0, .. }));
}

#[test]
fn shallow_credits_are_ignored() {
    let wallet = wallet_at_tip(ScriptKind::P2wpkh);
    let script = wallet.current_address(AccountId::DEFAULT).unwrap();
    wallet.record_credit(credit(1, script, 50_000, TEST_TIP, AccountId::DEFAULT));
    wallet.record_credit(credit(2, script, 70_000, TEST_TIP - 5, AccountId::DEFAULT));

    let outputs = [pay(ScriptKind::P2wpkh, 1, 40_000)];
    let author = |min_conf| {
        wallet.author_transaction(
            &outputs,
            AccountId::DEFAULT,
            min_conf,
            FeeRate::from_per_kvb(1_000),
            SelectionStrategy::Largest,
            true,
        )
    };

    let one = author(1).unwrap();
    assert_eq!(one.total_input, 70_000);
    let six = author(6).unwrap();
    assert_eq!(six.total_input, 70_000);
    assert!(matches!(
        author(7),
        Err(WalletError::InsufficientFunds { have: 0, .. })
    ));
}

#[test]
fn accounts_spend_only_their_own_credits() {
    let wallet = wallet_at_tip(ScriptKind::P2wpkh);
    let savings = wallet.create_account(ScriptKind::P2tr).unwrap();
    fund_current(&wallet, &[10_000]);
    let savings_script = wallet.current_address(savings).unwrap();
    wallet.record_credit(credit(50, savings_script, 500_000, TEST_TIP - 1, savings));

    let outputs = [pay(ScriptKind::P2wpkh, 1, 100_000)];
    let rate = FeeRate::from_per_kvb(1_000);
    assert!(matches!(
        wallet.author_transaction(&outputs, AccountId::DEFAULT, 1, rate, SelectionStrategy::Largest, true),
        Err(WalletError::InsufficientFunds { .. })
    ));

    let (authored, signed) = wallet
        .create_signed_transaction(&outputs, savings, 1, rate, SelectionStrategy::Largest)
        .unwrap();
    assert_eq!(authored.total_input, 500_000);
    assert_eq!(authored.change_output().unwrap().script.kind(), ScriptKind::P2tr);
    assert!(signed.inputs.iter().all(|i| i.is_signed()));
}
