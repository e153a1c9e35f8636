#![cfg(test)]
use governance::{ConfirmationStatus, Error};
use project_ledger::{ProjectLedger, ProjectLedgerClient};
use soroban_sdk::{testutils::Address as _, token, vec, Address, Env};

use crate::test::{create_token, launched, setup, tokens, with_admins, with_ledgers, Setup};

fn pay_rewards(s: &Setup, ledger: &Address, amount: i128) {
    let payer = Address::generate(&s.env);
    token::StellarAssetClient::new(&s.env, &s.asset).mint(&payer, &amount);
    reward_ledger::RewardLedgerClient::new(&s.env, ledger).deposit(&payer, &amount);
}

fn asset_balance(env: &Env, asset: &Address, who: &Address) -> i128 {
    token::Client::new(env, asset).balance(who)
}

/// Per-share math truncates; a payout may fall one unit short.
fn assert_near(actual: i128, expected: i128) {
    assert!(
        (actual - expected).abs() <= 1,
        "expected {} within one unit, got {}",
        expected,
        actual
    );
}

// ── balance tracking ──────────────────────────────────────────

#[test]
fn transfers_report_balances_to_rewards() {
    let s = setup();
    let (rewards, _project) = with_ledgers(&s);
    let minimum = rewards.minimum_balance();
    let h1 = Address::generate(&s.env);
    let h2 = Address::generate(&s.env);

    s.token.transfer(&s.owner, &h1, &minimum);
    s.token.transfer(&s.owner, &h2, &(minimum * 2));

    assert_eq!(rewards.holders(), 2);
    assert_eq!(rewards.total_tracked(), minimum * 3);
    assert_eq!(rewards.get_report_account(&h1).index, 1);
    assert_eq!(rewards.get_report_account(&h2).index, 2);
    // The owner's supply never earns.
    assert_eq!(rewards.balance_of(&s.owner), 0);
}

#[test]
fn small_and_pool_balances_are_not_tracked() {
    let s = setup();
    let (rewards, _project) = with_ledgers(&s);
    let small = Address::generate(&s.env);
    let pool = Address::generate(&s.env);
    s.token
        .set_automated_market_maker_pair(&s.owner, &pool, &true);

    s.token.transfer(&s.owner, &small, &tokens(1_000));
    s.token.transfer(&s.owner, &pool, &tokens(50_000_000));

    assert_eq!(rewards.holders(), 0);
    assert_eq!(rewards.total_tracked(), 0);
}

#[test]
fn selling_below_the_minimum_stops_tracking() {
    let s = setup();
    let (rewards, _project, _admins) = launched(&s);
    let seller = Address::generate(&s.env);
    let buyer = Address::generate(&s.env);
    s.token.transfer(&s.owner, &seller, &tokens(1_000_000));
    assert_eq!(rewards.holders(), 1);

    s.token.transfer(&seller, &buyer, &tokens(600_000));

    assert_eq!(rewards.balance_of(&seller), 0);
    assert_eq!(rewards.balance_of(&buyer), tokens(600_000));
    assert_eq!(rewards.holders(), 1);
    assert_eq!(rewards.holder_at(&1), buyer);
}

#[test]
fn transfers_after_launch_pay_out_rewards() {
    let s = setup();
    let (rewards, _project, _admins) = launched(&s);
    let h1 = Address::generate(&s.env);
    let h2 = Address::generate(&s.env);
    let h3 = Address::generate(&s.env);
    s.token.transfer(&s.owner, &h1, &tokens(500_000));
    s.token.transfer(&s.owner, &h2, &tokens(1_000_000));

    pay_rewards(&s, &rewards.address, tokens(3));
    s.token.transfer(&h2, &h3, &tokens(100_000));

    assert_near(asset_balance(&s.env, &s.asset, &h1), tokens(1));
    assert_near(asset_balance(&s.env, &s.asset, &h2), tokens(2));
    assert_eq!(asset_balance(&s.env, &s.asset, &h3), 0);
    assert_eq!(rewards.withdrawable(&h1), 0);
}

#[test]
fn transfers_before_launch_leave_rewards_in_the_ledger() {
    let s = setup();
    let (rewards, _project) = with_ledgers(&s);
    let h1 = Address::generate(&s.env);
    s.token.transfer(&s.owner, &h1, &tokens(500_000));
    pay_rewards(&s, &rewards.address, tokens(2));

    s.token
        .transfer(&s.owner, &Address::generate(&s.env), &tokens(1));

    assert_eq!(asset_balance(&s.env, &s.asset, &h1), 0);
    assert_near(rewards.withdrawable(&h1), tokens(2));
}

#[test]
fn transfers_keep_working_after_large_income() {
    let s = setup();
    let (rewards, _project, _admins) = launched(&s);
    let h1 = Address::generate(&s.env);
    let h2 = Address::generate(&s.env);
    s.token.transfer(&s.owner, &h1, &tokens(1_000_000));
    pay_rewards(&s, &rewards.address, 10_000_000_000_000_000_000);

    s.token.transfer(&h1, &h2, &tokens(100_000));

    assert_eq!(rewards.balance_of(&h1), tokens(900_000));
    assert_near(
        asset_balance(&s.env, &s.asset, &h1) + rewards.withdrawable(&h1),
        10_000_000_000_000_000_000,
    );
}

// ── governance through the token ──────────────────────────────

#[test]
fn owner_runs_ledgers_until_admins_are_set() {
    let s = setup();
    let (rewards, project) = with_ledgers(&s);
    let payer = Address::generate(&s.env);
    token::StellarAssetClient::new(&s.env, &s.asset).mint(&payer, &tokens(10));
    project.deposit(&payer, &tokens(10));

    rewards.add_token(&s.owner, &create_token(&s.env));
    let receiver = Address::generate(&s.env);
    assert_eq!(
        project.request_funds(&s.owner, &receiver, &1),
        ConfirmationStatus::complete(1, 2)
    );
    assert_eq!(asset_balance(&s.env, &s.asset, &receiver), 1);
}

#[test]
fn admins_take_over_ledger_calls() {
    let s = setup();
    let (rewards, project) = with_ledgers(&s);
    let [a1, _, _] = with_admins(&s);
    let payer = Address::generate(&s.env);
    token::StellarAssetClient::new(&s.env, &s.asset).mint(&payer, &tokens(10));
    project.deposit(&payer, &tokens(10));
    let reward_token = create_token(&s.env);
    let receiver = Address::generate(&s.env);

    assert_eq!(
        rewards.try_add_token(&s.owner, &reward_token),
        Err(Ok(Error::CallerInvalid))
    );
    assert_eq!(
        rewards.add_token(&a1, &reward_token),
        ConfirmationStatus::pending(1, 2)
    );
    assert_eq!(
        project.try_request_funds(&s.owner, &receiver, &1),
        Err(Ok(Error::CallerInvalid))
    );
    assert_eq!(
        project.request_funds(&a1, &receiver, &1),
        ConfirmationStatus::pending(1, 2)
    );
}

#[test]
fn reward_settings_need_two_token_admins() {
    let s = setup();
    let (rewards, _project) = with_ledgers(&s);
    let [a1, a2, _] = with_admins(&s);
    let before = rewards.minimum_balance();

    assert_eq!(
        rewards.set_minimum_balance(&a1, &450_000),
        ConfirmationStatus::pending(1, 2)
    );
    assert_eq!(rewards.minimum_balance(), before);
    assert!(s.token.pending_call().is_some());

    assert_eq!(
        rewards.set_minimum_balance(&a2, &450_000),
        ConfirmationStatus::complete(2, 2)
    );
    assert_eq!(rewards.minimum_balance(), tokens(450_000));
    assert!(s.token.pending_call().is_none());

    for status in [
        rewards.set_excluded(&a1, &Address::generate(&s.env), &true),
        rewards.set_staking(&a1, &true),
        rewards.set_waiting_period(&a1, &6_000),
    ] {
        assert_eq!(status, ConfirmationStatus::pending(1, 2));
    }
}

#[test]
fn equal_calls_on_different_ledgers_do_not_combine() {
    let s = setup();
    let (rewards, project) = with_ledgers(&s);
    let [a1, a2, _] = with_admins(&s);

    rewards.set_minimum_balance(&a1, &450_000);
    assert_eq!(
        project.set_minimum_balance(&a2, &450_000),
        ConfirmationStatus::pending(1, 2)
    );
    assert_eq!(project.minimum_balance(), tokens(250_000));
}

#[test]
fn detached_ledger_cannot_borrow_the_admins() {
    let s = setup();
    let [a1, a2, _] = with_admins(&s);
    let id = s.env.register_contract(None, ProjectLedger);
    let project = ProjectLedgerClient::new(&s.env, &id);
    project.initialize(&s.owner, &s.asset, &tokens(1), &1_000, &0);
    project.set_governor(&s.token.address);

    // Governed by the token, but never attached to it.
    assert_eq!(
        project.try_set_minimum_balance(&a1, &1),
        Err(Ok(Error::CallerInvalid))
    );
    assert_eq!(
        project.try_set_minimum_balance(&a2, &1),
        Err(Ok(Error::CallerInvalid))
    );
}

// ── project payback through the token gate ────────────────────

#[test]
fn project_dividends_follow_token_holdings() {
    let s = setup();
    let backers = [
        Address::generate(&s.env),
        Address::generate(&s.env),
        Address::generate(&s.env),
    ];
    let project = crate::test::project_ledger(&s, &backers);
    s.token.set_project_contract(&s.owner, &project.address);
    project.set_token(&s.owner, &s.token.address);
    assert_eq!(project.token(), Some(s.token.address.clone()));

    s.token.transfer(&s.owner, &backers[0], &tokens(250_000));
    for backer in backers.iter() {
        assert_eq!(project.withdraw_funds(backer), 0);
    }
    assert_eq!(project.get_report().total_active_shares, 1);

    let payer = Address::generate(&s.env);
    token::StellarAssetClient::new(&s.env, &s.asset).mint(&payer, &tokens(100));
    project.deposit(&payer, &tokens(100));

    assert_eq!(project.withdraw_funds(&backers[0]), tokens(10));
    assert_eq!(project.withdraw_funds(&backers[1]), 0);
    assert_eq!(asset_balance(&s.env, &s.asset, &backers[0]), tokens(10));
    assert_eq!(project.treasury(), tokens(90));
}

#[test]
fn project_funds_need_two_token_admins() {
    let s = setup();
    let (_rewards, project) = with_ledgers(&s);
    let [a1, a2, _] = with_admins(&s);
    let payer = Address::generate(&s.env);
    token::StellarAssetClient::new(&s.env, &s.asset).mint(&payer, &tokens(10));
    project.deposit(&payer, &tokens(10));
    let receiver = Address::generate(&s.env);

    project.request_funds(&a1, &receiver, &tokens(5));
    assert_eq!(asset_balance(&s.env, &s.asset, &receiver), 0);
    assert_eq!(
        project.request_funds(&a2, &receiver, &tokens(5)),
        ConfirmationStatus::complete(2, 2)
    );
    assert_eq!(asset_balance(&s.env, &s.asset, &receiver), tokens(5));
    assert_eq!(
        project.try_request_funds(&a1, &receiver, &tokens(5)),
        Err(Ok(Error::InsufficientResources))
    );
}

#[test]
fn project_admins_override_the_token() {
    let s = setup();
    let (_rewards, project) = with_ledgers(&s);
    let [t1, _, _] = with_admins(&s);
    let own = vec![
        &s.env,
        Address::generate(&s.env),
        Address::generate(&s.env),
        Address::generate(&s.env),
    ];
    project.set_admins(&s.owner, &own);

    assert_eq!(
        project.try_set_minimum_balance(&t1, &1),
        Err(Ok(Error::CallerInvalid))
    );
    assert_eq!(
        project.set_minimum_balance(&own.get(0).unwrap(), &1),
        ConfirmationStatus::pending(1, 2)
    );
}
