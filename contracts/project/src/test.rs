#![cfg(test)]
use governance::{ConfirmationStatus, Error};
use soroban_sdk::{
    symbol_short,
    testutils::{Address as _, Events as _},
    token, vec, Address, BytesN, Env, IntoVal, Val, Vec,
};

use crate::{ProjectLedger, ProjectLedgerClient};

const UNIT: i128 = 10_000_000;
/// 0.003 of the asset per share: 10,000 shares pay back 30.
const PAYBACK_RATE: i128 = 30_000;
const DIVIDEND_BPS: u32 = 1_000;
const MIN_BALANCE: i128 = 250_000 * UNIT;
const SHARES: [i128; 9] = [2000, 2000, 2000, 1000, 1000, 500, 500, 500, 500];
/// Per-share payback used where income runs into the 10^19 range.
const LARGE: i128 = 100_000_000_000_000_000_000;

// ── helper ────────────────────────────────────────────────────

struct Setup {
    env: Env,
    client: ProjectLedgerClient<'static>,
    owner: Address,
    asset: Address,
    holders: Vec<Address>,
}

fn create_token(env: &Env) -> Address {
    let admin = Address::generate(env);
    env.register_stellar_asset_contract(admin)
}

fn bare() -> Setup {
    let env = Env::default();
    env.mock_all_auths();
    let owner = Address::generate(&env);
    let asset = create_token(&env);
    let id = env.register_contract(None, ProjectLedger);
    let client = ProjectLedgerClient::new(&env, &id);
    client.initialize(&owner, &asset, &PAYBACK_RATE, &DIVIDEND_BPS, &MIN_BALANCE);
    let mut holders = vec![&env, owner.clone()];
    for _ in 1..SHARES.len() {
        holders.push_back(Address::generate(&env));
    }
    Setup {
        env,
        client,
        owner,
        asset,
        holders,
    }
}

fn setup() -> Setup {
    let s = bare();
    let mut shares = Vec::new(&s.env);
    for amount in SHARES.iter() {
        shares.push_back(*amount);
    }
    s.client.set_holders(&s.holders, &shares);
    s
}

fn with_admins(s: &Setup) -> [Address; 3] {
    let list = [
        Address::generate(&s.env),
        Address::generate(&s.env),
        Address::generate(&s.env),
    ];
    s.client.set_admins(
        &s.owner,
        &vec![&s.env, list[0].clone(), list[1].clone(), list[2].clone()],
    );
    list
}

fn pay_in(s: &Setup, amount: i128) {
    let payer = Address::generate(&s.env);
    token::StellarAssetClient::new(&s.env, &s.asset).mint(&payer, &amount);
    s.client.deposit(&payer, &amount);
}

fn balance(env: &Env, asset: &Address, who: &Address) -> i128 {
    token::Client::new(env, asset).balance(who)
}

/// A single backer with three shares, paid all income up to a cap far beyond
/// the deposits below.
fn single_backer() -> Setup {
    let env = Env::default();
    env.mock_all_auths();
    let owner = Address::generate(&env);
    let asset = create_token(&env);
    let id = env.register_contract(None, ProjectLedger);
    let client = ProjectLedgerClient::new(&env, &id);
    client.initialize(&owner, &asset, &LARGE, &10_000, &0);
    let holders = vec![&env, Address::generate(&env)];
    client.set_holders(&holders, &vec![&env, 3i128]);
    Setup {
        env,
        client,
        owner,
        asset,
        holders,
    }
}

fn last_event(env: &Env) -> Vec<(Address, Vec<Val>, Val)> {
    let all = env.events().all();
    all.slice(all.len() - 1..)
}

fn hash(env: &Env, seed: u8) -> BytesN<32> {
    BytesN::from_array(env, &[seed; 32])
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

// ── shareholders ──────────────────────────────────────────────

#[test]
fn initializes_shareholders() {
    let s = setup();
    let report = s.client.get_report();
    assert_eq!(report.holder_count, 9);
    assert_eq!(report.total_shares, 10_000);
    assert_eq!(report.payback_cap, 30 * UNIT);
    for (i, amount) in SHARES.iter().enumerate() {
        let account = s.holders.get(i as u32).unwrap();
        assert_eq!(s.client.balance_of(&account), *amount);
    }
}

#[test]
fn holders_are_set_once() {
    let s = setup();
    assert_eq!(
        s.client
            .try_set_holders(&vec![&s.env, s.owner.clone()], &vec![&s.env, 1i128]),
        Err(Ok(Error::AlreadySet))
    );
}

#[test]
fn set_holders_validates_input() {
    let s = bare();
    let a = Address::generate(&s.env);
    let b = Address::generate(&s.env);

    let mismatched = s
        .client
        .try_set_holders(&vec![&s.env, a.clone(), b.clone()], &vec![&s.env, 1i128]);
    assert_eq!(mismatched, Err(Ok(Error::ValueInvalid)));

    let zero = s
        .client
        .try_set_holders(&vec![&s.env, a.clone(), b.clone()], &vec![&s.env, 1i128, 0]);
    assert_eq!(zero, Err(Ok(Error::ValueInvalid)));

    let duplicate = s
        .client
        .try_set_holders(&vec![&s.env, a.clone(), a.clone()], &vec![&s.env, 1i128, 1]);
    assert_eq!(duplicate, Err(Ok(Error::ValueInvalid)));

    assert_eq!(s.client.holders(), 0);
}

#[test]
fn report_by_address_or_index() {
    let s = setup();
    let h1 = s.holders.get(1).unwrap();
    let by_index = s.client.get_report_account_at(&2);
    assert_eq!(by_index.account, h1);
    assert_eq!(by_index.index, 2);
    assert_eq!(s.client.get_report_account(&h1), by_index);
    assert_eq!(
        s.client.try_get_report_account_at(&100),
        Err(Ok(Error::ValueInvalid))
    );
}

// ── dividends ─────────────────────────────────────────────────

#[test]
fn distributes_funds() {
    let s = setup();
    let h1 = s.holders.get(1).unwrap();
    pay_in(&s, 100 * UNIT);

    assert_eq!(s.client.withdraw_funds(&h1), 2 * UNIT);
    assert_eq!(balance(&s.env, &s.asset, &h1), 2 * UNIT);

    let report = s.client.get_report_account(&h1);
    assert_eq!(report.shares, 2000);
    assert_eq!(report.dividends_earned, 2 * UNIT);
    assert_eq!(report.dividends_claimed, 2 * UNIT);
}

#[test]
fn only_token_holders_earn_once_token_is_set() {
    let s = setup();
    let h1 = s.holders.get(1).unwrap();
    let h2 = s.holders.get(2).unwrap();
    let project_token = create_token(&s.env);
    let minter = token::StellarAssetClient::new(&s.env, &project_token);

    s.client.set_token(&s.owner, &project_token);
    assert_eq!(s.client.get_report().total_active_shares, 0);

    minter.mint(&h1, &MIN_BALANCE);
    s.client.withdraw_funds(&h1);
    pay_in(&s, 100 * UNIT);

    let r1 = s.client.get_report_account(&h1);
    assert_eq!(r1.active_shares, 2000);
    assert_eq!(r1.dividends_earned, 10 * UNIT);

    let r2 = s.client.get_report_account(&h2);
    assert_eq!(r2.active_shares, 0);
    assert_eq!(r2.dividends_earned, 0);

    minter.mint(&h2, &MIN_BALANCE);
    s.client.withdraw_funds(&h2);
    pay_in(&s, 10 * UNIT);

    let r2 = s.client.get_report_account(&h2);
    assert_eq!(r2.active_shares, 2000);
    assert_eq!(r2.dividends_earned, UNIT / 2);
}

#[test]
fn stops_distributing_after_payback() {
    let s = setup();
    let h1 = s.holders.get(1).unwrap();
    // Ten times the cap, since a tenth of income becomes dividends.
    pay_in(&s, 300 * UNIT);

    assert_eq!(s.client.get_report().total_dividends, 30 * UNIT);
    assert_eq!(s.client.get_report_account(&h1).dividends_earned, 6 * UNIT);

    pay_in(&s, 10 * UNIT);
    assert_eq!(s.client.get_report().total_dividends, 30 * UNIT);
    assert_eq!(s.client.get_report_account(&h1).dividends_earned, 6 * UNIT);
}

#[test]
fn pays_out_every_shareholder() {
    let s = setup();
    pay_in(&s, 300 * UNIT);

    let mut sum = 0i128;
    for index in 1..=s.client.holders() {
        let account = s.client.holder_at(&index);
        s.client.withdraw_funds(&account);
        let report = s.client.get_report_account_at(&index);
        assert_eq!(
            report.dividends_claimed,
            SHARES[(index - 1) as usize] * PAYBACK_RATE
        );
        sum += report.dividends_claimed;
    }
    assert_eq!(sum, 30 * UNIT);
    assert_eq!(s.client.get_report().total_withdrawn, 30 * UNIT);
}

#[test]
fn withdraw_publishes_amount() {
    let s = setup();
    let h1 = s.holders.get(1).unwrap();
    pay_in(&s, 100 * UNIT);
    s.client.withdraw_funds(&h1);
    assert_eq!(
        last_event(&s.env),
        vec![
            &s.env,
            (
                s.client.address.clone(),
                (symbol_short!("fund_wdrw"), h1.clone()).into_val(&s.env),
                (2 * UNIT).into_val(&s.env)
            )
        ]
    );
}

#[test]
fn large_deposit_pays_out_in_full() {
    let s = single_backer();
    let backer = s.holders.get(0).unwrap();
    pay_in(&s, 10_000_000_000_000_000_000);

    assert_near(s.client.withdrawable(&backer), 10_000_000_000_000_000_000);
    assert_near(
        s.client.withdraw_funds(&backer),
        10_000_000_000_000_000_000,
    );
}

#[test]
fn cumulative_deposits_pay_out_in_full() {
    let s = single_backer();
    let backer = s.holders.get(0).unwrap();
    for _ in 0..3 {
        pay_in(&s, 4_000_000_000_000_000_000);
    }

    let paid = s.client.withdraw_funds(&backer);
    assert_near(paid, 12_000_000_000_000_000_000);
    assert_eq!(balance(&s.env, &s.asset, &backer), paid);
    assert_eq!(s.client.get_report_account(&backer).dividends_claimed, paid);
}

#[test]
fn non_holder_cannot_withdraw() {
    let s = setup();
    assert_eq!(
        s.client.try_withdraw_funds(&Address::generate(&s.env)),
        Err(Ok(Error::ValueInvalid))
    );
}

// ── admins ────────────────────────────────────────────────────

#[test]
fn sets_admin_accounts() {
    let s = setup();
    let list = with_admins(&s);
    let stored = s.client.get_admins();
    assert_eq!(stored.get(0).unwrap(), list[0]);
    assert_eq!(stored.get(1).unwrap(), list[1]);
    assert_eq!(stored.get(2).unwrap(), list[2]);
}

#[test]
fn requires_three_admins() {
    let s = setup();
    let two = vec![&s.env, Address::generate(&s.env), Address::generate(&s.env)];
    assert_eq!(
        s.client.try_set_admins(&s.owner, &two),
        Err(Ok(Error::ValueInvalid))
    );
}

#[test]
fn admins_initialize_once() {
    let s = setup();
    let list = with_admins(&s);
    let again = vec![&s.env, list[0].clone(), list[1].clone(), list[2].clone()];
    assert_eq!(
        s.client.try_set_admins(&s.owner, &again),
        Err(Ok(Error::AlreadySet))
    );
}

#[test]
fn only_owner_assigns_first_admins() {
    let s = setup();
    let stranger = Address::generate(&s.env);
    let list = vec![&s.env, stranger.clone(), Address::generate(&s.env), Address::generate(&s.env)];
    assert_eq!(
        s.client.try_set_admins(&stranger, &list),
        Err(Ok(Error::CallerInvalid))
    );
}

#[test]
fn admins_replace_the_whole_set_together() {
    let s = setup();
    let [a0, a1, _] = with_admins(&s);
    let next = vec![
        &s.env,
        Address::generate(&s.env),
        Address::generate(&s.env),
        Address::generate(&s.env),
    ];
    assert_eq!(
        s.client.set_admins(&a0, &next),
        ConfirmationStatus::pending(1, 2)
    );
    assert!(s.client.is_admin(&a0));
    assert_eq!(
        s.client.set_admins(&a1, &next),
        ConfirmationStatus::complete(2, 2)
    );
    assert_eq!(s.client.get_admins(), next);
}

#[test]
fn replace_admin_requires_two_admins() {
    let s = setup();
    let [a0, a1, a2] = with_admins(&s);
    let newcomer = Address::generate(&s.env);

    let first = s.client.replace_admin(&a0, &a2, &newcomer);
    assert_eq!(first, ConfirmationStatus::pending(1, 2));
    assert!(s.client.is_admin(&a2));
    assert!(!s.client.is_admin(&newcomer));

    let second = s.client.replace_admin(&a1, &a2, &newcomer);
    assert_eq!(second, ConfirmationStatus::complete(2, 2));
    assert_eq!(
        last_event(&s.env),
        vec![
            &s.env,
            (
                s.client.address.clone(),
                (symbol_short!("adm_chg"), a2.clone()).into_val(&s.env),
                newcomer.into_val(&s.env)
            )
        ]
    );
    assert!(s.client.is_admin(&newcomer));
    assert!(!s.client.is_admin(&a2));
}

#[test]
fn restarts_confirmation_when_conflicted() {
    let s = setup();
    let [a0, a1, a2] = with_admins(&s);
    let h4 = Address::generate(&s.env);
    let h5 = Address::generate(&s.env);

    s.client.replace_admin(&a0, &a2, &h4);
    let status = s.client.replace_admin(&a1, &a2, &h5);
    assert_eq!(status, ConfirmationStatus::pending(1, 2));
    assert!(s.client.is_admin(&a2));
    assert!(!s.client.is_admin(&h4));
    assert_eq!(s.client.pending_call().unwrap().confirmed_by, vec![&s.env, a1]);
}

#[test]
fn does_not_count_double_confirmation() {
    let s = setup();
    let [a0, _, a2] = with_admins(&s);
    let h4 = Address::generate(&s.env);
    assert_eq!(
        s.client.replace_admin(&a0, &a2, &h4),
        ConfirmationStatus::pending(1, 2)
    );
    assert_eq!(
        s.client.replace_admin(&a0, &a2, &h4),
        ConfirmationStatus::pending(1, 2)
    );
}

#[test]
fn confirmations_publish_progress() {
    let s = setup();
    let [a0, a1, a2] = with_admins(&s);
    let newcomer = Address::generate(&s.env);

    s.client.replace_admin(&a0, &a2, &newcomer);
    assert_eq!(
        last_event(&s.env),
        vec![
            &s.env,
            (
                s.client.address.clone(),
                (symbol_short!("conf_req"), a0.clone()).into_val(&s.env),
                (1u32, 2u32).into_val(&s.env)
            )
        ]
    );

    // conf_done precedes the transfer and fund_appr events.
    pay_in(&s, 10 * UNIT);
    let to = Address::generate(&s.env);
    s.client.request_funds(&a0, &to, &UNIT);
    s.client.request_funds(&a1, &to, &UNIT);
    let done: Vec<Val> = (symbol_short!("conf_done"), a1.clone()).into_val(&s.env);
    let mut completions = 0;
    for (contract, topics, data) in s.env.events().all().iter() {
        if contract == s.client.address && topics == done {
            let confirmations: u32 = data.into_val(&s.env);
            assert_eq!(confirmations, 2);
            completions += 1;
        }
    }
    assert_eq!(completions, 1);
}

// ── confirm_call ──────────────────────────────────────────────

#[test]
fn confirm_call_tracks_three_admins() {
    let s = setup();
    let [a0, a1, a2] = with_admins(&s);
    let selector = symbol_short!("upgrade");

    assert_eq!(
        s.client.confirm_call(&a0, &3, &a0, &selector, &hash(&s.env, 1)),
        ConfirmationStatus::pending(1, 3)
    );
    assert_eq!(
        s.client.confirm_call(&a1, &3, &a1, &selector, &hash(&s.env, 1)),
        ConfirmationStatus::pending(2, 3)
    );
    assert_eq!(
        s.client.confirm_call(&a2, &3, &a2, &selector, &hash(&s.env, 1)),
        ConfirmationStatus::complete(3, 3)
    );
    assert!(s.client.pending_call().is_none());
}

#[test]
fn confirm_call_restarts_on_conflicting_call() {
    let s = setup();
    let [a0, a1, _] = with_admins(&s);
    let selector = symbol_short!("upgrade");

    s.client.confirm_call(&a0, &3, &a0, &selector, &hash(&s.env, 1));
    assert_eq!(
        s.client.confirm_call(&a1, &3, &a1, &selector, &hash(&s.env, 2)),
        ConfirmationStatus::pending(1, 3)
    );
    let pending = s.client.pending_call().unwrap();
    assert_eq!(pending.fingerprint.args_hash, hash(&s.env, 2));
    assert_eq!(pending.confirmed_by, vec![&s.env, a1]);
}

#[test]
fn confirm_call_ignores_double_confirmation() {
    let s = setup();
    let [a0, _, _] = with_admins(&s);
    let selector = symbol_short!("upgrade");

    for _ in 0..2 {
        assert_eq!(
            s.client.confirm_call(&a0, &3, &a0, &selector, &hash(&s.env, 1)),
            ConfirmationStatus::pending(1, 3)
        );
    }
    assert_eq!(s.client.pending_call().unwrap().confirmed_by.len(), 1);
}

#[test]
fn confirm_call_rejects_strangers() {
    let s = setup();
    let [a0, _, _] = with_admins(&s);
    let stranger = Address::generate(&s.env);
    let selector = symbol_short!("upgrade");

    assert_eq!(
        s.client
            .try_confirm_call(&stranger, &2, &a0, &selector, &hash(&s.env, 1)),
        Err(Ok(Error::CallerInvalid))
    );
    assert_eq!(
        s.client
            .try_confirm_call(&s.owner, &2, &stranger, &selector, &hash(&s.env, 1)),
        Err(Ok(Error::CallerInvalid))
    );
    assert_eq!(
        s.client
            .try_confirm_call(&a0, &4, &a0, &selector, &hash(&s.env, 1)),
        Err(Ok(Error::ValueInvalid))
    );
}

#[test]
fn replace_admin_rejects_unknown_admin() {
    let s = setup();
    let [a0, _, _] = with_admins(&s);
    assert_eq!(
        s.client
            .try_replace_admin(&a0, &Address::generate(&s.env), &Address::generate(&s.env)),
        Err(Ok(Error::ValueInvalid))
    );
}

// ── treasury ──────────────────────────────────────────────────

#[test]
fn request_funds_requires_two_admins() {
    let s = setup();
    let [a0, a1, _] = with_admins(&s);
    let to = Address::generate(&s.env);
    pay_in(&s, 10 * UNIT);
    let contract = s.client.address.clone();

    let first = s.client.request_funds(&a0, &to, &(5 * UNIT));
    assert_eq!(first, ConfirmationStatus::pending(1, 2));
    assert_eq!(balance(&s.env, &s.asset, &to), 0);

    let second = s.client.request_funds(&a1, &to, &(5 * UNIT));
    assert_eq!(second, ConfirmationStatus::complete(2, 2));
    assert_eq!(
        last_event(&s.env),
        vec![
            &s.env,
            (
                contract.clone(),
                (symbol_short!("fund_appr"), to.clone()).into_val(&s.env),
                (5 * UNIT).into_val(&s.env)
            )
        ]
    );
    assert_eq!(balance(&s.env, &s.asset, &to), 5 * UNIT);
    assert_eq!(balance(&s.env, &s.asset, &contract), 5 * UNIT);
}

#[test]
fn request_funds_keeps_dividends_reserved() {
    let s = setup();
    let [a0, _, _] = with_admins(&s);
    pay_in(&s, 10 * UNIT);
    // One unit of the asset is owed to shareholders.
    assert_eq!(s.client.treasury(), 9 * UNIT);
    assert_eq!(
        s.client
            .try_request_funds(&a0, &Address::generate(&s.env), &(9 * UNIT + 1)),
        Err(Ok(Error::InsufficientResources))
    );
}

#[test]
fn owner_requests_funds_before_admins_exist() {
    let s = setup();
    let to = Address::generate(&s.env);
    pay_in(&s, 10 * UNIT);
    let status = s.client.request_funds(&s.owner, &to, &UNIT);
    assert!(status.complete);
    assert_eq!(balance(&s.env, &s.asset, &to), UNIT);
}

// ── token changes ─────────────────────────────────────────────

#[test]
fn later_token_changes_need_two_admins() {
    let s = setup();
    let [a0, a1, _] = with_admins(&s);
    let first = create_token(&s.env);
    let second = create_token(&s.env);

    assert!(s.client.set_token(&a0, &first).complete);
    assert_eq!(s.client.token(), Some(first.clone()));
    // Once set, even the current token goes through confirmation.
    assert_eq!(
        s.client.set_token(&a0, &first),
        ConfirmationStatus::pending(1, 2)
    );

    assert!(!s.client.set_token(&a0, &second).complete);
    assert_eq!(s.client.token(), Some(first));
    assert!(s.client.set_token(&a1, &second).complete);
    assert_eq!(s.client.token(), Some(second));
}

#[test]
fn first_token_rejects_strangers() {
    let s = setup();
    assert_eq!(
        s.client
            .try_set_token(&Address::generate(&s.env), &create_token(&s.env)),
        Err(Ok(Error::CallerInvalid))
    );
}

#[test]
fn reconfirming_the_current_token_keeps_weights() {
    let s = setup();
    let [a0, a1, _] = with_admins(&s);
    let project_token = create_token(&s.env);
    let h1 = s.holders.get(1).unwrap();
    s.client.set_token(&a0, &project_token);
    token::StellarAssetClient::new(&s.env, &project_token).mint(&h1, &MIN_BALANCE);
    s.client.withdraw_funds(&h1);
    assert_eq!(s.client.get_report().total_active_shares, 2000);

    assert_eq!(
        s.client.set_token(&a0, &project_token),
        ConfirmationStatus::pending(1, 2)
    );
    assert_eq!(
        s.client.set_token(&a1, &project_token),
        ConfirmationStatus::complete(2, 2)
    );
    assert_eq!(s.client.token(), Some(project_token));
    assert_eq!(s.client.get_report().total_active_shares, 2000);
}
