#![cfg(test)]
use governance::Error;
use soroban_sdk::{
    contract, contractimpl,
    testutils::{Address as _, Ledger as _},
    token, Address, Env,
};

use crate::{RewardLedger, RewardLedgerClient, MAX_SLOTS, SLOT_ROTATION_SECS, TOKEN_UNIT};

const START: u64 = 1_700_000_000;

/// Pays out twice the input in `asset_out` from its own inventory.
#[contract]
pub struct MockRouter;

#[contractimpl]
impl MockRouter {
    pub fn swap_exact_in(
        env: Env,
        asset_in: Address,
        asset_out: Address,
        amount_in: i128,
        recipient: Address,
    ) -> i128 {
        let _ = asset_in;
        let out = amount_in * 2;
        token::Client::new(&env, &asset_out).transfer(
            &env.current_contract_address(),
            &recipient,
            &out,
        );
        out
    }
}

// ── helper ────────────────────────────────────────────────────

fn setup() -> (Env, RewardLedgerClient<'static>, Address, Address) {
    let env = Env::default();
    env.mock_all_auths();
    env.ledger().with_mut(|li| li.timestamp = START);
    let owner = Address::generate(&env);
    let asset = create_token(&env);
    let id = env.register_contract(None, RewardLedger);
    let client = RewardLedgerClient::new(&env, &id);
    client.initialize(&owner, &asset);
    (env, client, owner, asset)
}

fn create_token(env: &Env) -> Address {
    let admin = Address::generate(env);
    env.register_stellar_asset_contract(admin)
}

fn pay_in(env: &Env, client: &RewardLedgerClient, asset: &Address, amount: i128) {
    let payer = Address::generate(env);
    token::StellarAssetClient::new(env, asset).mint(&payer, &amount);
    client.deposit(&payer, &amount);
}

fn balance(env: &Env, asset: &Address, who: &Address) -> i128 {
    token::Client::new(env, asset).balance(who)
}

/// Owner registers `n` fresh tokens; returns them in order.
fn add_tokens(env: &Env, client: &RewardLedgerClient, owner: &Address, n: usize) -> [Address; 3] {
    let list = [create_token(env), create_token(env), create_token(env)];
    for token in list.iter().take(n) {
        client.add_token(owner, token);
    }
    list
}

// ── token registry ────────────────────────────────────────────

#[test]
fn adds_tokens() {
    let (env, client, owner, _asset) = setup();
    let [first, _, _] = add_tokens(&env, &client, &owner, 1);

    assert_eq!(client.tokens(), 1);
    assert_eq!(client.token_at(&1), first);
    let entry = client.get_token(&first);
    assert_eq!(entry.index, 1);
    assert_eq!(entry.added, START);
    assert_eq!(
        client.try_add_token(&owner, &first),
        Err(Ok(Error::ValueUnchanged))
    );
}

#[test]
fn add_token_requires_a_token_contract() {
    let (env, client, owner, _asset) = setup();
    let not_a_token = env.register_contract(None, MockRouter);
    assert_eq!(
        client.try_add_token(&owner, &not_a_token),
        Err(Ok(Error::ValueInvalid))
    );
    assert_eq!(client.tokens(), 0);
}

#[test]
fn add_token_rejects_strangers() {
    let (env, client, _owner, _asset) = setup();
    let token = create_token(&env);
    assert_eq!(
        client.try_add_token(&Address::generate(&env), &token),
        Err(Ok(Error::CallerInvalid))
    );
}

#[test]
fn deletes_tokens() {
    let (env, client, owner, _asset) = setup();
    let [first, second, _] = add_tokens(&env, &client, &owner, 2);

    client.delete_token(&owner, &first);

    assert_eq!(client.tokens(), 1);
    assert_eq!(client.token_at(&1), second);
    assert_eq!(client.get_token(&second).index, 1);
    let gone = client.get_token(&first);
    assert_eq!(gone.index, 0);
    assert_eq!(gone.added, 0);
    assert_eq!(
        client.try_delete_token(&owner, &first),
        Err(Ok(Error::ValueInvalid))
    );
}

#[test]
fn slotted_token_cannot_be_deleted() {
    let (env, client, owner, _asset) = setup();
    let [first, _, _] = add_tokens(&env, &client, &owner, 1);
    client.set_slot(&owner, &0, &first);
    assert_eq!(
        client.try_delete_token(&owner, &first),
        Err(Ok(Error::ValueInvalid))
    );
}

// ── slots ─────────────────────────────────────────────────────

#[test]
fn slot_zero_fills_the_next_slot() {
    let (env, client, owner, _asset) = setup();
    let [a, b, _] = add_tokens(&env, &client, &owner, 2);
    assert_eq!(client.current_slot(), 0);

    client.set_slot(&owner, &0, &a);
    client.set_slot(&owner, &0, &b);

    assert_eq!(client.slots(), 2);
    assert_eq!(client.current_slot(), 1);
    assert_eq!(client.token_in_slot(&1), a);
    assert_eq!(client.token_in_slot(&2), b);
}

#[test]
fn set_slot_validates_token_and_index() {
    let (env, client, owner, _asset) = setup();
    let [a, _, _] = add_tokens(&env, &client, &owner, 1);
    let unregistered = create_token(&env);

    assert_eq!(
        client.try_set_slot(&owner, &0, &unregistered),
        Err(Ok(Error::ValueInvalid))
    );
    assert_eq!(
        client.try_set_slot(&owner, &1, &a),
        Err(Ok(Error::ValueInvalid))
    );
}

#[test]
fn slots_fill_up() {
    let (env, client, owner, _asset) = setup();
    let [a, _, _] = add_tokens(&env, &client, &owner, 1);
    for _ in 0..MAX_SLOTS {
        client.set_slot(&owner, &0, &a);
    }
    assert_eq!(client.slots(), MAX_SLOTS);
    assert_eq!(
        client.try_set_slot(&owner, &0, &a),
        Err(Ok(Error::SlotsFull))
    );
    // Replacing an occupied slot still works.
    client.set_slot(&owner, &MAX_SLOTS, &a);
}

#[test]
fn delete_slot_shifts_and_follows_current() {
    let (env, client, owner, _asset) = setup();
    let [a, b, c] = add_tokens(&env, &client, &owner, 3);
    client.set_slot(&owner, &0, &a);
    client.set_slot(&owner, &0, &b);
    client.set_slot(&owner, &0, &c);
    client.set_current_slot(&owner, &3);

    client.delete_slot(&owner, &1);
    assert_eq!(client.slots(), 2);
    assert_eq!(client.token_in_slot(&1), b);
    assert_eq!(client.token_in_slot(&2), c);
    assert_eq!(client.current_slot(), 2);

    client.delete_slot(&owner, &2);
    assert_eq!(client.current_slot(), 1);

    client.delete_slot(&owner, &1);
    assert_eq!(client.slots(), 0);
    assert_eq!(client.current_slot(), 0);
    assert_eq!(
        client.try_delete_slot(&owner, &1),
        Err(Ok(Error::ValueInvalid))
    );
}

#[test]
fn set_current_slot_checks_range_and_change() {
    let (env, client, owner, _asset) = setup();
    let [a, b, _] = add_tokens(&env, &client, &owner, 2);
    client.set_slot(&owner, &0, &a);
    client.set_slot(&owner, &0, &b);

    assert_eq!(
        client.try_set_current_slot(&owner, &0),
        Err(Ok(Error::ValueInvalid))
    );
    assert_eq!(
        client.try_set_current_slot(&owner, &3),
        Err(Ok(Error::ValueInvalid))
    );
    assert_eq!(
        client.try_set_current_slot(&owner, &1),
        Err(Ok(Error::ValueUnchanged))
    );
    client.set_current_slot(&owner, &2);
    assert_eq!(client.current_slot(), 2);
}

// ── routed payouts ────────────────────────────────────────────

/// Ledger with one tracked holder, a stocked router and `n` slots.
fn routed(
    n: usize,
) -> (
    Env,
    RewardLedgerClient<'static>,
    Address,
    Address,
    Address,
    [Address; 3],
) {
    let (env, client, owner, asset) = setup();
    let router = env.register_contract(None, MockRouter);
    client.set_router(&owner, &router);
    let slot_tokens = add_tokens(&env, &client, &owner, n);
    for token in slot_tokens.iter().take(n) {
        client.set_slot(&owner, &0, token);
        token::StellarAssetClient::new(&env, token).mint(&router, &(1_000 * TOKEN_UNIT));
    }
    let holder = Address::generate(&env);
    client.track_buy(&holder, &(500_000 * TOKEN_UNIT));
    (env, client, asset, router, holder, slot_tokens)
}

#[test]
fn router_pays_in_the_active_slot_token() {
    let (env, client, asset, router, holder, [a, _, _]) = routed(1);
    pay_in(&env, &client, &asset, 3 * TOKEN_UNIT);

    let paid = client.withdraw_funds(&holder);
    assert!(paid > 0);
    assert_eq!(balance(&env, &asset, &holder), 0);
    assert_eq!(balance(&env, &asset, &router), paid);
    assert_eq!(balance(&env, &a, &holder), 2 * paid);

    let report = client.get_report_token_in_slot(&0);
    assert_eq!(report.slot, 1);
    assert_eq!(report.token, a);
    assert_eq!(report.claims, 1);
    assert_eq!(report.amount, paid);
    assert_eq!(report.balance, 2 * paid);
}

#[test]
fn active_slot_rotates_daily() {
    let (env, client, asset, _router, holder, [a, b, _]) = routed(2);
    pay_in(&env, &client, &asset, TOKEN_UNIT);
    let first = client.withdraw_funds(&holder);
    assert_eq!(client.current_slot(), 1);
    assert_eq!(balance(&env, &a, &holder), 2 * first);

    env.ledger()
        .with_mut(|li| li.timestamp = START + SLOT_ROTATION_SECS);
    pay_in(&env, &client, &asset, TOKEN_UNIT);
    let second = client.withdraw_funds(&holder);

    assert_eq!(client.current_slot(), 2);
    assert_eq!(balance(&env, &b, &holder), 2 * second);
    assert_eq!(client.get_report_token_in_slot(&1).claims, 1);
    assert_eq!(client.get_report_token_in_slot(&2).claims, 1);
}

#[test]
fn slots_without_router_pay_the_reward_asset() {
    let (env, client, owner, asset) = setup();
    let [a, _, _] = add_tokens(&env, &client, &owner, 1);
    client.set_slot(&owner, &0, &a);
    let holder = Address::generate(&env);
    client.track_buy(&holder, &(500_000 * TOKEN_UNIT));
    pay_in(&env, &client, &asset, TOKEN_UNIT);

    let paid = client.withdraw_funds(&holder);
    assert_eq!(balance(&env, &asset, &holder), paid);
    assert_eq!(balance(&env, &a, &holder), 0);
    assert_eq!(client.get_report_token_in_slot(&1).claims, 0);
}

#[test]
fn slot_report_requires_an_occupied_slot() {
    let (_env, client, _owner, _asset) = setup();
    assert_eq!(
        client.try_get_report_token_in_slot(&0),
        Err(Ok(Error::ValueInvalid))
    );
    assert_eq!(
        client.try_get_report_token_in_slot(&4),
        Err(Ok(Error::ValueInvalid))
    );
}

#[test]
fn router_must_change() {
    let (env, client, owner, _asset) = setup();
    let router = env.register_contract(None, MockRouter);
    client.set_router(&owner, &router);
    assert_eq!(
        client.try_set_router(&owner, &router),
        Err(Ok(Error::ValueUnchanged))
    );
}
