#![no_std]
#![deny(unsafe_code)]
#![deny(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
use governance::{
    per_share, registry, ClaimsProcessed, ConfirmationStatus, Error, Fingerprint,
    REQUIRED_ROUTINE,
};
use soroban_sdk::{
    contract, contractclient, contractimpl, contracttype, log, symbol_short, token, Address,
    Env, IntoVal, String, Symbol, Val, I256,
};

// ── Event symbols ────────────────────────────────────────────
const EVENT_INIT: Symbol = symbol_short!("init");
const EVENT_GOVERNOR_SET: Symbol = symbol_short!("gov_set");
const EVENT_FUNDS_RECEIVED: Symbol = symbol_short!("fund_recv");
const EVENT_FUNDS_WITHDRAWN: Symbol = symbol_short!("fund_wdrw");
const EVENT_CLAIMS: Symbol = symbol_short!("claims");
const EVENT_MIN_BALANCE_CHANGED: Symbol = symbol_short!("min_chg");
const EVENT_WAITING_PERIOD_CHANGED: Symbol = symbol_short!("wait_chg");
const EVENT_STAKING: Symbol = symbol_short!("staking");
const EVENT_EXCLUDED: Symbol = symbol_short!("excluded");
const EVENT_ROUTER: Symbol = symbol_short!("router");
const EVENT_TOKEN_ADDED: Symbol = symbol_short!("tok_add");
const EVENT_TOKEN_DELETED: Symbol = symbol_short!("tok_del");
const EVENT_SLOT_SET: Symbol = symbol_short!("slot_set");
const EVENT_SLOT_DELETED: Symbol = symbol_short!("slot_del");
const EVENT_SLOT_CURRENT: Symbol = symbol_short!("slot_cur");

/// Smallest unit per whole token (7 decimals).
pub const TOKEN_UNIT: i128 = 10_000_000;
pub const DEFAULT_MINIMUM_BALANCE: i128 = 500_000 * TOKEN_UNIT;
pub const DEFAULT_WAITING_PERIOD: u64 = 6 * 60 * 60;
pub const MIN_WAITING_PERIOD: u64 = 60 * 60;
pub const MAX_WAITING_PERIOD: u64 = 24 * 60 * 60;

/// Maximum number of concurrently occupied reward slots.
pub const MAX_SLOTS: u32 = 10;
/// A slot stays active this long before payouts rotate to the next one.
pub const SLOT_ROTATION_SECS: u64 = 24 * 60 * 60;

/// Work units charged by `process_claims` for visiting one account.
pub const CLAIM_VISIT_COST: u64 = 5_000;
/// Additional work units charged for paying one account.
pub const CLAIM_PAYOUT_COST: u64 = 45_000;

// ── Data structures ──────────────────────────────────────────

/// Per-account accounting. Kept after the account drops out so earned but
/// unwithdrawn income survives until it qualifies again.
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct Holder {
    /// 1-based position in the tracked array; 0 when untracked.
    pub index: u32,
    pub balance: i128,
    /// Offsets income accrued before the current balance was reached.
    pub correction: I256,
    pub withdrawn: i128,
    pub last_claim: Option<u64>,
}

impl Holder {
    fn empty(env: &Env) -> Self {
        Self {
            index: 0,
            balance: 0,
            correction: per_share::zero(env),
            withdrawn: 0,
            last_claim: None,
        }
    }
}

/// Ledger-wide aggregates.
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct Totals {
    pub total_tracked: i128,
    pub total_received: i128,
    pub total_paid: i128,
    /// Income received while nothing was tracked; folded into the next deposit.
    pub undistributed: i128,
    /// Income per tracked unit, scaled by 2^64.
    pub magnified_per_share: I256,
}

/// Registered external reward token.
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct TokenEntry {
    pub token: Address,
    /// 1-based position in the registry; 0 when not registered.
    pub index: u32,
    /// Ledger timestamp of registration; 0 when not registered.
    pub added: u64,
}

/// One payout channel bound to an external reward token.
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    pub token: Address,
    /// Payouts routed through this slot.
    pub claims: u32,
    /// Reward asset spent on those payouts.
    pub amount: i128,
    /// Slot token delivered to holders.
    pub balance: i128,
}

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct RewardReport {
    pub holder_count: u32,
    pub staking_on: bool,
    pub total_tokens_tracked: i128,
    pub total_tokens_staked: i128,
    pub total_received: i128,
    pub total_paid: i128,
    pub required_balance: i128,
    pub wait_period_seconds: u64,
    pub current_holder: u32,
}

/// Per-account view. Every tracked token counts as staked: staking only
/// changes how income is paid out, never an account's weight.
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct AccountReport {
    pub account: Address,
    pub index: u32,
    pub balance: i128,
    pub staked_percent: u32,
    pub staked_tokens: i128,
    pub rewards_earned: i128,
    pub rewards_claimed: i128,
    pub withdrawable: i128,
    /// Whole hours since the last claim; 0 if never claimed.
    pub claim_hours: u64,
}

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct SlotReport {
    pub slot: u32,
    pub token: Address,
    pub name: String,
    pub symbol: String,
    pub claims: u32,
    pub amount: i128,
    pub balance: i128,
}

/// Storage keys. Tracked accounts form a dense 1-based array
/// (`HolderAt`/`HolderCount`) with `Holder(account).index` as the reverse map.
#[contracttype]
pub enum DataKey {
    Owner,
    Governor,
    RewardAsset,
    Router,
    MinimumBalance,
    WaitingPeriod,
    Staking,
    Totals,
    Holder(Address),
    HolderAt(u32),
    HolderCount,
    /// Next array offset `process_claims` visits (0-based).
    CurrentHolder,
    Excluded(Address),
    TokenEntry(Address),
    TokenAt(u32),
    TokenCount,
    SlotAt(u32),
    SlotCount,
    CurrentSlot,
    SlotStarted,
}

/// Swap venue used to pay holders in the active slot's token.
#[contractclient(name = "SwapRouterClient")]
pub trait SwapRouter {
    /// Swap `amount_in` of `asset_in`, already sent to the router, into
    /// `asset_out` delivered to `recipient`. Returns the amount delivered.
    fn swap_exact_in(
        env: Env,
        asset_in: Address,
        asset_out: Address,
        amount_in: i128,
        recipient: Address,
    ) -> i128;
}

// ── Contract ─────────────────────────────────────────────────
#[contract]
pub struct RewardLedger;

#[contractimpl]
impl RewardLedger {
    // ── Storage helpers ───────────────────────────────────────

    fn get_owner(env: &Env) -> Result<Address, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::Owner)
            .ok_or(Error::NotInitialized)
    }

    fn reward_asset(env: &Env) -> Result<Address, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::RewardAsset)
            .ok_or(Error::NotInitialized)
    }

    /// Address allowed to report balances: the governor once set, else the owner.
    fn authority(env: &Env) -> Result<Address, Error> {
        match Self::get_governor(env.clone()) {
            Some(governor) => Ok(governor),
            None => Self::get_owner(env),
        }
    }

    fn totals(env: &Env) -> Totals {
        env.storage()
            .persistent()
            .get(&DataKey::Totals)
            .unwrap_or(Totals {
                total_tracked: 0,
                total_received: 0,
                total_paid: 0,
                undistributed: 0,
                magnified_per_share: per_share::zero(env),
            })
    }

    fn holder(env: &Env, account: &Address) -> Option<Holder> {
        env.storage()
            .persistent()
            .get(&DataKey::Holder(account.clone()))
    }

    fn tracked_holder(env: &Env, account: &Address) -> Result<Holder, Error> {
        Self::holder(env, account)
            .filter(|h| h.index > 0)
            .ok_or(Error::ValueInvalid)
    }

    fn store_holder(env: &Env, account: &Address, holder: &Holder) {
        env.storage()
            .persistent()
            .set(&DataKey::Holder(account.clone()), holder);
    }

    fn holder_address(env: &Env, index: u32) -> Result<Address, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::HolderAt(index))
            .ok_or(Error::ValueInvalid)
    }

    fn accumulated(env: &Env, totals: &Totals, holder: &Holder) -> Result<i128, Error> {
        per_share::accumulated(
            env,
            &totals.magnified_per_share,
            holder.balance,
            &holder.correction,
        )
    }

    fn in_cooldown(env: &Env, holder: &Holder) -> bool {
        let waiting = Self::waiting_period(env.clone());
        match holder.last_claim {
            Some(last) => env.ledger().timestamp() < last.saturating_add(waiting),
            None => false,
        }
    }

    /// Admin gate. With a governor the token's admins confirm the call;
    /// otherwise only the owner passes. Setters call it before validating
    /// their arguments; a failed check reverts the recorded confirmation.
    fn confirm<A>(
        env: &Env,
        caller: &Address,
        selector: Symbol,
        args: A,
    ) -> Result<ConfirmationStatus, Error>
    where
        A: IntoVal<Env, Val>,
    {
        caller.require_auth();
        let fingerprint = Fingerprint::of(env, selector, args);
        match Self::get_governor(env.clone()) {
            Some(governor) => registry::confirm_with_governor(
                env,
                &governor,
                REQUIRED_ROUTINE,
                caller,
                fingerprint,
            ),
            None => {
                let owner = Self::get_owner(env)?;
                registry::confirm(env, &owner, REQUIRED_ROUTINE, caller, fingerprint)
            }
        }
    }

    // ── Initialization and ownership ──────────────────────────

    /// Initialize with the owner and the asset income is paid in.
    pub fn initialize(env: Env, owner: Address, reward_asset: Address) -> Result<(), Error> {
        if env.storage().persistent().has(&DataKey::Owner) {
            return Err(Error::AlreadySet);
        }
        let storage = env.storage().persistent();
        storage.set(&DataKey::Owner, &owner);
        storage.set(&DataKey::RewardAsset, &reward_asset);
        storage.set(&DataKey::MinimumBalance, &DEFAULT_MINIMUM_BALANCE);
        storage.set(&DataKey::WaitingPeriod, &DEFAULT_WAITING_PERIOD);
        storage.set(&DataKey::Staking, &false);
        env.events().publish((EVENT_INIT, owner), reward_asset);
        Ok(())
    }

    /// Hand control to the token contract. Owner only, once.
    ///
    /// Afterwards only the governor may report balances and every setting
    /// change is confirmed by the governor's admins.
    pub fn set_governor(env: Env, governor: Address) -> Result<(), Error> {
        let owner = Self::get_owner(&env)?;
        owner.require_auth();
        if env.storage().persistent().has(&DataKey::Governor) {
            return Err(Error::AlreadySet);
        }
        env.storage().persistent().set(&DataKey::Governor, &governor);
        env.events().publish((EVENT_GOVERNOR_SET, owner), governor);
        Ok(())
    }

    pub fn get_governor(env: Env) -> Option<Address> {
        env.storage().persistent().get(&DataKey::Governor)
    }

    pub fn owner(env: Env) -> Result<Address, Error> {
        Self::get_owner(&env)
    }

    // ── Balance tracking ──────────────────────────────────────

    /// Report `account`'s balance after it received tokens.
    pub fn track_buy(env: Env, account: Address, new_balance: i128) -> Result<(), Error> {
        Self::track(&env, &account, new_balance)
    }

    /// Report `account`'s balance after it sent tokens.
    pub fn track_sell(env: Env, account: Address, new_balance: i128) -> Result<(), Error> {
        Self::track(&env, &account, new_balance)
    }

    fn track(env: &Env, account: &Address, new_balance: i128) -> Result<(), Error> {
        Self::authority(env)?.require_auth();
        if new_balance < 0 {
            return Err(Error::ValueInvalid);
        }
        let qualifying = if Self::is_excluded(env.clone(), account.clone())
            || new_balance < Self::minimum_balance(env.clone())
        {
            0
        } else {
            new_balance
        };
        Self::set_balance(env, account, qualifying)
    }

    /// Move `account` to `balance`, joining or leaving the tracked array when
    /// it crosses zero. `total_tracked` moves by exactly the delta.
    fn set_balance(env: &Env, account: &Address, balance: i128) -> Result<(), Error> {
        let mut holder = Self::holder(env, account).unwrap_or_else(|| Holder::empty(env));
        if holder.balance == balance {
            return Ok(());
        }
        let mut totals = Self::totals(env);
        let delta = balance - holder.balance;
        holder.correction =
            per_share::adjust(env, &holder.correction, &totals.magnified_per_share, delta);
        holder.balance = balance;
        totals.total_tracked += delta;

        if balance > 0 && holder.index == 0 {
            let count: u32 = env
                .storage()
                .persistent()
                .get(&DataKey::HolderCount)
                .unwrap_or(0);
            holder.index = count + 1;
            env.storage()
                .persistent()
                .set(&DataKey::HolderAt(holder.index), account);
            env.storage()
                .persistent()
                .set(&DataKey::HolderCount, &holder.index);
        } else if balance == 0 && holder.index > 0 {
            Self::remove_holder(env, holder.index)?;
            holder.index = 0;
        }

        Self::store_holder(env, account, &holder);
        env.storage().persistent().set(&DataKey::Totals, &totals);
        Ok(())
    }

    /// Swap-remove the entry at `index`: the last entry takes its place and
    /// its own index is rewritten before the count shrinks.
    fn remove_holder(env: &Env, index: u32) -> Result<(), Error> {
        let storage = env.storage().persistent();
        let count: u32 = storage.get(&DataKey::HolderCount).unwrap_or(0);
        if index != count {
            let last = Self::holder_address(env, count)?;
            let mut moved = Self::tracked_holder(env, &last)?;
            moved.index = index;
            Self::store_holder(env, &last, &moved);
            storage.set(&DataKey::HolderAt(index), &last);
        }
        storage.remove(&DataKey::HolderAt(count));
        let remaining = count - 1;
        storage.set(&DataKey::HolderCount, &remaining);

        let cursor: u32 = storage.get(&DataKey::CurrentHolder).unwrap_or(0);
        if cursor >= remaining {
            storage.set(&DataKey::CurrentHolder, &0u32);
        }
        Ok(())
    }

    // ── Income and payouts ────────────────────────────────────

    /// Pay `amount` of the reward asset into the ledger. Income is shared by
    /// the accounts tracked right now, in proportion to their balances.
    pub fn deposit(env: Env, from: Address, amount: i128) -> Result<(), Error> {
        from.require_auth();
        if amount <= 0 {
            return Err(Error::ValueInvalid);
        }
        let asset = Self::reward_asset(&env)?;
        token::Client::new(&env, &asset).transfer(&from, &env.current_contract_address(), &amount);

        let mut totals = Self::totals(&env);
        totals.total_received += amount;
        let pool = amount + totals.undistributed;
        if totals.total_tracked > 0 {
            totals.magnified_per_share = per_share::distribute(
                &env,
                &totals.magnified_per_share,
                pool,
                totals.total_tracked,
            );
            totals.undistributed = 0;
        } else {
            totals.undistributed = pool;
        }
        env.storage().persistent().set(&DataKey::Totals, &totals);

        env.events().publish((EVENT_FUNDS_RECEIVED, from), amount);
        Ok(())
    }

    /// Pay `account` everything it has earned and not yet withdrawn.
    ///
    /// Anyone may trigger it; funds only ever go to `account`. Returns the
    /// amount paid, 0 when nothing is owed.
    pub fn withdraw_funds(env: Env, account: Address) -> Result<i128, Error> {
        let holder = Self::tracked_holder(&env, &account)?;
        if Self::in_cooldown(&env, &holder) {
            return Err(Error::WaitTimeActive);
        }
        let totals = Self::totals(&env);
        let amount = Self::accumulated(&env, &totals, &holder)? - holder.withdrawn;
        if amount <= 0 {
            return Ok(0);
        }
        Self::pay(&env, &account, holder, amount)?;
        Ok(amount)
    }

    /// Record the payout, then move funds. Accounting is persisted before any
    /// transfer leaves the contract.
    fn pay(env: &Env, account: &Address, mut holder: Holder, amount: i128) -> Result<(), Error> {
        let now = env.ledger().timestamp();
        holder.withdrawn += amount;
        holder.last_claim = Some(now);
        Self::store_holder(env, account, &holder);

        let mut totals = Self::totals(env);
        totals.total_paid += amount;
        env.storage().persistent().set(&DataKey::Totals, &totals);

        let asset = Self::reward_asset(env)?;
        let this = env.current_contract_address();
        let router: Option<Address> = env.storage().persistent().get(&DataKey::Router);
        match (Self::rotate_slot(env, now), router) {
            (Some(index), Some(router)) => {
                let mut slot: Slot = env
                    .storage()
                    .persistent()
                    .get(&DataKey::SlotAt(index))
                    .ok_or(Error::ValueInvalid)?;
                token::Client::new(env, &asset).transfer(&this, &router, &amount);
                let delivered = SwapRouterClient::new(env, &router).swap_exact_in(
                    &asset,
                    &slot.token,
                    &amount,
                    account,
                );
                slot.claims += 1;
                slot.amount += amount;
                slot.balance += delivered;
                env.storage()
                    .persistent()
                    .set(&DataKey::SlotAt(index), &slot);
            }
            _ => {
                token::Client::new(env, &asset).transfer(&this, account, &amount);
            }
        }

        env.events()
            .publish((EVENT_FUNDS_WITHDRAWN, account.clone()), amount);
        Ok(())
    }

    /// Walk tracked accounts round-robin from the persisted cursor, paying
    /// each one that is owed and out of cooldown.
    ///
    /// Each visit costs [`CLAIM_VISIT_COST`] and each payout a further
    /// [`CLAIM_PAYOUT_COST`]; the walk stops before a step could exceed
    /// `gas_budget`, or after one full cycle. While staking is on, income
    /// stays in the ledger and nothing is pushed.
    pub fn process_claims(env: Env, gas_budget: u64) -> Result<ClaimsProcessed, Error> {
        let storage = env.storage().persistent();
        let count: u32 = storage.get(&DataKey::HolderCount).unwrap_or(0);
        let mut cursor: u32 = storage.get(&DataKey::CurrentHolder).unwrap_or(0);
        let mut result = ClaimsProcessed {
            iterations: 0,
            claims: 0,
            cursor,
        };
        if count == 0 || Self::is_staking(env.clone()) {
            return Ok(result);
        }

        let step = CLAIM_VISIT_COST + CLAIM_PAYOUT_COST;
        let mut used: u64 = 0;
        while result.iterations < count && used + step <= gas_budget {
            let account = Self::holder_address(&env, cursor + 1)?;
            let holder = Self::tracked_holder(&env, &account)?;
            used += CLAIM_VISIT_COST;
            result.iterations += 1;
            cursor = (cursor + 1) % count;

            if Self::in_cooldown(&env, &holder) {
                continue;
            }
            let totals = Self::totals(&env);
            let amount = Self::accumulated(&env, &totals, &holder)? - holder.withdrawn;
            if amount > 0 {
                used += CLAIM_PAYOUT_COST;
                Self::pay(&env, &account, holder, amount)?;
                result.claims += 1;
            }
        }

        storage.set(&DataKey::CurrentHolder, &cursor);
        result.cursor = cursor;
        log!(&env, "claims processed", result.iterations, result.claims, used);
        env.events()
            .publish((EVENT_CLAIMS,), (result.iterations, result.claims, cursor));
        Ok(result)
    }

    // ── Governed settings ─────────────────────────────────────

    /// Set the qualifying balance, in whole tokens. Accounts are re-evaluated
    /// on their next balance report.
    pub fn set_minimum_balance(
        env: Env,
        caller: Address,
        tokens: i128,
    ) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(&env, &caller, symbol_short!("set_min"), (tokens,))?;
        if tokens <= 0 {
            return Err(Error::ValueInvalid);
        }
        let previous = Self::minimum_balance(env.clone());
        let amount = tokens * TOKEN_UNIT;
        if amount == previous {
            return Err(Error::ValueUnchanged);
        }
        if status.complete {
            env.storage()
                .persistent()
                .set(&DataKey::MinimumBalance, &amount);
            env.events()
                .publish((EVENT_MIN_BALANCE_CHANGED,), (previous, amount));
        }
        Ok(status)
    }

    /// Set the claim cooldown, between one hour and one day.
    pub fn set_waiting_period(
        env: Env,
        caller: Address,
        seconds: u64,
    ) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(&env, &caller, symbol_short!("set_wait"), (seconds,))?;
        if !(MIN_WAITING_PERIOD..=MAX_WAITING_PERIOD).contains(&seconds) {
            return Err(Error::ValueInvalid);
        }
        let previous = Self::waiting_period(env.clone());
        if seconds == previous {
            return Err(Error::ValueUnchanged);
        }
        if status.complete {
            env.storage()
                .persistent()
                .set(&DataKey::WaitingPeriod, &seconds);
            env.events()
                .publish((EVENT_WAITING_PERIOD_CHANGED,), (previous, seconds));
        }
        Ok(status)
    }

    /// With staking on, `process_claims` leaves income in the ledger and
    /// holders collect it with `withdraw_funds`.
    pub fn set_staking(env: Env, caller: Address, on: bool) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(&env, &caller, symbol_short!("staking"), (on,))?;
        if on == Self::is_staking(env.clone()) {
            return Err(Error::ValueUnchanged);
        }
        if status.complete {
            env.storage().persistent().set(&DataKey::Staking, &on);
            env.events().publish((EVENT_STAKING,), on);
        }
        Ok(status)
    }

    /// Exclude `account` from distribution (e.g. pools, the token itself).
    /// Excluding drops it from the tracked array immediately.
    pub fn set_excluded(
        env: Env,
        caller: Address,
        account: Address,
        excluded: bool,
    ) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(
            &env,
            &caller,
            symbol_short!("excluded"),
            (account.clone(), excluded),
        )?;
        if excluded == Self::is_excluded(env.clone(), account.clone()) {
            return Err(Error::ValueUnchanged);
        }
        if status.complete {
            let key = DataKey::Excluded(account.clone());
            if excluded {
                env.storage().persistent().set(&key, &true);
                Self::set_balance(&env, &account, 0)?;
            } else {
                env.storage().persistent().remove(&key);
            }
            env.events().publish((EVENT_EXCLUDED, account), excluded);
        }
        Ok(status)
    }

    /// Set the swap router used to pay holders in slot tokens.
    pub fn set_router(
        env: Env,
        caller: Address,
        router: Address,
    ) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(&env, &caller, symbol_short!("router"), (router.clone(),))?;
        let current: Option<Address> = env.storage().persistent().get(&DataKey::Router);
        if current.as_ref() == Some(&router) {
            return Err(Error::ValueUnchanged);
        }
        if status.complete {
            env.storage().persistent().set(&DataKey::Router, &router);
            env.events().publish((EVENT_ROUTER,), router);
        }
        Ok(status)
    }

    // ── Reward token registry ─────────────────────────────────

    /// Register an external reward token. The address must answer `name()`.
    pub fn add_token(
        env: Env,
        caller: Address,
        token: Address,
    ) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(&env, &caller, symbol_short!("add_tok"), (token.clone(),))?;
        if Self::get_token(env.clone(), token.clone()).index > 0 {
            return Err(Error::ValueUnchanged);
        }
        let name = match token::Client::new(&env, &token).try_name() {
            Ok(Ok(name)) => name,
            _ => return Err(Error::ValueInvalid),
        };
        if status.complete {
            let count = Self::tokens(env.clone()) + 1;
            let entry = TokenEntry {
                token: token.clone(),
                index: count,
                added: env.ledger().timestamp(),
            };
            let storage = env.storage().persistent();
            storage.set(&DataKey::TokenEntry(token.clone()), &entry);
            storage.set(&DataKey::TokenAt(count), &token);
            storage.set(&DataKey::TokenCount, &count);
            env.events().publish((EVENT_TOKEN_ADDED, token), name);
        }
        Ok(status)
    }

    /// Unregister a token. A token still bound to a slot cannot be deleted.
    pub fn delete_token(
        env: Env,
        caller: Address,
        token: Address,
    ) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(&env, &caller, symbol_short!("del_tok"), (token.clone(),))?;
        let entry = Self::get_token(env.clone(), token.clone());
        if entry.index == 0 {
            return Err(Error::ValueInvalid);
        }
        for slot in 1..=Self::slots(env.clone()) {
            if Self::token_in_slot(env.clone(), slot)? == token {
                return Err(Error::ValueInvalid);
            }
        }
        if status.complete {
            let storage = env.storage().persistent();
            let count = Self::tokens(env.clone());
            if entry.index != count {
                let last: Address = storage
                    .get(&DataKey::TokenAt(count))
                    .ok_or(Error::ValueInvalid)?;
                let mut moved = Self::get_token(env.clone(), last.clone());
                moved.index = entry.index;
                storage.set(&DataKey::TokenEntry(last.clone()), &moved);
                storage.set(&DataKey::TokenAt(entry.index), &last);
            }
            storage.remove(&DataKey::TokenAt(count));
            storage.remove(&DataKey::TokenEntry(token.clone()));
            storage.set(&DataKey::TokenCount, &(count - 1));
            let name = token::Client::new(&env, &token).name();
            env.events().publish((EVENT_TOKEN_DELETED, token), name);
        }
        Ok(status)
    }

    pub fn tokens(env: Env) -> u32 {
        env.storage()
            .persistent()
            .get(&DataKey::TokenCount)
            .unwrap_or(0)
    }

    pub fn token_at(env: Env, index: u32) -> Result<Address, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::TokenAt(index))
            .ok_or(Error::ValueInvalid)
    }

    /// Registry entry for `token`; index and added are 0 when unregistered.
    pub fn get_token(env: Env, token: Address) -> TokenEntry {
        env.storage()
            .persistent()
            .get(&DataKey::TokenEntry(token.clone()))
            .unwrap_or(TokenEntry {
                token,
                index: 0,
                added: 0,
            })
    }

    // ── Slots ─────────────────────────────────────────────────

    /// Bind a registered token to a slot. Slot 0 fills the next free slot;
    /// 1..=slots() replaces that slot and resets its counters.
    pub fn set_slot(
        env: Env,
        caller: Address,
        slot: u32,
        token: Address,
    ) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(
            &env,
            &caller,
            symbol_short!("set_slot"),
            (slot, token.clone()),
        )?;
        if Self::get_token(env.clone(), token.clone()).index == 0 {
            return Err(Error::ValueInvalid);
        }
        let count = Self::slots(env.clone());
        if slot == 0 && count >= MAX_SLOTS {
            return Err(Error::SlotsFull);
        }
        if slot > count {
            return Err(Error::ValueInvalid);
        }
        if status.complete {
            let storage = env.storage().persistent();
            let index = if slot == 0 { count + 1 } else { slot };
            let fresh = Slot {
                token: token.clone(),
                claims: 0,
                amount: 0,
                balance: 0,
            };
            storage.set(&DataKey::SlotAt(index), &fresh);
            if slot == 0 {
                storage.set(&DataKey::SlotCount, &index);
                if Self::current_slot(env.clone()) == 0 {
                    storage.set(&DataKey::CurrentSlot, &1u32);
                    storage.set(&DataKey::SlotStarted, &env.ledger().timestamp());
                }
            }
            let name = token::Client::new(&env, &token).name();
            env.events()
                .publish((EVENT_SLOT_SET, index), (token, name));
        }
        Ok(status)
    }

    /// Remove a slot; later slots shift down to keep the range dense.
    pub fn delete_slot(env: Env, caller: Address, slot: u32) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(&env, &caller, symbol_short!("del_slot"), (slot,))?;
        let count = Self::slots(env.clone());
        if slot == 0 || slot > count {
            return Err(Error::ValueInvalid);
        }
        if status.complete {
            let storage = env.storage().persistent();
            for index in slot..count {
                let next: Slot = storage
                    .get(&DataKey::SlotAt(index + 1))
                    .ok_or(Error::ValueInvalid)?;
                storage.set(&DataKey::SlotAt(index), &next);
            }
            storage.remove(&DataKey::SlotAt(count));
            let remaining = count - 1;
            storage.set(&DataKey::SlotCount, &remaining);

            let current = Self::current_slot(env.clone());
            let adjusted = if remaining == 0 {
                0
            } else if current > slot {
                current - 1
            } else if current > remaining {
                1
            } else {
                current
            };
            if adjusted != current {
                storage.set(&DataKey::CurrentSlot, &adjusted);
                storage.set(&DataKey::SlotStarted, &env.ledger().timestamp());
            }
            env.events().publish((EVENT_SLOT_DELETED,), slot);
        }
        Ok(status)
    }

    /// Make `slot` the active payout slot, restarting its rotation window.
    pub fn set_current_slot(
        env: Env,
        caller: Address,
        slot: u32,
    ) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(&env, &caller, symbol_short!("cur_slot"), (slot,))?;
        if slot == 0 || slot > Self::slots(env.clone()) {
            return Err(Error::ValueInvalid);
        }
        if slot == Self::current_slot(env.clone()) {
            return Err(Error::ValueUnchanged);
        }
        if status.complete {
            env.storage().persistent().set(&DataKey::CurrentSlot, &slot);
            env.storage()
                .persistent()
                .set(&DataKey::SlotStarted, &env.ledger().timestamp());
            env.events().publish((EVENT_SLOT_CURRENT,), slot);
        }
        Ok(status)
    }

    /// Advance the active slot once its rotation window has passed.
    /// Returns the slot active for a payout at `now`, if any.
    fn rotate_slot(env: &Env, now: u64) -> Option<u32> {
        let count = Self::slots(env.clone());
        if count == 0 {
            return None;
        }
        let storage = env.storage().persistent();
        let current = Self::current_slot(env.clone());
        let started: u64 = storage.get(&DataKey::SlotStarted).unwrap_or(0);
        if current == 0 || current > count {
            storage.set(&DataKey::CurrentSlot, &1u32);
            storage.set(&DataKey::SlotStarted, &now);
            return Some(1);
        }
        if now >= started.saturating_add(SLOT_ROTATION_SECS) {
            let next = current % count + 1;
            storage.set(&DataKey::CurrentSlot, &next);
            storage.set(&DataKey::SlotStarted, &now);
            return Some(next);
        }
        Some(current)
    }

    pub fn slots(env: Env) -> u32 {
        env.storage()
            .persistent()
            .get(&DataKey::SlotCount)
            .unwrap_or(0)
    }

    pub fn current_slot(env: Env) -> u32 {
        env.storage()
            .persistent()
            .get(&DataKey::CurrentSlot)
            .unwrap_or(0)
    }

    pub fn token_in_slot(env: Env, slot: u32) -> Result<Address, Error> {
        env.storage()
            .persistent()
            .get::<DataKey, Slot>(&DataKey::SlotAt(slot))
            .map(|s| s.token)
            .ok_or(Error::ValueInvalid)
    }

    /// Counters for `slot`; 0 reports the active slot.
    pub fn get_report_token_in_slot(env: Env, slot: u32) -> Result<SlotReport, Error> {
        let index = if slot == 0 {
            Self::current_slot(env.clone())
        } else {
            slot
        };
        let entry: Slot = env
            .storage()
            .persistent()
            .get(&DataKey::SlotAt(index))
            .ok_or(Error::ValueInvalid)?;
        let client = token::Client::new(&env, &entry.token);
        Ok(SlotReport {
            slot: index,
            token: entry.token.clone(),
            name: client.name(),
            symbol: client.symbol(),
            claims: entry.claims,
            amount: entry.amount,
            balance: entry.balance,
        })
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn minimum_balance(env: Env) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::MinimumBalance)
            .unwrap_or(DEFAULT_MINIMUM_BALANCE)
    }

    pub fn waiting_period(env: Env) -> u64 {
        env.storage()
            .persistent()
            .get(&DataKey::WaitingPeriod)
            .unwrap_or(DEFAULT_WAITING_PERIOD)
    }

    pub fn is_staking(env: Env) -> bool {
        env.storage()
            .persistent()
            .get(&DataKey::Staking)
            .unwrap_or(false)
    }

    pub fn is_excluded(env: Env, account: Address) -> bool {
        env.storage()
            .persistent()
            .get(&DataKey::Excluded(account))
            .unwrap_or(false)
    }

    pub fn holders(env: Env) -> u32 {
        env.storage()
            .persistent()
            .get(&DataKey::HolderCount)
            .unwrap_or(0)
    }

    pub fn holder_at(env: Env, index: u32) -> Result<Address, Error> {
        Self::holder_address(&env, index)
    }

    pub fn current_holder(env: Env) -> u32 {
        env.storage()
            .persistent()
            .get(&DataKey::CurrentHolder)
            .unwrap_or(0)
    }

    /// Tracked balance of `account`; 0 when below the minimum or excluded.
    pub fn balance_of(env: Env, account: Address) -> i128 {
        Self::holder(&env, &account).map_or(0, |h| h.balance)
    }

    pub fn total_tracked(env: Env) -> i128 {
        Self::totals(&env).total_tracked
    }

    pub fn withdrawable(env: Env, account: Address) -> Result<i128, Error> {
        match Self::holder(&env, &account) {
            Some(holder) => {
                Ok(Self::accumulated(&env, &Self::totals(&env), &holder)? - holder.withdrawn)
            }
            None => Ok(0),
        }
    }

    pub fn get_report(env: Env) -> RewardReport {
        let totals = Self::totals(&env);
        RewardReport {
            holder_count: Self::holders(env.clone()),
            staking_on: Self::is_staking(env.clone()),
            total_tokens_tracked: totals.total_tracked,
            total_tokens_staked: totals.total_tracked,
            total_received: totals.total_received,
            total_paid: totals.total_paid,
            required_balance: Self::minimum_balance(env.clone()),
            wait_period_seconds: Self::waiting_period(env.clone()),
            current_holder: Self::current_holder(env),
        }
    }

    pub fn get_report_account(env: Env, account: Address) -> Result<AccountReport, Error> {
        let holder = Self::tracked_holder(&env, &account)?;
        let totals = Self::totals(&env);
        let earned = Self::accumulated(&env, &totals, &holder)?;
        let claim_hours = holder
            .last_claim
            .map_or(0, |last| env.ledger().timestamp().saturating_sub(last) / 3600);
        Ok(AccountReport {
            account,
            index: holder.index,
            balance: holder.balance,
            staked_percent: 100,
            staked_tokens: holder.balance,
            rewards_earned: earned,
            rewards_claimed: holder.withdrawn,
            withdrawable: earned - holder.withdrawn,
            claim_hours,
        })
    }

    pub fn get_report_account_at(env: Env, index: u32) -> Result<AccountReport, Error> {
        let account = Self::holder_address(&env, index)?;
        Self::get_report_account(env, account)
    }
}

mod test_slots;
