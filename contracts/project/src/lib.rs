#![no_std]
#![deny(unsafe_code)]
#![deny(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
use governance::{
    admins, per_share, registry, ConfirmationStatus, Error, Fingerprint, PendingCall,
    REQUIRED_ROUTINE,
};
use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, token, Address, BytesN, Env, IntoVal,
    Symbol, Val, Vec, I256,
};

// ── Event symbols ────────────────────────────────────────────
const EVENT_INIT: Symbol = symbol_short!("init");
const EVENT_HOLDERS: Symbol = symbol_short!("holders");
const EVENT_GOVERNOR_SET: Symbol = symbol_short!("gov_set");
const EVENT_FUNDS_RECEIVED: Symbol = symbol_short!("fund_recv");
const EVENT_FUNDS_WITHDRAWN: Symbol = symbol_short!("fund_wdrw");
const EVENT_FUNDS_APPROVED: Symbol = symbol_short!("fund_appr");
const EVENT_TOKEN_SET: Symbol = symbol_short!("tok_set");
const EVENT_MIN_BALANCE_CHANGED: Symbol = symbol_short!("min_chg");

/// Basis-point denominator for `dividend_bps`.
pub const BPS_DENOMINATOR: i128 = 10_000;

// ── Data structures ──────────────────────────────────────────

/// A project backer. `shares` never change after `set_holders`; `weight`
/// is what currently earns, and drops to 0 while the backer does not hold
/// the token's minimum balance.
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct Shareholder {
    pub index: u32,
    pub shares: i128,
    pub weight: i128,
    pub correction: I256,
    pub withdrawn: i128,
}

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectTotals {
    pub total_shares: i128,
    pub total_weight: i128,
    pub total_received: i128,
    /// Dividends carved out of income so far; never exceeds the payback cap.
    pub total_dividends: i128,
    pub total_withdrawn: i128,
    /// Dividends received while no weight was active.
    pub undistributed: i128,
    /// Dividend per unit of weight, scaled by 2^64.
    pub magnified_per_share: I256,
}

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectReport {
    pub holder_count: u32,
    pub total_shares: i128,
    pub total_active_shares: i128,
    pub payback_cap: i128,
    pub total_received: i128,
    pub total_dividends: i128,
    pub total_withdrawn: i128,
    /// Asset balance not owed to shareholders.
    pub treasury: i128,
}

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct ShareholderReport {
    pub account: Address,
    pub index: u32,
    pub shares: i128,
    pub active_shares: i128,
    pub dividends_earned: i128,
    pub dividends_claimed: i128,
    pub withdrawable: i128,
}

#[contracttype]
pub enum DataKey {
    Owner,
    Governor,
    RewardAsset,
    Token,
    PaybackRate,
    DividendBps,
    MinimumBalance,
    Totals,
    Shareholder(Address),
    HolderAt(u32),
    HolderCount,
}

// ── Contract ─────────────────────────────────────────────────
#[contract]
pub struct ProjectLedger;

#[contractimpl]
impl ProjectLedger {
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

    fn totals(env: &Env) -> ProjectTotals {
        env.storage()
            .persistent()
            .get(&DataKey::Totals)
            .unwrap_or(ProjectTotals {
                total_shares: 0,
                total_weight: 0,
                total_received: 0,
                total_dividends: 0,
                total_withdrawn: 0,
                undistributed: 0,
                magnified_per_share: per_share::zero(env),
            })
    }

    fn shareholder(env: &Env, account: &Address) -> Result<Shareholder, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::Shareholder(account.clone()))
            .ok_or(Error::ValueInvalid)
    }

    fn accumulated(
        env: &Env,
        totals: &ProjectTotals,
        holder: &Shareholder,
    ) -> Result<i128, Error> {
        per_share::accumulated(
            env,
            &totals.magnified_per_share,
            holder.weight,
            &holder.correction,
        )
    }

    /// Admin gate. Uses this contract's admins once assigned; before that a
    /// governor's admins confirm, or failing that the owner acts alone.
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
        if !admins::is_set(env) {
            if let Some(governor) = Self::get_governor(env.clone()) {
                return registry::confirm_with_governor(
                    env,
                    &governor,
                    REQUIRED_ROUTINE,
                    caller,
                    fingerprint,
                );
            }
        }
        let owner = Self::get_owner(env)?;
        registry::confirm(env, &owner, REQUIRED_ROUTINE, caller, fingerprint)
    }

    /// Move `holder`'s earning weight, keeping its earned income intact.
    fn set_weight(
        env: &Env,
        totals: &mut ProjectTotals,
        holder: &mut Shareholder,
        weight: i128,
    ) {
        let delta = weight - holder.weight;
        holder.correction =
            per_share::adjust(env, &holder.correction, &totals.magnified_per_share, delta);
        holder.weight = weight;
        totals.total_weight += delta;
    }

    // ── Initialization ────────────────────────────────────────

    /// `payback_rate` is reward-asset units owed per share; `dividend_bps`
    /// is the share of income paid out as dividends; `minimum_balance` is
    /// the token balance a backer must hold to earn once a token is set.
    pub fn initialize(
        env: Env,
        owner: Address,
        reward_asset: Address,
        payback_rate: i128,
        dividend_bps: u32,
        minimum_balance: i128,
    ) -> Result<(), Error> {
        if env.storage().persistent().has(&DataKey::Owner) {
            return Err(Error::AlreadySet);
        }
        if payback_rate <= 0
            || dividend_bps == 0
            || i128::from(dividend_bps) > BPS_DENOMINATOR
            || minimum_balance < 0
        {
            return Err(Error::ValueInvalid);
        }
        let storage = env.storage().persistent();
        storage.set(&DataKey::Owner, &owner);
        storage.set(&DataKey::RewardAsset, &reward_asset);
        storage.set(&DataKey::PaybackRate, &payback_rate);
        storage.set(&DataKey::DividendBps, &dividend_bps);
        storage.set(&DataKey::MinimumBalance, &minimum_balance);
        env.events().publish((EVENT_INIT, owner), reward_asset);
        Ok(())
    }

    /// Register backers and their shares. Owner only, once.
    pub fn set_holders(env: Env, accounts: Vec<Address>, shares: Vec<i128>) -> Result<(), Error> {
        let owner = Self::get_owner(&env)?;
        owner.require_auth();
        if Self::holders(env.clone()) > 0 {
            return Err(Error::AlreadySet);
        }
        if accounts.is_empty() || accounts.len() != shares.len() {
            return Err(Error::ValueInvalid);
        }

        let earning = Self::token(env.clone()).is_none();
        let mut totals = Self::totals(&env);
        let storage = env.storage().persistent();
        for (i, account) in accounts.iter().enumerate() {
            let amount = shares.get(i as u32).ok_or(Error::ValueInvalid)?;
            let key = DataKey::Shareholder(account.clone());
            if amount <= 0 || storage.has(&key) {
                return Err(Error::ValueInvalid);
            }
            let index = i as u32 + 1;
            let weight = if earning { amount } else { 0 };
            storage.set(
                &key,
                &Shareholder {
                    index,
                    shares: amount,
                    weight,
                    correction: per_share::zero(&env),
                    withdrawn: 0,
                },
            );
            storage.set(&DataKey::HolderAt(index), &account);
            totals.total_shares += amount;
            totals.total_weight += weight;
        }
        storage.set(&DataKey::HolderCount, &accounts.len());
        storage.set(&DataKey::Totals, &totals);
        env.events()
            .publish((EVENT_HOLDERS,), (accounts.len(), totals.total_shares));
        Ok(())
    }

    /// Hand fallback governance to the token. Owner only, once.
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

    // ── Admins ────────────────────────────────────────────────

    /// First call by the owner assigns the admins. Afterwards an admin may
    /// propose a full replacement, applied once two admins agree; anyone
    /// else is told the admins are already set.
    pub fn set_admins(
        env: Env,
        caller: Address,
        new_admins: Vec<Address>,
    ) -> Result<ConfirmationStatus, Error> {
        if !admins::is_set(&env) {
            caller.require_auth();
            if caller != Self::get_owner(&env)? {
                return Err(Error::CallerInvalid);
            }
            admins::assign(&env, new_admins)?;
            return Ok(ConfirmationStatus::complete(1, 1));
        }
        if !admins::is_admin(&env, &caller) {
            return Err(Error::AlreadySet);
        }
        let status = Self::confirm(
            &env,
            &caller,
            symbol_short!("set_adm"),
            (new_admins.clone(),),
        )?;
        admins::validate(&new_admins)?;
        if status.complete {
            admins::reassign(&env, new_admins)?;
        }
        Ok(status)
    }

    pub fn replace_admin(
        env: Env,
        caller: Address,
        from: Address,
        to: Address,
    ) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(
            &env,
            &caller,
            symbol_short!("repl_adm"),
            (from.clone(), to.clone()),
        )?;
        admins::check_replace(&env, &from, &to)?;
        if status.complete {
            admins::replace(&env, &from, &to)?;
        }
        Ok(status)
    }

    pub fn get_admins(env: Env) -> Vec<Address> {
        admins::get(&env)
    }

    pub fn is_admin(env: Env, account: Address) -> bool {
        admins::is_admin(&env, &account)
    }

    pub fn pending_call(env: Env) -> Option<PendingCall> {
        registry::get_pending(&env)
    }

    /// Confirm an arbitrary guarded call against this ledger's own admins.
    ///
    /// `caller` is the owner or an admin; `signer` is the admin whose
    /// confirmation is recorded. Never delegated to the governor.
    pub fn confirm_call(
        env: Env,
        caller: Address,
        required: u32,
        signer: Address,
        selector: Symbol,
        args_hash: BytesN<32>,
    ) -> Result<ConfirmationStatus, Error> {
        caller.require_auth();
        if signer != caller {
            signer.require_auth();
        }
        let owner = Self::get_owner(&env)?;
        if caller != owner && !admins::is_admin(&env, &caller) {
            return Err(Error::CallerInvalid);
        }
        registry::confirm(
            &env,
            &owner,
            required,
            &signer,
            Fingerprint::new(selector, args_hash),
        )
    }

    // ── Token gate ────────────────────────────────────────────

    /// Point the ledger at the project token. The first assignment is made
    /// directly by the owner or any admin; later changes need two admins.
    /// Every backer stops earning until its next withdrawal re-checks its
    /// token balance.
    pub fn set_token(
        env: Env,
        caller: Address,
        token: Address,
    ) -> Result<ConfirmationStatus, Error> {
        let current = Self::token(env.clone());
        let status = match current {
            None => {
                caller.require_auth();
                if caller != Self::get_owner(&env)? && !admins::is_admin(&env, &caller) {
                    return Err(Error::CallerInvalid);
                }
                ConfirmationStatus::complete(1, 1)
            }
            Some(_) => Self::confirm(&env, &caller, symbol_short!("set_tok"), (token.clone(),))?,
        };
        // Re-confirming the current token settles the call without touching weights.
        if status.complete && current.as_ref() != Some(&token) {
            let storage = env.storage().persistent();
            storage.set(&DataKey::Token, &token);
            let mut totals = Self::totals(&env);
            for index in 1..=Self::holders(env.clone()) {
                let account: Address = storage
                    .get(&DataKey::HolderAt(index))
                    .ok_or(Error::ValueInvalid)?;
                let mut holder = Self::shareholder(&env, &account)?;
                Self::set_weight(&env, &mut totals, &mut holder, 0);
                storage.set(&DataKey::Shareholder(account), &holder);
            }
            storage.set(&DataKey::Totals, &totals);
            env.events().publish((EVENT_TOKEN_SET, caller), token);
        }
        Ok(status)
    }

    pub fn token(env: Env) -> Option<Address> {
        env.storage().persistent().get(&DataKey::Token)
    }

    pub fn set_minimum_balance(
        env: Env,
        caller: Address,
        amount: i128,
    ) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(&env, &caller, symbol_short!("set_min"), (amount,))?;
        if amount < 0 {
            return Err(Error::ValueInvalid);
        }
        let previous = Self::minimum_balance(env.clone());
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

    pub fn minimum_balance(env: Env) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::MinimumBalance)
            .unwrap_or(0)
    }

    // ── Income and payouts ────────────────────────────────────

    /// Pay income in. `dividend_bps` of it becomes dividends until the
    /// payback cap is reached; the rest stays in the treasury.
    pub fn deposit(env: Env, from: Address, amount: i128) -> Result<(), Error> {
        from.require_auth();
        if amount <= 0 {
            return Err(Error::ValueInvalid);
        }
        let asset = Self::reward_asset(&env)?;
        token::Client::new(&env, &asset).transfer(&from, &env.current_contract_address(), &amount);

        let bps: u32 = env
            .storage()
            .persistent()
            .get(&DataKey::DividendBps)
            .unwrap_or(0);
        let mut totals = Self::totals(&env);
        let remaining = (Self::payback_cap(env.clone()) - totals.total_dividends).max(0);
        let dividend = (amount * i128::from(bps) / BPS_DENOMINATOR).min(remaining);

        totals.total_received += amount;
        totals.total_dividends += dividend;
        let pool = dividend + totals.undistributed;
        if totals.total_weight > 0 {
            totals.magnified_per_share = per_share::distribute(
                &env,
                &totals.magnified_per_share,
                pool,
                totals.total_weight,
            );
            totals.undistributed = 0;
        } else {
            totals.undistributed = pool;
        }
        env.storage().persistent().set(&DataKey::Totals, &totals);

        env.events().publish((EVENT_FUNDS_RECEIVED, from), amount);
        Ok(())
    }

    /// Re-check `account` against the token gate, then pay what it is owed.
    pub fn withdraw_funds(env: Env, account: Address) -> Result<i128, Error> {
        let mut holder = Self::shareholder(&env, &account)?;
        let mut totals = Self::totals(&env);

        let weight = match Self::token(env.clone()) {
            Some(token) => {
                let held = token::Client::new(&env, &token).balance(&account);
                if held >= Self::minimum_balance(env.clone()) {
                    holder.shares
                } else {
                    0
                }
            }
            None => holder.shares,
        };
        Self::set_weight(&env, &mut totals, &mut holder, weight);

        let amount = Self::accumulated(&env, &totals, &holder)? - holder.withdrawn;
        if amount > 0 {
            holder.withdrawn += amount;
            totals.total_withdrawn += amount;
        }
        env.storage()
            .persistent()
            .set(&DataKey::Shareholder(account.clone()), &holder);
        env.storage().persistent().set(&DataKey::Totals, &totals);

        if amount > 0 {
            let asset = Self::reward_asset(&env)?;
            token::Client::new(&env, &asset).transfer(
                &env.current_contract_address(),
                &account,
                &amount,
            );
            env.events()
                .publish((EVENT_FUNDS_WITHDRAWN, account), amount);
        }
        Ok(amount.max(0))
    }

    /// Pay `amount` from the treasury to `to` once two admins agree.
    pub fn request_funds(
        env: Env,
        caller: Address,
        to: Address,
        amount: i128,
    ) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(
            &env,
            &caller,
            symbol_short!("req_fund"),
            (to.clone(), amount),
        )?;
        if amount <= 0 {
            return Err(Error::ValueInvalid);
        }
        if amount > Self::treasury(env.clone())? {
            return Err(Error::InsufficientResources);
        }
        if status.complete {
            let asset = Self::reward_asset(&env)?;
            token::Client::new(&env, &asset).transfer(
                &env.current_contract_address(),
                &to,
                &amount,
            );
            env.events().publish((EVENT_FUNDS_APPROVED, to), amount);
        }
        Ok(status)
    }

    // ── Queries ───────────────────────────────────────────────

    /// Total dividends backers can ever receive.
    pub fn payback_cap(env: Env) -> i128 {
        let rate: i128 = env
            .storage()
            .persistent()
            .get(&DataKey::PaybackRate)
            .unwrap_or(0);
        Self::totals(&env).total_shares * rate
    }

    /// Reward asset held beyond what is owed to backers.
    pub fn treasury(env: Env) -> Result<i128, Error> {
        let asset = Self::reward_asset(&env)?;
        let held = token::Client::new(&env, &asset).balance(&env.current_contract_address());
        let totals = Self::totals(&env);
        Ok(held - (totals.total_dividends - totals.total_withdrawn))
    }

    pub fn holders(env: Env) -> u32 {
        env.storage()
            .persistent()
            .get(&DataKey::HolderCount)
            .unwrap_or(0)
    }

    pub fn holder_at(env: Env, index: u32) -> Result<Address, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::HolderAt(index))
            .ok_or(Error::ValueInvalid)
    }

    /// Registered shares of `account`; 0 for non-backers.
    pub fn balance_of(env: Env, account: Address) -> i128 {
        Self::shareholder(&env, &account).map_or(0, |h| h.shares)
    }

    pub fn withdrawable(env: Env, account: Address) -> Result<i128, Error> {
        match Self::shareholder(&env, &account) {
            Ok(holder) => {
                Ok(Self::accumulated(&env, &Self::totals(&env), &holder)? - holder.withdrawn)
            }
            Err(_) => Ok(0),
        }
    }

    pub fn get_report(env: Env) -> Result<ProjectReport, Error> {
        let totals = Self::totals(&env);
        Ok(ProjectReport {
            holder_count: Self::holders(env.clone()),
            total_shares: totals.total_shares,
            total_active_shares: totals.total_weight,
            payback_cap: Self::payback_cap(env.clone()),
            total_received: totals.total_received,
            total_dividends: totals.total_dividends,
            total_withdrawn: totals.total_withdrawn,
            treasury: Self::treasury(env)?,
        })
    }

    pub fn get_report_account(env: Env, account: Address) -> Result<ShareholderReport, Error> {
        let holder = Self::shareholder(&env, &account)?;
        let earned = Self::accumulated(&env, &Self::totals(&env), &holder)?;
        Ok(ShareholderReport {
            account,
            index: holder.index,
            shares: holder.shares,
            active_shares: holder.weight,
            dividends_earned: earned,
            dividends_claimed: holder.withdrawn,
            withdrawable: earned - holder.withdrawn,
        })
    }

    pub fn get_report_account_at(env: Env, index: u32) -> Result<ShareholderReport, Error> {
        let account = Self::holder_at(env.clone(), index)?;
        Self::get_report_account(env, account)
    }
}

mod test;
