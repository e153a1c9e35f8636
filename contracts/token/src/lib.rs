#![no_std]
#![deny(unsafe_code)]
#![deny(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
use governance::{
    admins,
    interfaces::{OwnedLedgerClient, TrackerClient},
    registry, ConfirmationStatus, Error, Fingerprint, PendingCall, REQUIRED_CRITICAL,
    REQUIRED_ROUTINE,
};
use soroban_sdk::{
    contract, contractimpl, contracttype, log, symbol_short, token, Address, BytesN, Env,
    IntoVal, String, Symbol, Val, Vec,
};

// ── Event symbols ────────────────────────────────────────────
const EVENT_INIT: Symbol = symbol_short!("init");
const EVENT_TRANSFER: Symbol = symbol_short!("transfer");
const EVENT_FUNDS_RECEIVED: Symbol = symbol_short!("fund_recv");
const EVENT_FEELESS: Symbol = symbol_short!("feeless");
const EVENT_PRESALE: Symbol = symbol_short!("presale");
const EVENT_GAS_LIMIT: Symbol = symbol_short!("gas_lim");
const EVENT_AMM_PAIR: Symbol = symbol_short!("amm_pair");
const EVENT_PROJECT_CHANGED: Symbol = symbol_short!("proj_chg");
const EVENT_REWARDS_CHANGED: Symbol = symbol_short!("rwd_chg");
const EVENT_OPEN: Symbol = symbol_short!("open");

// ── Supply and launch limits ─────────────────────────────────
pub const TOKEN_DECIMALS: u32 = 7;
pub const TOKEN_UNIT: i128 = 10_000_000;
/// Minted to the owner at initialization.
pub const TOTAL_SUPPLY: i128 = 1_000_000_000 * TOKEN_UNIT;
/// Largest balance a wallet may receive before the token opens to the public.
pub const MAX_WALLET: i128 = 15_000_000 * TOKEN_UNIT;

pub const DEFAULT_GAS_LIMIT: u64 = 300_000;
pub const MIN_GAS_LIMIT: u64 = 250_000;
pub const MAX_GAS_LIMIT: u64 = 750_000;

#[contracttype]
pub enum DataKey {
    Owner,
    TokenName,
    TokenSymbol,
    PairAsset,
    TotalSupply,
    Balance(Address),
    Feeless(Address),
    Presale(Address),
    AmmPair(Address),
    GasLimit,
    Open,
    Rewards,
    Project,
}

// ── Contract ─────────────────────────────────────────────────
#[contract]
pub struct GovernedToken;

#[contractimpl]
impl GovernedToken {
    fn get_owner(env: &Env) -> Result<Address, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::Owner)
            .ok_or(Error::NotInitialized)
    }

    fn flag(env: &Env, key: &DataKey) -> bool {
        env.storage().persistent().get(key).unwrap_or(false)
    }

    fn set_balance(env: &Env, account: &Address, amount: i128) {
        env.storage()
            .persistent()
            .set(&DataKey::Balance(account.clone()), &amount);
    }

    /// Admin gate for the token's own settings.
    fn confirm<A>(
        env: &Env,
        caller: &Address,
        required: u32,
        selector: Symbol,
        args: A,
    ) -> Result<ConfirmationStatus, Error>
    where
        A: IntoVal<Env, Val>,
    {
        caller.require_auth();
        let owner = Self::get_owner(env)?;
        let fingerprint = Fingerprint::of(env, selector, args);
        registry::confirm(env, &owner, required, caller, fingerprint)
    }

    /// Accounts whose balances the reward ledger never sees.
    fn untracked(env: &Env, account: &Address) -> Result<bool, Error> {
        Ok(*account == env.current_contract_address()
            || *account == Self::get_owner(env)?
            || Self::flag(env, &DataKey::AmmPair(account.clone())))
    }

    /// A ledger may only be attached once it names this token as its governor.
    fn check_ownership(env: &Env, ledger: &Address) -> Result<(), Error> {
        let this = env.current_contract_address();
        match OwnedLedgerClient::new(env, ledger).try_get_governor() {
            Ok(Ok(Some(governor))) if governor == this => Ok(()),
            _ => Err(Error::ValueInvalid),
        }
    }

    // ── Initialization ────────────────────────────────────────

    /// Mint the whole supply to `owner`. `pair_asset` is the asset liquidity
    /// is paired with; the contract must hold some before launch.
    pub fn initialize(
        env: Env,
        owner: Address,
        name: String,
        symbol: String,
        pair_asset: Address,
    ) -> Result<(), Error> {
        if env.storage().persistent().has(&DataKey::Owner) {
            return Err(Error::AlreadySet);
        }
        let storage = env.storage().persistent();
        storage.set(&DataKey::Owner, &owner);
        storage.set(&DataKey::TokenName, &name);
        storage.set(&DataKey::TokenSymbol, &symbol);
        storage.set(&DataKey::PairAsset, &pair_asset);
        storage.set(&DataKey::TotalSupply, &TOTAL_SUPPLY);
        storage.set(&DataKey::GasLimit, &DEFAULT_GAS_LIMIT);
        storage.set(&DataKey::Open, &false);
        storage.set(&DataKey::Presale(owner.clone()), &true);
        storage.set(&DataKey::Presale(env.current_contract_address()), &true);
        Self::set_balance(&env, &owner, TOTAL_SUPPLY);
        env.events().publish((EVENT_INIT, owner), TOTAL_SUPPLY);
        Ok(())
    }

    pub fn owner(env: Env) -> Result<Address, Error> {
        Self::get_owner(&env)
    }

    // ── Token ─────────────────────────────────────────────────

    /// Move `amount` from `from` to `to`.
    ///
    /// Before launch only presale wallets may send, and receivers other than
    /// market pairs and the token itself are capped at [`MAX_WALLET`]. New
    /// balances are reported to the reward ledger; once open, every transfer
    /// also drives one bounded round of claim processing.
    pub fn transfer(env: Env, from: Address, to: Address, amount: i128) -> Result<(), Error> {
        from.require_auth();
        if amount <= 0 {
            return Err(Error::ValueInvalid);
        }
        let open = Self::is_open_to_public(env.clone());
        if !open && !Self::is_presale(env.clone(), from.clone()) {
            return Err(Error::TradingClosed);
        }

        let from_balance = Self::balance(env.clone(), from.clone());
        if from_balance < amount {
            return Err(Error::InsufficientResources);
        }
        let to_balance = Self::balance(env.clone(), to.clone());
        let exempt = to == env.current_contract_address()
            || Self::is_automated_market_maker_pair(env.clone(), to.clone());
        if !open && !exempt && to_balance + amount > MAX_WALLET {
            return Err(Error::WalletOverLimit);
        }

        let from_after = from_balance - amount;
        Self::set_balance(&env, &from, from_after);
        let to_after = Self::balance(env.clone(), to.clone()) + amount;
        Self::set_balance(&env, &to, to_after);
        env.events()
            .publish((EVENT_TRANSFER, from.clone(), to.clone()), amount);

        if let Some(rewards) = Self::rewards(env.clone()) {
            let tracker = TrackerClient::new(&env, &rewards);
            if !Self::untracked(&env, &from)? {
                tracker.track_sell(&from, &from_after);
            }
            if !Self::untracked(&env, &to)? {
                tracker.track_buy(&to, &to_after);
            }
            if open {
                let gas = Self::gas_limit(env.clone());
                match tracker.try_process_claims(&gas) {
                    Ok(Ok(processed)) => {
                        log!(&env, "claims", processed.iterations, processed.claims)
                    }
                    _ => log!(&env, "claim processing failed", gas),
                }
            }
        }
        Ok(())
    }

    pub fn balance(env: Env, id: Address) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::Balance(id))
            .unwrap_or(0)
    }

    pub fn total_supply(env: Env) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::TotalSupply)
            .unwrap_or(0)
    }

    pub fn decimals(_env: Env) -> u32 {
        TOKEN_DECIMALS
    }

    pub fn name(env: Env) -> Result<String, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::TokenName)
            .ok_or(Error::NotInitialized)
    }

    pub fn symbol(env: Env) -> Result<String, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::TokenSymbol)
            .ok_or(Error::NotInitialized)
    }

    /// Anyone may send pair-asset funds to the token.
    pub fn deposit(env: Env, from: Address, amount: i128) -> Result<(), Error> {
        from.require_auth();
        if amount <= 0 {
            return Err(Error::ValueInvalid);
        }
        let asset: Address = env
            .storage()
            .persistent()
            .get(&DataKey::PairAsset)
            .ok_or(Error::NotInitialized)?;
        token::Client::new(&env, &asset).transfer(&from, &env.current_contract_address(), &amount);
        env.events().publish((EVENT_FUNDS_RECEIVED, from), amount);
        Ok(())
    }

    // ── Admins ────────────────────────────────────────────────

    /// Assign the three admins. Owner only, once.
    pub fn set_admins(env: Env, new_admins: Vec<Address>) -> Result<(), Error> {
        if admins::is_set(&env) {
            return Err(Error::AlreadySet);
        }
        Self::get_owner(&env)?.require_auth();
        admins::assign(&env, new_admins)
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
            REQUIRED_ROUTINE,
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

    /// Confirm a guarded call made on an owned ledger.
    ///
    /// `invoker` is the ledger (or the owner) asking; the token's admins
    /// confirm on its behalf. The invoker is folded into the fingerprint so
    /// equal calls on different ledgers never count toward each other.
    pub fn confirm_call(
        env: Env,
        invoker: Address,
        required: u32,
        signer: Address,
        selector: Symbol,
        args_hash: BytesN<32>,
    ) -> Result<ConfirmationStatus, Error> {
        invoker.require_auth();
        let owner = Self::get_owner(&env)?;
        let known = invoker == owner
            || Self::rewards(env.clone()).as_ref() == Some(&invoker)
            || Self::project(env.clone()).as_ref() == Some(&invoker);
        if !known {
            return Err(Error::CallerInvalid);
        }
        let fingerprint = Fingerprint::of(&env, selector, (invoker, args_hash));
        registry::confirm(&env, &owner, required, &signer, fingerprint)
    }

    // ── Governed settings ─────────────────────────────────────

    pub fn set_feeless(
        env: Env,
        caller: Address,
        account: Address,
        on: bool,
    ) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(
            &env,
            &caller,
            REQUIRED_ROUTINE,
            symbol_short!("feeless"),
            (account.clone(), on),
        )?;
        if Self::is_feeless(env.clone(), account.clone()) == on {
            return Err(Error::ValueUnchanged);
        }
        if status.complete {
            env.storage()
                .persistent()
                .set(&DataKey::Feeless(account.clone()), &on);
            env.events().publish((EVENT_FEELESS, account), on);
        }
        Ok(status)
    }

    pub fn set_presale(
        env: Env,
        caller: Address,
        account: Address,
        on: bool,
    ) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(
            &env,
            &caller,
            REQUIRED_ROUTINE,
            symbol_short!("presale"),
            (account.clone(), on),
        )?;
        if Self::is_presale(env.clone(), account.clone()) == on {
            return Err(Error::ValueUnchanged);
        }
        if status.complete {
            env.storage()
                .persistent()
                .set(&DataKey::Presale(account.clone()), &on);
            env.events().publish((EVENT_PRESALE, account), on);
        }
        Ok(status)
    }

    /// Work budget handed to the reward ledger on every transfer after launch.
    pub fn set_gas_limit(env: Env, caller: Address, gas: u64) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(
            &env,
            &caller,
            REQUIRED_ROUTINE,
            symbol_short!("gas_lim"),
            (gas,),
        )?;
        if !(MIN_GAS_LIMIT..=MAX_GAS_LIMIT).contains(&gas) {
            return Err(Error::ValueInvalid);
        }
        let previous = Self::gas_limit(env.clone());
        if gas == previous {
            return Err(Error::ValueUnchanged);
        }
        if status.complete {
            env.storage().persistent().set(&DataKey::GasLimit, &gas);
            env.events().publish((EVENT_GAS_LIMIT,), (previous, gas));
        }
        Ok(status)
    }

    pub fn set_automated_market_maker_pair(
        env: Env,
        caller: Address,
        pair: Address,
        on: bool,
    ) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(
            &env,
            &caller,
            REQUIRED_ROUTINE,
            symbol_short!("amm_pair"),
            (pair.clone(), on),
        )?;
        if Self::is_automated_market_maker_pair(env.clone(), pair.clone()) == on {
            return Err(Error::ValueUnchanged);
        }
        if status.complete {
            env.storage()
                .persistent()
                .set(&DataKey::AmmPair(pair.clone()), &on);
            env.events().publish((EVENT_AMM_PAIR, pair), on);
        }
        Ok(status)
    }

    /// Attach the project ledger. Needs every admin; the ledger must already
    /// name this token as its governor.
    pub fn set_project_contract(
        env: Env,
        caller: Address,
        project: Address,
    ) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(
            &env,
            &caller,
            REQUIRED_CRITICAL,
            symbol_short!("set_proj"),
            (project.clone(),),
        )?;
        let previous = Self::project(env.clone());
        if previous.as_ref() == Some(&project) {
            return Err(Error::ValueUnchanged);
        }
        Self::check_ownership(&env, &project)?;
        if status.complete {
            env.storage().persistent().set(&DataKey::Project, &project);
            env.events()
                .publish((EVENT_PROJECT_CHANGED,), (previous, project));
        }
        Ok(status)
    }

    /// Attach the reward ledger. Same rules as the project ledger.
    pub fn set_rewards_contract(
        env: Env,
        caller: Address,
        rewards: Address,
    ) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(
            &env,
            &caller,
            REQUIRED_CRITICAL,
            symbol_short!("set_rwd"),
            (rewards.clone(),),
        )?;
        let previous = Self::rewards(env.clone());
        if previous.as_ref() == Some(&rewards) {
            return Err(Error::ValueUnchanged);
        }
        Self::check_ownership(&env, &rewards)?;
        if status.complete {
            env.storage().persistent().set(&DataKey::Rewards, &rewards);
            env.events()
                .publish((EVENT_REWARDS_CHANGED,), (previous, rewards));
        }
        Ok(status)
    }

    /// Launch. Requires both ledgers and the admins in place, and the token
    /// holding pair-asset funds and some of its own supply.
    pub fn open_to_public(env: Env, caller: Address) -> Result<ConfirmationStatus, Error> {
        let status = Self::confirm(&env, &caller, REQUIRED_ROUTINE, symbol_short!("open"), ())?;
        if Self::is_open_to_public(env.clone()) {
            return Err(Error::ValueUnchanged);
        }
        if Self::rewards(env.clone()).is_none()
            || Self::project(env.clone()).is_none()
            || !admins::is_set(&env)
        {
            return Err(Error::ConfigurationRequired);
        }
        let this = env.current_contract_address();
        let asset: Address = env
            .storage()
            .persistent()
            .get(&DataKey::PairAsset)
            .ok_or(Error::NotInitialized)?;
        let funds = token::Client::new(&env, &asset).balance(&this);
        if funds <= 0 || Self::balance(env.clone(), this) <= 0 {
            return Err(Error::InsufficientResources);
        }
        if status.complete {
            env.storage().persistent().set(&DataKey::Open, &true);
            env.events().publish((EVENT_OPEN, caller), funds);
        }
        Ok(status)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_open_to_public(env: Env) -> bool {
        Self::flag(&env, &DataKey::Open)
    }

    pub fn is_feeless(env: Env, account: Address) -> bool {
        Self::flag(&env, &DataKey::Feeless(account))
    }

    pub fn is_presale(env: Env, account: Address) -> bool {
        Self::flag(&env, &DataKey::Presale(account))
    }

    pub fn is_automated_market_maker_pair(env: Env, pair: Address) -> bool {
        Self::flag(&env, &DataKey::AmmPair(pair))
    }

    pub fn gas_limit(env: Env) -> u64 {
        env.storage()
            .persistent()
            .get(&DataKey::GasLimit)
            .unwrap_or(DEFAULT_GAS_LIMIT)
    }

    pub fn project(env: Env) -> Option<Address> {
        env.storage().persistent().get(&DataKey::Project)
    }

    pub fn rewards(env: Env) -> Option<Address> {
        env.storage().persistent().get(&DataKey::Rewards)
    }
}

#[cfg(test)]
mod test_ledgers;
