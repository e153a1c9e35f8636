//! The fixed-size admin set.
//!
//! Created empty (bootstrap mode), assigned once, then changed one member at a
//! time through a confirmed `replace`.

use soroban_sdk::{symbol_short, Address, Env, Symbol, Vec};

use crate::types::GovernanceKey;
use crate::Error;

/// Number of admins a governed contract carries once assigned.
pub const ADMIN_COUNT: u32 = 3;

const EVENT_ADMINS_SET: Symbol = symbol_short!("adm_set");
const EVENT_ADMIN_CHANGED: Symbol = symbol_short!("adm_chg");

/// Current admins in assignment order; empty while in bootstrap mode.
pub fn get(env: &Env) -> Vec<Address> {
    env.storage()
        .persistent()
        .get(&GovernanceKey::GovAdmins)
        .unwrap_or_else(|| Vec::new(env))
}

pub fn is_set(env: &Env) -> bool {
    env.storage().persistent().has(&GovernanceKey::GovAdmins)
}

pub fn is_admin(env: &Env, account: &Address) -> bool {
    get(env).contains(account)
}

/// Exactly [`ADMIN_COUNT`] entries, no duplicates.
pub fn validate(admins: &Vec<Address>) -> Result<(), Error> {
    if admins.len() != ADMIN_COUNT {
        return Err(Error::ValueInvalid);
    }
    for (i, admin) in admins.iter().enumerate() {
        for other in admins.iter().skip(i + 1) {
            if admin == other {
                return Err(Error::ValueInvalid);
            }
        }
    }
    Ok(())
}

/// One-time assignment. Fails with `AlreadySet` once admins exist.
pub fn assign(env: &Env, admins: Vec<Address>) -> Result<(), Error> {
    if is_set(env) {
        return Err(Error::AlreadySet);
    }
    store(env, admins)
}

/// Replace the whole set. Only reachable behind a confirmed call.
pub fn reassign(env: &Env, admins: Vec<Address>) -> Result<(), Error> {
    store(env, admins)
}

fn store(env: &Env, admins: Vec<Address>) -> Result<(), Error> {
    validate(&admins)?;
    env.storage()
        .persistent()
        .set(&GovernanceKey::GovAdmins, &admins);
    env.events().publish((EVENT_ADMINS_SET,), admins);
    Ok(())
}

/// Swap `from` for `to` in place, keeping the slot order.
pub fn replace(env: &Env, from: &Address, to: &Address) -> Result<(), Error> {
    let mut admins = get(env);
    let slot = admins.first_index_of(from).ok_or(Error::ValueInvalid)?;
    if admins.contains(to) {
        return Err(Error::ValueInvalid);
    }
    admins.set(slot, to.clone());
    env.storage()
        .persistent()
        .set(&GovernanceKey::GovAdmins, &admins);
    env.events()
        .publish((EVENT_ADMIN_CHANGED, from.clone()), to.clone());
    Ok(())
}

/// Pre-check for `replace` so a confirmation round is not spent on a call
/// that can never apply.
pub fn check_replace(env: &Env, from: &Address, to: &Address) -> Result<(), Error> {
    let admins = get(env);
    if !admins.contains(from) || admins.contains(to) {
        return Err(Error::ValueInvalid);
    }
    Ok(())
}
