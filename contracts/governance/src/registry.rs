//! M-of-N call confirmation.
//!
//! States are `Idle` (no pending call) and `Pending(fingerprint, confirmed_by)`.
//! Each admin call either advances the pending call or, on quorum, returns a
//! complete status so the caller can apply its mutation; the registry is back
//! to `Idle` by then.

use soroban_sdk::{log, symbol_short, Address, Env, Symbol, Vec};

use crate::admins::{self, ADMIN_COUNT};
use crate::interfaces::GovernorClient;
use crate::types::{ConfirmationStatus, Fingerprint, GovernanceKey, PendingCall};
use crate::Error;

/// Quorum for routine settings changes.
pub const REQUIRED_ROUTINE: u32 = 2;
/// Quorum for high-impact reconfiguration.
pub const REQUIRED_CRITICAL: u32 = 3;

const EVENT_CONFIRMATION_REQUIRED: Symbol = symbol_short!("conf_req");
const EVENT_CONFIRMATION_COMPLETE: Symbol = symbol_short!("conf_done");

pub fn get_pending(env: &Env) -> Option<PendingCall> {
    env.storage().persistent().get(&GovernanceKey::GovPending)
}

fn clear_pending(env: &Env) {
    env.storage().persistent().remove(&GovernanceKey::GovPending);
}

/// Record `signer`'s confirmation of `fingerprint`.
///
/// With no admins assigned only `owner` may act and the call completes at
/// once. Otherwise `signer` must be an admin; a fingerprint other than the
/// pending one restarts the count at `signer`, and a repeated confirmation
/// by the same admin leaves the count unchanged.
pub fn confirm(
    env: &Env,
    owner: &Address,
    required: u32,
    signer: &Address,
    fingerprint: Fingerprint,
) -> Result<ConfirmationStatus, Error> {
    if required == 0 || required > ADMIN_COUNT {
        return Err(Error::ValueInvalid);
    }

    let admins = admins::get(env);
    if admins.is_empty() {
        if signer != owner {
            return Err(Error::CallerInvalid);
        }
        return Ok(ConfirmationStatus::complete(1, required));
    }
    if !admins.contains(signer) {
        return Err(Error::CallerInvalid);
    }

    let mut pending = match get_pending(env) {
        Some(call) if call.fingerprint == fingerprint => call,
        _ => PendingCall {
            fingerprint,
            required,
            confirmed_by: Vec::new(env),
        },
    };
    if !pending.confirmed_by.contains(signer) {
        pending.confirmed_by.push_back(signer.clone());
    }

    let confirmations = pending.confirmed_by.len();
    if confirmations >= required {
        clear_pending(env);
        env.events()
            .publish((EVENT_CONFIRMATION_COMPLETE, signer.clone()), confirmations);
        return Ok(ConfirmationStatus::complete(confirmations, required));
    }

    env.storage()
        .persistent()
        .set(&GovernanceKey::GovPending, &pending);
    env.events().publish(
        (EVENT_CONFIRMATION_REQUIRED, signer.clone()),
        (confirmations, required),
    );
    Ok(ConfirmationStatus::pending(confirmations, required))
}

/// Ask `governor` to confirm on behalf of the current contract.
///
/// Used by ledgers owned by the token: the token's admins confirm the ledger's
/// settings. Errors returned by the governor are passed through; any other
/// failure of the cross-contract call is reported as `CallerInvalid`.
pub fn confirm_with_governor(
    env: &Env,
    governor: &Address,
    required: u32,
    signer: &Address,
    fingerprint: Fingerprint,
) -> Result<ConfirmationStatus, Error> {
    let client = GovernorClient::new(env, governor);
    let invoker = env.current_contract_address();
    log!(env, "delegating confirmation", fingerprint.selector, required);
    match client.try_confirm_call(
        &invoker,
        &required,
        signer,
        &fingerprint.selector,
        &fingerprint.args_hash,
    ) {
        Ok(Ok(status)) => Ok(status),
        Err(Ok(err)) => Err(err),
        _ => Err(Error::CallerInvalid),
    }
}
