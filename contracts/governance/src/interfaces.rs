//! Capability interfaces between the token and the ledgers it owns.
//!
//! Contracts talk to each other only through these clients, so no contract
//! crate links another's exported entry points.

use soroban_sdk::{contractclient, Address, BytesN, Env, Symbol};

use crate::types::{ClaimsProcessed, ConfirmationStatus};
use crate::Error;

/// Implemented by the token: confirms admin calls made on an owned ledger.
#[contractclient(name = "GovernorClient")]
pub trait Governor {
    fn confirm_call(
        env: Env,
        invoker: Address,
        required: u32,
        signer: Address,
        selector: Symbol,
        args_hash: BytesN<32>,
    ) -> Result<ConfirmationStatus, Error>;
}

/// Implemented by the reward ledger: the token reports balance changes and
/// drives batch payouts through it.
#[contractclient(name = "TrackerClient")]
pub trait Tracker {
    fn track_buy(env: Env, account: Address, new_balance: i128) -> Result<(), Error>;
    fn track_sell(env: Env, account: Address, new_balance: i128) -> Result<(), Error>;
    fn process_claims(env: Env, gas_budget: u64) -> Result<ClaimsProcessed, Error>;
}

/// Implemented by both ledgers: who governs them.
#[contractclient(name = "OwnedLedgerClient")]
pub trait OwnedLedger {
    fn get_governor(env: Env) -> Option<Address>;
}
