use soroban_sdk::{contracttype, xdr::ToXdr, Address, BytesN, Env, IntoVal, Symbol, Val, Vec};

/// Identity of a guarded call: entry point name plus a hash of its arguments.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Fingerprint {
    pub selector: Symbol,
    pub args_hash: BytesN<32>,
}

impl Fingerprint {
    pub fn new(selector: Symbol, args_hash: BytesN<32>) -> Self {
        Self {
            selector,
            args_hash,
        }
    }

    /// Fingerprint `selector` called with `args`; the arguments are hashed as XDR.
    pub fn of<A>(env: &Env, selector: Symbol, args: A) -> Self
    where
        A: IntoVal<Env, Val>,
    {
        let args_hash = env.crypto().sha256(&args.to_xdr(env));
        Self::new(selector, args_hash)
    }
}

/// The single in-flight guarded call and the admins that confirmed it.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingCall {
    pub fingerprint: Fingerprint,
    pub required: u32,
    pub confirmed_by: Vec<Address>,
}

/// Outcome of one confirmation. `complete` means the caller may apply the action.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConfirmationStatus {
    pub confirmations: u32,
    pub required: u32,
    pub complete: bool,
}

impl ConfirmationStatus {
    pub fn complete(confirmations: u32, required: u32) -> Self {
        Self {
            confirmations,
            required,
            complete: true,
        }
    }

    pub fn pending(confirmations: u32, required: u32) -> Self {
        Self {
            confirmations,
            required,
            complete: false,
        }
    }
}

/// Result of one bounded `process_claims` run.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ClaimsProcessed {
    /// Accounts visited.
    pub iterations: u32,
    /// Accounts paid.
    pub claims: u32,
    /// Persisted cursor the next run resumes from.
    pub cursor: u32,
}

/// Storage keys owned by this crate. Prefixed so they never collide with a
/// contract's own `DataKey` variants in the same storage.
#[contracttype]
#[derive(Clone)]
pub enum GovernanceKey {
    GovAdmins,
    GovPending,
}
