#![no_std]
#![deny(unsafe_code)]
#![deny(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
//! Multi-admin governance shared by the token and its ledgers.
//!
//! - [`admins`]: the fixed three-member admin set.
//! - [`registry`]: the M-of-N call-confirmation ledger keyed by call fingerprint.
//! - [`interfaces`]: `#[contractclient]` capability traits the contracts use to
//!   reach each other without linking each other's exports.
//! - [`per_share`]: magnified per-share income math for the ledgers.

use soroban_sdk::contracterror;

pub mod admins;
pub mod interfaces;
pub mod per_share;
pub mod registry;
pub mod types;

pub use admins::ADMIN_COUNT;
pub use registry::{REQUIRED_CRITICAL, REQUIRED_ROUTINE};
pub use types::{ClaimsProcessed, ConfirmationStatus, Fingerprint, PendingCall};

/// Error codes shared by every contract in the workspace.
///
/// A single enum keeps codes stable across cross-contract calls: a ledger that
/// delegates confirmation to the token surfaces the token's code unchanged.
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[repr(u32)]
pub enum Error {
    /// Caller is not the owner, an admin, or the governing token.
    CallerInvalid = 1,
    /// Out-of-range parameter, bad index or unknown account.
    ValueInvalid = 2,
    /// A multi-step workflow is missing one of its prerequisites.
    ConfigurationRequired = 3,
    /// Treasury lacks funds or tokens for the operation.
    InsufficientResources = 4,
    /// Claim cooldown has not elapsed.
    WaitTimeActive = 5,
    /// Setter called with the value already in effect.
    ValueUnchanged = 6,
    /// One-time value has already been assigned.
    AlreadySet = 7,
    /// Contract has not been initialized.
    NotInitialized = 8,
    /// Trading is not open to the public and sender is not a presale wallet.
    TradingClosed = 9,
    /// Receiver would exceed the pre-launch wallet limit.
    WalletOverLimit = 10,
    /// All reward slots are occupied.
    SlotsFull = 11,
    /// A settled amount does not fit in 128 bits.
    Overflow = 12,
}
