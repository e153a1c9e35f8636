//! Magnified per-share income accounting shared by both ledgers.
//!
//! `per_share` grows by `income * 2^64 / total_weight` on each distribution and
//! every account carries a `correction` so weight changes never move income it
//! already earned. Products of these values outgrow `i128` long before the
//! income itself does, so the magnified state is kept as `I256` and only
//! settled amounts come back as `i128`. Division truncates.

use soroban_sdk::{Env, I256};

use crate::Error;

const MAGNITUDE: i128 = 1 << 64;

pub fn zero(env: &Env) -> I256 {
    I256::from_i32(env, 0)
}

/// `per_share` after `income` is shared over `total_weight` (> 0).
pub fn distribute(env: &Env, per_share: &I256, income: i128, total_weight: i128) -> I256 {
    let scaled = I256::from_i128(env, income).mul(&I256::from_i128(env, MAGNITUDE));
    per_share.add(&scaled.div(&I256::from_i128(env, total_weight)))
}

/// `correction` after an account's weight moves by `delta`.
pub fn adjust(env: &Env, correction: &I256, per_share: &I256, delta: i128) -> I256 {
    correction.sub(&per_share.mul(&I256::from_i128(env, delta)))
}

/// Lifetime income earned by an account with `weight` and `correction`.
pub fn accumulated(
    env: &Env,
    per_share: &I256,
    weight: i128,
    correction: &I256,
) -> Result<i128, Error> {
    per_share
        .mul(&I256::from_i128(env, weight))
        .add(correction)
        .div(&I256::from_i128(env, MAGNITUDE))
        .to_i128()
        .ok_or(Error::Overflow)
}
