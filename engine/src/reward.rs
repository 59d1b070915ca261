//! Deterministic reward calculation.
//!
//! Every stage floors before feeding the next: base, then each bonus, then
//! the difficulty multiplier, then the per-game cap. The staging is part of
//! the contract (moving a division produces different totals), so each
//! stage is its own integer division here, u128 intermediates throughout.

use crate::registry::RewardConfig;
use dashrun_types::{Difficulty, RewardBreakdown};

const BPS: u128 = 10_000;

fn mul_div(value: u64, numerator: u64, denominator: u128) -> u64 {
    ((value as u128)
        .saturating_mul(numerator as u128)
        .checked_div(denominator)
        .unwrap_or(0)) as u64
}

/// Compute the capped reward for one validated game.
pub fn calculate(
    config: &RewardConfig,
    score: u64,
    fever_count: u32,
    perfect_count: u32,
    coin_count: u32,
    difficulty: Difficulty,
) -> RewardBreakdown {
    let base = mul_div(score, config.club_per_unit_bps, BPS);

    // floor(base * pct/100 * count): exact as a single division.
    let fever_bonus = ((base as u128)
        .saturating_mul(config.fever_bonus_pct as u128)
        .saturating_mul(fever_count as u128)
        .checked_div(100)
        .unwrap_or(0)) as u64;
    let perfect_bonus = mul_div(perfect_count as u64, config.perfect_dodge_bonus_bps, BPS);
    let coin_bonus = mul_div(coin_count as u64, config.coin_bonus_bps, BPS);

    let subtotal = base
        .saturating_add(fever_bonus)
        .saturating_add(perfect_bonus)
        .saturating_add(coin_bonus);

    let multiplier_bps = difficulty.multiplier_bps();
    let scaled = mul_div(subtotal, multiplier_bps, BPS);

    // The cap is the final stage; no bonus stacking may exceed it.
    let total = scaled.min(config.max_reward_per_game);

    RewardBreakdown {
        base,
        fever_bonus,
        perfect_bonus,
        coin_bonus,
        difficulty_multiplier_bps: multiplier_bps,
        total,
    }
}
