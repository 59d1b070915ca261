//! Physics- and statistics-based submission checks.
//!
//! The server never re-simulates a run. Instead every reported number is
//! held against limits derived from the game's own deterministic parameters
//! (top speed, spawn density), so a legitimate player cannot exceed them
//! even under optimal play; any excess means a tampered client or a
//! corrupted payload. Checks are evaluated independently and a submission
//! may fail several at once.

use crate::registry::GameLimits;
use dashrun_types::{Difficulty, Identity, SessionToken};

/// A completed-game payload as reported by the (untrusted) client.
/// Ephemeral: it only becomes a persisted record after validation passes.
#[derive(Clone, Debug)]
pub struct GameSubmission {
    pub identity: Identity,
    pub game_type: String,
    pub score: u64,
    pub distance: u64,
    pub time_ms: u64,
    pub fever_count: u32,
    pub perfect_count: u32,
    pub coin_count: u32,
    pub potion_count: u32,
    pub difficulty: Difficulty,
    pub session_token: Option<SessionToken>,
}

/// Validation outcome. Errors reject the submission; warnings are persisted
/// on the record for later audit but do not block it.
#[derive(Clone, Debug, Default)]
pub struct Validation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check one collectible counter against its spawn-density ceiling,
/// normalized per 100 distance units. `count * 100 <= limit * distance`
/// avoids the division (and a zero-distance run with any pickups fails).
fn check_rate(
    result: &mut Validation,
    label: &str,
    count: u32,
    distance: u64,
    max_per_100: u64,
) {
    if (count as u64).saturating_mul(100) > max_per_100.saturating_mul(distance) {
        result.errors.push(format!(
            "{label} count {count} exceeds maximum of {max_per_100} per 100 distance units over distance {distance}"
        ));
    }
}

/// Validate a submission against its game's limits. `None` limits means the
/// game type is not registered: fail open with a warning so new games ship
/// without a backend release, but pay only the fallback rate.
pub fn validate(submission: &GameSubmission, limits: Option<&GameLimits>) -> Validation {
    let mut result = Validation::default();

    let limits = match limits {
        Some(limits) => limits,
        None => {
            result.warnings.push(format!(
                "unknown game type '{}': plausibility checks skipped",
                submission.game_type
            ));
            return result;
        }
    };

    // Duration bounds.
    if submission.time_ms < limits.min_game_time_ms {
        result.errors.push(format!(
            "game time {}ms below minimum {}ms",
            submission.time_ms, limits.min_game_time_ms
        ));
    }
    if submission.time_ms > limits.max_game_time_ms {
        result.errors.push(format!(
            "game time {}ms above maximum {}ms",
            submission.time_ms, limits.max_game_time_ms
        ));
    }

    // Speed wall: distance / (time_ms / 1000) <= max_speed_ms, in integers.
    // A zero-duration run with any distance is impossible by the same rule.
    if submission
        .distance
        .saturating_mul(1_000)
        > limits.max_speed_ms.saturating_mul(submission.time_ms)
    {
        result.errors.push(format!(
            "impossible speed: {} units in {}ms exceeds {} units/s",
            submission.distance, submission.time_ms, limits.max_speed_ms
        ));
    }

    // Score/distance consistency. A mismatch indicates a scoring-formula
    // drift rather than impossible physics, so it only warns.
    if limits.score_is_distance {
        let diff = submission.score.abs_diff(submission.distance);
        if diff > limits.score_distance_tolerance {
            result.warnings.push(format!(
                "score {} deviates from distance {} by {} (tolerance {})",
                submission.score, submission.distance, diff, limits.score_distance_tolerance
            ));
        }
    }

    // Collection-rate bounds.
    check_rate(
        &mut result,
        "coin",
        submission.coin_count,
        submission.distance,
        limits.max_coins_per_100,
    );
    check_rate(
        &mut result,
        "potion",
        submission.potion_count,
        submission.distance,
        limits.max_potions_per_100,
    );
    check_rate(
        &mut result,
        "fever",
        submission.fever_count,
        submission.distance,
        limits.max_fevers_per_100,
    );
    check_rate(
        &mut result,
        "perfect dodge",
        submission.perfect_count,
        submission.distance,
        limits.max_perfects_per_100,
    );

    result
}
