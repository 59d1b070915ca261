//! Submission-cadence limits, checked before a session is issued.
//!
//! Pure over an identity's recent `played_at` timestamps: no state is read
//! or written here. All violations are reported together so abuse logs carry
//! the full picture.

use std::fmt;

const HOUR_MS: u64 = 3_600_000;
const DAY_MS: u64 = 86_400_000;

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Max submissions in the trailing hour.
    pub hourly_limit: usize,
    /// Max submissions in the trailing 24 hours.
    pub daily_limit: usize,
    /// Minimum gap after the most recent submission.
    pub min_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            hourly_limit: 20,
            daily_limit: 100,
            min_interval_ms: 5_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitViolation {
    HourlyLimitExceeded { count: usize, limit: usize },
    DailyLimitExceeded { count: usize, limit: usize },
    SubmissionTooFast { elapsed_ms: u64, min_interval_ms: u64 },
}

impl fmt::Display for RateLimitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HourlyLimitExceeded { count, limit } => {
                write!(f, "hourly limit exceeded: {count} plays in the last hour (limit {limit})")
            }
            Self::DailyLimitExceeded { count, limit } => {
                write!(f, "daily limit exceeded: {count} plays in the last 24h (limit {limit})")
            }
            Self::SubmissionTooFast { elapsed_ms, min_interval_ms } => {
                write!(f, "submission too fast: {elapsed_ms}ms since last play (minimum {min_interval_ms}ms)")
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RateCheck {
    pub violations: Vec<RateLimitViolation>,
}

impl RateCheck {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Count recent plays and the gap to the most recent one against `config`.
/// Timestamps at or after the window edge count as inside the window.
pub fn check(played_at_ms: &[u64], now_ms: u64, config: &RateLimitConfig) -> RateCheck {
    let mut violations = Vec::new();

    let hour_cutoff = now_ms.saturating_sub(HOUR_MS);
    let day_cutoff = now_ms.saturating_sub(DAY_MS);
    let hourly = played_at_ms.iter().filter(|&&t| t >= hour_cutoff).count();
    let daily = played_at_ms.iter().filter(|&&t| t >= day_cutoff).count();

    if hourly >= config.hourly_limit {
        violations.push(RateLimitViolation::HourlyLimitExceeded {
            count: hourly,
            limit: config.hourly_limit,
        });
    }
    if daily >= config.daily_limit {
        violations.push(RateLimitViolation::DailyLimitExceeded {
            count: daily,
            limit: config.daily_limit,
        });
    }
    if let Some(&latest) = played_at_ms.iter().max() {
        let elapsed_ms = now_ms.saturating_sub(latest);
        if elapsed_ms < config.min_interval_ms {
            violations.push(RateLimitViolation::SubmissionTooFast {
                elapsed_ms,
                min_interval_ms: config.min_interval_ms,
            });
        }
    }

    RateCheck { violations }
}
