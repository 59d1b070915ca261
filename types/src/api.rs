//! JSON request/response shapes for the HTTP surface.
//!
//! These mirror what the mobile web client sends today; optional counters
//! default to zero and a missing difficulty means "medium".

use crate::game::{Difficulty, GameRecord, RewardBreakdown, TicketUse};
use crate::primitives::{Identity, SessionToken};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize)]
pub struct RegisterRequest {
    pub identity: Identity,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegisterResponse {
    pub identity: Identity,
    pub club_balance: u64,
    pub daily_tickets: u32,
    pub star_tickets: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct IssueSessionRequest {
    pub identity: Identity,
    pub game_type: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct IssueSessionResponse {
    pub token: SessionToken,
    pub expires_at_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UseTicketRequest {
    pub identity: Identity,
    pub game_type: String,
}

/// Shared shape for both the success and failure paths of `ticket.use`, so
/// the client can render remaining counts either way.
#[derive(Clone, Debug, Serialize)]
pub struct UseTicketResponse {
    pub success: bool,
    pub daily_tickets: u32,
    pub star_tickets: u32,
    pub total_tickets: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_type: Option<TicketUse>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TicketStatusResponse {
    pub daily_tickets: u32,
    pub star_tickets: u32,
    pub total_tickets: u32,
    pub can_play: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RecordGameRequest {
    pub identity: Identity,
    pub game_type: String,
    pub score: u64,
    pub distance: u64,
    pub time_ms: u64,
    #[serde(default)]
    pub fever_count: u32,
    #[serde(default)]
    pub perfect_count: u32,
    #[serde(default)]
    pub coin_count: u32,
    #[serde(default)]
    pub potion_count: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub session_token: Option<SessionToken>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RecordGameResponse {
    pub record: RecordView,
    pub rewards: Rewards,
}

#[derive(Clone, Debug, Serialize)]
pub struct Rewards {
    pub club: u64,
}

/// Serializable projection of a persisted [`GameRecord`].
#[derive(Clone, Debug, Serialize)]
pub struct RecordView {
    pub game_type: String,
    pub score: u64,
    pub distance: u64,
    pub time_ms: u64,
    pub fever_count: u32,
    pub perfect_count: u32,
    pub coin_count: u32,
    pub potion_count: u32,
    pub difficulty: Difficulty,
    pub reward: RewardBreakdown,
    pub session_verified: bool,
    pub validation_warnings: Vec<String>,
    pub played_at_ms: u64,
}

impl From<&GameRecord> for RecordView {
    fn from(record: &GameRecord) -> Self {
        Self {
            game_type: record.game_type.clone(),
            score: record.score,
            distance: record.distance,
            time_ms: record.time_ms,
            fever_count: record.fever_count,
            perfect_count: record.perfect_count,
            coin_count: record.coin_count,
            potion_count: record.potion_count,
            difficulty: record.difficulty,
            reward: record.reward.clone(),
            session_verified: record.session_verified,
            validation_warnings: record.validation_warnings.clone(),
            played_at_ms: record.played_at_ms,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct BindReferralRequest {
    pub referrer: Identity,
    pub referred: Identity,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PurchaseCompletedRequest {
    pub identity: Identity,
    /// Verified purchase amount in USD cents; payment verification itself is
    /// upstream of this service.
    pub usd_cents: u64,
    /// Opaque payment reference used as the idempotency key.
    pub payment_ref: String,
    #[serde(default)]
    pub star_tickets: u32,
}

/// Structured error body: a stable code plus human-readable reasons.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}
