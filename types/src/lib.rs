//! Common types for the dashrun reward backend.
//!
//! Everything the engine persists is encoded with `commonware-codec` via the
//! `Write`/`Read`/`EncodeSize` impls in this crate; everything that crosses
//! the HTTP boundary is serde in [`api`]. The store schema lives in
//! [`state`] as the `Key`/`Value` pair.

pub mod api;
pub mod game;
pub mod primitives;
pub mod state;

pub use game::{
    Difficulty, GameRecord, GameSession, GameType, PlayHistory, PlayerProfile, ReferralEdge,
    RewardBreakdown, TicketPool, TicketUse, MAX_DAILY_TICKETS, MAX_GAME_TYPE_LENGTH,
    MAX_WARNINGS, MAX_WARNING_LENGTH, MS_PER_DAY, SESSION_TTL_MS,
};
pub use primitives::{EventId, Identity, SessionToken};
pub use state::{Key, Value};
