//! Dashrun game integrity and reward engine.
//!
//! This crate decides whether a client-reported run is physically
//! plausible, whether it corresponds to a play the server authorized, and
//! how much CLUB to mint, without re-simulating the game. It is built
//! against an untrusted client: session tokens are single-use, ticket
//! consumption is serialized per identity, and every reported number is
//! checked against limits a legitimate player cannot exceed.
//!
//! ## Concurrency requirements
//! - The [`Store`] only needs per-call atomicity; every check-then-act
//!   sequence runs under the engine's advisory lock table.
//! - Handlers take `now_ms` as an argument; nothing in this crate reads the
//!   wall clock, so behavior is reproducible in tests.
//!
//! The primary entrypoint is [`Engine`].

mod engine;
pub mod locks;
pub mod rate_limit;
pub mod referral;
pub mod registry;
pub mod reward;
pub mod session;
mod store;
pub mod tickets;
pub mod validator;

#[cfg(test)]
mod concurrency_tests;

pub use engine::{Engine, EngineConfig, EngineError, RecordOutcome, TicketStatus};
pub use rate_limit::{RateCheck, RateLimitConfig, RateLimitViolation};
pub use referral::{EARNING_SHARE_PCT, PURCHASE_CLUB_PER_USD};
pub use registry::{fallback_reward, GameInfo, GameLimits, GameRegistry, GameSpec, RewardConfig};
pub use session::SessionError;
pub use store::{Memory, Store};
pub use tickets::TicketError;
pub use validator::{validate, GameSubmission, Validation};
