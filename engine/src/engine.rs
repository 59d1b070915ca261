//! Request-level orchestration over a pluggable [`Store`].
//!
//! Each handler runs one request end-to-end; suspension happens only at
//! store I/O. Check-then-act sequences (ticket refresh+consume, session
//! check-and-set, revenue-event claim) run under the advisory [`LockTable`],
//! so the store itself only needs per-call atomicity.

use crate::locks::{LockKey, LockTable};
use crate::rate_limit::{self, RateLimitConfig, RateLimitViolation};
use crate::referral;
use crate::registry::{fallback_reward, GameRegistry};
use crate::reward;
use crate::session::{self, SessionError};
use crate::store::{load_history, load_profile, load_referral, Store};
use crate::tickets::{self, TicketError};
use crate::validator::{self, GameSubmission};
use anyhow::Result;
use dashrun_types::{
    GameRecord, GameSession, Identity, Key, PlayerProfile, ReferralEdge, TicketPool, TicketUse,
    Value, MAX_GAME_TYPE_LENGTH, MAX_WARNINGS, MAX_WARNING_LENGTH,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("identity not found")]
    IdentityNotFound,
    #[error("identity already registered")]
    AlreadyRegistered,
    #[error("invalid game type")]
    InvalidGameType,
    #[error("rate limited")]
    RateLimited(Vec<RateLimitViolation>),
    #[error("no tickets remaining")]
    NoTicketsRemaining,
    #[error("invalid amount")]
    InvalidAmount,
    #[error("submission failed validation")]
    SubmissionRejected(Vec<String>),
    #[error("session rejected: {0}")]
    SessionRejected(SessionError),
    #[error("cannot refer yourself")]
    SelfReferral,
    #[error("referrer already set")]
    ReferrerAlreadySet,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl EngineError {
    /// Transient store faults are the only retryable class.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

impl From<TicketError> for EngineError {
    fn from(err: TicketError) -> Self {
        match err {
            TicketError::NoTicketsRemaining => Self::NoTicketsRemaining,
            TicketError::InvalidAmount => Self::InvalidAmount,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    pub rate_limit: RateLimitConfig,
    /// Reject submissions whose session consume fails instead of persisting
    /// them unverified.
    pub strict_sessions: bool,
}

/// Ticket counts as returned to the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TicketStatus {
    pub daily: u32,
    pub star: u32,
    pub can_play: bool,
}

impl From<&TicketPool> for TicketStatus {
    fn from(pool: &TicketPool) -> Self {
        Self {
            daily: pool.daily,
            star: pool.star,
            can_play: pool.can_play(),
        }
    }
}

/// Outcome of a persisted submission.
#[derive(Clone, Debug)]
pub struct RecordOutcome {
    pub seq: u64,
    pub record: GameRecord,
}

/// A raw game-type string that exceeds the codec bound would persist as a
/// row the read path can never decode. Checked before any write.
fn check_game_type(game_type: &str) -> Result<(), EngineError> {
    if game_type.len() > MAX_GAME_TYPE_LENGTH {
        return Err(EngineError::InvalidGameType);
    }
    Ok(())
}

/// Clamp stored warnings to the codec bounds, respecting char boundaries.
fn clamp_warnings(warnings: &mut Vec<String>) {
    warnings.truncate(MAX_WARNINGS);
    for warning in warnings.iter_mut() {
        if warning.len() > MAX_WARNING_LENGTH {
            let mut end = MAX_WARNING_LENGTH;
            while !warning.is_char_boundary(end) {
                end -= 1;
            }
            warning.truncate(end);
        }
    }
}

pub struct Engine<S: Store> {
    store: RwLock<S>,
    locks: LockTable,
    registry: GameRegistry,
    config: EngineConfig,
}

impl<S: Store> Engine<S> {
    pub fn new(store: S, registry: GameRegistry, config: EngineConfig) -> Self {
        Self {
            store: RwLock::new(store),
            locks: LockTable::new(),
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &GameRegistry {
        &self.registry
    }

    /// Create a profile and a full ticket pool for a new identity.
    pub async fn register_player(
        &self,
        identity: Identity,
        now_ms: u64,
    ) -> Result<(PlayerProfile, TicketPool), EngineError> {
        let _guard = self.locks.acquire(LockKey::Identity(identity)).await;
        let mut store = self.store.write().await;
        if load_profile(&*store, &identity).await?.is_some() {
            return Err(EngineError::AlreadyRegistered);
        }
        let profile = PlayerProfile {
            club_balance: 0,
            games_played: 0,
            created_at_ms: now_ms,
        };
        store
            .insert(Key::Profile(identity), Value::Profile(profile.clone()))
            .await?;
        let pool = tickets::refresh_and_load(&mut *store, &identity, now_ms).await?;
        info!(identity = %identity, "player registered");
        Ok((profile, pool))
    }

    /// Read-only ticket view; still applies the daily-reset transition.
    pub async fn ticket_status(
        &self,
        identity: Identity,
        now_ms: u64,
    ) -> Result<TicketStatus, EngineError> {
        let _guard = self.locks.acquire(LockKey::Identity(identity)).await;
        let mut store = self.store.write().await;
        self.require_profile(&*store, &identity).await?;
        let pool = tickets::refresh_and_load(&mut *store, &identity, now_ms).await?;
        Ok(TicketStatus::from(&pool))
    }

    /// Consume one ticket ahead of play.
    pub async fn use_ticket(
        &self,
        identity: Identity,
        now_ms: u64,
    ) -> Result<(TicketUse, TicketStatus), EngineError> {
        let _guard = self.locks.acquire(LockKey::Identity(identity)).await;
        let mut store = self.store.write().await;
        self.require_profile(&*store, &identity).await?;
        let (used, pool) = tickets::consume(&mut *store, &identity, now_ms)
            .await?
            .map_err(EngineError::from)?;
        Ok((used, TicketStatus::from(&pool)))
    }

    /// Authorize one play: rate-limit check, then ticket debit, then session
    /// issue, so an identity can never hold more unconsumed sessions than it
    /// had tickets for.
    pub async fn issue_session(
        &self,
        identity: Identity,
        game_type: &str,
        now_ms: u64,
    ) -> Result<GameSession, EngineError> {
        check_game_type(game_type)?;
        let _guard = self.locks.acquire(LockKey::Identity(identity)).await;
        let mut store = self.store.write().await;
        self.require_profile(&*store, &identity).await?;

        let history = load_history(&*store, &identity).await?;
        let rate = rate_limit::check(&history.played_at_ms, now_ms, &self.config.rate_limit);
        if !rate.is_valid() {
            self.log_suspicious_activity(
                &identity,
                game_type,
                "rate limited at session issue",
                &rate
                    .violations
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>(),
            );
            return Err(EngineError::RateLimited(rate.violations));
        }

        tickets::consume(&mut *store, &identity, now_ms)
            .await?
            .map_err(EngineError::from)?;

        let session = session::new_session(identity, game_type, now_ms);
        session::issue(&mut *store, &session).await?;
        debug!(identity = %identity, game_type, token = %session.token, "session issued");
        Ok(session)
    }

    /// The primary entry: advisory session consume, validation, reward
    /// calculation, persistence, and revenue-share propagation.
    pub async fn record_game(
        &self,
        submission: GameSubmission,
        now_ms: u64,
    ) -> Result<RecordOutcome, EngineError> {
        check_game_type(&submission.game_type)?;
        let identity = submission.identity;

        // Advisory session consume, under the token's lock. Exactly one of
        // any concurrent submissions carrying this token gets `verified`.
        let mut session_verified = false;
        let mut session_warning = None;
        if let Some(token) = submission.session_token {
            let _token_guard = self.locks.acquire(LockKey::Session(token)).await;
            let mut store = self.store.write().await;
            match session::consume(
                &mut *store,
                &token,
                &identity,
                &submission.game_type,
                now_ms,
            )
            .await?
            {
                Ok(()) => session_verified = true,
                Err(err) => {
                    if self.config.strict_sessions {
                        self.log_suspicious_activity(
                            &identity,
                            &submission.game_type,
                            "session consume failed in strict mode",
                            &[err.to_string()],
                        );
                        return Err(EngineError::SessionRejected(err));
                    }
                    session_warning = Some(format!("session not verified: {err}"));
                }
            }
        } else if self.config.strict_sessions {
            return Err(EngineError::SessionRejected(SessionError::NotFound));
        } else {
            session_warning = Some("submitted without session token".to_string());
        }

        // Plausibility checks. A failing validation never partially applies
        // rewards: nothing has been persisted yet.
        let spec = self.registry.get(&submission.game_type);
        let validation = validator::validate(&submission, spec.map(|s| &s.limits));
        if !validation.is_valid() {
            self.log_suspicious_activity(
                &identity,
                &submission.game_type,
                "submission failed validation",
                &validation.errors,
            );
            return Err(EngineError::SubmissionRejected(validation.errors));
        }

        let reward_config = spec.map(|s| s.reward.clone()).unwrap_or_else(fallback_reward);
        let breakdown = reward::calculate(
            &reward_config,
            submission.score,
            submission.fever_count,
            submission.perfect_count,
            submission.coin_count,
            submission.difficulty,
        );

        let mut warnings = validation.warnings;
        if let Some(warning) = session_warning {
            warnings.push(warning);
        }
        clamp_warnings(&mut warnings);

        // Persist the record and credit the reward as one locked section;
        // the balance only moves together with the record write.
        let _guard = self.locks.acquire(LockKey::Identity(identity)).await;
        let mut store = self.store.write().await;
        let mut profile = match load_profile(&*store, &identity).await? {
            Some(profile) => profile,
            None => return Err(EngineError::IdentityNotFound),
        };
        let seq = profile.games_played;
        let record = GameRecord {
            game_type: submission.game_type.clone(),
            score: submission.score,
            distance: submission.distance,
            time_ms: submission.time_ms,
            fever_count: submission.fever_count,
            perfect_count: submission.perfect_count,
            coin_count: submission.coin_count,
            potion_count: submission.potion_count,
            difficulty: submission.difficulty,
            reward: breakdown.clone(),
            session_token: submission.session_token,
            session_verified,
            validation_warnings: warnings,
            played_at_ms: now_ms,
        };
        store
            .insert(Key::Record(identity, seq), Value::Record(record.clone()))
            .await?;

        profile.games_played += 1;
        profile.club_balance = profile.club_balance.saturating_add(breakdown.total);
        store
            .insert(Key::Profile(identity), Value::Profile(profile))
            .await?;

        let mut history = load_history(&*store, &identity).await?;
        history.record(now_ms);
        store
            .insert(Key::History(identity), Value::History(history))
            .await?;

        // Revenue share, keyed to this record so retries cannot double-pay.
        let event = referral::earn_event_id(&identity, seq);
        if let Some((referrer, share)) =
            referral::on_club_earned(&mut *store, &identity, breakdown.total, event).await?
        {
            info!(
                identity = %identity,
                referrer = %referrer,
                share,
                "revenue share credited"
            );
        }

        info!(
            identity = %identity,
            game_type = %record.game_type,
            score = record.score,
            reward = breakdown.total,
            verified = session_verified,
            "game recorded"
        );
        Ok(RecordOutcome { seq, record })
    }

    /// Credit purchased star tickets and propagate the purchase revenue
    /// share, idempotently per payment reference.
    pub async fn purchase_completed(
        &self,
        identity: Identity,
        usd_cents: u64,
        star_tickets: u32,
        payment_ref: &str,
        now_ms: u64,
    ) -> Result<TicketStatus, EngineError> {
        let _guard = self.locks.acquire(LockKey::Identity(identity)).await;
        let mut store = self.store.write().await;
        self.require_profile(&*store, &identity).await?;

        let pool = if star_tickets > 0 {
            tickets::credit(&mut *store, &identity, star_tickets, now_ms)
                .await?
                .map_err(EngineError::from)?
        } else {
            tickets::refresh_and_load(&mut *store, &identity, now_ms).await?
        };

        let event = referral::purchase_event_id(&identity, payment_ref);
        if let Some((referrer, share)) =
            referral::on_purchase_completed(&mut *store, &identity, usd_cents, event).await?
        {
            info!(
                identity = %identity,
                referrer = %referrer,
                share,
                payment_ref,
                "purchase revenue share credited"
            );
        }
        Ok(TicketStatus::from(&pool))
    }

    /// Credit star tickets outside a purchase (quests, referral bonuses).
    pub async fn credit_star_tickets(
        &self,
        identity: Identity,
        amount: u32,
        now_ms: u64,
    ) -> Result<TicketStatus, EngineError> {
        let _guard = self.locks.acquire(LockKey::Identity(identity)).await;
        let mut store = self.store.write().await;
        self.require_profile(&*store, &identity).await?;
        let pool = tickets::credit(&mut *store, &identity, amount, now_ms)
            .await?
            .map_err(EngineError::from)?;
        Ok(TicketStatus::from(&pool))
    }

    /// Bind a referral edge: at most one referrer per identity, set once,
    /// never self-referencing.
    pub async fn set_referrer(
        &self,
        referrer: Identity,
        referred: Identity,
        now_ms: u64,
    ) -> Result<(), EngineError> {
        if referrer == referred {
            return Err(EngineError::SelfReferral);
        }
        let _guard = self.locks.acquire(LockKey::Identity(referred)).await;
        let mut store = self.store.write().await;
        self.require_profile(&*store, &referrer).await?;
        self.require_profile(&*store, &referred).await?;
        if load_referral(&*store, &referred).await?.is_some() {
            return Err(EngineError::ReferrerAlreadySet);
        }
        store
            .insert(
                Key::Referral(referred),
                Value::Referral(ReferralEdge {
                    referrer,
                    created_at_ms: now_ms,
                }),
            )
            .await?;
        info!(referrer = %referrer, referred = %referred, "referral bound");
        Ok(())
    }

    /// Fetch a persisted record by its per-identity sequence number.
    pub async fn stored_record(
        &self,
        identity: Identity,
        seq: u64,
    ) -> Result<Option<GameRecord>, EngineError> {
        let store = self.store.read().await;
        Ok(crate::store::load_record(&*store, &identity, seq).await?)
    }

    /// Current CLUB balance, for display.
    pub async fn club_balance(&self, identity: Identity) -> Result<u64, EngineError> {
        let store = self.store.read().await;
        let profile = load_profile(&*store, &identity)
            .await?
            .ok_or(EngineError::IdentityNotFound)?;
        Ok(profile.club_balance)
    }

    async fn require_profile(
        &self,
        store: &S,
        identity: &Identity,
    ) -> Result<PlayerProfile, EngineError> {
        load_profile(store, identity)
            .await?
            .ok_or(EngineError::IdentityNotFound)
    }

    /// Rejections worth keeping an audit trail for. Structured so abuse
    /// monitoring can aggregate by identity and reason.
    fn log_suspicious_activity(
        &self,
        identity: &Identity,
        game_type: &str,
        reason: &str,
        details: &[String],
    ) {
        warn!(
            identity = %identity,
            game_type,
            reason,
            details = ?details,
            "suspicious activity"
        );
    }
}
