use crate::primitives::{Identity, SessionToken};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};
use serde::{Deserialize, Serialize};

/// Helper to write a string as length-prefixed UTF-8 bytes.
pub(crate) fn write_string(s: &str, writer: &mut impl BufMut) {
    let bytes = s.as_bytes();
    (bytes.len() as u32).write(writer);
    writer.put_slice(bytes);
}

/// Helper to read a string from length-prefixed UTF-8 bytes.
pub(crate) fn read_string(reader: &mut impl Buf, max_len: usize) -> Result<String, Error> {
    let len = u32::read(reader)? as usize;
    if len > max_len {
        return Err(Error::Invalid("String", "too long"));
    }
    if reader.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    let mut bytes = vec![0u8; len];
    reader.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|_| Error::Invalid("String", "invalid UTF-8"))
}

/// Helper to get encode size of a string.
pub(crate) fn string_encode_size(s: &str) -> usize {
    4 + s.len()
}

/// Maximum length accepted for a raw game-type string
pub const MAX_GAME_TYPE_LENGTH: usize = 64;

/// Maximum number of validation warnings stored on a record
pub const MAX_WARNINGS: usize = 16;

/// Maximum length of a single stored warning
pub const MAX_WARNING_LENGTH: usize = 256;

/// Daily ticket pool cap (refilled at the UTC day boundary)
pub const MAX_DAILY_TICKETS: u32 = 5;

/// Session token lifetime: the play must be submitted within this window
pub const SESSION_TTL_MS: u64 = 10 * 60 * 1000;

/// Milliseconds per UTC day, used to derive the ticket-reset day number
pub const MS_PER_DAY: u64 = 86_400_000;

/// Maximum play timestamps retained per identity (bounded by the daily rate cap)
pub const MAX_HISTORY_ENTRIES: usize = 256;

/// Game types with server-side limits and reward tables.
///
/// Submissions may carry game-type strings not enumerated here; those take
/// the registry's fallback path rather than being rejected, so shipping a new
/// game ahead of a backend release degrades gracefully.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GameType {
    DashTrials = 0,
    CoinRush = 1,
}

impl GameType {
    pub const ALL: [GameType; 2] = [GameType::DashTrials, GameType::CoinRush];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DashTrials => "dash-trials",
            Self::CoinRush => "coin-rush",
        }
    }

    /// Parse a client-provided game-type string. `None` means "unknown game",
    /// not an error.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dash-trials" => Some(Self::DashTrials),
            "coin-rush" => Some(Self::CoinRush),
            _ => None,
        }
    }
}

impl Write for GameType {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for GameType {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        match value {
            0 => Ok(Self::DashTrials),
            1 => Ok(Self::CoinRush),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for GameType {
    const SIZE: usize = 1;
}

/// How far into the run's escalating difficulty curve the player reached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy = 0,
    #[default]
    Medium = 1,
    Hard = 2,
    Extreme = 3,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Extreme => "extreme",
        }
    }

    /// Reward multiplier in basis points (10_000 = 1.0x).
    pub fn multiplier_bps(&self) -> u64 {
        match self {
            Self::Easy => 8_000,
            Self::Medium => 10_000,
            Self::Hard => 12_500,
            Self::Extreme => 15_000,
        }
    }
}

impl Write for Difficulty {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for Difficulty {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        match value {
            0 => Ok(Self::Easy),
            1 => Ok(Self::Medium),
            2 => Ok(Self::Hard),
            3 => Ok(Self::Extreme),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for Difficulty {
    const SIZE: usize = 1;
}

/// Which pool a consumed ticket came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketUse {
    Daily,
    Star,
}

impl TicketUse {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Star => "star",
        }
    }
}

/// Per-identity play credits.
///
/// `last_reset_day` is the UTC day number (`now_ms / MS_PER_DAY`) at which the
/// daily pool was last refilled. It only moves forward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketPool {
    pub daily: u32,
    pub star: u32,
    pub last_reset_day: u32,
}

impl TicketPool {
    /// Fresh pool for a newly registered identity.
    pub fn new(day: u32) -> Self {
        Self {
            daily: MAX_DAILY_TICKETS,
            star: 0,
            last_reset_day: day,
        }
    }

    /// Apply the daily-reset transition for `day`. Returns whether the pool
    /// changed. Idempotent when re-applied within the same day, and a no-op
    /// for stale (earlier) days so the reset date never moves backwards.
    pub fn refresh(&mut self, day: u32) -> bool {
        if day <= self.last_reset_day {
            return false;
        }
        self.daily = MAX_DAILY_TICKETS;
        self.last_reset_day = day;
        true
    }

    pub fn total(&self) -> u32 {
        self.daily.saturating_add(self.star)
    }

    pub fn can_play(&self) -> bool {
        self.total() > 0
    }
}

impl Write for TicketPool {
    fn write(&self, writer: &mut impl BufMut) {
        self.daily.write(writer);
        self.star.write(writer);
        self.last_reset_day.write(writer);
    }
}

impl Read for TicketPool {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            daily: u32::read(reader)?,
            star: u32::read(reader)?,
            last_reset_day: u32::read(reader)?,
        })
    }
}

impl FixedSize for TicketPool {
    const SIZE: usize = u32::SIZE * 3;
}

/// One authorized play attempt awaiting its submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSession {
    pub token: SessionToken,
    pub identity: Identity,
    /// Raw game-type string as requested; sessions are issued for unknown
    /// games too (fail-open registry).
    pub game_type: String,
    pub issued_at_ms: u64,
    pub expires_at_ms: u64,
    pub consumed: bool,
}

impl GameSession {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at_ms
    }
}

impl Write for GameSession {
    fn write(&self, writer: &mut impl BufMut) {
        self.token.write(writer);
        self.identity.write(writer);
        write_string(&self.game_type, writer);
        self.issued_at_ms.write(writer);
        self.expires_at_ms.write(writer);
        self.consumed.write(writer);
    }
}

impl Read for GameSession {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            token: SessionToken::read(reader)?,
            identity: Identity::read(reader)?,
            game_type: read_string(reader, MAX_GAME_TYPE_LENGTH)?,
            issued_at_ms: u64::read(reader)?,
            expires_at_ms: u64::read(reader)?,
            consumed: bool::read(reader)?,
        })
    }
}

impl EncodeSize for GameSession {
    fn encode_size(&self) -> usize {
        self.token.encode_size()
            + self.identity.encode_size()
            + string_encode_size(&self.game_type)
            + self.issued_at_ms.encode_size()
            + self.expires_at_ms.encode_size()
            + self.consumed.encode_size()
    }
}

/// Recent submission timestamps, used by the rate limiter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayHistory {
    pub played_at_ms: Vec<u64>,
}

impl PlayHistory {
    /// Record a play and drop everything outside the trailing 24h window.
    pub fn record(&mut self, now_ms: u64) {
        self.played_at_ms.push(now_ms);
        self.prune(now_ms);
    }

    pub fn prune(&mut self, now_ms: u64) {
        let cutoff = now_ms.saturating_sub(MS_PER_DAY);
        self.played_at_ms.retain(|&t| t >= cutoff);
        if self.played_at_ms.len() > MAX_HISTORY_ENTRIES {
            let excess = self.played_at_ms.len() - MAX_HISTORY_ENTRIES;
            self.played_at_ms.drain(..excess);
        }
    }
}

impl Write for PlayHistory {
    fn write(&self, writer: &mut impl BufMut) {
        self.played_at_ms.write(writer);
    }
}

impl Read for PlayHistory {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            played_at_ms: Vec::<u64>::read_range(reader, 0..=MAX_HISTORY_ENTRIES)?,
        })
    }
}

impl EncodeSize for PlayHistory {
    fn encode_size(&self) -> usize {
        self.played_at_ms.encode_size()
    }
}

/// Registered identity: CLUB balance and record counter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerProfile {
    pub club_balance: u64,
    pub games_played: u64,
    pub created_at_ms: u64,
}

impl Write for PlayerProfile {
    fn write(&self, writer: &mut impl BufMut) {
        self.club_balance.write(writer);
        self.games_played.write(writer);
        self.created_at_ms.write(writer);
    }
}

impl Read for PlayerProfile {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            club_balance: u64::read(reader)?,
            games_played: u64::read(reader)?,
            created_at_ms: u64::read(reader)?,
        })
    }
}

impl FixedSize for PlayerProfile {
    const SIZE: usize = u64::SIZE * 3;
}

/// Reward breakdown for one validated game, staged exactly as computed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RewardBreakdown {
    pub base: u64,
    pub fever_bonus: u64,
    pub perfect_bonus: u64,
    pub coin_bonus: u64,
    pub difficulty_multiplier_bps: u64,
    /// Capped total actually credited.
    pub total: u64,
}

impl Write for RewardBreakdown {
    fn write(&self, writer: &mut impl BufMut) {
        self.base.write(writer);
        self.fever_bonus.write(writer);
        self.perfect_bonus.write(writer);
        self.coin_bonus.write(writer);
        self.difficulty_multiplier_bps.write(writer);
        self.total.write(writer);
    }
}

impl Read for RewardBreakdown {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            base: u64::read(reader)?,
            fever_bonus: u64::read(reader)?,
            perfect_bonus: u64::read(reader)?,
            coin_bonus: u64::read(reader)?,
            difficulty_multiplier_bps: u64::read(reader)?,
            total: u64::read(reader)?,
        })
    }
}

impl FixedSize for RewardBreakdown {
    const SIZE: usize = u64::SIZE * 6;
}

/// A validated, persisted game result. Immutable once written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameRecord {
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
    pub session_token: Option<SessionToken>,
    /// Whether the session token was consumed successfully. Unverified
    /// records are persisted but flagged for abuse monitoring.
    pub session_verified: bool,
    pub validation_warnings: Vec<String>,
    pub played_at_ms: u64,
}

impl Write for GameRecord {
    fn write(&self, writer: &mut impl BufMut) {
        write_string(&self.game_type, writer);
        self.score.write(writer);
        self.distance.write(writer);
        self.time_ms.write(writer);
        self.fever_count.write(writer);
        self.perfect_count.write(writer);
        self.coin_count.write(writer);
        self.potion_count.write(writer);
        self.difficulty.write(writer);
        self.reward.write(writer);
        self.session_token.write(writer);
        self.session_verified.write(writer);
        (self.validation_warnings.len() as u32).write(writer);
        for warning in &self.validation_warnings {
            write_string(warning, writer);
        }
        self.played_at_ms.write(writer);
    }
}

impl Read for GameRecord {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let game_type = read_string(reader, MAX_GAME_TYPE_LENGTH)?;
        let score = u64::read(reader)?;
        let distance = u64::read(reader)?;
        let time_ms = u64::read(reader)?;
        let fever_count = u32::read(reader)?;
        let perfect_count = u32::read(reader)?;
        let coin_count = u32::read(reader)?;
        let potion_count = u32::read(reader)?;
        let difficulty = Difficulty::read(reader)?;
        let reward = RewardBreakdown::read(reader)?;
        let session_token = Option::<SessionToken>::read(reader)?;
        let session_verified = bool::read(reader)?;
        let warning_count = u32::read(reader)? as usize;
        if warning_count > MAX_WARNINGS {
            return Err(Error::Invalid("GameRecord", "too many warnings"));
        }
        let mut validation_warnings = Vec::with_capacity(warning_count);
        for _ in 0..warning_count {
            validation_warnings.push(read_string(reader, MAX_WARNING_LENGTH)?);
        }
        let played_at_ms = u64::read(reader)?;
        Ok(Self {
            game_type,
            score,
            distance,
            time_ms,
            fever_count,
            perfect_count,
            coin_count,
            potion_count,
            difficulty,
            reward,
            session_token,
            session_verified,
            validation_warnings,
            played_at_ms,
        })
    }
}

impl EncodeSize for GameRecord {
    fn encode_size(&self) -> usize {
        string_encode_size(&self.game_type)
            + self.score.encode_size()
            + self.distance.encode_size()
            + self.time_ms.encode_size()
            + self.fever_count.encode_size()
            + self.perfect_count.encode_size()
            + self.coin_count.encode_size()
            + self.potion_count.encode_size()
            + self.difficulty.encode_size()
            + self.reward.encode_size()
            + self.session_token.encode_size()
            + self.session_verified.encode_size()
            + 4
            + self
                .validation_warnings
                .iter()
                .map(|w| string_encode_size(w))
                .sum::<usize>()
            + self.played_at_ms.encode_size()
    }
}

/// The referral relation, keyed in the store by the referred identity.
/// Set at most once; never self-referencing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferralEdge {
    pub referrer: Identity,
    pub created_at_ms: u64,
}

impl Write for ReferralEdge {
    fn write(&self, writer: &mut impl BufMut) {
        self.referrer.write(writer);
        self.created_at_ms.write(writer);
    }
}

impl Read for ReferralEdge {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            referrer: Identity::read(reader)?,
            created_at_ms: u64::read(reader)?,
        })
    }
}

impl FixedSize for ReferralEdge {
    const SIZE: usize = Identity::SIZE + u64::SIZE;
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt, Encode};

    #[test]
    fn test_game_type_parse() {
        assert_eq!(GameType::parse("dash-trials"), Some(GameType::DashTrials));
        assert_eq!(GameType::parse("coin-rush"), Some(GameType::CoinRush));
        assert_eq!(GameType::parse("moon-surf"), None);
        for game in GameType::ALL {
            assert_eq!(GameType::parse(game.as_str()), Some(game));
        }
    }

    #[test]
    fn test_ticket_refresh_is_idempotent_same_day() {
        let mut pool = TicketPool::new(100);
        pool.daily = 1;
        pool.star = 2;
        assert!(pool.refresh(101));
        assert_eq!(pool.daily, MAX_DAILY_TICKETS);
        assert_eq!(pool.star, 2);
        assert_eq!(pool.last_reset_day, 101);

        // Same day again: nothing moves.
        pool.daily = 3;
        assert!(!pool.refresh(101));
        assert_eq!(pool.daily, 3);
    }

    #[test]
    fn test_ticket_refresh_ignores_stale_day() {
        let mut pool = TicketPool::new(100);
        pool.daily = 0;
        assert!(!pool.refresh(99));
        assert_eq!(pool.daily, 0);
        assert_eq!(pool.last_reset_day, 100);
    }

    #[test]
    fn test_ticket_total_saturates() {
        let pool = TicketPool {
            daily: MAX_DAILY_TICKETS,
            star: u32::MAX,
            last_reset_day: 0,
        };
        assert_eq!(pool.total(), u32::MAX);
        assert!(pool.can_play());
    }

    #[test]
    fn test_history_prunes_outside_day_window() {
        let mut history = PlayHistory::default();
        history.record(1_000);
        history.record(MS_PER_DAY + 500);
        history.record(MS_PER_DAY + 2_000);
        assert_eq!(history.played_at_ms, vec![MS_PER_DAY + 500, MS_PER_DAY + 2_000]);
    }

    #[test]
    fn test_record_codec_round_trip() {
        let record = GameRecord {
            game_type: "dash-trials".to_string(),
            score: 1_000,
            distance: 1_000,
            time_ms: 60_000,
            fever_count: 2,
            perfect_count: 5,
            coin_count: 10,
            potion_count: 1,
            difficulty: Difficulty::Medium,
            reward: RewardBreakdown {
                base: 10,
                fever_bonus: 2,
                perfect_bonus: 0,
                coin_bonus: 0,
                difficulty_multiplier_bps: 10_000,
                total: 12,
            },
            session_token: Some(SessionToken([9u8; 32])),
            session_verified: true,
            validation_warnings: vec!["score/distance mismatch".to_string()],
            played_at_ms: 1_700_000_000_000,
        };
        let decoded = GameRecord::decode(record.encode()).expect("decode");
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_session_codec_round_trip() {
        let session = GameSession {
            token: SessionToken([1u8; 32]),
            identity: Identity([2u8; 32]),
            game_type: "dash-trials".to_string(),
            issued_at_ms: 5_000,
            expires_at_ms: 5_000 + SESSION_TTL_MS,
            consumed: false,
        };
        let decoded = GameSession::decode(session.encode()).expect("decode");
        assert_eq!(decoded, session);
    }
}
