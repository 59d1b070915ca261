use crate::game::{GameRecord, GameSession, PlayHistory, PlayerProfile, ReferralEdge, TicketPool};
use crate::primitives::{EventId, Identity, SessionToken};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};

/// Store key space. One row per key; the store must provide (or the engine
/// must emulate) atomic conditional updates at this granularity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Registered player profile (tag 0)
    Profile(Identity),
    /// Ticket pools and reset date (tag 1)
    Tickets(Identity),
    /// Recent play timestamps for rate limiting (tag 2)
    History(Identity),
    /// Play-authorization session, keyed by token (tag 3)
    Session(SessionToken),
    /// Persisted game record, keyed by (identity, sequence) (tag 4)
    Record(Identity, u64),
    /// Referral edge, keyed by the referred identity (tag 5)
    Referral(Identity),
    /// Idempotency marker for a revenue-share trigger (tag 6)
    RevenueEvent(EventId),
}

impl Write for Key {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Profile(identity) => {
                0u8.write(writer);
                identity.write(writer);
            }
            Self::Tickets(identity) => {
                1u8.write(writer);
                identity.write(writer);
            }
            Self::History(identity) => {
                2u8.write(writer);
                identity.write(writer);
            }
            Self::Session(token) => {
                3u8.write(writer);
                token.write(writer);
            }
            Self::Record(identity, seq) => {
                4u8.write(writer);
                identity.write(writer);
                seq.write(writer);
            }
            Self::Referral(identity) => {
                5u8.write(writer);
                identity.write(writer);
            }
            Self::RevenueEvent(event) => {
                6u8.write(writer);
                event.write(writer);
            }
        }
    }
}

impl Read for Key {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Self::Profile(Identity::read(reader)?)),
            1 => Ok(Self::Tickets(Identity::read(reader)?)),
            2 => Ok(Self::History(Identity::read(reader)?)),
            3 => Ok(Self::Session(SessionToken::read(reader)?)),
            4 => Ok(Self::Record(Identity::read(reader)?, u64::read(reader)?)),
            5 => Ok(Self::Referral(Identity::read(reader)?)),
            6 => Ok(Self::RevenueEvent(EventId::read(reader)?)),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for Key {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Profile(identity) => identity.encode_size(),
            Self::Tickets(identity) => identity.encode_size(),
            Self::History(identity) => identity.encode_size(),
            Self::Session(token) => token.encode_size(),
            Self::Record(identity, seq) => identity.encode_size() + seq.encode_size(),
            Self::Referral(identity) => identity.encode_size(),
            Self::RevenueEvent(event) => event.encode_size(),
        }
    }
}

/// Store value space, mirroring [`Key`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Profile(PlayerProfile),
    Tickets(TicketPool),
    History(PlayHistory),
    Session(GameSession),
    Record(GameRecord),
    Referral(ReferralEdge),
    /// Presence-only marker (revenue events).
    Marker,
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Profile(profile) => {
                0u8.write(writer);
                profile.write(writer);
            }
            Self::Tickets(pool) => {
                1u8.write(writer);
                pool.write(writer);
            }
            Self::History(history) => {
                2u8.write(writer);
                history.write(writer);
            }
            Self::Session(session) => {
                3u8.write(writer);
                session.write(writer);
            }
            Self::Record(record) => {
                4u8.write(writer);
                record.write(writer);
            }
            Self::Referral(edge) => {
                5u8.write(writer);
                edge.write(writer);
            }
            Self::Marker => 6u8.write(writer),
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Self::Profile(PlayerProfile::read(reader)?)),
            1 => Ok(Self::Tickets(TicketPool::read(reader)?)),
            2 => Ok(Self::History(PlayHistory::read(reader)?)),
            3 => Ok(Self::Session(GameSession::read(reader)?)),
            4 => Ok(Self::Record(GameRecord::read(reader)?)),
            5 => Ok(Self::Referral(ReferralEdge::read(reader)?)),
            6 => Ok(Self::Marker),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Profile(profile) => profile.encode_size(),
            Self::Tickets(pool) => pool.encode_size(),
            Self::History(history) => history.encode_size(),
            Self::Session(session) => session.encode_size(),
            Self::Record(record) => record.encode_size(),
            Self::Referral(edge) => edge.encode_size(),
            Self::Marker => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt, Encode};

    #[test]
    fn test_key_codec_round_trip() {
        let keys = [
            Key::Profile(Identity([1u8; 32])),
            Key::Tickets(Identity([2u8; 32])),
            Key::History(Identity([3u8; 32])),
            Key::Session(SessionToken([4u8; 32])),
            Key::Record(Identity([5u8; 32]), 42),
            Key::Referral(Identity([6u8; 32])),
            Key::RevenueEvent(EventId([7u8; 32])),
        ];
        for key in keys {
            let decoded = Key::decode(key.encode()).expect("decode");
            assert_eq!(decoded, key);
        }
    }

    #[test]
    fn test_value_marker_round_trip() {
        let decoded = Value::decode(Value::Marker.encode()).expect("decode");
        assert_eq!(decoded, Value::Marker);
    }
}
