use anyhow::Result;
use dashrun_types::{
    GameSession, Key, PlayHistory, PlayerProfile, ReferralEdge, SessionToken, TicketPool, Value,
};
use dashrun_types::{GameRecord, Identity};
use std::collections::HashMap;
use std::future::Future;

/// Row-oriented key/value store the engine runs against.
///
/// The engine never relies on cross-key transactions: every check-then-act
/// sequence runs under an advisory lock (see [`crate::locks`]), so a backend
/// only needs per-call atomicity. Backends: [`Memory`] for local/dev use and
/// the SQLite store in the service binary for durable deployments; one is
/// selected at startup and never mixed at runtime.
pub trait Store: Send + Sync {
    fn get(&self, key: &Key) -> impl Future<Output = Result<Option<Value>>> + Send;
    fn insert(&mut self, key: Key, value: Value) -> impl Future<Output = Result<()>> + Send;
    fn delete(&mut self, key: &Key) -> impl Future<Output = Result<()>> + Send;
}

/// Ephemeral in-memory store.
#[derive(Default)]
pub struct Memory {
    state: HashMap<Key, Value>,
}

impl Store for Memory {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(self.state.get(key).cloned())
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.state.insert(key, value);
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.state.remove(key);
        Ok(())
    }
}

pub(crate) async fn load_profile<S: Store>(
    store: &S,
    identity: &Identity,
) -> Result<Option<PlayerProfile>> {
    Ok(match store.get(&Key::Profile(*identity)).await? {
        Some(Value::Profile(profile)) => Some(profile),
        _ => None,
    })
}

pub(crate) async fn load_tickets<S: Store>(
    store: &S,
    identity: &Identity,
) -> Result<Option<TicketPool>> {
    Ok(match store.get(&Key::Tickets(*identity)).await? {
        Some(Value::Tickets(pool)) => Some(pool),
        _ => None,
    })
}

pub(crate) async fn load_history<S: Store>(store: &S, identity: &Identity) -> Result<PlayHistory> {
    Ok(match store.get(&Key::History(*identity)).await? {
        Some(Value::History(history)) => history,
        _ => PlayHistory::default(),
    })
}

pub(crate) async fn load_session<S: Store>(
    store: &S,
    token: &SessionToken,
) -> Result<Option<GameSession>> {
    Ok(match store.get(&Key::Session(*token)).await? {
        Some(Value::Session(session)) => Some(session),
        _ => None,
    })
}

pub(crate) async fn load_referral<S: Store>(
    store: &S,
    identity: &Identity,
) -> Result<Option<ReferralEdge>> {
    Ok(match store.get(&Key::Referral(*identity)).await? {
        Some(Value::Referral(edge)) => Some(edge),
        _ => None,
    })
}

pub(crate) async fn load_record<S: Store>(
    store: &S,
    identity: &Identity,
    seq: u64,
) -> Result<Option<GameRecord>> {
    Ok(match store.get(&Key::Record(*identity, seq)).await? {
        Some(Value::Record(record)) => Some(record),
        _ => None,
    })
}
