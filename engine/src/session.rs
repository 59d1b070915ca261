//! Session-token lifecycle: one authorized play, one future submission.

use crate::store::{load_session, Store};
use anyhow::Result;
use dashrun_types::{GameSession, Identity, Key, SessionToken, Value, SESSION_TTL_MS};
use rand::RngCore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,
    #[error("session expired")]
    Expired,
    #[error("session already used")]
    AlreadyUsed,
    #[error("session does not match this identity and game")]
    Mismatch,
}

/// Build a fresh session with a cryptographically random 256-bit token.
pub fn new_session(identity: Identity, game_type: &str, now_ms: u64) -> GameSession {
    let mut token = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut token);
    GameSession {
        token: SessionToken(token),
        identity,
        game_type: game_type.to_string(),
        issued_at_ms: now_ms,
        expires_at_ms: now_ms + SESSION_TTL_MS,
        consumed: false,
    }
}

/// Persist a freshly issued session. Caller must have already debited a
/// ticket (consume-then-issue ordering).
pub async fn issue<S: Store>(store: &mut S, session: &GameSession) -> Result<()> {
    store
        .insert(Key::Session(session.token), Value::Session(session.clone()))
        .await
}

/// Single-use consume: check-and-set on the `consumed` flag.
///
/// Must run under the token's advisory lock so that concurrent submissions
/// racing on the same token have exactly one winner. The outer `Result` is
/// store failure; the inner one is the policy outcome.
pub async fn consume<S: Store>(
    store: &mut S,
    token: &SessionToken,
    identity: &Identity,
    game_type: &str,
    now_ms: u64,
) -> Result<Result<(), SessionError>> {
    let mut session = match load_session(store, token).await? {
        Some(session) => session,
        None => return Ok(Err(SessionError::NotFound)),
    };
    if session.consumed {
        return Ok(Err(SessionError::AlreadyUsed));
    }
    if session.is_expired(now_ms) {
        return Ok(Err(SessionError::Expired));
    }
    if session.identity != *identity || session.game_type != game_type {
        return Ok(Err(SessionError::Mismatch));
    }
    session.consumed = true;
    store
        .insert(Key::Session(*token), Value::Session(session))
        .await?;
    Ok(Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Memory;

    const NOW: u64 = 1_700_000_000_000;

    fn identity() -> Identity {
        Identity([1u8; 32])
    }

    #[tokio::test]
    async fn test_consume_once_then_already_used() {
        let mut store = Memory::default();
        let session = new_session(identity(), "dash-trials", NOW);
        issue(&mut store, &session).await.expect("issue");

        let first = consume(&mut store, &session.token, &identity(), "dash-trials", NOW + 1)
            .await
            .expect("store");
        assert_eq!(first, Ok(()));

        // Every subsequent attempt fails the same way, forever.
        for _ in 0..3 {
            let replay =
                consume(&mut store, &session.token, &identity(), "dash-trials", NOW + 2)
                    .await
                    .expect("store");
            assert_eq!(replay, Err(SessionError::AlreadyUsed));
        }
    }

    #[tokio::test]
    async fn test_consume_unknown_token() {
        let mut store = Memory::default();
        let result = consume(
            &mut store,
            &SessionToken([9u8; 32]),
            &identity(),
            "dash-trials",
            NOW,
        )
        .await
        .expect("store");
        assert_eq!(result, Err(SessionError::NotFound));
    }

    #[tokio::test]
    async fn test_consume_expired() {
        let mut store = Memory::default();
        let session = new_session(identity(), "dash-trials", NOW);
        issue(&mut store, &session).await.expect("issue");

        let at_expiry = consume(
            &mut store,
            &session.token,
            &identity(),
            "dash-trials",
            session.expires_at_ms,
        )
        .await
        .expect("store");
        assert_eq!(at_expiry, Ok(()), "expiry boundary is inclusive");

        let session = new_session(identity(), "dash-trials", NOW);
        issue(&mut store, &session).await.expect("issue");
        let past_expiry = consume(
            &mut store,
            &session.token,
            &identity(),
            "dash-trials",
            session.expires_at_ms + 1,
        )
        .await
        .expect("store");
        assert_eq!(past_expiry, Err(SessionError::Expired));
    }

    #[tokio::test]
    async fn test_consume_mismatch() {
        let mut store = Memory::default();
        let session = new_session(identity(), "dash-trials", NOW);
        issue(&mut store, &session).await.expect("issue");

        let wrong_game = consume(&mut store, &session.token, &identity(), "coin-rush", NOW)
            .await
            .expect("store");
        assert_eq!(wrong_game, Err(SessionError::Mismatch));

        let wrong_identity = consume(
            &mut store,
            &session.token,
            &Identity([2u8; 32]),
            "dash-trials",
            NOW,
        )
        .await
        .expect("store");
        assert_eq!(wrong_identity, Err(SessionError::Mismatch));

        // Mismatches do not burn the session.
        let ok = consume(&mut store, &session.token, &identity(), "dash-trials", NOW)
            .await
            .expect("store");
        assert_eq!(ok, Ok(()));
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = new_session(identity(), "dash-trials", NOW);
        let b = new_session(identity(), "dash-trials", NOW);
        assert_ne!(a.token, b.token);
    }
}
