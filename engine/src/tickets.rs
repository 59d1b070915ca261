//! Ticket ledger: daily pool (UTC reset) plus persistent star pool.
//!
//! The daily reset is an explicit transition ([`TicketPool::refresh`])
//! applied inside the same identity-locked section as the read or consume
//! that observed the stale date, never a bare read-path side effect, so
//! concurrent calls cannot lose the update.

use crate::store::{load_tickets, Store};
use anyhow::Result;
use dashrun_types::{Identity, Key, TicketPool, TicketUse, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TicketError {
    #[error("no tickets remaining")]
    NoTicketsRemaining,
    #[error("invalid amount")]
    InvalidAmount,
}

/// Load the pool, applying (and persisting) the daily reset if the stored
/// date is stale. A missing row materializes as a fresh full pool, which is
/// what a first-ever read should see.
pub async fn refresh_and_load<S: Store>(
    store: &mut S,
    identity: &Identity,
    now_ms: u64,
) -> Result<TicketPool> {
    let day = (now_ms / dashrun_types::MS_PER_DAY) as u32;
    let mut pool = match load_tickets(store, identity).await? {
        Some(pool) => pool,
        None => {
            let pool = TicketPool::new(day);
            store
                .insert(Key::Tickets(*identity), Value::Tickets(pool.clone()))
                .await?;
            return Ok(pool);
        }
    };
    if pool.refresh(day) {
        store
            .insert(Key::Tickets(*identity), Value::Tickets(pool.clone()))
            .await?;
    }
    Ok(pool)
}

/// Consume one ticket, draining the daily pool before touching stars.
///
/// Refresh-then-decrement is one logical transaction: the caller must hold
/// the identity's advisory lock so two concurrent consumes cannot both see
/// the last ticket.
pub async fn consume<S: Store>(
    store: &mut S,
    identity: &Identity,
    now_ms: u64,
) -> Result<Result<(TicketUse, TicketPool), TicketError>> {
    let mut pool = refresh_and_load(store, identity, now_ms).await?;
    let used = if pool.daily > 0 {
        pool.daily -= 1;
        TicketUse::Daily
    } else if pool.star > 0 {
        pool.star -= 1;
        TicketUse::Star
    } else {
        return Ok(Err(TicketError::NoTicketsRemaining));
    };
    store
        .insert(Key::Tickets(*identity), Value::Tickets(pool.clone()))
        .await?;
    Ok(Ok((used, pool)))
}

/// Credit star tickets (purchases, referral bonuses). Daily tickets are
/// never credited; they only refill at the day boundary.
pub async fn credit<S: Store>(
    store: &mut S,
    identity: &Identity,
    amount: u32,
    now_ms: u64,
) -> Result<Result<TicketPool, TicketError>> {
    if amount == 0 {
        return Ok(Err(TicketError::InvalidAmount));
    }
    let mut pool = refresh_and_load(store, identity, now_ms).await?;
    pool.star = pool.star.saturating_add(amount);
    store
        .insert(Key::Tickets(*identity), Value::Tickets(pool.clone()))
        .await?;
    Ok(Ok(pool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Memory;
    use dashrun_types::{MAX_DAILY_TICKETS, MS_PER_DAY};

    const NOW: u64 = 1_700_000_000_000;

    fn identity() -> Identity {
        Identity([1u8; 32])
    }

    #[tokio::test]
    async fn test_first_read_materializes_full_pool() {
        let mut store = Memory::default();
        let pool = refresh_and_load(&mut store, &identity(), NOW)
            .await
            .expect("load");
        assert_eq!(pool.daily, MAX_DAILY_TICKETS);
        assert_eq!(pool.star, 0);
        assert!(pool.can_play());
    }

    #[tokio::test]
    async fn test_daily_drains_before_star() {
        let mut store = Memory::default();
        credit(&mut store, &identity(), 2, NOW)
            .await
            .expect("store")
            .expect("credit");

        for remaining in (0..MAX_DAILY_TICKETS).rev() {
            let (used, pool) = consume(&mut store, &identity(), NOW)
                .await
                .expect("store")
                .expect("consume");
            assert_eq!(used, TicketUse::Daily);
            assert_eq!(pool.daily, remaining);
            assert_eq!(pool.star, 2);
        }
        let (used, pool) = consume(&mut store, &identity(), NOW)
            .await
            .expect("store")
            .expect("consume");
        assert_eq!(used, TicketUse::Star);
        assert_eq!(pool.star, 1);
    }

    #[tokio::test]
    async fn test_star_only_pool_then_exhausted() {
        let mut store = Memory::default();
        // Drain the daily pool.
        for _ in 0..MAX_DAILY_TICKETS {
            consume(&mut store, &identity(), NOW)
                .await
                .expect("store")
                .expect("consume");
        }
        credit(&mut store, &identity(), 1, NOW)
            .await
            .expect("store")
            .expect("credit");

        // {daily: 0, star: 1}: one star consume succeeds, then empty.
        let (used, pool) = consume(&mut store, &identity(), NOW)
            .await
            .expect("store")
            .expect("consume");
        assert_eq!(used, TicketUse::Star);
        assert_eq!((pool.daily, pool.star), (0, 0));

        let result = consume(&mut store, &identity(), NOW).await.expect("store");
        assert_eq!(result, Err(TicketError::NoTicketsRemaining));
    }

    #[tokio::test]
    async fn test_utc_rollover_refills_daily_only() {
        let mut store = Memory::default();
        for _ in 0..MAX_DAILY_TICKETS {
            consume(&mut store, &identity(), NOW)
                .await
                .expect("store")
                .expect("consume");
        }
        credit(&mut store, &identity(), 3, NOW)
            .await
            .expect("store")
            .expect("credit");

        let next_day = (NOW / MS_PER_DAY + 1) * MS_PER_DAY;
        let pool = refresh_and_load(&mut store, &identity(), next_day)
            .await
            .expect("load");
        assert_eq!(pool.daily, MAX_DAILY_TICKETS);
        assert_eq!(pool.star, 3, "star tickets never expire");
    }

    #[tokio::test]
    async fn test_cap_invariant_across_sequences() {
        let mut store = Memory::default();
        let mut now = NOW;
        for step in 0..50u64 {
            match step % 4 {
                0 => {
                    let _ = consume(&mut store, &identity(), now).await.expect("store");
                }
                1 => {
                    let _ = credit(&mut store, &identity(), 1, now).await.expect("store");
                }
                2 => now += MS_PER_DAY / 3,
                _ => {
                    let pool = refresh_and_load(&mut store, &identity(), now)
                        .await
                        .expect("load");
                    assert!(pool.daily <= MAX_DAILY_TICKETS);
                }
            }
            let pool = refresh_and_load(&mut store, &identity(), now)
                .await
                .expect("load");
            assert!(pool.daily <= MAX_DAILY_TICKETS);
        }
    }

    #[tokio::test]
    async fn test_credit_rejects_zero() {
        let mut store = Memory::default();
        let result = credit(&mut store, &identity(), 0, NOW).await.expect("store");
        assert_eq!(result, Err(TicketError::InvalidAmount));
    }
}
