//! Revenue-share propagation to referrers.
//!
//! Both entry points are idempotent per triggering event: a marker row keyed
//! by the event digest is written alongside the credit, and a retried event
//! that finds its marker is a no-op. Absence of a referrer is not an error.

use crate::store::{load_profile, load_referral, Store};
use anyhow::Result;
use commonware_cryptography::{Hasher, Sha256};
use dashrun_types::{EventId, Identity, Key, Value};
use tracing::warn;

/// Share of referred earnings credited to the referrer, in percent.
pub const EARNING_SHARE_PCT: u64 = 1;

/// CLUB credited to the referrer per USD of a referred purchase.
pub const PURCHASE_CLUB_PER_USD: u64 = 10;

fn digest_event(parts: &[&[u8]]) -> EventId {
    let mut payload = Vec::new();
    for part in parts {
        payload.extend_from_slice(part);
    }
    let digest = Sha256::hash(&payload);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(digest.as_ref());
    EventId(bytes)
}

/// Event id for the reward payout of one persisted record. Ties the
/// propagation to the record, so a retried submission pipeline cannot
/// double-credit the referrer.
pub fn earn_event_id(identity: &Identity, record_seq: u64) -> EventId {
    digest_event(&[b"club-earned", identity.as_bytes(), &record_seq.to_be_bytes()])
}

/// Event id for a completed purchase, derived from the payment reference.
pub fn purchase_event_id(identity: &Identity, payment_ref: &str) -> EventId {
    digest_event(&[b"purchase", identity.as_bytes(), payment_ref.as_bytes()])
}

async fn claim_event<S: Store>(store: &mut S, event: EventId) -> Result<bool> {
    if store.get(&Key::RevenueEvent(event)).await?.is_some() {
        return Ok(false);
    }
    store.insert(Key::RevenueEvent(event), Value::Marker).await?;
    Ok(true)
}

async fn credit_referrer<S: Store>(
    store: &mut S,
    referrer: &Identity,
    amount: u64,
) -> Result<bool> {
    let mut profile = match load_profile(store, referrer).await? {
        Some(profile) => profile,
        None => {
            warn!(referrer = %referrer, "referrer has no profile; dropping revenue share");
            return Ok(false);
        }
    };
    profile.club_balance = profile.club_balance.saturating_add(amount);
    store
        .insert(Key::Profile(*referrer), Value::Profile(profile))
        .await?;
    Ok(true)
}

/// Credit the referrer their share of a referred identity's CLUB earnings.
/// Returns the `(referrer, share)` actually credited, if any. Caller must
/// hold the triggering identity's advisory lock (the event claim is a
/// check-then-act).
pub async fn on_club_earned<S: Store>(
    store: &mut S,
    identity: &Identity,
    amount: u64,
    event: EventId,
) -> Result<Option<(Identity, u64)>> {
    if amount == 0 {
        return Ok(None);
    }
    let edge = match load_referral(store, identity).await? {
        Some(edge) => edge,
        None => return Ok(None),
    };
    let share = amount.saturating_mul(EARNING_SHARE_PCT) / 100;
    if share == 0 {
        return Ok(None);
    }
    if !claim_event(store, event).await? {
        return Ok(None);
    }
    if !credit_referrer(store, &edge.referrer, share).await? {
        return Ok(None);
    }
    Ok(Some((edge.referrer, share)))
}

/// Credit the referrer for a referred identity's verified purchase:
/// `round(usd * PURCHASE_CLUB_PER_USD)` CLUB, with `usd` given in cents.
pub async fn on_purchase_completed<S: Store>(
    store: &mut S,
    identity: &Identity,
    usd_cents: u64,
    event: EventId,
) -> Result<Option<(Identity, u64)>> {
    if usd_cents == 0 {
        return Ok(None);
    }
    let edge = match load_referral(store, identity).await? {
        Some(edge) => edge,
        None => return Ok(None),
    };
    let share = (usd_cents.saturating_mul(PURCHASE_CLUB_PER_USD) + 50) / 100;
    if share == 0 {
        return Ok(None);
    }
    if !claim_event(store, event).await? {
        return Ok(None);
    }
    if !credit_referrer(store, &edge.referrer, share).await? {
        return Ok(None);
    }
    Ok(Some((edge.referrer, share)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Memory;
    use dashrun_types::{PlayerProfile, ReferralEdge};

    fn referred() -> Identity {
        Identity([1u8; 32])
    }

    fn referrer() -> Identity {
        Identity([2u8; 32])
    }

    async fn setup() -> Memory {
        let mut store = Memory::default();
        store
            .insert(
                Key::Profile(referrer()),
                Value::Profile(PlayerProfile::default()),
            )
            .await
            .expect("insert");
        store
            .insert(
                Key::Referral(referred()),
                Value::Referral(ReferralEdge {
                    referrer: referrer(),
                    created_at_ms: 0,
                }),
            )
            .await
            .expect("insert");
        store
    }

    async fn referrer_balance(store: &Memory) -> u64 {
        load_profile(store, &referrer())
            .await
            .expect("load")
            .expect("profile")
            .club_balance
    }

    #[tokio::test]
    async fn test_earn_share_one_percent_floored() {
        let mut store = setup().await;
        let event = earn_event_id(&referred(), 0);
        let credited = on_club_earned(&mut store, &referred(), 250, event)
            .await
            .expect("store");
        assert_eq!(credited, Some((referrer(), 2)));
        assert_eq!(referrer_balance(&store).await, 2);
    }

    #[tokio::test]
    async fn test_earn_share_rounds_to_zero_is_noop() {
        let mut store = setup().await;
        let event = earn_event_id(&referred(), 0);
        // 1% of 99 floors to 0: no credit and, importantly, no event claim.
        let credited = on_club_earned(&mut store, &referred(), 99, event)
            .await
            .expect("store");
        assert_eq!(credited, None);
        assert_eq!(referrer_balance(&store).await, 0);
    }

    #[tokio::test]
    async fn test_earn_idempotent_per_event() {
        let mut store = setup().await;
        let event = earn_event_id(&referred(), 7);
        let first = on_club_earned(&mut store, &referred(), 1_000, event)
            .await
            .expect("store");
        assert_eq!(first, Some((referrer(), 10)));

        let retry = on_club_earned(&mut store, &referred(), 1_000, event)
            .await
            .expect("store");
        assert_eq!(retry, None);
        assert_eq!(referrer_balance(&store).await, 10);

        // A different record sequence is a different event.
        let other = on_club_earned(&mut store, &referred(), 1_000, earn_event_id(&referred(), 8))
            .await
            .expect("store");
        assert_eq!(other, Some((referrer(), 10)));
        assert_eq!(referrer_balance(&store).await, 20);
    }

    #[tokio::test]
    async fn test_no_referrer_is_not_an_error() {
        let mut store = Memory::default();
        let credited = on_club_earned(
            &mut store,
            &Identity([9u8; 32]),
            1_000,
            earn_event_id(&Identity([9u8; 32]), 0),
        )
        .await
        .expect("store");
        assert_eq!(credited, None);
    }

    #[tokio::test]
    async fn test_purchase_share_rounds_half_up() {
        let mut store = setup().await;
        // $4.99 -> 49.9 CLUB -> rounds to 50.
        let credited = on_purchase_completed(
            &mut store,
            &referred(),
            499,
            purchase_event_id(&referred(), "pay-1"),
        )
        .await
        .expect("store");
        assert_eq!(credited, Some((referrer(), 50)));

        // Same payment reference replayed: no-op.
        let retry = on_purchase_completed(
            &mut store,
            &referred(),
            499,
            purchase_event_id(&referred(), "pay-1"),
        )
        .await
        .expect("store");
        assert_eq!(retry, None);
        assert_eq!(referrer_balance(&store).await, 50);
    }
}
