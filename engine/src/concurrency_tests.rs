//! Linearizability tests for the two check-and-set hot spots: ticket
//! consumption and session consumption. N racing requests against one
//! remaining ticket (or one fresh token) must produce exactly one winner.

use crate::engine::{Engine, EngineConfig, EngineError};
use crate::registry::GameRegistry;
use crate::store::Memory;
use crate::validator::GameSubmission;
use dashrun_types::{Difficulty, Identity, MAX_DAILY_TICKETS};
use std::sync::Arc;

const NOW: u64 = 1_700_000_000_000;

fn engine() -> Arc<Engine<Memory>> {
    Arc::new(Engine::new(
        Memory::default(),
        GameRegistry::default(),
        EngineConfig::default(),
    ))
}

fn identity() -> Identity {
    Identity([1u8; 32])
}

#[tokio::test]
async fn test_concurrent_ticket_consume_single_winner() {
    let engine = engine();
    engine
        .register_player(identity(), NOW)
        .await
        .expect("register");

    // Leave exactly one ticket.
    for _ in 0..MAX_DAILY_TICKETS - 1 {
        engine.use_ticket(identity(), NOW).await.expect("consume");
    }

    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        handles.push(tokio::spawn(
            async move { engine.use_ticket(identity(), NOW).await },
        ));
    }

    let mut successes = 0;
    let mut exhausted = 0;
    for handle in handles {
        match handle.await.expect("task") {
            Ok(_) => successes += 1,
            Err(EngineError::NoTicketsRemaining) => exhausted += 1,
            Err(err) => panic!("unexpected error: {err}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(exhausted, 15);

    let status = engine.ticket_status(identity(), NOW).await.expect("status");
    assert_eq!((status.daily, status.star), (0, 0));
}

#[tokio::test]
async fn test_concurrent_session_consume_single_winner() {
    let engine = engine();
    engine
        .register_player(identity(), NOW)
        .await
        .expect("register");
    let session = engine
        .issue_session(identity(), "dash-trials", NOW)
        .await
        .expect("issue");

    // Race replayed submissions carrying the same token. All of them are
    // individually plausible; only one may come back verified.
    let mut handles = Vec::new();
    for i in 0..8u64 {
        let engine = engine.clone();
        let token = session.token;
        handles.push(tokio::spawn(async move {
            let submission = GameSubmission {
                identity: identity(),
                game_type: "dash-trials".to_string(),
                score: 600,
                distance: 600,
                time_ms: 30_000,
                fever_count: 0,
                perfect_count: 0,
                coin_count: 0,
                potion_count: 0,
                difficulty: Difficulty::Medium,
                session_token: Some(token),
            };
            engine.record_game(submission, NOW + 30_000 + i).await
        }));
    }

    let mut verified = 0;
    let mut unverified = 0;
    for handle in handles {
        let outcome = handle.await.expect("task").expect("record");
        if outcome.record.session_verified {
            verified += 1;
        } else {
            unverified += 1;
            assert!(outcome
                .record
                .validation_warnings
                .iter()
                .any(|w| w.contains("session not verified")));
        }
    }
    assert_eq!(verified, 1);
    assert_eq!(unverified, 7);
}

#[tokio::test]
async fn test_concurrent_issue_never_overdraws_tickets() {
    let engine = engine();
    engine
        .register_player(identity(), NOW)
        .await
        .expect("register");

    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.issue_session(identity(), "dash-trials", NOW).await
        }));
    }

    let mut issued = 0;
    for handle in handles {
        match handle.await.expect("task") {
            Ok(_) => issued += 1,
            Err(EngineError::NoTicketsRemaining) => {}
            Err(err) => panic!("unexpected error: {err}"),
        }
    }
    assert_eq!(issued as u32, MAX_DAILY_TICKETS);
}

#[tokio::test]
async fn test_concurrent_registration_single_winner() {
    let engine = engine();
    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        handles.push(tokio::spawn(
            async move { engine.register_player(identity(), NOW).await },
        ));
    }
    let mut created = 0;
    for handle in handles {
        match handle.await.expect("task") {
            Ok(_) => created += 1,
            Err(EngineError::AlreadyRegistered) => {}
            Err(err) => panic!("unexpected error: {err}"),
        }
    }
    assert_eq!(created, 1);
}
