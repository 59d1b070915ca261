//! HTTP surface: thin JSON handlers over [`Engine`].
//!
//! Handlers read the wall clock once at entry and hand `now_ms` to the
//! engine; everything below this layer is clock-free.

use crate::sqlite::ServiceStore;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dashrun_engine::{Engine, EngineError, GameSubmission};
use dashrun_types::api::{
    BindReferralRequest, ErrorResponse, IssueSessionRequest, IssueSessionResponse,
    PurchaseCompletedRequest, RecordGameRequest, RecordGameResponse, RecordView, RegisterRequest,
    RegisterResponse, Rewards, TicketStatusResponse, UseTicketRequest, UseTicketResponse,
};
use dashrun_types::Identity;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine<ServiceStore>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/player/register", post(register))
        .route("/session/issue", post(issue_session))
        .route("/ticket/use", post(use_ticket))
        .route("/ticket/status", get(ticket_status))
        .route("/game/record", post(record_game))
        .route("/referral/bind", post(bind_referral))
        .route("/purchase/complete", post(purchase_complete))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, reasons) = match &self.0 {
            EngineError::IdentityNotFound => {
                (StatusCode::NOT_FOUND, "identity_not_found", Vec::new())
            }
            EngineError::AlreadyRegistered => {
                (StatusCode::CONFLICT, "already_registered", Vec::new())
            }
            EngineError::InvalidGameType => {
                (StatusCode::BAD_REQUEST, "invalid_game_type", Vec::new())
            }
            EngineError::RateLimited(violations) => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                violations.iter().map(|v| v.to_string()).collect(),
            ),
            EngineError::NoTicketsRemaining => {
                (StatusCode::FORBIDDEN, "no_tickets_remaining", Vec::new())
            }
            EngineError::InvalidAmount => (StatusCode::BAD_REQUEST, "invalid_amount", Vec::new()),
            EngineError::SubmissionRejected(errors) => (
                StatusCode::FORBIDDEN,
                "submission_rejected",
                errors.clone(),
            ),
            EngineError::SessionRejected(err) => (
                StatusCode::FORBIDDEN,
                "session_rejected",
                vec![err.to_string()],
            ),
            EngineError::SelfReferral => (StatusCode::BAD_REQUEST, "self_referral", Vec::new()),
            EngineError::ReferrerAlreadySet => {
                (StatusCode::CONFLICT, "referrer_already_set", Vec::new())
            }
            EngineError::Store(err) => {
                tracing::error!(error = ?err, "store failure");
                (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", Vec::new())
            }
        };
        let body = ErrorResponse {
            error: code.to_string(),
            reasons,
        };
        (status, Json(body)).into_response()
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let (profile, pool) = state
        .engine
        .register_player(request.identity, now_ms())
        .await?;
    Ok(Json(RegisterResponse {
        identity: request.identity,
        club_balance: profile.club_balance,
        daily_tickets: pool.daily,
        star_tickets: pool.star,
    }))
}

async fn issue_session(
    State(state): State<AppState>,
    Json(request): Json<IssueSessionRequest>,
) -> Result<Json<IssueSessionResponse>, ApiError> {
    let session = state
        .engine
        .issue_session(request.identity, &request.game_type, now_ms())
        .await?;
    Ok(Json(IssueSessionResponse {
        token: session.token,
        expires_at_ms: session.expires_at_ms,
    }))
}

async fn use_ticket(
    State(state): State<AppState>,
    Json(request): Json<UseTicketRequest>,
) -> Result<Json<UseTicketResponse>, ApiError> {
    match state.engine.use_ticket(request.identity, now_ms()).await {
        Ok((used, status)) => Ok(Json(UseTicketResponse {
            success: true,
            daily_tickets: status.daily,
            star_tickets: status.star,
            total_tickets: status.daily.saturating_add(status.star),
            used_type: Some(used),
        })),
        // Exhaustion keeps the success shape so the client can show the
        // remaining (zero) counts.
        Err(EngineError::NoTicketsRemaining) => Ok(Json(UseTicketResponse {
            success: false,
            daily_tickets: 0,
            star_tickets: 0,
            total_tickets: 0,
            used_type: None,
        })),
        Err(err) => Err(err.into()),
    }
}

#[derive(Deserialize)]
struct TicketStatusParams {
    identity: Identity,
}

async fn ticket_status(
    State(state): State<AppState>,
    Query(params): Query<TicketStatusParams>,
) -> Result<Json<TicketStatusResponse>, ApiError> {
    let status = state
        .engine
        .ticket_status(params.identity, now_ms())
        .await?;
    Ok(Json(TicketStatusResponse {
        daily_tickets: status.daily,
        star_tickets: status.star,
        total_tickets: status.daily.saturating_add(status.star),
        can_play: status.can_play,
    }))
}

async fn record_game(
    State(state): State<AppState>,
    Json(request): Json<RecordGameRequest>,
) -> Result<Json<RecordGameResponse>, ApiError> {
    let submission = GameSubmission {
        identity: request.identity,
        game_type: request.game_type,
        score: request.score,
        distance: request.distance,
        time_ms: request.time_ms,
        fever_count: request.fever_count,
        perfect_count: request.perfect_count,
        coin_count: request.coin_count,
        potion_count: request.potion_count,
        difficulty: request.difficulty,
        session_token: request.session_token,
    };
    let outcome = state.engine.record_game(submission, now_ms()).await?;
    Ok(Json(RecordGameResponse {
        rewards: Rewards {
            club: outcome.record.reward.total,
        },
        record: RecordView::from(&outcome.record),
    }))
}

async fn bind_referral(
    State(state): State<AppState>,
    Json(request): Json<BindReferralRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .engine
        .set_referrer(request.referrer, request.referred, now_ms())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn purchase_complete(
    State(state): State<AppState>,
    Json(request): Json<PurchaseCompletedRequest>,
) -> Result<Json<TicketStatusResponse>, ApiError> {
    let status = state
        .engine
        .purchase_completed(
            request.identity,
            request.usd_cents,
            request.star_tickets,
            &request.payment_ref,
            now_ms(),
        )
        .await?;
    Ok(Json(TicketStatusResponse {
        daily_tickets: status.daily,
        star_tickets: status.star,
        total_tickets: status.daily.saturating_add(status.star),
        can_play: status.can_play,
    }))
}
