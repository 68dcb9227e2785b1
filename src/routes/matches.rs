use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::core::ServiceError;
use crate::models::{
    GetLikersQuery, GetMatchAccountsQuery, HealthResponse, MatchAction, MatchActionRequest,
    MatchResultResponse, PageResponse,
};
use crate::routes::{AccountId, AppState};

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/match/accounts", web::get().to(matchable_accounts))
        .route("/match/likers", web::get().to(account_likers))
        .route("/match/{action}", web::post().to(match_action));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.database.health_check().await.unwrap_or(false);

    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Candidate feed
///
/// GET /api/v1/match/accounts?limit=20
async fn matchable_accounts(
    state: web::Data<AppState>,
    account: AccountId,
    query: web::Query<GetMatchAccountsQuery>,
) -> Result<HttpResponse, ServiceError> {
    query.validate()?;
    let limit = state.matching.clamp_limit(query.limit);

    tracing::info!("Finding candidates for account: {}, limit: {}", account.0, limit);

    let page = state.engine.matchable_accounts(account.0, limit).await?;
    Ok(HttpResponse::Ok().json(PageResponse::from(page)))
}

/// Accounts that liked the caller
///
/// GET /api/v1/match/likers?offset=0&limit=20
async fn account_likers(
    state: web::Data<AppState>,
    account: AccountId,
    query: web::Query<GetLikersQuery>,
) -> Result<HttpResponse, ServiceError> {
    query.validate()?;
    let limit = state.matching.clamp_limit(query.limit);

    let page = state
        .engine
        .account_likers(account.0, query.offset, limit)
        .await?;
    Ok(HttpResponse::Ok().json(PageResponse::from(page)))
}

/// Like or dislike a candidate
///
/// POST /api/v1/match/{like|dislike}
///
/// Request body:
/// ```json
/// { "targetId": 20 }
/// ```
async fn match_action(
    state: web::Data<AppState>,
    account: AccountId,
    action: web::Path<String>,
    body: web::Json<MatchActionRequest>,
) -> Result<HttpResponse, ServiceError> {
    body.validate()?;

    let action = MatchAction::parse(&action.into_inner());
    let result = state
        .engine
        .match_action(account.0, body.target_id, action)
        .await?;

    Ok(HttpResponse::Ok().json(MatchResultResponse { result }))
}
