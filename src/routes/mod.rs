// Route exports
pub mod accounts;
pub mod identity;
pub mod matches;
pub mod tasks;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use std::sync::Arc;

use crate::config::MatchingSettings;
use crate::core::{AccountCoordinator, MatchEngine, ServiceError, TaskService};
use crate::models::ErrorResponse;
use crate::services::PostgresStore;

pub use identity::AccountId;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: AccountCoordinator,
    pub engine: MatchEngine,
    pub tasks: TaskService,
    pub database: Arc<PostgresStore>,
    pub matching: MatchingSettings,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure)
            .configure(accounts::configure)
            .configure(tasks::configure),
    );
}

impl ServiceError {
    fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Duplicate(_) => "duplicate",
            ServiceError::UnknownValue(_) => "unknown_value",
            ServiceError::EmptyValue(_) => "empty_value",
            ServiceError::Validation(_) => "validation_failed",
            ServiceError::UnhandledAction(_) => "unhandled_action",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::TaskLimit(_) => "task_limit_exceeded",
            ServiceError::Store(_) | ServiceError::FileStorage(_) => "internal_error",
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::GONE,
            ServiceError::Duplicate(_) => StatusCode::CONFLICT,
            ServiceError::UnknownValue(_)
            | ServiceError::EmptyValue(_)
            | ServiceError::Validation(_)
            | ServiceError::UnhandledAction(_) => StatusCode::BAD_REQUEST,
            ServiceError::Forbidden(_) | ServiceError::TaskLimit(_) => StatusCode::FORBIDDEN,
            ServiceError::Store(_) | ServiceError::FileStorage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Internal details stay in the logs
        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => "internal server error".to_string(),
            _ => self.to_string(),
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message,
            status_code: status.as_u16(),
        })
    }
}
