use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::core::ServiceError;
use crate::models::{CreateTask, GetTasksQuery, PageResponse};
use crate::routes::{AccountId, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/task", web::post().to(create_task))
        .route("/task/list", web::get().to(list_tasks));
}

/// Publish a task as the calling client
///
/// POST /api/v1/task with `{ "title": "...", "description": "..." }`
async fn create_task(
    state: web::Data<AppState>,
    account: AccountId,
    body: web::Json<CreateTask>,
) -> Result<HttpResponse, ServiceError> {
    let task = state.tasks.create_task(account.0, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(task))
}

/// GET /api/v1/task/list?account_id=7&offset=0&limit=10
async fn list_tasks(
    state: web::Data<AppState>,
    _account: AccountId,
    query: web::Query<GetTasksQuery>,
) -> Result<HttpResponse, ServiceError> {
    query.validate()?;
    let limit = state.matching.clamp_limit(query.limit);

    let page = state
        .tasks
        .owner_tasks(query.account_id, query.offset, limit)
        .await?;
    Ok(HttpResponse::Ok().json(PageResponse::from(page)))
}
