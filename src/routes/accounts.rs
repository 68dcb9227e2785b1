use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::core::ServiceError;
use crate::models::{ChangeRoleRequest, Role, RoleResponse};
use crate::routes::{AccountId, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/account", web::get().to(get_account))
        .route("/account", web::delete().to(delete_account))
        .route("/account/role", web::get().to(get_role))
        .route("/account/role", web::patch().to(change_role))
        .route("/account/role/{role}", web::get().to(has_role));
}

/// Caller's account with company, attachments, tags and categories
async fn get_account(
    state: web::Data<AppState>,
    account: AccountId,
) -> Result<HttpResponse, ServiceError> {
    let details = state.coordinator.get_account_details(account.0).await?;
    Ok(HttpResponse::Ok().json(details))
}

async fn delete_account(
    state: web::Data<AppState>,
    account: AccountId,
) -> Result<HttpResponse, ServiceError> {
    state.coordinator.delete_account(account.0).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn get_role(
    state: web::Data<AppState>,
    account: AccountId,
) -> Result<HttpResponse, ServiceError> {
    let role = state.coordinator.get_account_role(account.0).await?;
    Ok(HttpResponse::Ok().json(RoleResponse {
        role: role.to_string(),
    }))
}

/// PATCH /api/v1/account/role with `{ "role": "client" | "freelancer" }`
async fn change_role(
    state: web::Data<AppState>,
    account: AccountId,
    body: web::Json<ChangeRoleRequest>,
) -> Result<HttpResponse, ServiceError> {
    body.validate()?;
    let role: Role = body.role.parse()?;

    state.coordinator.change_role(account.0, role).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn has_role(
    state: web::Data<AppState>,
    account: AccountId,
    role: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let role: Role = role.parse()?;

    let has_role = state.coordinator.account_has_role(account.0, role).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "hasRole": has_role })))
}
