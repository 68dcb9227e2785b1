use actix_web::dev::Payload;
use actix_web::http::header::HeaderMap;
use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError};
use std::future::{ready, Ready};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Header carrying the account id resolved by the upstream identity layer
pub const ACCOUNT_ID_HEADER: &str = "X-Account-Id";

/// Authenticated account id. Trusted as supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountId(pub i64);

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("missing X-Account-Id header")]
    Missing,

    #[error("invalid X-Account-Id header")]
    Invalid,
}

impl ResponseError for IdentityError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Unauthorized().json(ErrorResponse {
            error: "unauthorized".to_string(),
            message: self.to_string(),
            status_code: 401,
        })
    }
}

impl FromRequest for AccountId {
    type Error = IdentityError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_account_id(req.headers()))
    }
}

fn extract_account_id(headers: &HeaderMap) -> Result<AccountId, IdentityError> {
    let raw = headers
        .get(ACCOUNT_ID_HEADER)
        .ok_or(IdentityError::Missing)?
        .to_str()
        .map_err(|_| IdentityError::Invalid)?;

    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(AccountId(id)),
        _ => Err(IdentityError::Invalid),
    }
}
