use axum::http::{header::AUTHORIZATION, HeaderMap};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, warn};

use super::jwt::JwtKeys;
use crate::{
    errors::{AppError, AppResult},
    users::{repo::UserRepository, repo_types::User},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Token part of `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolves the caller from the Authorization header, re-reading the user row.
pub async fn user_from_authorization_header(
    headers: &HeaderMap,
    keys: &JwtKeys,
    users: &dyn UserRepository,
) -> AppResult<User> {
    let token = bearer_token(headers).ok_or_else(|| {
        warn!("missing or malformed Authorization header");
        AppError::invalid_token()
    })?;

    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::invalid_token()
    })?;

    match users.find_by_id(claims.sub).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            warn!(user_id = %claims.sub, "token subject no longer exists");
            Err(AppError::invalid_token())
        }
        Err(e) => {
            error!(error = %e, user_id = %claims.sub, "load token subject failed");
            Err(e.into())
        }
    }
}
