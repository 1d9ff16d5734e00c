use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use super::{jwt::JwtKeys, services::user_from_authorization_header};
use crate::{errors::AppError, state::AppState, users::repo_types::User};

/// The authenticated caller, re-loaded from storage on every request.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let user = user_from_authorization_header(&parts.headers, &keys, state.users.as_ref()).await?;
        Ok(CurrentUser(user))
    }
}
