use axum::{
    extract::{rejection::FormRejection, FromRef, State},
    routing::post,
    Form, Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginForm, LoginResponse, LogoutResponse},
        extractors::CurrentUser,
        jwt::JwtKeys,
        password::verify_password,
    },
    errors::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

fn invalid_credentials() -> AppError {
    AppError::BadRequest("invalid credentials".into())
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Form(form) = form.map_err(|e| {
        warn!(error = %e, "malformed login form");
        AppError::BadRequest(e.body_text())
    })?;

    let Some(user) = state.users.find_by_username(&form.username).await? else {
        warn!(username = %form.username, "login unknown username");
        return Err(invalid_credentials());
    };

    let ok = verify_password(&form.password, &user.password_hash).unwrap_or_else(|e| {
        error!(error = %e, user_id = %user.id, "stored password hash unreadable");
        false
    });
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid_credentials());
    }

    let access_token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer".into(),
    }))
}

/// Tokens are stateless; logging out only confirms who the caller was.
#[instrument(skip_all)]
pub async fn logout(CurrentUser(user): CurrentUser) -> Json<LogoutResponse> {
    info!(user_id = %user.id, "user logged out");
    Json(LogoutResponse {
        email: user.email,
        username: user.username,
    })
}
