use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::CurrentUser,
    errors::{AppError, AppResult},
    state::AppState,
    users::{
        dto::{
            ListUsersQuery, UserCreateRequest, UserDetailResponse, UserPaginateResponse,
            UserUpdateRequest,
        },
        services,
    },
    validation::FieldErrors,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(list_users).post(create_user))
        .route("/user/", get(list_users).post(create_user))
        .route(
            "/user/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

/// Malformed ids are reported as a missing user rather than a bad request.
fn parse_user_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| {
        debug!(raw_id = %raw, "malformed user id");
        AppError::user_not_found()
    })
}

fn bad_body(e: JsonRejection) -> AppError {
    warn!(error = %e, "malformed json body");
    AppError::BadRequest(e.body_text())
}

#[instrument(skip_all, fields(caller = %caller.id))]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> AppResult<Json<UserPaginateResponse>> {
    let Query(query) = query.map_err(|e| {
        warn!(error = %e, "malformed list query");
        AppError::Validation(FieldErrors::single("query", e.body_text()))
    })?;
    let params = query.validate().map_err(AppError::Validation)?;

    let page = services::paginate_users(
        state.users.as_ref(),
        params.page,
        params.page_size,
        params.search.as_deref(),
    )
    .await?;
    Ok(Json(page.into()))
}

#[instrument(skip_all, fields(caller = %caller.id, user_id = %id))]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<UserDetailResponse>> {
    let id = parse_user_id(&id)?;
    let user = services::get_user(state.users.as_ref(), id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip_all, fields(caller = %caller.id))]
pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    body: Result<Json<UserCreateRequest>, JsonRejection>,
) -> AppResult<(StatusCode, HeaderMap, Json<UserDetailResponse>)> {
    let Json(body) = body.map_err(bad_body)?;
    let input = body.validate().map_err(AppError::Validation)?;

    let now = OffsetDateTime::now_utc();
    let user = services::create_user(state.users.as_ref(), input, now, Some(now)).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/user/{}", user.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(user.into())))
}

#[instrument(skip_all, fields(caller = %caller.id, user_id = %id))]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
    body: Result<Json<UserUpdateRequest>, JsonRejection>,
) -> AppResult<Json<UserDetailResponse>> {
    let id = parse_user_id(&id)?;
    let Json(body) = body.map_err(bad_body)?;
    let input = body.validate().map_err(AppError::Validation)?;

    let existing = services::get_user(state.users.as_ref(), id).await?;
    let user = services::update_user(state.users.as_ref(), &existing, input).await?;
    Ok(Json(user.into()))
}

#[instrument(skip_all, fields(caller = %caller.id, user_id = %id))]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_user_id(&id)?;
    let existing = services::get_user(state.users.as_ref(), id).await?;
    services::delete_user(state.users.as_ref(), &existing).await?;
    Ok(StatusCode::NO_CONTENT)
}
