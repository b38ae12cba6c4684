use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;

use mesto_db::models::UserRow;
use mesto_types::api::{UpdateAvatarRequest, UpdateProfileRequest, UserResponse};

use crate::error::ApiError;
use crate::middleware::Identity;
use crate::state::AppState;
use crate::store;
use crate::validation::{ValidJson, parse_id};

pub const DEFAULT_NAME: &str = "Jacques-Yves Cousteau";
pub const DEFAULT_ABOUT: &str = "Explorer";
pub const DEFAULT_AVATAR: &str =
    "https://pictures.s3.yandex.net/resources/jacques-cousteau_1595865594.png";

/// Row to wire shape. The password hash is dropped here.
pub(crate) fn user_response(row: UserRow) -> Result<UserResponse, ApiError> {
    let id = row.id.parse().map_err(|e| {
        ApiError::unexpected(anyhow::anyhow!("corrupt user id '{}': {e}", row.id))
    })?;

    Ok(UserResponse {
        id,
        name: row.name,
        about: row.about,
        avatar: row.avatar,
        email: row.email,
    })
}

/// GET /users
pub async fn list_users(
    State(state): State<AppState>,
    _identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let rows = store::run(&state, |db| db.list_users()).await?;
    let users = rows
        .into_iter()
        .map(user_response)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(users))
}

/// GET /users/me
pub async fn get_me(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let id = identity.user_id().to_string();
    let row = store::run(&state, move |db| db.get_user_by_id(&id))
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;
    Ok(Json(user_response(row)?))
}

/// GET /users/{user_id}
pub async fn get_user(
    State(state): State<AppState>,
    _identity: Identity,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id("userId", &user_id)?.to_string();
    let row = store::run(&state, move |db| db.get_user_by_id(&id))
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;
    Ok(Json(user_response(row)?))
}

// The `/users/me` routes bind the target record to the caller's identity, so
// the caller always owns what they mutate here.

/// PATCH /users/me
pub async fn update_profile(
    State(state): State<AppState>,
    identity: Identity,
    ValidJson(req): ValidJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = identity.user_id().to_string();
    let row = store::run(&state, move |db| {
        db.update_user_profile(&id, &req.name, &req.about)
    })
    .await?
    .ok_or(ApiError::NotFound("User not found"))?;

    info!("User {} updated profile", identity.user_id());
    Ok(Json(user_response(row)?))
}

/// PATCH /users/me/avatar
pub async fn update_avatar(
    State(state): State<AppState>,
    identity: Identity,
    ValidJson(req): ValidJson<UpdateAvatarRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = identity.user_id().to_string();
    let row = store::run(&state, move |db| db.update_user_avatar(&id, &req.avatar))
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    info!("User {} updated avatar", identity.user_id());
    Ok(Json(user_response(row)?))
}
