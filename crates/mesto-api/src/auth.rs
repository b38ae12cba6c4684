use std::sync::LazyLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;
use uuid::Uuid;

use mesto_db::models::NewUser;
use mesto_types::api::{MessageResponse, SigninRequest, SignupRequest};

use crate::error::ApiError;
use crate::middleware::{expired_session_cookie, session_cookie};
use crate::state::AppState;
use crate::store;
use crate::users::{DEFAULT_ABOUT, DEFAULT_AVATAR, DEFAULT_NAME, user_response};
use crate::validation::ValidJson;

/// Hash checked when the email is unknown, so a miss costs the same as a
/// wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("mesto-dummy-password").ok());

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::unexpected(anyhow::anyhow!("password hashing failed: {e}")))
}

/// Constant-time comparison against a stored Argon2 PHC string.
fn password_matches(password: &str, stored: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| ApiError::unexpected(anyhow::anyhow!("corrupt password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// POST /signup — create a user. The response never includes the password.
pub async fn signup(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email);
    let user_id = Uuid::new_v4();

    // Hashing is CPU-bound, so it runs on the blocking pool with the insert
    let row = store::run(&state, move |db| {
        let password_hash = hash_password(&req.password)?;
        let id = user_id.to_string();
        db.create_user(&NewUser {
            id: &id,
            name: req.name.as_deref().unwrap_or(DEFAULT_NAME),
            about: req.about.as_deref().unwrap_or(DEFAULT_ABOUT),
            avatar: req.avatar.as_deref().unwrap_or(DEFAULT_AVATAR),
            email: &email,
            password_hash: &password_hash,
        })
        .map_err(ApiError::from)
    })
    .await?;

    info!("User {} registered", user_id);
    Ok((StatusCode::CREATED, Json(user_response(row)?)))
}

/// POST /signin — check credentials and set the session cookie.
///
/// Unknown email and wrong password produce the same error.
pub async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(req): ValidJson<SigninRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email);

    let user_id = store::run(&state, move |db| {
        let Some(user) = db.get_user_by_email(&email)? else {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                password_matches(&req.password, dummy)?;
            }
            return Err(ApiError::InvalidCredentials);
        };

        if !password_matches(&req.password, &user.password)? {
            return Err(ApiError::InvalidCredentials);
        }

        user.id
            .parse::<Uuid>()
            .map_err(|e| ApiError::unexpected(anyhow::anyhow!("corrupt user id '{}': {e}", user.id)))
    })
    .await?;

    let token = state.tokens.issue(user_id).map_err(ApiError::unexpected)?;

    info!("User {} signed in", user_id);
    Ok((
        jar.add(session_cookie(&state, token)),
        Json(MessageResponse::new("Signed in")),
    ))
}

/// DELETE /signout — clear the session cookie. Works with or without one.
pub async fn signout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(expired_session_cookie(&state)),
        Json(MessageResponse::new("Signed out")),
    )
}
