use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Name of the HTTP-only cookie carrying the session token.
pub const SESSION_COOKIE: &str = "jwt";

/// The authenticated caller, resolved once per request by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity(Uuid);

impl Identity {
    pub fn new(user_id: Uuid) -> Self {
        Self(user_id)
    }

    pub fn user_id(self) -> Uuid {
        self.0
    }
}

/// Verify the session cookie and attach the caller's [`Identity`] to the
/// request. Missing, malformed, tampered and expired tokens are all the same
/// 401 and the handler never runs.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = authenticate(&state, &jar)?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

fn authenticate(state: &AppState, jar: &CookieJar) -> Result<Identity, ApiError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value())
        .ok_or(ApiError::Authentication)?;

    let user_id = state.tokens.verify(token).map_err(|e| {
        debug!("Rejected session token: {}", e);
        ApiError::Authentication
    })?;

    Ok(Identity(user_id))
}

/// Handlers take `Identity` as an argument. Behind [`require_auth`] it is
/// already in the extensions; elsewhere (the fallback) the cookie is checked
/// here with the same rules.
impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(*identity);
        }
        authenticate(state, &CookieJar::from_headers(&parts.headers))
    }
}

/// Session cookie for a freshly issued token. Lives as long as the token.
pub fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let mut cookie = scoped_cookie(state, token);
    cookie.set_max_age(time::Duration::seconds(state.tokens.ttl().num_seconds()));
    cookie
}

/// Cookie for removal from the jar. Carries the same scope attributes as the
/// session cookie, otherwise a cross-site removal is rejected by the browser.
pub fn expired_session_cookie(state: &AppState) -> Cookie<'static> {
    scoped_cookie(state, String::new())
}

fn scoped_cookie(state: &AppState, value: String) -> Cookie<'static> {
    // Cross-site delivery needs SameSite=None, which browsers only accept with Secure
    let same_site = if state.secure_cookies {
        SameSite::None
    } else {
        SameSite::Lax
    };

    Cookie::build((SESSION_COOKIE, value))
        .http_only(true)
        .secure(state.secure_cookies)
        .same_site(same_site)
        .path("/")
        .build()
}
