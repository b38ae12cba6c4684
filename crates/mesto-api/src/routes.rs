use axum::{
    Router, middleware,
    routing::{delete, get, patch, post, put},
};

use crate::error::ApiError;
use crate::middleware::{Identity, require_auth};
use crate::state::AppState;
use crate::{auth, cards, users};

/// The full HTTP surface. Sign-up, sign-in and sign-out are reachable without
/// a session; everything else sits behind [`require_auth`].
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/signin", post(auth::signin))
        .route("/signout", delete(auth::signout));

    let protected_routes = Router::new()
        .route("/users", get(users::list_users))
        .route("/users/me", get(users::get_me).patch(users::update_profile))
        .route("/users/me/avatar", patch(users::update_avatar))
        .route("/users/{user_id}", get(users::get_user))
        .route("/cards", get(cards::list_cards).post(cards::create_card))
        .route("/cards/{card_id}", delete(cards::delete_card))
        .route(
            "/cards/{card_id}/likes",
            put(cards::like_card).delete(cards::unlike_card),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .with_state(state)
}

/// Unknown paths: anonymous callers get 401, signed-in callers get 404.
async fn not_found(_identity: Identity) -> ApiError {
    ApiError::NotFound("Requested resource not found")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use mesto_db::Database;

    use super::*;
    use crate::state::AppStateInner;
    use crate::token::TokenCodec;

    const SECRET: &str = "router-test-secret";

    struct Reply {
        status: StatusCode,
        set_cookie: Option<String>,
        body: Value,
    }

    impl Reply {
        /// `jwt=<token>` pair from the Set-Cookie header, ready to send back.
        fn session(&self) -> String {
            let header = self.set_cookie.as_deref().expect("response set a cookie");
            header.split(';').next().unwrap().to_string()
        }
    }

    fn app() -> Router {
        app_with_cookies(false)
    }

    fn app_with_cookies(secure_cookies: bool) -> Router {
        router(Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            tokens: TokenCodec::new(SECRET, Duration::days(7)),
            secure_cookies,
        }))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>, cookie: Option<&str>) -> Reply {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let set_cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        Reply {
            status,
            set_cookie,
            body,
        }
    }

    async fn signup(app: &Router, email: &str) -> Value {
        let reply = send(
            app,
            Method::POST,
            "/signup",
            Some(json!({ "email": email, "password": "secret1" })),
            None,
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        reply.body
    }

    async fn signin(app: &Router, email: &str) -> String {
        let reply = send(
            app,
            Method::POST,
            "/signin",
            Some(json!({ "email": email, "password": "secret1" })),
            None,
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
        reply.session()
    }

    async fn create_card(app: &Router, session: &str) -> Value {
        let reply = send(
            app,
            Method::POST,
            "/cards",
            Some(json!({ "name": "Baikal", "link": "https://example.com/baikal.jpg" })),
            Some(session),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        reply.body
    }

    #[tokio::test]
    async fn signup_signin_me_signout() {
        let app = app();

        let user = signup(&app, "a@b.com").await;
        assert_eq!(user["email"], "a@b.com");
        assert!(user["_id"].is_string());
        assert!(user.get("password").is_none());
        assert_eq!(user["name"], "Jacques-Yves Cousteau");

        let reply = send(
            &app,
            Method::POST,
            "/signin",
            Some(json!({ "email": "a@b.com", "password": "secret1" })),
            None,
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
        let raw_cookie = reply.set_cookie.clone().unwrap();
        assert!(raw_cookie.contains("HttpOnly"));
        let session = reply.session();

        let me = send(&app, Method::GET, "/users/me", None, Some(&session)).await;
        assert_eq!(me.status, StatusCode::OK);
        assert_eq!(me.body["_id"], user["_id"]);
        assert!(me.body.get("password").is_none());

        let out = send(&app, Method::DELETE, "/signout", None, Some(&session)).await;
        assert_eq!(out.status, StatusCode::OK);
        let cleared = out.set_cookie.unwrap();
        assert!(cleared.starts_with("jwt=;") || cleared.starts_with("jwt=\"\""));
        assert!(cleared.contains("Max-Age=0"));

        // The browser drops the cookie, so the next request carries none
        let me = send(&app, Method::GET, "/users/me", None, None).await;
        assert_eq!(me.status, StatusCode::UNAUTHORIZED);
        assert_eq!(me.body["message"], "Authorization required");
    }

    #[tokio::test]
    async fn secure_sessions_are_cleared_with_matching_attributes() {
        let app = app_with_cookies(true);
        signup(&app, "a@b.com").await;

        let reply = send(
            &app,
            Method::POST,
            "/signin",
            Some(json!({ "email": "a@b.com", "password": "secret1" })),
            None,
        )
        .await;
        let issued = reply.set_cookie.clone().unwrap();
        assert!(issued.contains("SameSite=None"));
        assert!(issued.contains("Secure"));

        let out = send(&app, Method::DELETE, "/signout", None, Some(&reply.session())).await;
        assert_eq!(out.status, StatusCode::OK);
        let cleared = out.set_cookie.unwrap();
        assert!(cleared.contains("Max-Age=0"));
        assert!(cleared.contains("SameSite=None"));
        assert!(cleared.contains("Secure"));
        assert!(cleared.contains("HttpOnly"));
        assert!(cleared.contains("Path=/"));
    }

    #[tokio::test]
    async fn signout_without_session_is_fine() {
        let app = app();
        let reply = send(&app, Method::DELETE, "/signout", None, None).await;
        assert_eq!(reply.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let app = app();
        signup(&app, "a@b.com").await;

        let reply = send(
            &app,
            Method::POST,
            "/signup",
            Some(json!({ "email": "A@B.com", "password": "other" })),
            None,
        )
        .await;
        assert_eq!(reply.status, StatusCode::CONFLICT);
        assert!(reply.body["message"].is_string());
    }

    #[tokio::test]
    async fn bad_credentials_are_indistinguishable() {
        let app = app();
        signup(&app, "a@b.com").await;

        let wrong_password = send(
            &app,
            Method::POST,
            "/signin",
            Some(json!({ "email": "a@b.com", "password": "nope" })),
            None,
        )
        .await;
        let unknown_email = send(
            &app,
            Method::POST,
            "/signin",
            Some(json!({ "email": "ghost@b.com", "password": "secret1" })),
            None,
        )
        .await;

        assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_email.status, wrong_password.status);
        assert_eq!(unknown_email.body, wrong_password.body);
        assert!(wrong_password.set_cookie.is_none());
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_store() {
        let app = app();

        let reply = send(
            &app,
            Method::POST,
            "/signup",
            Some(json!({ "email": "not-an-email", "password": "secret1" })),
            None,
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert!(reply.body["message"].as_str().unwrap().starts_with("email"));

        let reply = send(&app, Method::POST, "/signup", Some(json!({ "email": "a@b.com" })), None).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert!(reply.body["message"].is_string());

        // Nothing was created by the rejected attempts
        signup(&app, "a@b.com").await;
    }

    #[tokio::test]
    async fn expired_tampered_and_missing_tokens_look_the_same() {
        let app = app();
        let user = signup(&app, "a@b.com").await;
        let user_id: Uuid = user["_id"].as_str().unwrap().parse().unwrap();
        let codec = TokenCodec::new(SECRET, Duration::days(7));

        let expired = codec.issue_at(user_id, Utc::now() - Duration::days(8)).unwrap();
        let forged = TokenCodec::new("wrong-secret", Duration::days(7))
            .issue(user_id)
            .unwrap();

        let none = send(&app, Method::GET, "/users/me", None, None).await;
        for token in [expired, forged, "garbage".to_string()] {
            let reply = send(&app, Method::GET, "/users/me", None, Some(&format!("jwt={token}"))).await;
            assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
            assert_eq!(reply.body, none.body);
        }

        let valid = codec.issue(user_id).unwrap();
        let reply = send(&app, Method::GET, "/users/me", None, Some(&format!("jwt={valid}"))).await;
        assert_eq!(reply.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn only_the_owner_deletes_a_card() {
        let app = app();
        signup(&app, "a@b.com").await;
        signup(&app, "b@b.com").await;
        let alice = signin(&app, "a@b.com").await;
        let bob = signin(&app, "b@b.com").await;

        let card = create_card(&app, &alice).await;
        let uri = format!("/cards/{}", card["_id"].as_str().unwrap());

        let reply = send(&app, Method::DELETE, &uri, None, Some(&bob)).await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN);

        let reply = send(&app, Method::DELETE, &uri, None, Some(&alice)).await;
        assert_eq!(reply.status, StatusCode::OK);

        let listing = send(&app, Method::GET, "/cards", None, Some(&alice)).await;
        assert_eq!(listing.status, StatusCode::OK);
        assert!(listing.body.as_array().unwrap().is_empty());

        let reply = send(&app, Method::DELETE, &uri, None, Some(&alice)).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        let reply = send(&app, Method::PUT, &format!("{uri}/likes"), None, Some(&alice)).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn likes_are_idempotent() {
        let app = app();
        let user = signup(&app, "a@b.com").await;
        let session = signin(&app, "a@b.com").await;
        let card = create_card(&app, &session).await;
        let likes = format!("/cards/{}/likes", card["_id"].as_str().unwrap());

        let never = send(&app, Method::DELETE, &likes, None, Some(&session)).await;
        assert_eq!(never.status, StatusCode::OK);
        assert_eq!(never.body["likes"], json!([]));

        let once = send(&app, Method::PUT, &likes, None, Some(&session)).await;
        let twice = send(&app, Method::PUT, &likes, None, Some(&session)).await;
        assert_eq!(twice.status, StatusCode::OK);
        assert_eq!(once.body["likes"], json!([user["_id"]]));
        assert_eq!(twice.body["likes"], once.body["likes"]);

        let off = send(&app, Method::DELETE, &likes, None, Some(&session)).await;
        let off_again = send(&app, Method::DELETE, &likes, None, Some(&session)).await;
        assert_eq!(off.body["likes"], json!([]));
        assert_eq!(off_again.body["likes"], json!([]));
    }

    #[tokio::test]
    async fn profile_and_avatar_updates() {
        let app = app();
        signup(&app, "a@b.com").await;
        let session = signin(&app, "a@b.com").await;

        let reply = send(
            &app,
            Method::PATCH,
            "/users/me",
            Some(json!({ "name": "Marie", "about": "Oceanographer" })),
            Some(&session),
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["name"], "Marie");

        let reply = send(
            &app,
            Method::PATCH,
            "/users/me/avatar",
            Some(json!({ "avatar": "https://example.com/marie.png" })),
            Some(&session),
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["avatar"], "https://example.com/marie.png");
        assert_eq!(reply.body["name"], "Marie");

        let reply = send(
            &app,
            Method::PATCH,
            "/users/me/avatar",
            Some(json!({ "avatar": "not a url" })),
            Some(&session),
        )
        .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn user_lookup_by_id() {
        let app = app();
        let user = signup(&app, "a@b.com").await;
        let session = signin(&app, "a@b.com").await;

        let uri = format!("/users/{}", user["_id"].as_str().unwrap());
        let reply = send(&app, Method::GET, &uri, None, Some(&session)).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["email"], "a@b.com");

        let reply = send(&app, Method::GET, &format!("/users/{}", Uuid::new_v4()), None, Some(&session)).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);

        let reply = send(&app, Method::GET, "/users/not-an-id", None, Some(&session)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);

        let reply = send(&app, Method::GET, "/users", None, Some(&session)).await;
        assert_eq!(reply.body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_routes_are_gated_then_not_found() {
        let app = app();
        let reply = send(&app, Method::GET, "/nowhere", None, None).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

        signup(&app, "a@b.com").await;
        let session = signin(&app, "a@b.com").await;
        let reply = send(&app, Method::GET, "/nowhere", None, Some(&session)).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert!(reply.body["message"].is_string());
    }
}
