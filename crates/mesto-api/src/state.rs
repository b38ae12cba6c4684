use std::sync::Arc;

use mesto_db::Database;

use crate::token::TokenCodec;

pub type AppState = Arc<AppStateInner>;

/// Everything a handler needs, built once at startup and injected.
pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenCodec,
    /// Sets the `Secure` attribute on the session cookie.
    pub secure_cookies: bool,
}
