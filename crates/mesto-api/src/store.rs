use std::time::Duration;

use tokio::time::timeout;
use tracing::{error, warn};

use mesto_db::Database;

use crate::error::ApiError;
use crate::state::AppState;

/// Upper bound on a single store call, queueing for the connection included.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Run blocking store work off the async runtime, bounded by [`STORE_TIMEOUT`].
///
/// A timeout surfaces as `ApiError::Unavailable` (503) so the caller may retry.
/// The blocking task itself cannot be interrupted and runs to completion.
pub async fn run<F, T, E>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    run_with_timeout(state, STORE_TIMEOUT, f).await
}

/// [`run`] with an explicit bound.
pub async fn run_with_timeout<F, T, E>(state: &AppState, limit: Duration, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    let state = state.clone();
    let task = tokio::task::spawn_blocking(move || f(&state.db));

    match timeout(limit, task).await {
        Ok(Ok(result)) => result.map_err(Into::into),
        Ok(Err(e)) => {
            error!("spawn_blocking join error: {}", e);
            Err(ApiError::unexpected(e))
        }
        Err(_) => {
            warn!("Store call exceeded {:?}", limit);
            Err(ApiError::Unavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use mesto_db::StoreError;

    use super::*;
    use crate::state::AppStateInner;
    use crate::token::TokenCodec;

    fn state() -> AppState {
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            tokens: TokenCodec::new("store-test", Duration::days(1)),
            secure_cookies: false,
        })
    }

    #[tokio::test]
    async fn results_and_store_errors_pass_through() {
        let state = state();

        let users = run(&state, |db| db.list_users()).await.unwrap();
        assert!(users.is_empty());

        let err = run(&state, |_| Err::<(), _>(StoreError::Duplicate))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn panicking_store_work_is_an_internal_error() {
        let state = state();
        let err = run(&state, |_| -> Result<(), ApiError> { panic!("boom") })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unexpected(_)));
    }

    #[tokio::test]
    async fn slow_store_work_is_unavailable() {
        let state = state();
        let err = run_with_timeout(&state, std::time::Duration::from_millis(20), |db| {
            std::thread::sleep(std::time::Duration::from_millis(300));
            db.list_users()
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Unavailable));
        assert_eq!(err.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
