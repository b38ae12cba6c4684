//! HTTP layer for Mesto: session handling, authorization and the user and
//! card handlers.

pub mod auth;
pub mod cards;
pub mod error;
pub mod guard;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;
pub mod token;
pub mod users;
pub mod validation;

pub use routes::router;
pub use state::{AppState, AppStateInner};
