//! Wire types shared by the Mesto server and its HTTP client.

pub mod api;
