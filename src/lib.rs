// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod model;
pub mod protocol;
pub mod results;
pub mod shell;
pub mod triggers;
pub mod vote;
