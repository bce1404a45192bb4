// Library root: re-exports all modules so integration tests can drive the
// server's request handling directly.

pub mod app;
pub mod config;
pub mod protocol;
pub mod ws_server;
