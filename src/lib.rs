//! ReMarkable: a personal bookmarking service with link previews.
//!
//! This library crate exposes all modules for use by the binaries and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod routes;
pub mod rpc_handler;
pub mod server;
pub mod services;
pub mod types;
