//! Core of a Slack application framework: a state-free request classifier
//! and dispatcher, a recursively-composed middleware chain, the OAuth
//! install/callback state machine, and the signature-verification and
//! multi-workspace authorization middlewares that sit in front of it.
//!
//! This crate accepts already-parsed HTTP requests (`RawRequest`) and
//! produces `Response` values; it never owns an HTTP listener or thread
//! pool. See `src/main.rs` for a minimal Axum adapter that wires this
//! crate to real HTTP.

pub mod app;
pub mod cancellation;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod installation;
pub mod middleware;
pub mod oauth;
pub mod parser;
pub mod pattern;
pub mod registry;
pub mod request;
pub mod response;
pub mod signature;
pub mod store;

#[cfg(test)]
mod tests_support;

pub use app::{App, RawRequest};
pub use config::{AppConfig, AppConfigBuilder};
pub use context::Context;
pub use error::AppError;
pub use handler::{Handler, HandlerFn};
pub use installation::Installation;
pub use pattern::Pattern;
pub use request::{ParsedPayload, Request, RequestKind};
pub use response::Response;
