//! HTTP API: authentication, the governance guard and the governed routes.

pub mod app;
pub mod config;
pub mod context;
pub mod jwt;
pub mod middleware;
