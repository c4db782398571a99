//! HTTP API: configuration, authentication and routing over the workflow
//! service.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
