//! `jobpoold`: HTTP daemon serving the jobpool lease API.
//!
//! The daemon wires the `jobpool-core` pool to an axum HTTP surface,
//! API-key authentication, Prometheus metrics, and a background sweep task.
//! All lease semantics live in the core; this crate only translates the
//! wire protocol and hosts the process plumbing.

pub mod auth;
pub mod config;
pub mod http;
pub mod metrics;
pub mod sweeper;

pub use auth::ApiKey;
pub use config::{DaemonConfig, DaemonConfigError};
pub use http::{router, AppState};
pub use metrics::{DaemonMetrics, MetricsError};
