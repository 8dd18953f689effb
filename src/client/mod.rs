//! Gateway client: builder, handle, and connection lifecycle.
//!
//! This module provides the caller-facing client surface. Options are
//! validated once by [`GatewayClientBuilder`] and the resulting
//! [`GatewayClient`] drives the connection through a per-`connect()` worker
//! task that owns all mutable session state. Callers interact exclusively
//! through message passing: `send()` enqueues onto the rate-limited outbound
//! queue, `disconnect()` cancels the worker, and observer callbacks report
//! dispatches, closes, and errors.

mod builder;
pub(crate) mod config;
mod error;
mod hooks;
mod runtime;
mod worker;

pub use builder::GatewayClientBuilder;
pub use config::{ReconnectOptions, ShardIdentity};
pub use error::{ClientError, ConfigError};
pub use hooks::Disconnect;
pub use runtime::GatewayClient;
