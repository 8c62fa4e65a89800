//! # hook-nats
//!
//! NATS plumbing for the hook delivery workspace.
//!
//! - [`NatsConfig`]: servers, auth and TLS resolved from `NATS_*` env vars
//! - [`connect`]: connection with TLS, reconnect backoff and event logging
//! - [`PublishClient`]: the one broker operation the pipeline depends on,
//!   implemented for core NATS and JetStream
//! - [`MockNatsClient`]: recording publisher for tests (`test-support` feature)
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use hook_nats::{NatsConfig, connect};
//! use hook_std::env::SystemEnv;
//!
//! # async fn run() -> Result<(), hook_nats::ConnectError> {
//! let config = NatsConfig::from_env(&SystemEnv);
//! let client = connect(&config, Duration::from_secs(10)).await?;
//! # drop(client);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connect;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub use client::PublishClient;
pub use config::{ClientCertificate, NatsAuth, NatsConfig, NatsTls};
pub use connect::{ConnectError, connect};

#[cfg(any(test, feature = "test-support"))]
pub use mocks::{MockError, MockNatsClient, PublishedMessage};
