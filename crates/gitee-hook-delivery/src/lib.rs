//! # gitee-hook-delivery
//!
//! Gitee webhook receiver that authenticates deliveries and republishes them
//! to a NATS subject.
//!
//! ## How it works
//!
//! 1. Gitee sends `POST /gitee-hook` with `X-Gitee-Event`, `X-Gitee-Timestamp`
//!    and `X-Gitee-Token` headers plus a JSON payload.
//! 2. The request is validated in a fixed order (method, content type, event
//!    headers, token presence, body) and the token is checked as an
//!    HMAC-SHA256 of the body against the current secret.
//! 3. The handler answers `200` straight away and publishes the body on a
//!    detached task. Publish failures are logged and dropped.
//! 4. On SIGINT/SIGTERM the listener stops, open connections get a grace
//!    period, and the process waits for every in-flight publish before
//!    flushing the NATS connection.
//!
//! Any path other than `/gitee-hook` answers `200` with an empty body and
//! serves as the health check.
//!
//! ## NATS message format
//!
//! - **Subject**: `GITEE_TOPIC`
//! - **Headers**: `content-type`, `X-Gitee-Event`, `X-Gitee-Timestamp`,
//!   `X-Gitee-Token`, `User-Agent`
//! - **Payload**: raw JSON body from Gitee
//!
//! ## Configuration (env vars)
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `GITEE_TOPIC` | (required) | NATS subject to publish to |
//! | `GITEE_USER_AGENT` | `Robot-Gitee-Access` | `User-Agent` header on published messages |
//! | `GITEE_WEBHOOK_PORT` | `8888` | HTTP listening port |
//! | `GITEE_HMAC_SECRET_FILE` | `/etc/webhook/hmac` | File holding the webhook secret |
//! | `GITEE_SECRET_REFRESH_SECS` | `60` | How often the secret file is re-read |
//! | `GITEE_SHUTDOWN_GRACE_SECS` | `180` | Time open connections get on shutdown |
//! | `GITEE_MAX_BODY_BYTES` | `26214400` | Largest accepted body |
//! | `GITEE_JETSTREAM` | `false` | Publish through JetStream and wait for the ack |
//! | `NATS_URL` | `localhost:4222` | NATS server URL(s) |

pub mod config;
pub mod delivery;
pub mod drain;
pub mod message;
pub mod secret;
pub mod server;
pub mod signal;
pub mod signature;
pub mod validator;

pub use config::{ConfigError, DeliveryConfig};
pub use delivery::Delivery;
pub use drain::{InFlightCounter, InFlightGuard};
pub use message::OutboundMessage;
pub use secret::{FileSecret, SecretError, SecretProvider, StaticSecret};
pub use server::{router, run};
pub use validator::{Rejection, WebhookEvent, validate};
