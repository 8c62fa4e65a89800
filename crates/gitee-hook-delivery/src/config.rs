use std::path::PathBuf;
use std::time::Duration;

use hook_nats::NatsConfig;
use hook_std::env::ReadEnv;

const DEFAULT_PORT: u16 = 8888;
const DEFAULT_USER_AGENT: &str = "Robot-Gitee-Access";
const DEFAULT_SECRET_FILE: &str = "/etc/webhook/hmac";
const DEFAULT_SECRET_REFRESH_SECS: u64 = 60;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 180;
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing topic, set GITEE_TOPIC")]
    MissingTopic,

    #[error("missing user agent, GITEE_USER_AGENT must not be blank")]
    MissingUserAgent,

    #[error("no valid NATS server address in NATS_URL")]
    NoBrokerAddress,
}

/// Configuration for the Gitee webhook delivery service.
///
/// Resolved from environment variables:
/// - `GITEE_TOPIC`: NATS subject every accepted webhook is published to (required)
/// - `GITEE_USER_AGENT`: `User-Agent` header stamped on outbound messages (default: `Robot-Gitee-Access`)
/// - `GITEE_WEBHOOK_PORT`: HTTP listening port (default: 8888)
/// - `GITEE_HMAC_SECRET_FILE`: file holding the webhook secret (default: `/etc/webhook/hmac`)
/// - `GITEE_SECRET_REFRESH_SECS`: how often the secret file is re-read (default: 60)
/// - `GITEE_SHUTDOWN_GRACE_SECS`: how long open HTTP connections get on shutdown (default: 180)
/// - `GITEE_MAX_BODY_BYTES`: largest accepted webhook body (default: 25 MiB)
/// - `GITEE_JETSTREAM`: publish through JetStream and wait for the ack (default: false)
/// - Standard `NATS_*` variables for the broker connection (see `hook-nats`)
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub topic: String,
    pub user_agent: String,
    pub port: u16,
    pub secret_file: PathBuf,
    pub secret_refresh: Duration,
    pub grace_period: Duration,
    pub max_body_bytes: usize,
    pub jetstream: bool,
    pub nats: NatsConfig,
}

impl DeliveryConfig {
    pub fn from_env<E: ReadEnv>(env: &E) -> Self {
        Self {
            topic: env
                .var("GITEE_TOPIC")
                .map(|t| t.trim().to_string())
                .unwrap_or_default(),
            user_agent: env
                .var("GITEE_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
            port: env.parsed("GITEE_WEBHOOK_PORT").unwrap_or(DEFAULT_PORT),
            secret_file: env
                .var("GITEE_HMAC_SECRET_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_SECRET_FILE)),
            secret_refresh: Duration::from_secs(
                env.parsed("GITEE_SECRET_REFRESH_SECS")
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_SECRET_REFRESH_SECS),
            ),
            grace_period: Duration::from_secs(
                env.parsed("GITEE_SHUTDOWN_GRACE_SECS")
                    .unwrap_or(DEFAULT_SHUTDOWN_GRACE_SECS),
            ),
            max_body_bytes: env
                .parsed("GITEE_MAX_BODY_BYTES")
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
            jetstream: env.flag("GITEE_JETSTREAM").unwrap_or(false),
            nats: NatsConfig::from_env(env),
        }
    }

    /// Rejects settings the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topic.is_empty() {
            return Err(ConfigError::MissingTopic);
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::MissingUserAgent);
        }
        if self.nats.servers.is_empty() {
            return Err(ConfigError::NoBrokerAddress);
        }
        Ok(())
    }
}
