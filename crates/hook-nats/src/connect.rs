use crate::config::{NatsAuth, NatsConfig, NatsTls};
use async_nats::{Client, ConnectOptions, Event};
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("failed to load credentials file: {0}")]
    InvalidCredentials(#[source] std::io::Error),

    #[error("failed to connect to NATS servers {servers:?}: {error}")]
    ConnectionFailed {
        servers: Vec<String>,
        #[source]
        error: async_nats::ConnectError,
    },
}

const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

fn reconnect_delay(attempts: usize) -> Duration {
    let exp = u32::try_from(attempts).unwrap_or(u32::MAX);
    let delay = Duration::from_secs(std::cmp::min(
        MAX_RECONNECT_DELAY.as_secs(),
        2u64.saturating_pow(exp),
    ));
    info!(attempts, delay_secs = delay.as_secs(), "NATS reconnect delay");
    delay
}

async fn handle_event(event: Event) {
    match event {
        Event::Connected => info!("NATS connected"),
        Event::Disconnected => warn!("NATS disconnected, publishes buffer until reconnect"),
        Event::ServerError(err) => warn!(error = %err, "NATS server error"),
        Event::ClientError(err) => warn!(error = %err, "NATS client error"),
        Event::SlowConsumer(sid) => warn!(sid, "NATS slow consumer detected"),
        Event::LameDuckMode => warn!("NATS server entering lame duck mode"),
        Event::Closed => info!("NATS connection closed"),
        Event::Draining => info!("NATS connection draining"),
    }
}

fn apply_tls(mut opts: ConnectOptions, tls: &NatsTls) -> ConnectOptions {
    if !tls.is_enabled() {
        return opts;
    }
    opts = opts.require_tls(true);
    if let Some(ca) = &tls.ca_file {
        opts = opts.add_root_certificates(ca.clone());
    }
    if let Some(client) = &tls.client_cert {
        opts = opts.add_client_certificate(client.cert.clone(), client.key.clone());
    }
    opts
}

fn apply_common_options(
    opts: ConnectOptions,
    tls: &NatsTls,
    connection_timeout: Duration,
) -> ConnectOptions {
    apply_tls(opts, tls)
        .retry_on_initial_connect()
        .connection_timeout(connection_timeout)
        .reconnect_delay_callback(reconnect_delay)
        .event_callback(|event| async move { handle_event(event).await })
}

async fn base_options(auth: &NatsAuth) -> Result<ConnectOptions, ConnectError> {
    let opts = match auth {
        NatsAuth::Credentials(path) => {
            info!(path = %path.display(), "Using credentials file");
            ConnectOptions::with_credentials_file(path.clone())
                .await
                .map_err(|e| {
                    warn!(error = %e, path = %path.display(), "Failed to load credentials file");
                    ConnectError::InvalidCredentials(e)
                })?
        }
        NatsAuth::NKey(seed) => ConnectOptions::with_nkey(seed.clone()),
        NatsAuth::UserPassword { user, password } => {
            ConnectOptions::with_user_and_password(user.clone(), password.clone())
        }
        NatsAuth::Token(token) => ConnectOptions::with_token(token.clone()),
        NatsAuth::None => ConnectOptions::new(),
    };
    Ok(opts)
}

/// Connect to NATS with TLS, automatic reconnection and event logging.
///
/// The returned client is a cheap, cloneable handle that is safe to publish
/// from many tasks at once.
#[instrument(
    name = "nats.connect",
    skip(config),
    fields(servers = ?config.servers, auth = %config.auth.description(), tls = config.tls.is_enabled())
)]
pub async fn connect(
    config: &NatsConfig,
    connection_timeout: Duration,
) -> Result<Client, ConnectError> {
    info!("Connecting to NATS");

    let opts = apply_common_options(
        base_options(&config.auth).await?,
        &config.tls,
        connection_timeout,
    );

    match opts.connect(&config.servers).await {
        Ok(client) => {
            info!("Connected to NATS");
            Ok(client)
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS");
            Err(ConnectError::ConnectionFailed {
                servers: config.servers.clone(),
                error: e,
            })
        }
    }
}
