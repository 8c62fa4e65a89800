use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use gitee_hook_delivery::signal::shutdown_signal;
use gitee_hook_delivery::{Delivery, DeliveryConfig, FileSecret, run};
use hook_nats::{PublishClient, connect};
use hook_std::env::SystemEnv;
use hook_std::fs::SystemFs;
use tokio::net::TcpListener;
use tracing::info;

const NATS_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = DeliveryConfig::from_env(&SystemEnv);
    config.validate()?;

    let secret = FileSecret::load(&SystemFs, config.secret_file.clone())?;
    let refresher = secret.spawn_refresh(SystemFs, config.secret_refresh);
    info!(path = %secret.path().display(), "Loaded webhook secret");

    let nats = connect(&config.nats, NATS_CONNECT_TIMEOUT).await?;

    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], config.port))).await?;

    if config.jetstream {
        info!("Publishing through JetStream");
        serve(listener, async_nats::jetstream::new(nats.clone()), secret, &config).await?;
    } else {
        serve(listener, nats.clone(), secret, &config).await?;
    }

    refresher.abort();
    nats.flush().await?;
    info!("Shut down cleanly");
    Ok(())
}

async fn serve<P: PublishClient>(
    listener: TcpListener,
    publisher: P,
    secret: FileSecret,
    config: &DeliveryConfig,
) -> std::io::Result<()> {
    let delivery = Arc::new(Delivery::from_config(publisher, secret, config));
    let shutdown = async {
        shutdown_signal().await;
    };
    run(listener, delivery, config.grace_period, shutdown).await
}
