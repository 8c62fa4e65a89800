use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::any;
use hook_nats::PublishClient;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{info, instrument, warn};

use crate::delivery::Delivery;
use crate::secret::SecretProvider;

pub const WEBHOOK_PATH: &str = "/gitee-hook";

/// `/gitee-hook` takes every method so the validator can answer 405 itself;
/// every other path is the health check.
pub fn router<P, S>(delivery: Arc<Delivery<P, S>>) -> Router
where
    P: PublishClient,
    S: SecretProvider,
{
    Router::new()
        .route(WEBHOOK_PATH, any(handle_hook::<P, S>))
        .fallback(health)
        .with_state(delivery)
}

/// Serves webhooks until `shutdown` resolves, then waits for in-flight
/// publishes.
///
/// Once `shutdown` fires the listener stops accepting and open connections
/// get `grace_period` to finish. The in-flight counter is then closed, so a
/// connection that outlives the grace period answers 503 instead of
/// scheduling a publish behind the drain. The drain itself is unbounded.
pub async fn run<P, S, F>(
    listener: TcpListener,
    delivery: Arc<Delivery<P, S>>,
    grace_period: Duration,
    shutdown: F,
) -> io::Result<()>
where
    P: PublishClient,
    S: SecretProvider,
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(addr = %addr, path = WEBHOOK_PATH, topic = delivery.topic(), "Gitee webhook server listening");

    let stopping = Arc::new(Notify::new());
    let signal = {
        let stopping = Arc::clone(&stopping);
        async move {
            shutdown.await;
            stopping.notify_one();
        }
    };

    let server = axum::serve(listener, router(Arc::clone(&delivery)))
        .with_graceful_shutdown(signal)
        .into_future();
    let grace = async {
        stopping.notified().await;
        tokio::time::sleep(grace_period).await;
    };

    tokio::select! {
        result = server => result?,
        () = grace => {
            warn!(grace_period = ?grace_period, "Open connections outlived the grace period, closing");
        }
    }

    delivery.in_flight().close();
    info!(
        in_flight = delivery.in_flight().in_flight(),
        "Waiting for in-flight publishes"
    );
    delivery.await_drain().await;
    info!("All publishes finished");
    Ok(())
}

#[instrument(
    name = "gitee.webhook",
    skip_all,
    fields(method = %request.method())
)]
async fn handle_hook<P, S>(
    State(delivery): State<Arc<Delivery<P, S>>>,
    request: Request,
) -> Response
where
    P: PublishClient,
    S: SecretProvider,
{
    delivery.handle(request).await
}

async fn health() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::StaticSecret;
    use crate::signature::sign;
    use axum::body::Body;
    use hook_nats::MockNatsClient;
    use tower::ServiceExt as _;

    const SECRET: &[u8] = b"s3cr3t";
    const BODY: &[u8] = br#"{"hello":"world"}"#;

    fn app(mock: &MockNatsClient) -> (Router, Arc<Delivery<MockNatsClient, StaticSecret>>) {
        let delivery = Arc::new(Delivery::new(
            mock.clone(),
            StaticSecret::new(SECRET),
            "gitee-webhook",
            "Robot-Gitee-Access",
        ));
        (router(Arc::clone(&delivery)), delivery)
    }

    async fn read_body(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn health_check_on_root() {
        let mock = MockNatsClient::new();
        let (app, _) = app(&mock);

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(read_body(response).await.is_empty());
        assert_eq!(mock.publish_attempts(), 0);
    }

    #[tokio::test]
    async fn unknown_paths_and_methods_are_health_checks() {
        let mock = MockNatsClient::new();

        for (method, uri) in [("GET", "/healthz"), ("POST", "/"), ("DELETE", "/some/where")] {
            let (app, _) = app(&mock);
            let response = app
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK, "{method} {uri}");
        }
        assert_eq!(mock.publish_attempts(), 0);
    }

    #[tokio::test]
    async fn get_on_hook_path_is_405() {
        let mock = MockNatsClient::new();
        let (app, _) = app(&mock);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(WEBHOOK_PATH)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(read_body(response).await, b"405 Method not allowed");
    }

    #[tokio::test]
    async fn signed_push_is_accepted_and_published() {
        let mock = MockNatsClient::new();
        let (app, delivery) = app(&mock);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(WEBHOOK_PATH)
                    .header("Content-Type", "application/json")
                    .header("X-Gitee-Event", "push")
                    .header("X-Gitee-Timestamp", "abc123")
                    .header("X-Gitee-Token", sign(SECRET, BODY))
                    .body(Body::from(BODY))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_body(response).await, b"Event received. Have a nice day.");

        delivery.await_drain().await;
        let published = mock.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].header("X-Gitee-Event"), Some("push"));
        assert_eq!(published[0].payload.as_ref(), BODY);
    }

    #[tokio::test]
    async fn broken_body_stream_is_500() {
        let mock = MockNatsClient::new();
        let (app, _) = app(&mock);
        let stream = futures_util::stream::once(async {
            Err::<bytes::Bytes, io::Error>(io::Error::other("peer went away"))
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(WEBHOOK_PATH)
                    .header("Content-Type", "application/json")
                    .header("X-Gitee-Event", "push")
                    .header("X-Gitee-Timestamp", "abc123")
                    .header("X-Gitee-Token", sign(SECRET, BODY))
                    .body(Body::from_stream(stream))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            read_body(response).await,
            b"500 Internal Server Error: Failed to read request body"
        );
        assert_eq!(mock.publish_attempts(), 0);
    }
}
