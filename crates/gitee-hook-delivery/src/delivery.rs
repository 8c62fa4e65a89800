use std::sync::Arc;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hook_nats::PublishClient;
use tracing::{Instrument, error, info, info_span};

use crate::config::{DEFAULT_MAX_BODY_BYTES, DeliveryConfig};
use crate::drain::InFlightCounter;
use crate::message::OutboundMessage;
use crate::secret::SecretProvider;
use crate::validator::{self, Rejection, WebhookEvent};

pub const ACCEPTED_MESSAGE: &str = "Event received. Have a nice day.";

/// Validates webhooks and hands accepted ones to a detached publish task.
///
/// The response never waits on the broker: a `200` only means the webhook
/// was authenticated and a publish was scheduled.
pub struct Delivery<P, S> {
    publisher: P,
    secret: S,
    topic: String,
    user_agent: String,
    max_body_bytes: usize,
    in_flight: Arc<InFlightCounter>,
}

impl<P, S> Delivery<P, S>
where
    P: PublishClient,
    S: SecretProvider,
{
    pub fn new(
        publisher: P,
        secret: S,
        topic: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            publisher,
            secret,
            topic: topic.into(),
            user_agent: user_agent.into(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            in_flight: Arc::new(InFlightCounter::new()),
        }
    }

    pub fn from_config(publisher: P, secret: S, config: &DeliveryConfig) -> Self {
        Self::new(publisher, secret, &config.topic, &config.user_agent)
            .with_max_body_bytes(config.max_body_bytes)
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn in_flight(&self) -> &Arc<InFlightCounter> {
        &self.in_flight
    }

    /// Resolves once every publish scheduled so far has finished.
    pub async fn await_drain(&self) {
        self.in_flight.await_drain().await;
    }

    pub async fn handle(&self, request: Request) -> Response {
        match validator::validate(request, &self.secret, self.max_body_bytes).await {
            Ok(event) if self.schedule_publish(&event) => {
                (StatusCode::OK, ACCEPTED_MESSAGE).into_response()
            }
            Ok(_) => Rejection::SHUTTING_DOWN.into_response(),
            Err(rejection) => rejection.into_response(),
        }
    }

    /// Spawns the publish unless the drain has already begun.
    fn schedule_publish(&self, event: &WebhookEvent) -> bool {
        let Some(guard) = self.in_flight.track() else {
            return false;
        };
        let message = OutboundMessage::from_event(event, &self.user_agent);
        let span = info_span!(
            "gitee.publish",
            event_type = %event.event_type,
            event_id = %event.event_id,
            topic = %self.topic,
        );
        let publisher = self.publisher.clone();
        let topic = self.topic.clone();

        tokio::spawn(
            async move {
                let _guard = guard;
                let (headers, payload) = message.into_parts();
                match publisher.publish_with_headers(topic, headers, payload).await {
                    Ok(()) => info!("Published Gitee event"),
                    Err(e) => error!(error = %e, "Failed to publish Gitee event"),
                }
            }
            .instrument(span),
        );
        true
    }
}
