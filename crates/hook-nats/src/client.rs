use async_nats::jetstream;
use async_nats::subject::ToSubject;
use async_nats::{Client as NatsAsyncClient, HeaderMap};
use bytes::Bytes;
use std::error::Error;
use std::future::Future;

/// Publishes one message with headers to a subject.
///
/// This is the only broker operation the delivery pipeline needs. Implementors
/// must tolerate concurrent calls from many tasks; the handle is cloned into
/// every publish task.
pub trait PublishClient: Send + Sync + Clone + 'static {
    type PublishError: Error + Send + Sync + 'static;

    fn publish_with_headers<S: ToSubject + Send>(
        &self,
        subject: S,
        headers: HeaderMap,
        payload: Bytes,
    ) -> impl Future<Output = Result<(), Self::PublishError>> + Send;
}

/// Core NATS: resolves once the message is handed to the client's outbound
/// buffer. Call `flush` on shutdown to push buffered messages to the server.
impl PublishClient for NatsAsyncClient {
    type PublishError = async_nats::client::PublishError;

    async fn publish_with_headers<S: ToSubject + Send>(
        &self,
        subject: S,
        headers: HeaderMap,
        payload: Bytes,
    ) -> Result<(), Self::PublishError> {
        self.publish_with_headers(subject, headers, payload).await
    }
}

/// JetStream: resolves once the stream has acknowledged the message. The stream
/// capturing the subject must already exist.
impl PublishClient for jetstream::Context {
    type PublishError = jetstream::context::PublishError;

    async fn publish_with_headers<S: ToSubject + Send>(
        &self,
        subject: S,
        headers: HeaderMap,
        payload: Bytes,
    ) -> Result<(), Self::PublishError> {
        let ack = self.publish_with_headers(subject, headers, payload).await?;
        ack.await.map(|_| ())
    }
}
