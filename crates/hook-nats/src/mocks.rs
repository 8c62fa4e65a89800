use crate::client::PublishClient;
use async_nats::HeaderMap;
use async_nats::subject::ToSubject;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct MockError(pub String);

/// A message captured by [`MockNatsClient`].
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub subject: String,
    pub headers: HeaderMap,
    pub payload: Bytes,
}

impl PublishedMessage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }
}

/// Recording publisher for tests.
///
/// Clones share state, so a test keeps one handle for assertions while the
/// code under test owns another. Besides recording, it can:
/// - fail the next `n` publishes ([`fail_publish_count`](Self::fail_publish_count)),
/// - panic inside the next publish ([`panic_next_publish`](Self::panic_next_publish)),
/// - park every publish until released ([`hold_publishes`](Self::hold_publishes)).
#[derive(Clone, Debug)]
pub struct MockNatsClient {
    published: Arc<Mutex<Vec<PublishedMessage>>>,
    attempts: Arc<AtomicUsize>,
    fail_count: Arc<AtomicUsize>,
    panic_next: Arc<AtomicBool>,
    held: Arc<watch::Sender<bool>>,
}

impl MockNatsClient {
    pub fn new() -> Self {
        let (held, _) = watch::channel(false);
        Self {
            published: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(AtomicUsize::new(0)),
            fail_count: Arc::new(AtomicUsize::new(0)),
            panic_next: Arc::new(AtomicBool::new(false)),
            held: Arc::new(held),
        }
    }

    pub fn fail_next_publish(&self) {
        self.fail_publish_count(1);
    }

    pub fn fail_publish_count(&self, n: usize) {
        self.fail_count.store(n, Ordering::SeqCst);
    }

    pub fn panic_next_publish(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    /// Parks every publish (current and future) until [`release_publishes`](Self::release_publishes).
    pub fn hold_publishes(&self) {
        self.held.send_replace(true);
    }

    pub fn release_publishes(&self) {
        self.held.send_replace(false);
    }

    /// Messages that were published successfully, in completion order.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.lock().clone()
    }

    /// Every call to `publish_with_headers`, including failed and parked ones.
    pub fn publish_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PublishedMessage>> {
        self.published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_failure(&self) -> bool {
        self.fail_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for MockNatsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishClient for MockNatsClient {
    type PublishError = MockError;

    async fn publish_with_headers<S: ToSubject + Send>(
        &self,
        subject: S,
        headers: HeaderMap,
        payload: Bytes,
    ) -> Result<(), MockError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let subject = subject.to_subject().to_string();

        let mut held = self.held.subscribe();
        // The sender lives in `self`, so this only errors if the mock is gone.
        let _ = held.wait_for(|parked| !*parked).await;

        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("mock: simulated publish panic on {subject}");
        }
        if self.take_failure() {
            return Err(MockError(format!("simulated publish failure on {subject}")));
        }

        self.lock().push(PublishedMessage {
            subject,
            headers,
            payload,
        });
        Ok(())
    }
}
