use std::collections::BTreeMap;

use async_nats::HeaderMap;
use bytes::Bytes;

use crate::validator::WebhookEvent;

pub const CONTENT_TYPE: &str = "content-type";
pub const GITEE_EVENT: &str = "X-Gitee-Event";
pub const GITEE_TIMESTAMP: &str = "X-Gitee-Timestamp";
pub const GITEE_TOKEN: &str = "X-Gitee-Token";
pub const USER_AGENT: &str = "User-Agent";

/// What gets published for one accepted webhook: the original body plus the
/// Gitee headers a consumer needs to interpret it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    headers: BTreeMap<&'static str, String>,
    body: Bytes,
}

impl OutboundMessage {
    pub fn from_event(event: &WebhookEvent, user_agent: &str) -> Self {
        let headers = BTreeMap::from([
            (CONTENT_TYPE, event.content_type.clone()),
            (GITEE_EVENT, event.event_type.clone()),
            (GITEE_TIMESTAMP, event.event_id.clone()),
            (GITEE_TOKEN, event.signature.clone()),
            (USER_AGENT, user_agent.to_owned()),
        ]);
        Self {
            headers,
            body: event.body.clone(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Splits the message into the NATS header map and payload.
    pub fn into_parts(self) -> (HeaderMap, Bytes) {
        let mut headers = HeaderMap::new();
        for (name, value) in self.headers {
            headers.insert(name, value.as_str());
        }
        (headers, self.body)
    }
}
