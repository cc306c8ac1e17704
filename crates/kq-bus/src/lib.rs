//! Messaging primitives shared by the orchestrator and the scheduler.
//!
//! Every channel is a trait object so that an unconfigured peer can be a no-op implementation
//! instead of a scattered `Option`. All receiving calls take an explicit timeout; a timeout is
//! reported as `None`, never as an error.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

mod error;
pub use error::BusError;

mod memory;
pub use memory::{
    MemoryBus, MemoryPuller, MemoryPusher, MemoryReplier, MemoryRequester, MemorySubscription,
    PendingRequest, pipeline, reply_channel,
};

mod noop;
pub use noop::{NoopPublisher, NoopPuller, NoopPusher, NoopRequester};

#[cfg(feature = "http")]
mod http;
#[cfg(feature = "http")]
pub use http::{HttpPusher, HttpRequester};

/// Structured, string-keyed message body.
pub type Payload = serde_json::Map<String, Value>;

/// Topic-based fan-out.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: Payload) -> Result<(), BusError>;
}

/// Source of topic subscriptions.
pub trait Subscriber: Send + Sync {
    /// Subscribe to every topic starting with one of `topics` (all topics when empty).
    fn subscribe(&self, topics: &[&str]) -> Box<dyn Subscription>;
}

#[async_trait]
pub trait Subscription: Send + Sync {
    /// Next matching `(topic, payload)`, or `None` once `timeout` elapses.
    async fn receive(&mut self, timeout: Duration) -> Option<(String, Payload)>;
}

/// Sending half of a work pipeline.
#[async_trait]
pub trait Pusher: Send + Sync {
    async fn push(&self, payload: Payload) -> Result<(), BusError>;
}

/// Receiving half of a work pipeline.
#[async_trait]
pub trait Puller: Send {
    async fn receive(&mut self, timeout: Duration) -> Option<Payload>;
}

/// Request/reply with a bounded wait.
#[async_trait]
pub trait Requester: Send + Sync {
    /// Response payload, or `None` on timeout or unreachable peer.
    async fn request(&self, payload: Payload, timeout: Duration) -> Option<Payload>;
}

/// Serialize `value` into a payload; it must serialize to a JSON object.
pub fn to_payload<T: Serialize + ?Sized>(value: &T) -> Result<Payload, BusError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(BusError::NotAnObject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn to_payload_accepts_objects_only() {
        let p = to_payload(&json!({"module": "kq", "priority": 3})).unwrap();
        assert_eq!(p["priority"], 3);

        assert!(matches!(to_payload(&json!([1, 2])), Err(BusError::NotAnObject)));
    }
}
