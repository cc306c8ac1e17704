use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{trace, warn};

use crate::{BusError, Payload, Publisher, Puller, Pusher, Requester, Subscriber, Subscription};

/// In-process publish/subscribe bus backed by a broadcast channel.
///
/// Publishing with no live subscriber is not an error; the message is dropped.
#[derive(Debug, Clone)]
pub struct MemoryBus {
    sender: broadcast::Sender<(String, Payload)>,
}

impl MemoryBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl Publisher for MemoryBus {
    async fn publish(&self, topic: &str, payload: Payload) -> Result<(), BusError> {
        let delivered = self.sender.send((topic.to_string(), payload)).unwrap_or(0);
        trace!(topic, delivered, "published");
        Ok(())
    }
}

impl Subscriber for MemoryBus {
    fn subscribe(&self, topics: &[&str]) -> Box<dyn Subscription> {
        Box::new(MemorySubscription {
            rx: self.sender.subscribe(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
        })
    }
}

pub struct MemorySubscription {
    rx: broadcast::Receiver<(String, Payload)>,
    topics: Vec<String>,
}

impl MemorySubscription {
    fn matches(&self, topic: &str) -> bool {
        self.topics.is_empty() || self.topics.iter().any(|t| topic.starts_with(t.as_str()))
    }
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn receive(&mut self, wait: Duration) -> Option<(String, Payload)> {
        let deadline = Instant::now() + wait;
        loop {
            match timeout_at(deadline, self.rx.recv()).await {
                Err(_) => return None,
                Ok(Ok((topic, payload))) => {
                    if self.matches(&topic) {
                        return Some((topic, payload));
                    }
                }
                Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    warn!(skipped, "subscription lagged; messages dropped");
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => return None,
            }
        }
    }
}

/// Build a connected push/pull pair.
pub fn pipeline() -> (MemoryPusher, MemoryPuller) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MemoryPusher { tx }, MemoryPuller { rx })
}

#[derive(Debug, Clone)]
pub struct MemoryPusher {
    tx: mpsc::UnboundedSender<Payload>,
}

#[async_trait]
impl Pusher for MemoryPusher {
    async fn push(&self, payload: Payload) -> Result<(), BusError> {
        self.tx.send(payload).map_err(|_| BusError::Closed)
    }
}

#[derive(Debug)]
pub struct MemoryPuller {
    rx: mpsc::UnboundedReceiver<Payload>,
}

#[async_trait]
impl Puller for MemoryPuller {
    async fn receive(&mut self, wait: Duration) -> Option<Payload> {
        timeout(wait, self.rx.recv()).await.ok().flatten()
    }
}

/// Build a connected request/reply pair.
pub fn reply_channel(capacity: usize) -> (MemoryRequester, MemoryReplier) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (MemoryRequester { tx }, MemoryReplier { rx })
}

#[derive(Debug, Clone)]
pub struct MemoryRequester {
    tx: mpsc::Sender<PendingRequest>,
}

#[async_trait]
impl Requester for MemoryRequester {
    async fn request(&self, payload: Payload, wait: Duration) -> Option<Payload> {
        let (reply, rx) = oneshot::channel();
        let exchange = async move {
            self.tx.send(PendingRequest { payload, reply }).await.ok()?;
            rx.await.ok()
        };
        timeout(wait, exchange).await.ok().flatten()
    }
}

/// A request waiting for its reply.
#[derive(Debug)]
pub struct PendingRequest {
    pub payload: Payload,
    reply: oneshot::Sender<Payload>,
}

impl PendingRequest {
    /// Send the reply; a requester that already gave up is ignored.
    pub fn respond(self, payload: Payload) {
        let _ = self.reply.send(payload);
    }
}

#[derive(Debug)]
pub struct MemoryReplier {
    rx: mpsc::Receiver<PendingRequest>,
}

impl MemoryReplier {
    pub async fn next(&mut self) -> Option<PendingRequest> {
        self.rx.recv().await
    }

    /// Answer every request with `handler` until all requesters are dropped.
    pub async fn serve<F>(mut self, handler: F)
    where
        F: Fn(&Payload) -> Payload + Send,
    {
        while let Some(req) = self.next().await {
            let response = handler(&req.payload);
            req.respond(response);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::to_payload;
    use serde_json::json;

    fn p(v: serde_json::Value) -> Payload {
        to_payload(&v).unwrap()
    }

    #[tokio::test]
    async fn subscription_filters_by_prefix() {
        let bus = MemoryBus::new(16);
        let mut sub = bus.subscribe(&["cycle."]);

        bus.publish("cluster.metrics", p(json!({"nodes": {}}))).await.unwrap();
        bus.publish("cycle.started", p(json!({"cycle": 1}))).await.unwrap();

        let (topic, payload) = sub.receive(Duration::from_millis(100)).await.unwrap();
        assert_eq!(topic, "cycle.started");
        assert_eq!(payload["cycle"], 1);
    }

    #[tokio::test]
    async fn subscription_times_out_when_idle() {
        let bus = MemoryBus::new(4);
        let mut sub = bus.subscribe(&[]);
        assert!(sub.receive(Duration::from_millis(10)).await.is_none());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let bus = MemoryBus::new(4);
        assert!(bus.publish("nobody", Payload::new()).await.is_ok());
    }

    #[tokio::test]
    async fn pipeline_drains_in_order_then_times_out() {
        let (push, mut pull) = pipeline();
        push.push(p(json!({"n": 1}))).await.unwrap();
        push.push(p(json!({"n": 2}))).await.unwrap();

        let wait = Duration::from_millis(10);
        assert_eq!(pull.receive(wait).await.unwrap()["n"], 1);
        assert_eq!(pull.receive(wait).await.unwrap()["n"], 2);
        assert!(pull.receive(wait).await.is_none());
    }

    #[tokio::test]
    async fn push_after_puller_dropped_fails() {
        let (push, pull) = pipeline();
        drop(pull);
        assert!(matches!(push.push(Payload::new()).await, Err(BusError::Closed)));
    }

    #[tokio::test]
    async fn request_reply_roundtrip() {
        let (req, rep) = reply_channel(4);
        tokio::spawn(rep.serve(|payload| {
            let priority = payload.get("priority").and_then(|v| v.as_u64()).unwrap_or(0);
            p(json!({"execute": priority < 10}))
        }));

        let resp = req
            .request(p(json!({"priority": 3})), Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(resp["execute"], true);
    }

    #[tokio::test]
    async fn request_times_out_without_reply() {
        let (req, mut rep) = reply_channel(4);
        let holder = tokio::spawn(async move {
            // keep the request pending without answering
            let pending = rep.next().await;
            tokio::time::sleep(Duration::from_millis(200)).await;
            drop(pending);
        });

        let resp = req.request(Payload::new(), Duration::from_millis(20)).await;
        assert!(resp.is_none());
        holder.abort();
    }
}
