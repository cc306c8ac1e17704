use std::time::Duration;

use async_trait::async_trait;

use crate::{BusError, Payload, Publisher, Puller, Pusher, Requester};

/// Publisher for an unconfigured topic sink; drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

#[async_trait]
impl Publisher for NoopPublisher {
    async fn publish(&self, _topic: &str, _payload: Payload) -> Result<(), BusError> {
        Ok(())
    }
}

/// Pusher for an unconfigured metrics sink; drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPusher;

#[async_trait]
impl Pusher for NoopPusher {
    async fn push(&self, _payload: Payload) -> Result<(), BusError> {
        Ok(())
    }
}

/// Puller that never yields a message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPuller;

#[async_trait]
impl Puller for NoopPuller {
    async fn receive(&mut self, _timeout: Duration) -> Option<Payload> {
        None
    }
}

/// Requester for an unconfigured peer: answers `None` immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRequester;

#[async_trait]
impl Requester for NoopRequester {
    async fn request(&self, _payload: Payload, _timeout: Duration) -> Option<Payload> {
        None
    }
}
