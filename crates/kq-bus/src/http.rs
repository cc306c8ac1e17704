use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::{BusError, Payload, Pusher, Requester};

/// Request/reply over HTTP: the payload is POSTed as JSON and the JSON object body is the reply.
#[derive(Debug, Clone)]
pub struct HttpRequester {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRequester {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, BusError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn exchange(&self, payload: &Payload, timeout: Duration) -> Result<Payload, BusError> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(timeout)
            .json(payload)
            .send()
            .await?
            .error_for_status()?;

        match response.json::<Value>().await? {
            Value::Object(map) => Ok(map),
            _ => Err(BusError::NotAnObject),
        }
    }
}

#[async_trait]
impl Requester for HttpRequester {
    async fn request(&self, payload: Payload, timeout: Duration) -> Option<Payload> {
        match self.exchange(&payload, timeout).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                debug!(endpoint = %self.endpoint, error = %e, "request got no usable reply");
                None
            }
        }
    }
}

/// Push over HTTP: each payload is POSTed as JSON, the response body is ignored.
#[derive(Debug, Clone)]
pub struct HttpPusher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPusher {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, BusError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Pusher for HttpPusher {
    async fn push(&self, payload: Payload) -> Result<(), BusError> {
        self.client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
