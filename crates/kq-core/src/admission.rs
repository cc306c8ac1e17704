//! Cooperative admission: ask a peer coordinator whether this cycle may run.

use std::{sync::Arc, time::Duration};

use kq_bus::{Requester, to_payload};
use kq_model::{AdmissionRequest, AdmissionResponse};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Verdict of one admission round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Peer answered and allowed the cycle.
    Granted,
    /// No peer configured, timeout, or unreadable answer; the cycle proceeds.
    Unanswered,
    /// Peer answered `execute = false`.
    Deferred,
}

impl Admission {
    pub fn proceeds(&self) -> bool {
        !matches!(self, Admission::Deferred)
    }
}

/// Fail-open negotiator. Only an explicit `execute = false` defers a cycle.
pub struct AdmissionNegotiator {
    peer: Option<Arc<dyn Requester>>,
    module: String,
    timeout: Duration,
}

impl AdmissionNegotiator {
    pub fn new(
        module: impl Into<String>,
        peer: Option<Arc<dyn Requester>>,
        timeout: Duration,
    ) -> Self {
        Self {
            peer,
            module: module.into(),
            timeout,
        }
    }

    /// Negotiator without a peer; every cycle proceeds.
    pub fn disabled(module: impl Into<String>) -> Self {
        Self::new(module, None, Duration::ZERO)
    }

    pub async fn negotiate(&self, priority: usize) -> Admission {
        let Some(peer) = &self.peer else {
            return Admission::Unanswered;
        };

        let request = AdmissionRequest {
            module: self.module.clone(),
            priority,
        };
        let payload = match to_payload(&request) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "admission request not serializable; proceeding");
                return Admission::Unanswered;
            }
        };

        let Some(reply) = peer.request(payload, self.timeout).await else {
            debug!(
                timeout_ms = self.timeout.as_millis() as u64,
                "admission peer silent; proceeding"
            );
            return Admission::Unanswered;
        };

        match serde_json::from_value::<AdmissionResponse>(Value::Object(reply)) {
            Ok(resp) if resp.execute => Admission::Granted,
            Ok(_) => {
                info!(module = %self.module, priority, "admission peer deferred the cycle");
                Admission::Deferred
            }
            Err(e) => {
                warn!(
                    error = %e,
                    error_kind = "serialization_failure",
                    "unreadable admission reply; proceeding"
                );
                Admission::Unanswered
            }
        }
    }
}
