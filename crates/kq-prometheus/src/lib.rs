//! Prometheus metrics backend for the kq orchestrator.
//!
//! [`PrometheusMetrics`] implements [`kq_core::MetricsBackend`]; hand it to
//! `Orchestrator::builder(..).metrics(..)` and serve [`PrometheusMetrics::encode`] from an HTTP
//! endpoint (`kq-agentd` exposes it as `GET /metrics`).
//!
//! ## Metrics
//! - `kq_cycles_total{mode, outcome}` - Counter
//! - `kq_tasks_completed_total{status, error_kind}` - Counter
//! - `kq_task_duration_seconds` - Histogram
//! - `kq_policy_reward` - Gauge (last reward)

mod backend;
pub use backend::PrometheusMetrics;

pub use prometheus::{Encoder, Registry, TextEncoder};
