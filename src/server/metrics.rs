//! Request logging and metrics middleware.
//!
//! Every request is timed, logged through `tracing`, and folded into a
//! process-wide counter set served by the metrics endpoint. Latencies keep a
//! bounded window of recent samples.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;

use crate::server::AppState;

/// Number of latency samples kept for the summary.
const LATENCY_WINDOW: usize = 1000;

/// How many endpoints the snapshot reports.
const TOP_ENDPOINTS: usize = 10;

#[derive(Default)]
struct MetricsInner {
    total_requests: u64,
    total_errors: u64,
    by_method: HashMap<String, u64>,
    by_endpoint: HashMap<String, u64>,
    status_codes: BTreeMap<u16, u64>,
    latencies_secs: VecDeque<f64>,
}

/// Process-wide request metrics.
#[derive(Default)]
pub struct Metrics {
    inner: Mutex<MetricsInner>,
}

/// Latency summary over the sample window.
#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Point-in-time metrics view.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    /// Percentage of requests answered with a 5xx
    pub error_rate: f64,
    pub requests_by_method: BTreeMap<String, u64>,
    /// Busiest endpoints, capped at the top ten
    pub requests_by_endpoint: BTreeMap<String, u64>,
    pub status_codes: BTreeMap<u16, u64>,
    pub response_times: LatencySummary,
}

impl Metrics {
    /// Fold one finished request into the counters.
    pub fn record(&self, method: &str, path: &str, status: u16, elapsed: Duration) {
        let mut inner = self.inner.lock().expect("metrics lock poisoned");

        inner.total_requests += 1;
        if status >= 500 {
            inner.total_errors += 1;
        }
        *inner.by_method.entry(method.to_string()).or_insert(0) += 1;
        *inner.by_endpoint.entry(path.to_string()).or_insert(0) += 1;
        *inner.status_codes.entry(status).or_insert(0) += 1;

        inner.latencies_secs.push_back(elapsed.as_secs_f64());
        if inner.latencies_secs.len() > LATENCY_WINDOW {
            inner.latencies_secs.pop_front();
        }
    }

    /// Current metrics view.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock().expect("metrics lock poisoned");

        let error_rate = if inner.total_requests > 0 {
            round4(inner.total_errors as f64 / inner.total_requests as f64 * 100.0)
        } else {
            0.0
        };

        let mut endpoints: Vec<(&String, &u64)> = inner.by_endpoint.iter().collect();
        endpoints.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let requests_by_endpoint = endpoints
            .into_iter()
            .take(TOP_ENDPOINTS)
            .map(|(path, count)| (path.clone(), *count))
            .collect();

        MetricsSnapshot {
            total_requests: inner.total_requests,
            total_errors: inner.total_errors,
            error_rate,
            requests_by_method: inner
                .by_method
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            requests_by_endpoint,
            status_codes: inner.status_codes.clone(),
            response_times: latency_summary(&inner.latencies_secs),
        }
    }
}

fn latency_summary(samples: &VecDeque<f64>) -> LatencySummary {
    if samples.is_empty() {
        return LatencySummary {
            count: 0,
            mean: 0.0,
            median: 0.0,
            min: 0.0,
            max: 0.0,
            p95: 0.0,
            p99: 0.0,
        };
    }

    let mut sorted: Vec<f64> = samples.iter().copied().collect();
    sorted.sort_by(f64::total_cmp);

    let sum: f64 = sorted.iter().sum();
    LatencySummary {
        count: sorted.len(),
        mean: round4(sum / sorted.len() as f64),
        median: round4(percentile(&sorted, 50.0)),
        min: round4(sorted[0]),
        max: round4(sorted[sorted.len() - 1]),
        p95: round4(percentile(&sorted, 95.0)),
        p99: round4(percentile(&sorted, 99.0)),
    }
}

/// Nearest-rank percentile over an ascending-sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Middleware: time the request, record metrics, and log the outcome.
pub async fn track(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    state.metrics.record(method.as_str(), &path, status, elapsed);
    tracing::info!(
        method = %method,
        path = %path,
        status,
        elapsed_ms = elapsed.as_millis() as u64,
        "request completed"
    );

    response
}
