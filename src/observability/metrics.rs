//! Run metrics for the batch jobs
//!
//! Counters and histograms go through the `metrics` facade. When a Pushgateway is
//! configured the job installs a Prometheus recorder and pushes one snapshot when it
//! finishes, since a short-lived job is never around to be scraped.

use std::fmt;
use std::sync::OnceLock;
use tracing::{info, warn};

/// All metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Ingest metrics
    IngestRuns,
    IngestEntitiesFetched,
    IngestAlertsStored,
    IngestEntitiesSkipped,
    IngestRecordErrors,
    IngestFetchDuration,
    IngestRunDuration,

    // Classify metrics
    ClassifyRuns,
    ClassifyCandidates,
    ClassifyAlertsLabeled,
    ClassifyRecordErrors,
    ClassifyRunDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::IngestRuns => "alerts_ingest_runs_total",
            MetricName::IngestEntitiesFetched => "alerts_ingest_entities_fetched_total",
            MetricName::IngestAlertsStored => "alerts_ingest_alerts_stored_total",
            MetricName::IngestEntitiesSkipped => "alerts_ingest_entities_skipped_total",
            MetricName::IngestRecordErrors => "alerts_ingest_record_errors_total",
            MetricName::IngestFetchDuration => "alerts_ingest_fetch_duration_seconds",
            MetricName::IngestRunDuration => "alerts_ingest_run_duration_seconds",

            MetricName::ClassifyRuns => "alerts_classify_runs_total",
            MetricName::ClassifyCandidates => "alerts_classify_candidates_total",
            MetricName::ClassifyAlertsLabeled => "alerts_classify_alerts_labeled_total",
            MetricName::ClassifyRecordErrors => "alerts_classify_record_errors_total",
            MetricName::ClassifyRunDuration => "alerts_classify_run_duration_seconds",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

struct MetricsState {
    handle: metrics_exporter_prometheus::PrometheusHandle,
    pushgateway_url: String,
    job: String,
}

static METRICS_STATE: OnceLock<MetricsState> = OnceLock::new();

/// Install the Prometheus recorder if a Pushgateway is configured. Without one the
/// `metrics` macros stay no-ops.
pub fn init(pushgateway_url: Option<&str>, job: &str) {
    let Some(url) = pushgateway_url else {
        info!("Metrics system initialized (no push gateway)");
        return;
    };
    match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_STATE.set(MetricsState {
                handle,
                pushgateway_url: url.trim_end_matches('/').to_string(),
                job: job.to_string(),
            });
            info!("Metrics system initialized with push gateway support");
        }
        Err(e) => warn!("Failed to install Prometheus recorder: {}", e),
    }
}

/// Pushgateway grouping URL for a job
pub fn push_url(base: &str, job: &str) -> String {
    format!("{}/metrics/job/{}", base.trim_end_matches('/'), job)
}

/// Push the rendered snapshot. Failures are logged and never fail the run.
pub async fn push_all() {
    let Some(state) = METRICS_STATE.get() else {
        return;
    };
    let url = push_url(&state.pushgateway_url, &state.job);
    let body = state.handle.render();

    let res = reqwest::Client::new()
        .put(&url)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(body)
        .send()
        .await;
    match res {
        Ok(r) if r.status().is_success() => info!("Pushed metrics to Pushgateway for job={}", state.job),
        Ok(r) => warn!(
            "Pushgateway push responded with status {} for job={}",
            r.status().as_u16(),
            state.job
        ),
        Err(e) => warn!("Failed to push metrics to Pushgateway for job={}: {}", state.job, e),
    }
}

// ============================================================================
// Ingest Metrics
// ============================================================================

pub mod ingest {
    use super::MetricName;

    pub fn run_started() {
        ::metrics::counter!(MetricName::IngestRuns.as_str()).increment(1);
    }

    pub fn entities_fetched(count: usize) {
        ::metrics::counter!(MetricName::IngestEntitiesFetched.as_str()).increment(count as u64);
    }

    pub fn alert_stored() {
        ::metrics::counter!(MetricName::IngestAlertsStored.as_str()).increment(1);
    }

    pub fn entity_skipped() {
        ::metrics::counter!(MetricName::IngestEntitiesSkipped.as_str()).increment(1);
    }

    pub fn record_error(stage: &'static str) {
        ::metrics::counter!(MetricName::IngestRecordErrors.as_str(), "stage" => stage).increment(1);
    }

    pub fn fetch_duration(secs: f64) {
        ::metrics::histogram!(MetricName::IngestFetchDuration.as_str()).record(secs);
    }

    pub fn run_duration(secs: f64) {
        ::metrics::histogram!(MetricName::IngestRunDuration.as_str()).record(secs);
    }
}

// ============================================================================
// Classify Metrics
// ============================================================================

pub mod classify {
    use super::MetricName;

    pub fn run_started() {
        ::metrics::counter!(MetricName::ClassifyRuns.as_str()).increment(1);
    }

    pub fn candidates(count: usize) {
        ::metrics::counter!(MetricName::ClassifyCandidates.as_str()).increment(count as u64);
    }

    pub fn alert_labeled(cause: &str) {
        ::metrics::counter!(MetricName::ClassifyAlertsLabeled.as_str(), "cause" => cause.to_string())
            .increment(1);
    }

    pub fn record_error(stage: &'static str) {
        ::metrics::counter!(MetricName::ClassifyRecordErrors.as_str(), "stage" => stage).increment(1);
    }

    pub fn run_duration(secs: f64) {
        ::metrics::histogram!(MetricName::ClassifyRunDuration.as_str()).record(secs);
    }
}
