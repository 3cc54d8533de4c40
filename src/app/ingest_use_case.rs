use crate::app::ports::{AlertStore, FeedSource};
use crate::app::RecordFailure;
use crate::error::Result;
use crate::observability::metrics::ingest as ingest_metrics;
use crate::parser::{entity_id, AlertParser};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

/// Outcome of one ingest run
#[derive(Debug, Default, Serialize)]
pub struct IngestReport {
    pub total_entities: usize,
    pub stored: usize,
    pub skipped: usize,
    pub failures: Vec<RecordFailure>,
}

/// Fetch the feed once, then parse and upsert every delay alert in it.
pub struct IngestUseCase {
    feed: Box<dyn FeedSource>,
    parser: AlertParser,
    store: Arc<dyn AlertStore>,
}

impl IngestUseCase {
    pub fn new(feed: Box<dyn FeedSource>, parser: AlertParser, store: Arc<dyn AlertStore>) -> Self {
        Self { feed, parser, store }
    }

    /// A fetch failure aborts the run. Failures on single entities are logged,
    /// collected in the report, and the run moves on.
    #[instrument(skip(self))]
    pub async fn run(&self, observed_at: NaiveDateTime) -> Result<IngestReport> {
        ingest_metrics::run_started();
        let t_run = Instant::now();

        let t_fetch = Instant::now();
        let message = self.feed.fetch().await?;
        ingest_metrics::fetch_duration(t_fetch.elapsed().as_secs_f64());
        ingest_metrics::entities_fetched(message.entity.len());

        let mut report = IngestReport {
            total_entities: message.entity.len(),
            ..IngestReport::default()
        };

        for raw in &message.entity {
            let key = entity_id(raw).unwrap_or("<missing id>").to_string();
            let alert = match self.parser.parse(raw, observed_at) {
                Ok(Some(alert)) => alert,
                Ok(None) => {
                    report.skipped += 1;
                    ingest_metrics::entity_skipped();
                    continue;
                }
                Err(e) => {
                    error!(alert_id = %key, "Error processing alert entity: {}", e);
                    ingest_metrics::record_error("parse");
                    report.failures.push(RecordFailure::new(key, &e));
                    continue;
                }
            };

            match self.store.upsert_alert(&alert).await {
                Ok(()) => {
                    info!(alert_id = %alert.alert_id, routes = ?alert.routes, "Upserted alert");
                    ingest_metrics::alert_stored();
                    report.stored += 1;
                }
                Err(e) => {
                    error!(alert_id = %alert.alert_id, "Failed to store alert: {}", e);
                    ingest_metrics::record_error("store");
                    report.failures.push(RecordFailure::new(alert.alert_id, &e));
                }
            }
        }

        ingest_metrics::run_duration(t_run.elapsed().as_secs_f64());
        info!(
            total = report.total_entities,
            stored = report.stored,
            skipped = report.skipped,
            errors = report.failures.len(),
            "Ingest run finished"
        );
        Ok(report)
    }
}
