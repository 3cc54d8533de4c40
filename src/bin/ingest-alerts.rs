//! Ingest job: fetch the subway alerts feed and upsert every delay alert.
//!
//! Usage:
//!   cargo run --bin ingest-alerts

use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};
use transit_alerts::app::ingest_use_case::{IngestReport, IngestUseCase};
use transit_alerts::config::Config;
use transit_alerts::constants::DEFAULT_LOG_DIR;
use transit_alerts::feed::FeedFetcher;
use transit_alerts::infra::build_store;
use transit_alerts::infra::http_client::ReqwestHttp;
use transit_alerts::parser::AlertParser;
use transit_alerts::{logging, observability};
use uuid::Uuid;

const JOB: &str = "ingest-alerts";

async fn run(config: &Config) -> transit_alerts::error::Result<IngestReport> {
    let store = build_store(config).await?;
    let feed = FeedFetcher::new(Arc::new(ReqwestHttp::new()), config.feed_url.clone());
    let use_case = IngestUseCase::new(Box::new(feed), AlertParser::new(), store);
    use_case.run(Utc::now().naive_utc()).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            let _guard = logging::init_logging(JOB, Path::new(DEFAULT_LOG_DIR));
            error!("Configuration failed: {}", e);
            return Err(e.into());
        }
    };
    let _guard = logging::init_logging(JOB, &config.log_dir);
    observability::init_metrics(config.pushgateway_url.as_deref(), JOB);

    let span = tracing::info_span!("ingest", run_id = %Uuid::new_v4());
    let result = run(&config).instrument(span).await;
    observability::push_metrics().await;

    match result {
        Ok(report) => {
            if !report.failures.is_empty() {
                warn!("{} alerts failed during ingest", report.failures.len());
            }
            info!(
                "Ingest complete: {} stored, {} skipped, {} errors",
                report.stored,
                report.skipped,
                report.failures.len()
            );
            Ok(())
        }
        Err(e) => {
            error!("Failed to fetch or parse alert data: {}", e);
            Err(e.into())
        }
    }
}
