//! Classify job: predict a cause for every alert that does not have one yet.
//!
//! Usage:
//!   cargo run --bin classify-alerts

use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};
use transit_alerts::app::classify_use_case::{ClassifyReport, ClassifyUseCase};
use transit_alerts::classifier::ArtifactLoader;
use transit_alerts::config::Config;
use transit_alerts::constants::DEFAULT_LOG_DIR;
use transit_alerts::infra::build_store;
use transit_alerts::{logging, observability};
use uuid::Uuid;

const JOB: &str = "classify-alerts";

async fn run(config: &Config) -> transit_alerts::error::Result<ClassifyReport> {
    info!("Loading model and preprocessing artifacts");
    let predictor = Arc::new(ArtifactLoader::load(&config.artifacts)?);
    let store = build_store(config).await?;
    ClassifyUseCase::new(predictor, store).run().await
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

    let span = tracing::info_span!("classify", run_id = %Uuid::new_v4());
    let result = run(&config).instrument(span).await;
    observability::push_metrics().await;

    match result {
        Ok(report) => {
            if !report.failures.is_empty() {
                warn!("{} alerts could not be classified", report.failures.len());
            }
            info!(
                "Classify complete: {} of {} labeled",
                report.labeled, report.candidates
            );
            Ok(())
        }
        Err(e) => {
            error!("Classify run aborted: {}", e);
            Err(e.into())
        }
    }
}
