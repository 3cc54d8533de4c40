use crate::app::ports::{AlertStore, Predictor};
use crate::app::RecordFailure;
use crate::error::Result;
use crate::observability::metrics::classify as classify_metrics;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

/// Outcome of one classify run
#[derive(Debug, Default, Serialize)]
pub struct ClassifyReport {
    pub candidates: usize,
    pub labeled: usize,
    pub failures: Vec<RecordFailure>,
}

/// Label every alert whose cause is still unset.
pub struct ClassifyUseCase {
    predictor: Arc<dyn Predictor>,
    store: Arc<dyn AlertStore>,
}

impl ClassifyUseCase {
    pub fn new(predictor: Arc<dyn Predictor>, store: Arc<dyn AlertStore>) -> Self {
        Self { predictor, store }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<ClassifyReport> {
        classify_metrics::run_started();
        let t_run = Instant::now();

        let rows = self.store.fetch_unlabeled().await?;
        classify_metrics::candidates(rows.len());
        if rows.is_empty() {
            info!("No uncategorized alerts found");
            return Ok(ClassifyReport::default());
        }

        let mut report = ClassifyReport {
            candidates: rows.len(),
            ..ClassifyReport::default()
        };

        for row in rows {
            let cause = match self.predictor.predict(&row.description) {
                Ok(cause) => cause,
                Err(e) => {
                    error!(alert_id = %row.alert_id, "Error classifying alert: {}", e);
                    classify_metrics::record_error("predict");
                    report.failures.push(RecordFailure::new(row.alert_id, &e));
                    continue;
                }
            };

            match self.store.update_cause(&row.alert_id, &cause).await {
                Ok(()) => {
                    info!(alert_id = %row.alert_id, cause = %cause, "Updated alert cause");
                    classify_metrics::alert_labeled(&cause);
                    report.labeled += 1;
                }
                Err(e) => {
                    error!(alert_id = %row.alert_id, "Failed to update alert cause: {}", e);
                    classify_metrics::record_error("update");
                    report.failures.push(RecordFailure::new(row.alert_id, &e));
                }
            }
        }

        classify_metrics::run_duration(t_run.elapsed().as_secs_f64());
        info!(
            candidates = report.candidates,
            labeled = report.labeled,
            errors = report.failures.len(),
            "Classify run finished"
        );
        Ok(report)
    }
}
