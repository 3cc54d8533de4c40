use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use transit_alerts::app::classify_use_case::ClassifyUseCase;
use transit_alerts::app::ports::{AlertStore, Predictor};
use transit_alerts::classifier::ArtifactLoader;
use transit_alerts::config::ArtifactPaths;
use transit_alerts::error::AlertError;
use transit_alerts::storage::InMemoryAlertStore;
use transit_alerts::types::{Alert, StoredAlert, UnlabeledAlert};

/// Records every call so tests can assert on writes
#[derive(Default)]
struct RecordingStore {
    unlabeled: Vec<UnlabeledAlert>,
    fail_fetch: bool,
    updates: Mutex<Vec<(String, String)>>,
}

impl RecordingStore {
    fn with_rows(rows: &[(&str, &str)]) -> Self {
        Self {
            unlabeled: rows
                .iter()
                .map(|(id, text)| UnlabeledAlert {
                    alert_id: id.to_string(),
                    description: text.to_string(),
                })
                .collect(),
            ..Self::default()
        }
    }

    fn updates(&self) -> Vec<(String, String)> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertStore for RecordingStore {
    async fn upsert_alert(&self, _alert: &Alert) -> transit_alerts::error::Result<()> {
        Ok(())
    }

    async fn fetch_unlabeled(&self) -> transit_alerts::error::Result<Vec<UnlabeledAlert>> {
        if self.fail_fetch {
            return Err(AlertError::store("401 - invalid api key"));
        }
        Ok(self.unlabeled.clone())
    }

    async fn update_cause(&self, alert_id: &str, cause: &str) -> transit_alerts::error::Result<()> {
        self.updates
            .lock()
            .unwrap()
            .push((alert_id.to_string(), cause.to_string()));
        Ok(())
    }

    async fn fetch_seen_since(
        &self,
        _since: NaiveDateTime,
    ) -> transit_alerts::error::Result<Vec<StoredAlert>> {
        Ok(Vec::new())
    }
}

/// Fails on descriptions containing a marker word
struct PickyPredictor;

impl Predictor for PickyPredictor {
    fn predict(&self, description: &str) -> transit_alerts::error::Result<String> {
        if description.contains("garbled") {
            return Err(AlertError::Prediction("input rejected".to_string()));
        }
        Ok("Signal".to_string())
    }
}

fn write(dir: &TempDir, name: &str, value: serde_json::Value) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();
    path
}

fn artifacts(dir: &TempDir) -> ArtifactPaths {
    ArtifactPaths {
        vectorizer: write(
            dir,
            "tfidf_vectorizer.json",
            json!({
                "vocabulary": {"brakes": 0, "signal": 1, "police": 2, "sick": 3, "customer": 4},
                "idf": [1.4, 1.2, 1.9, 2.1, 1.3],
                "sublinear_tf": true
            }),
        ),
        model: write(
            dir,
            "cause_model.json",
            json!({"layers": [
                {
                    "weights": [
                        [3.0, 0.0, 0.0, 0.0],
                        [0.0, 3.0, 0.0, 0.0],
                        [0.0, 0.0, 3.0, 0.0],
                        [0.0, 0.0, 0.0, 3.0],
                        [0.0, 0.0, 0.0, 1.0]
                    ],
                    "bias": [0.0, 0.0, 0.0, 0.0],
                    "activation": "relu"
                },
                {
                    "weights": [
                        [2.0, 0.0, 0.0, 0.0],
                        [0.0, 2.0, 0.0, 0.0],
                        [0.0, 0.0, 2.0, 0.0],
                        [0.0, 0.0, 0.0, 2.0]
                    ],
                    "bias": [0.0, 0.0, 0.0, 0.0],
                    "activation": "softmax"
                }
            ]}),
        ),
        label_encoder: write(
            dir,
            "label_encoder.json",
            json!({"classes": ["Brakes", "Signal", "NYPD", "EMS"]}),
        ),
    }
}

fn alert(id: &str, description: &str) -> Alert {
    let day = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
    Alert {
        alert_id: id.to_string(),
        routes: vec!["L".to_string()],
        start_time: day.and_hms_opt(8, 15, 0).unwrap(),
        last_seen_time: day.and_hms_opt(8, 20, 0).unwrap(),
        description: description.to_string(),
    }
}

#[tokio::test]
async fn no_unlabeled_rows_means_no_writes() -> Result<()> {
    let store = Arc::new(RecordingStore::default());
    let report = ClassifyUseCase::new(Arc::new(PickyPredictor), store.clone())
        .run()
        .await?;

    assert_eq!(report.candidates, 0);
    assert_eq!(report.labeled, 0);
    assert!(store.updates().is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_prediction_only_skips_that_row() -> Result<()> {
    let store = Arc::new(RecordingStore::with_rows(&[
        ("lmm:alert:1", "[G] trains delayed, signal problems"),
        ("lmm:alert:2", "garbled"),
        ("lmm:alert:3", "[J] trains delayed, signal problems"),
    ]));
    let report = ClassifyUseCase::new(Arc::new(PickyPredictor), store.clone())
        .run()
        .await?;

    assert_eq!(report.candidates, 3);
    assert_eq!(report.labeled, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].key, "lmm:alert:2");
    assert_eq!(
        store.updates(),
        vec![
            ("lmm:alert:1".to_string(), "Signal".to_string()),
            ("lmm:alert:3".to_string(), "Signal".to_string()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn unlabeled_fetch_failure_aborts_the_run() {
    let store = Arc::new(RecordingStore {
        fail_fetch: true,
        ..RecordingStore::default()
    });
    let err = ClassifyUseCase::new(Arc::new(PickyPredictor), store.clone())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, AlertError::Store { .. }));
    assert!(store.updates().is_empty());
}

#[tokio::test]
async fn loaded_artifacts_label_every_unlabeled_alert() -> Result<()> {
    let dir = TempDir::new()?;
    let predictor = Arc::new(ArtifactLoader::load(&artifacts(&dir))?);

    let store = Arc::new(InMemoryAlertStore::new());
    store
        .upsert_alert(&alert("lmm:alert:1", "[L] trains are delayed while we fix a signal problem"))
        .await?;
    store
        .upsert_alert(&alert("lmm:alert:2", "Trains delayed because of a sick customer"))
        .await?;
    store
        .upsert_alert(&alert("lmm:alert:3", "NYPD and police are responding at 14 St"))
        .await?;
    store
        .upsert_alert(&alert("lmm:alert:4", "Already labeled"))
        .await?;
    store.update_cause("lmm:alert:4", "Track").await?;

    let report = ClassifyUseCase::new(predictor, store.clone()).run().await?;

    assert_eq!(report.candidates, 3);
    assert_eq!(report.labeled, 3);
    assert!(report.failures.is_empty());
    assert_eq!(store.get("lmm:alert:1").unwrap().cause.as_deref(), Some("Signal"));
    assert_eq!(store.get("lmm:alert:2").unwrap().cause.as_deref(), Some("EMS"));
    assert_eq!(store.get("lmm:alert:3").unwrap().cause.as_deref(), Some("NYPD"));
    assert_eq!(store.get("lmm:alert:4").unwrap().cause.as_deref(), Some("Track"));

    // A second run finds nothing left to do
    let again = ClassifyUseCase::new(
        Arc::new(ArtifactLoader::load(&artifacts(&dir))?),
        store.clone(),
    )
    .run()
    .await?;
    assert_eq!(again.candidates, 0);
    Ok(())
}
