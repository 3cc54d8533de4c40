use crate::error::Result;
use crate::feed::FeedMessage;
use crate::types::{Alert, StoredAlert, UnlabeledAlert};
use async_trait::async_trait;
use chrono::NaiveDateTime;

// Ingest-side ports
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpGetResult>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<FeedMessage>;
}

/// Persistence for the alerts table
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Insert or refresh an alert keyed by `alert_id`. Never writes `cause`.
    async fn upsert_alert(&self, alert: &Alert) -> Result<()>;

    /// Rows whose `cause` is null.
    async fn fetch_unlabeled(&self) -> Result<Vec<UnlabeledAlert>>;

    async fn update_cause(&self, alert_id: &str, cause: &str) -> Result<()>;

    /// Rows with `last_seen_time >= since`, used by the report.
    async fn fetch_seen_since(&self, since: NaiveDateTime) -> Result<Vec<StoredAlert>>;
}

// Classify-side port
pub trait Predictor: Send + Sync {
    fn predict(&self, description: &str) -> Result<String>;
}
