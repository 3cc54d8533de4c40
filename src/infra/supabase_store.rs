use crate::app::ports::AlertStore;
use crate::config::SupabaseConfig;
use crate::constants::{TIMESTAMP_FORMAT, UPSERT_COLUMNS};
use crate::error::{AlertError, Result};
use crate::types::{Alert, CauseUpdate, StoredAlert, UnlabeledAlert};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response};
use tracing::{debug, instrument};

/// Alerts table behind Supabase's PostgREST API.
pub struct SupabaseAlertStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl SupabaseAlertStore {
    pub fn new(config: &SupabaseConfig, table: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            table: table.into(),
        }
    }

    pub fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    /// Query string for the upsert. Naming the columns keeps PostgREST's
    /// `ON CONFLICT DO UPDATE` away from `cause`.
    pub fn upsert_query() -> [(&'static str, String); 2] {
        [
            ("on_conflict", "alert_id".to_string()),
            ("columns", UPSERT_COLUMNS.join(",")),
        ]
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn check(resp: Response, action: &str) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(AlertError::store(format!("{action} failed: {status} - {body}")))
    }
}

#[async_trait]
impl AlertStore for SupabaseAlertStore {
    #[instrument(skip(self, alert), fields(alert_id = %alert.alert_id))]
    async fn upsert_alert(&self, alert: &Alert) -> Result<()> {
        let resp = self
            .authorized(self.client.post(self.table_url()))
            .query(&Self::upsert_query())
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(alert)
            .send()
            .await?;
        Self::check(resp, "upsert").await?;
        debug!("Upserted alert {}", alert.alert_id);
        Ok(())
    }

    async fn fetch_unlabeled(&self) -> Result<Vec<UnlabeledAlert>> {
        let resp = self
            .authorized(self.client.get(self.table_url()))
            .query(&[("select", "alert_id,description"), ("cause", "is.null")])
            .send()
            .await?;
        let rows = Self::check(resp, "select unlabeled").await?.json().await?;
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn update_cause(&self, alert_id: &str, cause: &str) -> Result<()> {
        let resp = self
            .authorized(self.client.patch(self.table_url()))
            .query(&[("alert_id", format!("eq.{alert_id}"))])
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "return=minimal")
            .json(&CauseUpdate { cause })
            .send()
            .await?;
        Self::check(resp, "update cause").await?;
        Ok(())
    }

    async fn fetch_seen_since(&self, since: NaiveDateTime) -> Result<Vec<StoredAlert>> {
        let resp = self
            .authorized(self.client.get(self.table_url()))
            .query(&[
                ("select", "*".to_string()),
                ("last_seen_time", format!("gte.{}", since.format(TIMESTAMP_FORMAT))),
                ("order", "last_seen_time.asc".to_string()),
            ])
            .send()
            .await?;
        let rows = Self::check(resp, "select recent").await?.json().await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_url_trims_trailing_slash() {
        let store = SupabaseAlertStore::new(
            &SupabaseConfig {
                url: "https://demo.supabase.co/".to_string(),
                api_key: "k".to_string(),
            },
            "alerts",
        );
        assert_eq!(store.table_url(), "https://demo.supabase.co/rest/v1/alerts");
    }

    #[test]
    fn upsert_columns_exclude_cause() {
        let query = SupabaseAlertStore::upsert_query();
        assert_eq!(query[0], ("on_conflict", "alert_id".to_string()));
        assert_eq!(
            query[1].1,
            "alert_id,routes,start_time,last_seen_time,description"
        );
        assert!(!query[1].1.contains("cause"));
    }
}
