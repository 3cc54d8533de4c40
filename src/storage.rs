use crate::app::ports::AlertStore;
use crate::error::{AlertError, Result};
use crate::types::{Alert, StoredAlert, UnlabeledAlert};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// In-memory alerts table for development and tests
#[derive(Clone, Default)]
pub struct InMemoryAlertStore {
    rows: Arc<Mutex<BTreeMap<String, StoredAlert>>>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> Result<MutexGuard<'_, BTreeMap<String, StoredAlert>>> {
        self.rows
            .lock()
            .map_err(|_| AlertError::store("in-memory alerts table poisoned"))
    }

    pub fn get(&self, alert_id: &str) -> Option<StoredAlert> {
        self.rows().ok()?.get(alert_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn upsert_alert(&self, alert: &Alert) -> Result<()> {
        let mut rows = self.rows()?;
        match rows.get_mut(&alert.alert_id) {
            Some(existing) => existing.alert = alert.clone(),
            None => {
                rows.insert(
                    alert.alert_id.clone(),
                    StoredAlert {
                        alert: alert.clone(),
                        cause: None,
                    },
                );
            }
        }
        debug!("Upserted alert {}", alert.alert_id);
        Ok(())
    }

    async fn fetch_unlabeled(&self) -> Result<Vec<UnlabeledAlert>> {
        Ok(self
            .rows()?
            .values()
            .filter(|row| row.cause.is_none())
            .map(|row| UnlabeledAlert {
                alert_id: row.alert.alert_id.clone(),
                description: row.alert.description.clone(),
            })
            .collect())
    }

    async fn update_cause(&self, alert_id: &str, cause: &str) -> Result<()> {
        let mut rows = self.rows()?;
        // PostgREST PATCH on a missing key is a no-op, mirror that here
        if let Some(row) = rows.get_mut(alert_id) {
            row.cause = Some(cause.to_string());
            debug!("Updated cause for alert {} to {}", alert_id, cause);
        }
        Ok(())
    }

    async fn fetch_seen_since(&self, since: NaiveDateTime) -> Result<Vec<StoredAlert>> {
        Ok(self
            .rows()?
            .values()
            .filter(|row| row.alert.last_seen_time >= since)
            .cloned()
            .collect())
    }
}
