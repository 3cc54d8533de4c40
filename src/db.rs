use crate::app::ports::AlertStore;
use crate::config::LibsqlConfig;
use crate::constants::TIMESTAMP_FORMAT;
use crate::error::{AlertError, Result};
use crate::types::{iso_seconds, Alert, StoredAlert, UnlabeledAlert};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use libsql::{Builder, Connection, Database, Row, Value};
use tracing::{debug, info};

const CREATE_ALERTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS {table} (
    alert_id       TEXT PRIMARY KEY,
    routes         TEXT NOT NULL,
    start_time     TEXT NOT NULL,
    last_seen_time TEXT NOT NULL,
    description    TEXT NOT NULL,
    cause          TEXT
)";

/// Alerts table on Turso/libSQL. Routes are stored as a JSON array.
pub struct LibsqlAlertStore {
    db: Database,
    table: String,
}

impl LibsqlAlertStore {
    /// Connect to Turso and make sure the alerts table exists
    pub async fn connect(config: &LibsqlConfig, table: impl Into<String>) -> Result<Self> {
        info!("Connecting to Turso database at {}", config.url);

        let db = Builder::new_remote(config.url.clone(), config.auth_token.clone())
            .build()
            .await
            .map_err(|e| AlertError::store(format!("Failed to connect to database: {e}")))?;

        Self::from_database(db, table).await
    }

    /// Wrap an already built database, local or remote, and make sure the table exists
    pub async fn from_database(db: Database, table: impl Into<String>) -> Result<Self> {
        let store = Self {
            db,
            table: table.into(),
        };
        store.ensure_table().await?;
        Ok(store)
    }

    fn get_connection(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|e| AlertError::store(format!("Failed to get database connection: {e}")))
    }

    async fn ensure_table(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute(&CREATE_ALERTS_TABLE.replace("{table}", &self.table), ())
            .await
            .map_err(|e| AlertError::store(format!("Failed to create alerts table: {e}")))?;
        Ok(())
    }
}

fn text(row: &Row, idx: i32, name: &str) -> Result<String> {
    row.get::<String>(idx)
        .map_err(|e| AlertError::store(format!("Failed to get {name}: {e}")))
}

fn stored_alert(row: &Row) -> Result<StoredAlert> {
    let routes = text(row, 1, "routes")?;
    let start_time = text(row, 2, "start_time")?;
    let last_seen_time = text(row, 3, "last_seen_time")?;
    Ok(StoredAlert {
        alert: Alert {
            alert_id: text(row, 0, "alert_id")?,
            routes: serde_json::from_str(&routes)?,
            start_time: iso_seconds::parse(&start_time).map_err(AlertError::store)?,
            last_seen_time: iso_seconds::parse(&last_seen_time).map_err(AlertError::store)?,
            description: text(row, 4, "description")?,
        },
        cause: match row.get_value(5) {
            Ok(Value::Text(cause)) => Some(cause),
            _ => None,
        },
    })
}

#[async_trait]
impl AlertStore for LibsqlAlertStore {
    async fn upsert_alert(&self, alert: &Alert) -> Result<()> {
        let conn = self.get_connection()?;
        let routes = serde_json::to_string(&alert.routes)?;

        // cause is not in the SET list so a re-ingest keeps an existing label
        let sql = format!(
            "INSERT INTO {} (alert_id, routes, start_time, last_seen_time, description) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(alert_id) DO UPDATE SET \
             routes = excluded.routes, start_time = excluded.start_time, \
             last_seen_time = excluded.last_seen_time, description = excluded.description",
            self.table
        );
        conn.execute(
            &sql,
            libsql::params![
                alert.alert_id.as_str(),
                routes,
                alert.start_time.format(TIMESTAMP_FORMAT).to_string(),
                alert.last_seen_time.format(TIMESTAMP_FORMAT).to_string(),
                alert.description.as_str()
            ],
        )
        .await
        .map_err(|e| AlertError::store(format!("Failed to upsert alert: {e}")))?;

        debug!("Upserted alert {}", alert.alert_id);
        Ok(())
    }

    async fn fetch_unlabeled(&self) -> Result<Vec<UnlabeledAlert>> {
        let conn = self.get_connection()?;
        let mut rows = conn
            .query(
                &format!("SELECT alert_id, description FROM {} WHERE cause IS NULL", self.table),
                (),
            )
            .await
            .map_err(|e| AlertError::store(format!("Failed to query unlabeled alerts: {e}")))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AlertError::store(format!("Failed to read row: {e}")))?
        {
            results.push(UnlabeledAlert {
                alert_id: text(&row, 0, "alert_id")?,
                description: text(&row, 1, "description")?,
            });
        }
        Ok(results)
    }

    async fn update_cause(&self, alert_id: &str, cause: &str) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute(
            &format!("UPDATE {} SET cause = ?1 WHERE alert_id = ?2", self.table),
            libsql::params![cause, alert_id],
        )
        .await
        .map_err(|e| AlertError::store(format!("Failed to update cause: {e}")))?;
        Ok(())
    }

    async fn fetch_seen_since(&self, since: NaiveDateTime) -> Result<Vec<StoredAlert>> {
        let conn = self.get_connection()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT alert_id, routes, start_time, last_seen_time, description, cause \
                     FROM {} WHERE last_seen_time >= ?1 ORDER BY last_seen_time",
                    self.table
                ),
                libsql::params![since.format(TIMESTAMP_FORMAT).to_string()],
            )
            .await
            .map_err(|e| AlertError::store(format!("Failed to query recent alerts: {e}")))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AlertError::store(format!("Failed to read row: {e}")))?
        {
            results.push(stored_alert(&row)?);
        }
        Ok(results)
    }
}
