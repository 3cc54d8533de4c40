use crate::constants::{DELAY_ALERT_TYPE, DESCRIPTION_LANGUAGE, MERCURY_ALERT_MARKER};
use crate::error::{AlertError, Result};
use crate::feed::{FeedAlert, FeedEntity};
use crate::types::Alert;
use chrono::{DateTime, NaiveDateTime, Timelike};
use serde_json::Value;
use tracing::debug;

/// Maps raw feed entities onto normalized delay alerts.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlertParser;

impl AlertParser {
    pub fn new() -> Self {
        Self
    }

    /// Returns `Ok(None)` for entities that are not mercury delay alerts.
    ///
    /// A matching entity with a missing active period, a malformed informed-entity
    /// list or no header text is an error for that entity alone.
    pub fn parse(&self, raw: &Value, observed_at: NaiveDateTime) -> Result<Option<Alert>> {
        let id = entity_id(raw)?;
        if !is_mercury_delay(id, raw) {
            debug!(alert_id = id, "Skipping entity that is not a mercury delay alert");
            return Ok(None);
        }

        let entity: FeedEntity = serde_json::from_value(raw.clone())?;
        let alert = entity
            .alert
            .ok_or_else(|| AlertError::MissingField(format!("{}: alert", entity.id)))?;

        let routes = routes(&entity.id, &alert)?;
        let start_time = start_time(&entity.id, &alert)?;
        let description = description(&entity.id, &alert)?;

        Ok(Some(Alert {
            alert_id: entity.id,
            routes,
            start_time,
            last_seen_time: observed_at.with_nanosecond(0).unwrap_or(observed_at),
            description,
        }))
    }
}

/// The entity's top-level id, used for filtering and for error reporting.
pub fn entity_id(raw: &Value) -> Result<&str> {
    raw.get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AlertError::MissingField("entity id".to_string()))
}

fn is_mercury_delay(id: &str, raw: &Value) -> bool {
    if !id.contains(MERCURY_ALERT_MARKER) {
        return false;
    }
    raw.get("alert")
        .and_then(|a| a.get("transit_realtime.mercury_alert"))
        .and_then(|m| m.get("alert_type"))
        .and_then(Value::as_str)
        == Some(DELAY_ALERT_TYPE)
}

fn routes(id: &str, alert: &FeedAlert) -> Result<Vec<String>> {
    let informed = alert
        .informed_entity
        .as_ref()
        .ok_or_else(|| AlertError::MissingField(format!("{id}: informed_entity")))?;
    Ok(informed
        .iter()
        .filter_map(|e| e.route_id.clone())
        .collect())
}

fn start_time(id: &str, alert: &FeedAlert) -> Result<NaiveDateTime> {
    let start = alert
        .active_period
        .as_ref()
        .and_then(|periods| periods.first())
        .and_then(|p| p.start.as_ref())
        .ok_or_else(|| AlertError::MissingField(format!("{id}: active_period[0].start")))?;
    let seconds = start.seconds()?;
    DateTime::from_timestamp(seconds, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| AlertError::MissingField(format!("{id}: start {seconds} out of range")))
}

fn description(id: &str, alert: &FeedAlert) -> Result<String> {
    let translations = alert
        .header_text
        .as_ref()
        .and_then(|h| h.translation.as_ref())
        .ok_or_else(|| AlertError::MissingField(format!("{id}: header_text.translation")))?;
    Ok(translations
        .iter()
        .find(|t| t.language.as_deref() == Some(DESCRIPTION_LANGUAGE))
        .and_then(|t| t.text.clone())
        .unwrap_or_default())
}
