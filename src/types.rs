use crate::constants::TIMESTAMP_FORMAT;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A normalized delay alert as written by the ingest job.
///
/// There is no `cause` field: the ingest upsert payload is built from this type,
/// so a re-ingest can never overwrite a label set by the classify job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub routes: Vec<String>,
    #[serde(with = "iso_seconds")]
    pub start_time: NaiveDateTime,
    #[serde(with = "iso_seconds")]
    pub last_seen_time: NaiveDateTime,
    pub description: String,
}

/// A full row of the alerts table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAlert {
    #[serde(flatten)]
    pub alert: Alert,
    #[serde(default)]
    pub cause: Option<String>,
}

/// The projection the classify job reads: rows whose cause is still unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlabeledAlert {
    pub alert_id: String,
    #[serde(default)]
    pub description: String,
}

/// Body of the cause update.
#[derive(Debug, Serialize)]
pub struct CauseUpdate<'a> {
    pub cause: &'a str,
}

/// Second-precision timestamps without a timezone suffix.
///
/// Reading also accepts RFC 3339 values (a `timestamptz` column comes back with an
/// offset), normalized to UTC.
pub mod iso_seconds {
    use super::TIMESTAMP_FORMAT;
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveDateTime, String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.naive_utc());
        }
        NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .map_err(|e| format!("invalid timestamp '{raw}': {e}"))
    }
}
