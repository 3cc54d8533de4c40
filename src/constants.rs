//! Constants shared by the ingest, classify and report jobs

// Upstream feed
pub const DEFAULT_FEED_URL: &str =
    "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/camsys%2Fsubway-alerts.json";

/// Substring that marks an entity id as a mercury alert
pub const MERCURY_ALERT_MARKER: &str = "lmm:alert";

/// The only mercury alert type this pipeline tracks
pub const DELAY_ALERT_TYPE: &str = "Delays";

/// Language tag of the header translation used as the description
pub const DESCRIPTION_LANGUAGE: &str = "en";

/// Wire format for `start_time` and `last_seen_time`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// Database
pub const DEFAULT_ALERTS_TABLE: &str = "alerts";

/// Columns written by the ingest upsert. `cause` is deliberately absent.
pub const UPSERT_COLUMNS: [&str; 5] = [
    "alert_id",
    "routes",
    "start_time",
    "last_seen_time",
    "description",
];

// Classifier artifacts
pub const DEFAULT_MODEL_PATH: &str = "artifacts/cause_model.json";
pub const DEFAULT_VECTORIZER_PATH: &str = "artifacts/tfidf_vectorizer.json";
pub const DEFAULT_LABEL_ENCODER_PATH: &str = "artifacts/label_encoder.json";

// Logging
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_CONFIG_FILE: &str = "transit_alerts.toml";

// Report
pub const DEFAULT_REPORT_DAYS: i64 = 7;
pub const MAX_REPORT_DAYS: i64 = 3650;
pub const FALLBACK_CAUSE: &str = "Other";

/// Keyword fallback for alerts without a stored cause, checked in order.
pub const CAUSE_KEYWORDS: [(&str, &str); 11] = [
    ("nypd", "NYPD"),
    ("ems", "EMS"),
    ("fdny", "FDNY"),
    ("brake", "Brakes"),
    ("door", "Door"),
    ("signal", "Signal"),
    ("track", "Track"),
    ("clean", "Cleaning"),
    ("switch", "Switch"),
    ("disruptive", "Disruptive"),
    ("mechanical", "Mechanical"),
];
