//! Typed view of the subway alerts feed and the fetcher that downloads it.

use crate::app::ports::{FeedSource, HttpClientPort};
use crate::error::{AlertError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Top-level feed document.
///
/// Entities stay as raw JSON here so that one malformed entity fails on its own
/// when the parser deserializes it, instead of failing the whole document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedMessage {
    #[serde(default)]
    pub entity: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedEntity {
    pub id: String,
    pub alert: Option<FeedAlert>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedAlert {
    pub informed_entity: Option<Vec<InformedEntity>>,
    pub active_period: Option<Vec<ActivePeriod>>,
    pub header_text: Option<TranslatedString>,
    #[serde(rename = "transit_realtime.mercury_alert")]
    pub mercury_alert: Option<MercuryAlert>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InformedEntity {
    pub route_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivePeriod {
    pub start: Option<EpochSeconds>,
}

/// GTFS-realtime JSON renders uint64 either as a number or as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EpochSeconds {
    Number(i64),
    Text(String),
}

impl EpochSeconds {
    pub fn seconds(&self) -> Result<i64> {
        match self {
            EpochSeconds::Number(n) => Ok(*n),
            EpochSeconds::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| AlertError::MissingField(format!("active_period start '{s}' is not an epoch"))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslatedString {
    pub translation: Option<Vec<Translation>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Translation {
    pub language: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MercuryAlert {
    pub alert_type: Option<String>,
}

/// Downloads the feed with a single GET. Any status other than 200 is fatal.
pub struct FeedFetcher {
    http: Arc<dyn HttpClientPort>,
    url: String,
}

impl FeedFetcher {
    pub fn new(http: Arc<dyn HttpClientPort>, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl FeedSource for FeedFetcher {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<FeedMessage> {
        let resp = self.http.get(&self.url).await?;
        if resp.status != 200 {
            return Err(AlertError::FeedStatus {
                status: resp.status,
                body: String::from_utf8_lossy(&resp.bytes).into_owned(),
            });
        }
        let message: FeedMessage = serde_json::from_slice(&resp.bytes)?;
        info!(
            entities = message.entity.len(),
            bytes = resp.bytes.len(),
            content_type = %resp.content_type,
            "Fetched alert feed"
        );
        Ok(message)
    }
}
