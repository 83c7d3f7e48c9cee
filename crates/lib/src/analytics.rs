//! Analytics reporting: flatten player payloads into events and submit them.
//!
//! A payload must carry `event` (string) and `params` (object); every params
//! key is forwarded as an event property, unvalidated. Failures are logged and
//! swallowed; analytics is best-effort and never disturbs the session.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

const DEFAULT_TRACK_BASE_URL: &str = "https://api.segment.io";

/// Flat analytics event: name plus property map.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsEvent {
    pub name: String,
    pub properties: Map<String, Value>,
}

/// Destination for analytics events (HTTP collector, log, test recorder).
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Submit one event. Best-effort: the reporter logs failures and moves on.
    async fn track(&self, event: &AnalyticsEvent) -> Result<(), String>;
}

/// Extract an event from a player analytics payload: `event` is the name and
/// each key of the `params` object becomes a property. `None` when either
/// field is missing or of the wrong type.
pub fn event_from_payload(data: &Value) -> Option<AnalyticsEvent> {
    let name = data.get("event")?.as_str()?;
    let params = data.get("params")?.as_object()?;
    Some(AnalyticsEvent {
        name: name.to_string(),
        properties: params.clone(),
    })
}

/// Validates player payloads and forwards events to the sink.
#[derive(Clone)]
pub struct AnalyticsReporter {
    sink: Arc<dyn AnalyticsSink>,
}

impl AnalyticsReporter {
    pub fn new(sink: Arc<dyn AnalyticsSink>) -> Self {
        Self { sink }
    }

    /// Submit a player analytics payload. A payload missing `event` or
    /// `params` is logged and skipped; sink failures are logged and swallowed.
    /// Callers never see either failure.
    pub async fn report(&self, data: &Value) {
        let Some(event) = event_from_payload(data) else {
            log::error!("analytics payload missing event or params");
            return;
        };
        if let Err(e) = self.sink.track(&event).await {
            log::warn!("analytics track failed for {}: {}", event.name, e);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("track request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("track api error: {0}")]
    Api(String),
}

/// HTTP sink: posts track calls to a Segment-compatible collector.
pub struct HttpSink {
    base_url: String,
    write_key: String,
    /// Install-scoped anonymous identity sent with every track call.
    anonymous_id: String,
    client: reqwest::Client,
}

impl HttpSink {
    pub fn new(write_key: impl Into<String>, base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_TRACK_BASE_URL.to_string());
        Self {
            base_url,
            write_key: write_key.into(),
            anonymous_id: uuid::Uuid::new_v4().to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// POST /v1/track: one event per call; no batching, retry, or dedup.
    async fn track_once(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        let url = format!("{}/v1/track", self.base_url);
        let body = serde_json::json!({
            "event": event.name,
            "properties": event.properties,
            "anonymousId": self.anonymous_id,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        let res = self
            .client
            .post(&url)
            .basic_auth(&self.write_key, None::<&str>)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(AnalyticsError::Api(format!("{} {}", status, body)));
        }
        Ok(())
    }
}

#[async_trait]
impl AnalyticsSink for HttpSink {
    async fn track(&self, event: &AnalyticsEvent) -> Result<(), String> {
        self.track_once(event).await.map_err(|e| e.to_string())
    }
}

/// Log-only sink for installs without a write key (or analytics disabled).
pub struct LogSink;

#[async_trait]
impl AnalyticsSink for LogSink {
    async fn track(&self, event: &AnalyticsEvent) -> Result<(), String> {
        log::info!(
            "analytics (log only): {} {}",
            event.name,
            Value::Object(event.properties.clone())
        );
        Ok(())
    }
}
