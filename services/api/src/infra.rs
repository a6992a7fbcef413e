use chrono::{DateTime, Utc};
use hiring_pipeline::workflows::ats::parse_timestamp;
use hiring_pipeline::workflows::pipeline::{NotificationSink, NotifyError, PipelineNotification};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::de::DeserializeOwned;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Keeps every notification in memory; the demo prints them afterwards.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationSink {
    events: Arc<Mutex<Vec<PipelineNotification>>>,
}

impl NotificationSink for InMemoryNotificationSink {
    fn publish(&self, notification: PipelineNotification) -> Result<(), NotifyError> {
        let mut guard = self.events.lock().expect("notification mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

impl InMemoryNotificationSink {
    pub(crate) fn events(&self) -> Vec<PipelineNotification> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }
}

/// Relays notifications to the log until a messaging backend is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn publish(&self, notification: PipelineNotification) -> Result<(), NotifyError> {
        let candidate = notification
            .candidate_id
            .as_ref()
            .map(|id| id.as_str())
            .unwrap_or("-");
        info!(
            kind = notification.kind.label(),
            candidate,
            details = ?notification.details,
            "pipeline notification"
        );
        Ok(())
    }
}

/// Parse a CLI flag through the same snake_case names the HTTP API accepts.
pub(crate) fn parse_snake_case<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(normalized))
        .map_err(|_| format!("'{raw}' is not a recognised value"))
}

/// Clap adapter over the feed's timestamp rules.
pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(raw).ok_or_else(|| format!("failed to parse '{raw}' as RFC 3339 or YYYY-MM-DD"))
}
