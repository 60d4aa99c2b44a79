//! Ad click and impression records.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use felos_domain::error::Result;
use felos_domain::trace::TraceEvent;

use crate::jsonl::JsonlFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdEventKind {
    Click,
    Impression,
}

impl AdEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Impression => "impression",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdEvent {
    pub id: String,
    pub kind: AdEventKind,
    pub ad_id: String,
    pub campaign_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    pub ip: String,
    pub user_agent: String,
    pub payment_settled: bool,
    pub timestamp: DateTime<Utc>,
}

impl AdEvent {
    /// Build an event, filling the usual defaults for missing identifiers.
    pub fn new(
        kind: AdEventKind,
        ad_id: Option<String>,
        campaign_id: Option<String>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            ad_id: non_empty(ad_id).unwrap_or_else(|| "unknown".into()),
            campaign_id: non_empty(campaign_id).unwrap_or_else(|| "unknown".into()),
            user_id: non_empty(user_id).unwrap_or_else(|| "anonymous".into()),
            placement: None,
            redirect_url: None,
            ip: "unknown".into(),
            user_agent: "unknown".into(),
            payment_settled: true,
            timestamp: Utc::now(),
        }
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

enum Backend {
    Memory(RwLock<Vec<AdEvent>>),
    Jsonl(JsonlFile<AdEvent>),
}

/// Append-only log of ad events.
pub struct AdEventLog {
    backend: Backend,
}

impl AdEventLog {
    pub const FILE_NAME: &'static str = "ad_events.jsonl";

    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(RwLock::new(Vec::new())),
        }
    }

    pub fn open(state_dir: &Path) -> Result<Self> {
        Ok(Self {
            backend: Backend::Jsonl(JsonlFile::open(state_dir.join(Self::FILE_NAME))?),
        })
    }

    /// Persist one event. Unlike ledger writes, failures are returned: the
    /// tracking routes report them to the caller.
    pub async fn record(&self, event: AdEvent) -> Result<()> {
        let trace = TraceEvent::AdEventRecorded {
            kind: event.kind.as_str().into(),
            ad_id: event.ad_id.clone(),
            campaign_id: event.campaign_id.clone(),
        };
        match &self.backend {
            Backend::Memory(events) => events.write().push(event),
            Backend::Jsonl(file) => file.append(event).await?,
        }
        trace.emit();
        Ok(())
    }

    pub fn count(&self, kind: AdEventKind) -> usize {
        let count = |events: &[AdEvent]| events.iter().filter(|e| e.kind == kind).count();
        match &self.backend {
            Backend::Memory(events) => count(&events.read()),
            Backend::Jsonl(file) => file.with_items(count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ids_get_defaults() {
        let ev = AdEvent::new(AdEventKind::Click, None, Some(" ".into()), None);
        assert_eq!(ev.ad_id, "unknown");
        assert_eq!(ev.campaign_id, "unknown");
        assert_eq!(ev.user_id, "anonymous");
        assert!(ev.payment_settled);
    }

    #[tokio::test]
    async fn counts_by_kind() {
        let log = AdEventLog::in_memory();
        log.record(AdEvent::new(AdEventKind::Click, Some("ad-1".into()), None, None))
            .await
            .unwrap();
        log.record(AdEvent::new(AdEventKind::Impression, Some("ad-1".into()), None, None))
            .await
            .unwrap();
        log.record(AdEvent::new(AdEventKind::Impression, Some("ad-2".into()), None, None))
            .await
            .unwrap();
        assert_eq!(log.count(AdEventKind::Click), 1);
        assert_eq!(log.count(AdEventKind::Impression), 2);
    }

    #[tokio::test]
    async fn jsonl_log_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let log = AdEventLog::open(dir.path()).unwrap();
            let mut ev = AdEvent::new(AdEventKind::Click, Some("ad-9".into()), Some("c".into()), None);
            ev.redirect_url = Some("https://shop.test".into());
            log.record(ev).await.unwrap();
        }
        let log = AdEventLog::open(dir.path()).unwrap();
        assert_eq!(log.count(AdEventKind::Click), 1);
    }
}
