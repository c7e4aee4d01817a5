//! Composes multiple stream pollers behind one control surface.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::poller::StreamPoller;

/// Per-stream status without the full history buffer.
#[derive(Debug, Clone, Serialize)]
pub struct StreamStatus {
    pub name: String,
    pub points: usize,
    pub latest: Option<common::TimeSeriesPoint>,
    pub error: Option<String>,
    pub is_loading: bool,
    pub is_running: bool,
    pub update_count: u64,
    pub last_update: Option<DateTime<Utc>>,
}

/// Aggregate status derived from all constituent pollers.
///
/// Recomputed from the children on every call to `status()`; nothing
/// here is cached, so it cannot drift out of sync.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub is_any_running: bool,
    pub has_any_error: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub total_updates: u64,
    pub streams: Vec<StreamStatus>,
}

/// Unified control over a set of independently-cadenced pollers.
pub struct PollingOrchestrator {
    pollers: Vec<StreamPoller>,
}

impl PollingOrchestrator {
    pub fn new(pollers: Vec<StreamPoller>) -> Self {
        Self { pollers }
    }

    pub fn pollers(&self) -> &[StreamPoller] {
        &self.pollers
    }

    pub fn poller(&self, name: &str) -> Option<&StreamPoller> {
        self.pollers.iter().find(|p| p.name() == name)
    }

    /// Start every poller not already running.
    pub async fn start_all(&self) {
        info!("starting {} pollers", self.pollers.len());
        for poller in &self.pollers {
            poller.start().await;
        }
    }

    /// Stop every poller.
    pub async fn stop_all(&self) {
        info!("stopping {} pollers", self.pollers.len());
        for poller in &self.pollers {
            poller.stop().await;
        }
    }

    /// Reset every poller back to its initial state.
    pub async fn reset_all(&self) {
        for poller in &self.pollers {
            poller.reset().await;
        }
    }

    /// If any poller is running, stop them all; otherwise start them
    /// all. A partially-running set is fully stopped by one toggle.
    pub async fn toggle_all(&self) {
        if self.status().await.is_any_running {
            self.stop_all().await;
        } else {
            self.start_all().await;
        }
    }

    /// Derive the aggregate status from all children.
    pub async fn status(&self) -> OrchestratorStatus {
        let mut streams = Vec::with_capacity(self.pollers.len());
        for poller in &self.pollers {
            let snap = poller.snapshot().await;
            streams.push(StreamStatus {
                name: snap.name,
                points: snap.data.len(),
                latest: snap.latest,
                error: snap.error,
                is_loading: snap.is_loading,
                is_running: snap.is_running,
                update_count: snap.update_count,
                last_update: snap.last_update,
            });
        }

        OrchestratorStatus {
            is_any_running: streams.iter().any(|s| s.is_running),
            has_any_error: streams.iter().any(|s| s.error.is_some()),
            last_update: streams.iter().filter_map(|s| s.last_update).max(),
            total_updates: streams.iter().map(|s| s.update_count).sum(),
            streams,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::{Error, TimeSeriesPoint};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::source::StreamSource;

    struct OkSource;

    #[async_trait]
    impl StreamSource for OkSource {
        async fn fetch(&self) -> Result<Vec<TimeSeriesPoint>, Error> {
            let mut p = TimeSeriesPoint::new(Utc::now());
            p.fields.insert("p_active".into(), 1500.0);
            Ok(vec![p])
        }
    }

    struct FailSource;

    #[async_trait]
    impl StreamSource for FailSource {
        async fn fetch(&self) -> Result<Vec<TimeSeriesPoint>, Error> {
            Err(Error::Http("connection refused".into()))
        }
    }

    fn make_orchestrator() -> PollingOrchestrator {
        let slow = Duration::from_secs(3600);
        PollingOrchestrator::new(vec![
            StreamPoller::new("realtime", slow, 10, Arc::new(OkSource)),
            StreamPoller::new("power", slow, 10, Arc::new(FailSource)),
            StreamPoller::new("extremes", slow, 10, Arc::new(OkSource)),
        ])
    }

    #[tokio::test]
    async fn test_status_on_fresh_orchestrator() {
        let orch = make_orchestrator();
        let status = orch.status().await;
        assert!(!status.is_any_running);
        assert!(!status.has_any_error);
        assert_eq!(status.total_updates, 0);
        assert!(status.last_update.is_none());
        assert_eq!(status.streams.len(), 3);
    }

    #[tokio::test]
    async fn test_one_running_erroring_poller_sets_both_flags() {
        let orch = make_orchestrator();
        orch.poller("power").expect("power poller").start().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let status = orch.status().await;
        assert!(status.is_any_running);
        assert!(status.has_any_error);
        orch.stop_all().await;
    }

    #[tokio::test]
    async fn test_toggle_with_one_running_stops_everything() {
        let orch = make_orchestrator();
        orch.poller("realtime").expect("realtime poller").start().await;

        orch.toggle_all().await;
        let status = orch.status().await;
        assert!(!status.is_any_running);
        assert!(status.streams.iter().all(|s| !s.is_running));
    }

    #[tokio::test]
    async fn test_toggle_from_stopped_starts_everything() {
        let orch = make_orchestrator();
        orch.toggle_all().await;
        let status = orch.status().await;
        assert!(status.streams.iter().all(|s| s.is_running));
        orch.stop_all().await;
    }

    #[tokio::test]
    async fn test_aggregate_counts_and_last_update() {
        let orch = make_orchestrator();
        let realtime = orch.poller("realtime").expect("realtime poller");
        let extremes = orch.poller("extremes").expect("extremes poller");

        realtime.poll_once().await;
        realtime.poll_once().await;
        extremes.poll_once().await;

        let status = orch.status().await;
        assert_eq!(status.total_updates, 3);
        assert!(status.last_update.is_some());
        assert!(!status.has_any_error);
    }

    #[tokio::test]
    async fn test_reset_all_clears_children_and_last_update() {
        let orch = make_orchestrator();
        orch.poller("realtime").expect("realtime poller").poll_once().await;
        assert!(orch.status().await.last_update.is_some());

        orch.reset_all().await;
        let status = orch.status().await;
        assert_eq!(status.total_updates, 0);
        assert!(status.last_update.is_none());
        assert!(status.streams.iter().all(|s| s.latest.is_none()));
    }
}
