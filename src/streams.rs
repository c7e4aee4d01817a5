//! Wires configured telemetry streams to the polling core.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::config::{MonitorConfig, StreamConfig};
use common::{Error, TimeSeriesPoint};
use flux_client::{flat_points, pivot, FluxClient, FluxQuery};
use poller::{PollingOrchestrator, StreamPoller, StreamSource};

/// Build the query text for one stream.
pub fn build_query(bucket: &str, stream: &StreamConfig) -> String {
    let mut query = FluxQuery::new(bucket)
        .range(&stream.range_start)
        .measurement(&stream.measurement)
        .fields(&stream.fields);

    if let Some(agg) = &stream.aggregate {
        query = query.aggregate_window(&agg.every, &agg.func);
    }
    if stream.server_pivot {
        query = query.pivot();
    }

    query.build()
}

/// A telemetry stream source: one query against the shared client.
pub struct FluxStreamSource {
    client: Arc<FluxClient>,
    query: String,
    server_pivot: bool,
}

impl FluxStreamSource {
    pub fn new(client: Arc<FluxClient>, bucket: &str, stream: &StreamConfig) -> Self {
        Self {
            client,
            query: build_query(bucket, stream),
            server_pivot: stream.server_pivot,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

#[async_trait]
impl StreamSource for FluxStreamSource {
    async fn fetch(&self) -> Result<Vec<TimeSeriesPoint>, Error> {
        let rows = self.client.query(&self.query).await?;
        let points = if self.server_pivot {
            flat_points(&rows, "_time")
        } else {
            pivot(&rows, "_time", "_field", "_value")
        };
        Ok(points)
    }
}

/// Build one poller per configured stream, composed into an orchestrator.
pub fn build_orchestrator(config: &MonitorConfig, client: Arc<FluxClient>) -> PollingOrchestrator {
    let pollers = config
        .streams
        .iter()
        .map(|stream| {
            let source = Arc::new(FluxStreamSource::new(
                client.clone(),
                &config.influx.bucket,
                stream,
            ));
            StreamPoller::new(
                &stream.name,
                Duration::from_millis(stream.interval_ms),
                config.buffer_capacity,
                source,
            )
        })
        .collect();

    PollingOrchestrator::new(pollers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::AggregateConfig;

    fn stream() -> StreamConfig {
        StreamConfig {
            name: "realtime".into(),
            measurement: "electrical".into(),
            fields: vec!["v_rms".into(), "p_active".into()],
            range_start: "-30s".into(),
            aggregate: None,
            server_pivot: true,
            interval_ms: 1000,
        }
    }

    #[test]
    fn test_build_query_plain() {
        let q = build_query("energy", &stream());
        assert!(q.starts_with("from(bucket: \"energy\")"));
        assert!(q.contains("range(start: -30s)"));
        assert!(q.contains(r#"r._measurement == "electrical""#));
        assert!(q.contains("pivot("));
        assert!(!q.contains("aggregateWindow"));
    }

    #[test]
    fn test_build_query_with_aggregation() {
        let mut s = stream();
        s.aggregate = Some(AggregateConfig {
            every: "1m".into(),
            func: "max".into(),
        });
        let q = build_query("energy", &s);
        assert!(q.contains("aggregateWindow(every: 1m, fn: max, createEmpty: false)"));
    }

    #[test]
    fn test_build_query_without_server_pivot() {
        let mut s = stream();
        s.server_pivot = false;
        let q = build_query("energy", &s);
        assert!(!q.contains("pivot("));
    }

    #[test]
    fn test_orchestrator_has_one_poller_per_stream() {
        let config = MonitorConfig::default();
        let client = Arc::new(FluxClient::new(&config.influx));
        let orch = build_orchestrator(&config, client);
        assert_eq!(orch.pollers().len(), config.streams.len());
        assert_eq!(
            orch.poller("realtime").map(|p| p.interval()),
            Some(Duration::from_millis(1000))
        );
    }
}
