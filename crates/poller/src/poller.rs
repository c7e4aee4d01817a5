//! A single independently-scheduled polling unit.
//!
//! Each poller runs one cadence against one source. Failures are
//! contained here: they become the `error` field of the state, never a
//! panic and never an error crossing into the orchestrator. A run
//! generation counter implements the stale-result guard — a fetch
//! started under generation G commits nothing once `stop()` or
//! `reset()` has moved the poller past G.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::TimeSeriesPoint;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::buffer::RollingBuffer;
use crate::source::StreamSource;

/// Read-only copy of a poller's state.
#[derive(Debug, Clone, Serialize)]
pub struct PollerSnapshot {
    pub name: String,
    pub data: Vec<TimeSeriesPoint>,
    pub latest: Option<TimeSeriesPoint>,
    pub error: Option<String>,
    pub is_loading: bool,
    pub is_running: bool,
    pub update_count: u64,
    pub last_update: Option<DateTime<Utc>>,
}

struct PollerState {
    data: RollingBuffer<TimeSeriesPoint>,
    latest: Option<TimeSeriesPoint>,
    error: Option<String>,
    is_loading: bool,
    is_running: bool,
    update_count: u64,
    last_update: Option<DateTime<Utc>>,
}

impl PollerState {
    fn new(capacity: usize) -> Self {
        Self {
            data: RollingBuffer::new(capacity),
            latest: None,
            error: None,
            is_loading: false,
            is_running: false,
            update_count: 0,
            last_update: None,
        }
    }
}

struct Inner {
    name: String,
    interval: Duration,
    source: Arc<dyn StreamSource>,
    state: RwLock<PollerState>,
    /// Bumped by stop()/reset(); fetches committed only under the
    /// generation they started with.
    generation: AtomicU64,
    /// At-most-one-in-flight guard; an overlapping tick is skipped.
    in_flight: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    /// One fetch cycle under run generation `generation`.
    async fn fetch_cycle(&self, generation: u64) {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("{}: fetch still in flight, skipping tick", self.name);
            return;
        }

        {
            let mut state = self.state.write().await;
            state.is_loading = true;
        }

        let result = self.source.fetch().await;
        // Release the guard only while this cycle's generation is
        // still current. stop() resets the guard for the next run; an
        // orphaned fetch finishing later must not release the guard
        // out from under that run's in-flight cycle.
        if self.generation.load(Ordering::SeqCst) == generation {
            self.in_flight.store(false, Ordering::SeqCst);
        }

        let mut state = self.state.write().await;
        // Checked under the lock so a concurrent stop()/reset() cannot
        // slip between the check and the commit.
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("{}: discarding result from stale run generation", self.name);
            return;
        }
        state.is_loading = false;
        match result {
            Ok(points) => {
                state.error = None;
                for point in points {
                    state.latest = Some(point.clone());
                    state.data.push(point);
                }
                state.update_count += 1;
                state.last_update = Some(Utc::now());
            }
            Err(e) => {
                // Previously fetched data stays untouched.
                warn!("{}: fetch failed: {}", self.name, e);
                state.error = Some(e.to_string());
            }
        }
    }
}

/// One polling cadence against one data source.
#[derive(Clone)]
pub struct StreamPoller {
    inner: Arc<Inner>,
}

impl StreamPoller {
    pub fn new(
        name: &str,
        interval: Duration,
        capacity: usize,
        source: Arc<dyn StreamSource>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.to_string(),
                interval,
                source,
                state: RwLock::new(PollerState::new(capacity)),
                generation: AtomicU64::new(0),
                in_flight: AtomicBool::new(false),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Start polling: an immediate fetch cycle, then recurring ticks.
    /// Calling start on a running poller is a no-op.
    pub async fn start(&self) {
        let mut task = self.inner.task.lock().await;

        {
            let mut state = self.inner.state.write().await;
            if state.is_running {
                return;
            }
            state.is_running = true;
        }

        let generation = self.inner.generation.load(Ordering::SeqCst);
        let inner = self.inner.clone();
        debug!("{}: starting at {:?} cadence", inner.name, inner.interval);

        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                inner.fetch_cycle(generation).await;
            }
        }));
    }

    /// Stop polling. Any in-flight fetch is discarded via the
    /// generation bump even if it completes later.
    pub async fn stop(&self) {
        let mut task = self.inner.task.lock().await;
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = task.take() {
            handle.abort();
        }
        // An aborted task can die between setting and clearing the
        // in-flight flag; a restart must not inherit a stuck guard.
        self.inner.in_flight.store(false, Ordering::SeqCst);

        let mut state = self.inner.state.write().await;
        state.is_running = false;
        state.is_loading = false;
        debug!("{}: stopped", self.inner.name);
    }

    /// Stop and clear all accumulated state. Does not restart.
    pub async fn reset(&self) {
        self.stop().await;
        let mut state = self.inner.state.write().await;
        state.data.clear();
        state.latest = None;
        state.error = None;
        state.update_count = 0;
        state.last_update = None;
    }

    /// Run a single fetch cycle under the current generation. Used by
    /// dry-run mode and tests; subject to the same in-flight and
    /// stale-result guards as scheduled ticks.
    pub async fn poll_once(&self) {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        self.inner.fetch_cycle(generation).await;
    }

    /// Read-only copy of the current state.
    pub async fn snapshot(&self) -> PollerSnapshot {
        let state = self.inner.state.read().await;
        PollerSnapshot {
            name: self.inner.name.clone(),
            data: state.data.to_vec(),
            latest: state.latest.clone(),
            error: state.error.clone(),
            is_loading: state.is_loading,
            is_running: state.is_running,
            update_count: state.update_count,
            last_update: state.last_update,
        }
    }
}
