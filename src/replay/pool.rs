//! Replay output: a self-scaling pool of HTTP workers.
//!
//! # Data Flow
//! ```text
//! Emitter → HttpOutput::write (request payloads only)
//!     → queue (bounded, blocks when full)
//!     → worker (one HttpClient each) → replay target
//!     → responses (bounded, only with tracking on)
//!     → HttpOutput::read → Emitter → other outputs
//! ```
//!
//! # Scaling
//! A single coordinator task owns the resize channel. Writers ask for more
//! workers when the queue outgrows the active pool; retiring workers send a
//! zero request so the coordinator recomputes the idle floor. The resize
//! channel holds one pending request, so bursts coalesce into one wakeup.
//!
//! The initial workers are started with the pool. A fixed-size pool never
//! runs a coordinator, so exactly `workers` workers ever exist.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};

use crate::config::HttpOutputConfig;
use crate::http::client::{HttpClientConfig, Target, TargetError};
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::observability::metrics;
use crate::payload::{encode_payload, is_request_payload, now_nanos, PayloadKind};
use crate::plugins::{Input, Output, PluginError};
use crate::replay::analytics::{LogAnalyzer, ResponseAnalyzer};
use crate::replay::counters::WorkerCounters;
use crate::replay::worker;

/// Workers started by a dynamic pool without an idle floor.
pub const INITIAL_DYNAMIC_WORKERS: usize = 10;

/// A replayed response waiting to be read back out of the pool.
#[derive(Debug, Clone)]
pub struct ReplayResponse {
    pub payload: Bytes,
    pub id: Bytes,
    pub round_trip: Duration,
}

/// Snapshot of pool state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub active: usize,
    pub idle: usize,
    /// Workers started over the pool's lifetime.
    pub spawned: usize,
    /// Requests waiting in the queue.
    pub queued: usize,
}

/// State shared by the pool handle, its coordinator and every worker.
pub(crate) struct PoolShared {
    pub(crate) target: Target,
    pub(crate) config: HttpOutputConfig,
    pub(crate) client_config: HttpClientConfig,
    pub(crate) queue: Mutex<mpsc::Receiver<Bytes>>,
    pub(crate) responses: mpsc::Sender<ReplayResponse>,
    pub(crate) resize: mpsc::Sender<usize>,
    pub(crate) counters: WorkerCounters,
    pub(crate) analyzer: Option<Arc<dyn ResponseAnalyzer>>,
    pub(crate) shutdown: Shutdown,
}

impl PoolShared {
    pub(crate) fn is_dynamic(&self) -> bool {
        self.config.is_dynamic()
    }

    /// Wake the coordinator. A request already pending absorbs this one.
    pub(crate) fn request_workers(&self, count: usize) {
        let _ = self.resize.try_send(count);
    }
}

/// Sink for captured requests and, with tracking on, source of replayed responses.
pub struct HttpOutput {
    shared: Arc<PoolShared>,
    queue: mpsc::Sender<Bytes>,
    responses: Mutex<mpsc::Receiver<ReplayResponse>>,
}

impl HttpOutput {
    /// Start a pool replaying to `address`. Must be called inside a tokio runtime.
    pub fn new(address: &str, config: HttpOutputConfig, shutdown: &Shutdown) -> Result<Self, TargetError> {
        let analyzer = if config.analytics {
            Some(Arc::new(LogAnalyzer) as Arc<dyn ResponseAnalyzer>)
        } else {
            None
        };
        Self::with_analyzer(address, config, analyzer, shutdown)
    }

    /// Start a pool with a custom analytics consumer.
    pub fn with_analyzer(
        address: &str,
        config: HttpOutputConfig,
        analyzer: Option<Arc<dyn ResponseAnalyzer>>,
        shutdown: &Shutdown,
    ) -> Result<Self, TargetError> {
        let target = Target::parse(address)?;

        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (responses_tx, responses_rx) = mpsc::channel(config.response_capacity.max(1));
        let (resize_tx, resize_rx) = mpsc::channel(1);

        let shared = Arc::new(PoolShared {
            client_config: config.client_config(),
            target,
            config,
            queue: Mutex::new(queue_rx),
            responses: responses_tx,
            resize: resize_tx,
            counters: WorkerCounters::new(),
            analyzer,
            shutdown: shutdown.clone(),
        });

        tracing::info!(
            replay_target = %shared.target,
            workers = shared.config.workers,
            idle_workers = shared.config.idle_workers,
            track_responses = shared.config.track_responses,
            "Starting replay output"
        );

        let initial = initial_workers(&shared.config);
        for _ in 0..initial {
            spawn_worker(&shared);
        }

        if shared.is_dynamic() {
            tracing::debug!(workers = initial, idle_floor = shared.config.idle_workers, "Dynamic replay pool started");
            tokio::spawn(coordinate(shared.clone(), resize_rx, shutdown.subscribe()));
        } else {
            tracing::info!(workers = initial, "Fixed replay pool started");
        }

        Ok(Self {
            shared,
            queue: queue_tx,
            responses: Mutex::new(responses_rx),
        })
    }

    /// Current pool size and backlog.
    pub fn stats(&self) -> PoolStats {
        let snapshot = self.shared.counters.snapshot();
        PoolStats {
            active: snapshot.active,
            idle: snapshot.idle,
            spawned: self.shared.counters.spawned(),
            queued: self.queue_depth(),
        }
    }

    pub fn target(&self) -> &Target {
        &self.shared.target
    }

    fn queue_depth(&self) -> usize {
        self.queue.max_capacity() - self.queue.capacity()
    }
}

impl std::fmt::Display for HttpOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP output: {}", self.shared.target)
    }
}

#[async_trait]
impl Output for HttpOutput {
    async fn write(&self, payload: &[u8]) -> Result<usize, PluginError> {
        if !is_request_payload(payload) {
            return Ok(payload.len());
        }

        self.queue
            .send(Bytes::copy_from_slice(payload))
            .await
            .map_err(|_| PluginError::Closed(self.to_string()))?;

        let depth = self.queue_depth();
        if self.shared.config.stats {
            metrics::record_queue_depth(depth);
        }
        if self.shared.is_dynamic() && depth > self.shared.counters.active() {
            self.shared.request_workers(depth);
        }

        Ok(payload.len())
    }

    fn as_input(self: Arc<Self>) -> Option<Arc<dyn Input>> {
        if self.shared.config.track_responses {
            Some(self as Arc<dyn Input>)
        } else {
            None
        }
    }
}

#[async_trait]
impl Input for HttpOutput {
    async fn read(&self) -> Option<Bytes> {
        let response = self.responses.lock().await.recv().await?;

        if self.shared.config.debug {
            tracing::debug!(
                correlation_id = %String::from_utf8_lossy(&response.id),
                payload = %String::from_utf8_lossy(&response.payload),
                "Received response"
            );
        }

        Some(encode_payload(
            PayloadKind::ReplayedResponse,
            &response.id,
            now_nanos(),
            Some(response.round_trip.as_nanos() as i64),
            &response.payload,
        ))
    }
}

/// Number of workers to start for a resize request in dynamic mode.
fn workers_to_spawn(requested: usize, idle_floor: usize, idle: usize) -> usize {
    if idle_floor == 0 {
        return requested;
    }
    if idle >= idle_floor {
        return 0;
    }
    requested.max((idle_floor * 3 / 2).saturating_sub(idle))
}

fn spawn_worker(shared: &Arc<PoolShared>) {
    let seq = shared.counters.register();
    tokio::spawn(worker::run(shared.clone(), seq, shared.shutdown.subscribe()));
}

/// Workers started with the pool. Fixed pools never start more.
fn initial_workers(config: &HttpOutputConfig) -> usize {
    if !config.is_dynamic() {
        config.workers
    } else if config.idle_workers > 0 {
        workers_to_spawn(config.idle_workers * 3 / 2, config.idle_workers, 0)
    } else {
        INITIAL_DYNAMIC_WORKERS
    }
}

/// Scaling loop for dynamic pools.
async fn coordinate(shared: Arc<PoolShared>, mut resize: mpsc::Receiver<usize>, mut stop: ShutdownSignal) {
    let idle_floor = shared.config.idle_workers;

    loop {
        let requested = tokio::select! {
            biased;
            _ = stop.recv() => break,
            requested = resize.recv() => match requested {
                Some(n) => n,
                None => break,
            },
        };

        let snapshot = shared.counters.snapshot();
        let count = workers_to_spawn(requested, idle_floor, snapshot.idle);
        for _ in 0..count {
            spawn_worker(&shared);
        }

        if count > 0 {
            tracing::debug!(
                requested,
                spawned = count,
                active = snapshot.active + count,
                idle = snapshot.idle,
                "Scaled replay pool"
            );
            metrics::record_pool(snapshot.active + count, snapshot.idle);
        }
    }

    tracing::debug!(replay_target = %shared.target, "Replay pool coordinator stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_count_without_floor_honors_request() {
        assert_eq!(workers_to_spawn(0, 0, 0), 0);
        assert_eq!(workers_to_spawn(37, 0, 5), 37);
    }

    #[test]
    fn spawn_count_with_floor() {
        // idle floor already met
        assert_eq!(workers_to_spawn(50, 4, 4), 0);
        assert_eq!(workers_to_spawn(50, 4, 9), 0);
        // topped up to 1.5x the floor
        assert_eq!(workers_to_spawn(0, 4, 1), 5);
        assert_eq!(workers_to_spawn(2, 10, 0), 15);
        // large backlog wins
        assert_eq!(workers_to_spawn(40, 4, 1), 40);
    }

    #[test]
    fn initial_pool_size() {
        let fixed = HttpOutputConfig {
            workers: 4,
            ..Default::default()
        };
        assert_eq!(initial_workers(&fixed), 4);
        assert_eq!(initial_workers(&HttpOutputConfig::default()), INITIAL_DYNAMIC_WORKERS);

        let floor = HttpOutputConfig {
            idle_workers: 4,
            ..Default::default()
        };
        assert_eq!(initial_workers(&floor), 6);
    }

    #[tokio::test]
    async fn rejects_bad_target() {
        let shutdown = Shutdown::new();
        let result = HttpOutput::new("ftp://nope", HttpOutputConfig::default(), &shutdown);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn passes_through_non_requests() {
        let shutdown = Shutdown::new();
        let config = HttpOutputConfig {
            workers: 1,
            ..Default::default()
        };
        let output = HttpOutput::new("127.0.0.1:9", config, &shutdown).unwrap();

        let response = b"2 abc 1\nHTTP/1.1 200 OK\r\n\r\n";
        assert_eq!(output.write(response).await.unwrap(), response.len());
        assert_eq!(output.stats().queued, 0);
        shutdown.trigger();
    }
}
