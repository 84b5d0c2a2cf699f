//! Replay worker task.
//!
//! # Responsibilities
//! - Own one HttpClient for the worker's lifetime
//! - Pull request payloads off the shared queue, in arrival order
//! - Keep the pool's idle/active counters current around every wait
//! - Retire on prolonged idleness, recycle, or idle excess

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use tokio::time::{timeout, Instant};

use crate::http::client::HttpClient;
use crate::http::proto;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::payload::{decode_meta, payload_body};
use crate::replay::pool::{PoolShared, ReplayResponse};

/// How long a worker waits for work before counting an idle timeout.
pub const WORKER_WAIT: Duration = Duration::from_millis(100);

/// Consecutive idle timeouts (~2 s) before a surplus worker exits.
pub const MAX_IDLE_TIMEOUTS: u32 = 20;

enum Exit {
    /// Shutdown or closed queue; the worker still holds its active slot.
    Stopped,
    /// The active slot was already given back.
    Retired,
}

pub(crate) async fn run(shared: Arc<PoolShared>, seq: u64, mut stop: ShutdownSignal) {
    tracing::trace!(worker = seq, "Worker started");
    let exit = work(&shared, seq, &mut stop).await;

    if let Exit::Stopped = exit {
        shared.counters.retire();
    }
    let snapshot = shared.counters.snapshot();
    metrics::record_pool(snapshot.active, snapshot.idle);
    tracing::trace!(worker = seq, active = snapshot.active, "Worker exited");
}

async fn work(shared: &PoolShared, seq: u64, stop: &mut ShutdownSignal) -> Exit {
    let mut client = HttpClient::new(shared.target.clone(), shared.client_config.clone());
    let recycle = shared.config.recycle;
    let idle_floor = shared.config.idle_workers;
    let dynamic = shared.is_dynamic();

    let mut idle_timeouts = 0u32;
    let mut processed = 0usize;

    loop {
        shared.counters.enter_idle();
        let next = tokio::select! {
            biased;
            _ = stop.recv() => None,
            next = timeout(WORKER_WAIT, next_payload(shared)) => Some(next),
        };
        shared.counters.leave_idle();

        match next {
            None | Some(Ok(None)) => return Exit::Stopped,
            Some(Ok(Some(payload))) => {
                idle_timeouts = 0;
                dispatch(shared, &mut client, &payload, stop).await;
                processed += 1;

                if recycle > 0 && processed >= recycle {
                    if dynamic && shared.counters.try_retire() {
                        tracing::debug!(worker = seq, processed, "Recycling worker");
                        shared.request_workers(0);
                        return Exit::Retired;
                    }
                    // Fixed pools and the last worker rotate their connection in place.
                    client = HttpClient::new(shared.target.clone(), shared.client_config.clone());
                    processed = 0;
                }
            }
            Some(Err(_)) => {
                if dynamic && idle_floor == 0 {
                    idle_timeouts += 1;
                    if idle_timeouts > MAX_IDLE_TIMEOUTS {
                        if shared.counters.try_retire() {
                            tracing::trace!(worker = seq, "Idle worker retiring");
                            return Exit::Retired;
                        }
                        idle_timeouts = 0;
                    }
                }
            }
        }

        if dynamic && idle_floor > 0 && shared.counters.idle() > idle_floor * 2 && shared.counters.try_retire() {
            tracing::debug!(worker = seq, idle_floor, "Too many idle workers, retiring");
            shared.request_workers(0);
            return Exit::Retired;
        }
    }
}

async fn next_payload(shared: &PoolShared) -> Option<Bytes> {
    shared.queue.lock().await.recv().await
}

/// Replay one request payload and hand the response on.
async fn dispatch(shared: &PoolShared, client: &mut HttpClient, payload: &[u8], stop: &mut ShutdownSignal) {
    let Some(meta) = decode_meta(payload) else {
        tracing::trace!("Skipping payload without a valid header");
        return;
    };

    let body = payload_body(payload);
    if !proto::is_http_payload(body) {
        tracing::debug!(correlation_id = %meta.id_str(), "Skipping non-HTTP payload");
        return;
    }

    let started_at = Utc::now();
    let start = Instant::now();
    let response = client.send(body).await;
    let round_trip = start.elapsed();
    let stopped_at = Utc::now();

    metrics::record_replay(proto::status(&response), round_trip);
    tracing::trace!(
        correlation_id = %meta.id_str(),
        status = %String::from_utf8_lossy(proto::status(&response).unwrap_or_default()),
        round_trip_ms = round_trip.as_millis() as u64,
        "Replayed request"
    );

    if let Some(analyzer) = &shared.analyzer {
        analyzer.analyze(body, &response, started_at, stopped_at);
    }

    if shared.config.track_responses {
        let record = ReplayResponse {
            payload: response,
            id: Bytes::copy_from_slice(meta.id),
            round_trip,
        };
        tokio::select! {
            biased;
            _ = stop.recv() => {}
            sent = shared.responses.send(record) => {
                if sent.is_err() {
                    tracing::debug!("Response channel closed, dropping tracked response");
                }
            }
        }
    }
}
