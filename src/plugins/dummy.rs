//! Input that generates a GET request on a fixed interval.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::payload::{encode_payload, new_request_id, now_nanos, PayloadKind};
use crate::plugins::Input;

const DUMMY_REQUEST: &[u8] = b"GET / HTTP/1.1\r\nHost: localhost\r\nUser-Agent: traffic-replay\r\n\r\n";

pub struct DummyInput {
    interval: Duration,
    state: Mutex<DummyState>,
}

struct DummyState {
    next: Instant,
    stop: ShutdownSignal,
}

impl DummyInput {
    /// The first request is produced one `interval` after construction.
    pub fn new(interval: Duration, shutdown: &Shutdown) -> Self {
        Self {
            interval,
            state: Mutex::new(DummyState {
                next: Instant::now() + interval,
                stop: shutdown.subscribe(),
            }),
        }
    }
}

impl fmt::Display for DummyInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dummy input: every {:?}", self.interval)
    }
}

#[async_trait]
impl Input for DummyInput {
    async fn read(&self) -> Option<Bytes> {
        let mut state = self.state.lock().await;
        let deadline = state.next;

        tokio::select! {
            biased;
            _ = state.stop.recv() => return None,
            _ = sleep_until(deadline) => {}
        }
        state.next = Instant::now() + self.interval;

        Some(encode_payload(
            PayloadKind::Request,
            new_request_id().as_bytes(),
            now_nanos(),
            None,
            DUMMY_REQUEST,
        ))
    }
}
