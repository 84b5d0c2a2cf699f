//! In-memory input fed through a handle.
//!
//! Used to drive pipelines from code. Dropping every handle closes the input.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};

use crate::payload::{encode_payload, new_request_id, now_nanos, PayloadKind};
use crate::plugins::Input;

/// Buffered payloads before `emit` waits.
pub const CHANNEL_INPUT_CAPACITY: usize = 100;

pub struct ChannelInput {
    rx: Mutex<mpsc::Receiver<Bytes>>,
}

/// Producer side of a [`ChannelInput`].
#[derive(Debug, Clone)]
pub struct ChannelInputHandle {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelInput {
    pub fn new() -> (Self, ChannelInputHandle) {
        let (tx, rx) = mpsc::channel(CHANNEL_INPUT_CAPACITY);
        (Self { rx: Mutex::new(rx) }, ChannelInputHandle { tx })
    }
}

impl fmt::Display for ChannelInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Channel input")
    }
}

#[async_trait]
impl Input for ChannelInput {
    async fn read(&self) -> Option<Bytes> {
        self.rx.lock().await.recv().await
    }
}

impl ChannelInputHandle {
    /// Push an already framed payload. Returns false once the input is gone.
    pub async fn emit(&self, payload: impl Into<Bytes>) -> bool {
        self.tx.send(payload.into()).await.is_ok()
    }

    /// Frame raw request bytes as a Request payload and push it.
    /// Returns the generated correlation id, or None once the input is gone.
    pub async fn emit_request(&self, request: &[u8]) -> Option<String> {
        let id = new_request_id();
        let payload = encode_payload(PayloadKind::Request, id.as_bytes(), now_nanos(), None, request);
        self.emit(payload).await.then_some(id)
    }

    pub async fn emit_get(&self) -> Option<String> {
        self.emit_request(b"GET / HTTP/1.1\r\n\r\n").await
    }

    pub async fn emit_post(&self) -> Option<String> {
        self.emit_request(b"POST /pub/WWW/ HTTP/1.1\r\nHost: www.w3.org\r\nContent-Length: 7\r\n\r\na=1&b=2")
            .await
    }

    pub async fn emit_options(&self) -> Option<String> {
        self.emit_request(b"OPTIONS / HTTP/1.1\r\nHost: www.w3.org\r\n\r\n").await
    }
}
