//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the replay pipeline.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::client::{HttpClientConfig, DEFAULT_RESPONSE_BUFFER_SIZE};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ReplayConfig {
    /// Fan-out behaviour.
    pub emitter: EmitterConfig,

    /// Traffic sources.
    pub inputs: Vec<PluginConfig>,

    /// Traffic sinks.
    pub outputs: Vec<PluginConfig>,

    /// Settings shared by every `http` output.
    pub http_output: HttpOutputConfig,

    /// Settings for `dummy` inputs.
    pub dummy_input: DummyInputConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Emitter configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EmitterConfig {
    /// Round-robin payloads across outputs instead of broadcasting.
    pub split_output: bool,
}

/// One input or output, resolved through the plugin factory table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PluginConfig {
    /// Factory identifier, e.g. `dummy`, `stdout`, `http`.
    pub kind: String,

    /// Plugin-specific address (replay target for `http`).
    #[serde(default)]
    pub address: String,
}

impl PluginConfig {
    pub fn new(kind: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            address: address.into(),
        }
    }
}

/// Replay output (worker pool + HTTP client) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpOutputConfig {
    /// Redirect hops to follow (0 disables).
    pub redirect_limit: usize,

    /// Log every replayed request and response.
    pub debug: bool,

    /// Keep the captured Host header.
    pub original_host: bool,

    /// Dial timeout in milliseconds (0 = same as `timeout_ms`).
    pub connect_timeout_ms: u64,

    /// Write/read deadline in milliseconds (0 = 5 s).
    pub timeout_ms: u64,

    /// Response buffer capacity in bytes (0 = 100 KiB).
    pub response_buffer_size: usize,

    /// Fixed worker count (0 = dynamic scaling).
    pub workers: usize,

    /// Minimum idle workers to keep ready (dynamic mode).
    pub idle_workers: usize,

    /// Payloads a worker processes before rotating out (0 = never).
    pub recycle: usize,

    /// Surface replayed responses as a source.
    pub track_responses: bool,

    /// Capacity of the pending request queue.
    pub queue_capacity: usize,

    /// Capacity of the tracked response channel.
    pub response_capacity: usize,

    /// Publish queue depth on every write.
    pub stats: bool,

    /// Hand every exchange to the analytics side-channel.
    pub analytics: bool,
}

impl Default for HttpOutputConfig {
    fn default() -> Self {
        Self {
            redirect_limit: 0,
            debug: false,
            original_host: false,
            connect_timeout_ms: 0,
            timeout_ms: 5_000,
            response_buffer_size: DEFAULT_RESPONSE_BUFFER_SIZE,
            workers: 0,
            idle_workers: 0,
            recycle: 0,
            track_responses: false,
            queue_capacity: 1000,
            response_capacity: 1000,
            stats: false,
            analytics: false,
        }
    }
}

impl HttpOutputConfig {
    /// Settings handed to each worker's client.
    pub fn client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            follow_redirects: self.redirect_limit,
            debug: self.debug,
            original_host: self.original_host,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            timeout: Duration::from_millis(self.timeout_ms),
            response_buffer_size: self.response_buffer_size,
        }
    }

    /// Whether the pool sizes itself.
    pub fn is_dynamic(&self) -> bool {
        self.workers == 0
    }
}

/// Dummy input configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DummyInputConfig {
    /// Delay between generated requests in milliseconds.
    pub interval_ms: u64,
}

impl Default for DummyInputConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
