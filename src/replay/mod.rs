//! Replay subsystem: the HTTP output and its worker pool.
//!
//! # Data Flow
//! ```text
//! request payload
//!     → pool.rs (queue, scaling coordinator)
//!     → worker.rs (decode header, replay body through HttpClient)
//!     → analytics.rs (optional exchange export)
//!     → pool.rs (tracked responses framed as ReplayedResponse)
//! ```

pub mod analytics;
pub mod counters;
pub mod pool;
mod worker;

pub use analytics::{ExchangeRecord, LogAnalyzer, ResponseAnalyzer};
pub use counters::{WorkerCounters, WorkerSnapshot};
pub use pool::{HttpOutput, PoolStats, ReplayResponse, INITIAL_DYNAMIC_WORKERS};
pub use worker::{MAX_IDLE_TIMEOUTS, WORKER_WAIT};
