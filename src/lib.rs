//! Traffic replication pipeline library.
//!
//! Captured HTTP traffic flows as framed payloads from inputs, through the
//! emitter, to outputs. The replay output drives a self-scaling pool of
//! raw-socket HTTP clients against a target server and can surface the
//! replayed responses back into the pipeline.

// Wire format
pub mod payload;

// Replay transport
pub mod http;
pub mod net;

// Pipeline
pub mod emitter;
pub mod plugins;
pub mod replay;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::schema::ReplayConfig;
pub use emitter::Emitter;
pub use http::{HttpClient, HttpClientConfig};
pub use lifecycle::Shutdown;
pub use plugins::{Input, Output, Plugins};
pub use replay::HttpOutput;
