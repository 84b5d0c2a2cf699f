//! HTTP replay subsystem.
//!
//! # Data Flow
//! ```text
//! request bytes (payload body)
//!     → proto.rs (Host rewrite, framing checks)
//!     → client.rs (write, bounded read, redirect chase)
//!     → response bytes, or error_response.rs (synthetic 52x) on failure
//! ```
//!
//! # Design Decisions
//! - Messages stay raw bytes end to end; nothing is parsed into typed requests
//! - One client owns one connection and is never shared between tasks

pub mod client;
pub mod error_response;
pub mod proto;

pub use client::{ClientError, HttpClient, HttpClientConfig, Target, TargetError};
pub use error_response::{error_response, SyntheticStatus};
