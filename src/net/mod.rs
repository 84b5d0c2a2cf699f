//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Replay target address
//!     → connection.rs (resolve, dial with timeout)
//!     → tls.rs (optional TLS handshake, no chain validation)
//!     → Transport handed to the HTTP client
//! ```
//!
//! # Design Decisions
//! - Plain and TLS streams share one `Transport` type so the client has a single I/O path
//! - Each connection gets an ID for tracing

pub mod connection;
pub mod tls;

pub use connection::{dial, ConnectionId, DialError, Transport};
