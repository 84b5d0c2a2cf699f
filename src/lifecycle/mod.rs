//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build plugins → Start emitter
//!
//! Shutdown (shutdown.rs):
//!     Signal received → trigger() → every task's ShutdownSignal resolves
//!     → emitter source tasks, pool coordinator and workers exit → run() returns
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - One signal per spawned task, threaded from the top-level coordinator
//! - The flag is sticky: late subscribers see an earlier trigger

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
