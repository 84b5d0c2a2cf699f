//! Emitter: moves payloads from every input to the outputs.
//!
//! # Data Flow
//! ```text
//! input 1 ──┐                  ┌─→ output A
//! input 2 ──┼─ copy_multi task ┼─→ output B   (broadcast)
//! input N ──┘   (one per input) └─→ output C   (or round-robin with split)
//! ```
//!
//! # Design Decisions
//! - One task per input; a closed input ends only its own task
//! - Every task carries its own shutdown signal, so `run` returns only
//!   after all of them have stopped
//! - A failed write is logged and does not stop the input

use std::sync::Arc;

use futures_util::future::join_all;

use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::observability::metrics;
use crate::plugins::{Input, Output, Plugins};

pub struct Emitter {
    plugins: Plugins,
    split_output: bool,
}

impl Emitter {
    pub fn new(plugins: Plugins, split_output: bool) -> Self {
        Self {
            plugins,
            split_output,
        }
    }

    /// Run until every input closes or shutdown is triggered.
    pub async fn run(self, shutdown: &Shutdown) {
        let outputs: Arc<[Arc<dyn Output>]> = self.plugins.outputs.into();

        let tasks: Vec<_> = self
            .plugins
            .inputs
            .into_iter()
            .map(|input| {
                tokio::spawn(copy_multi(
                    input,
                    outputs.clone(),
                    self.split_output,
                    shutdown.subscribe(),
                ))
            })
            .collect();

        tracing::info!(
            inputs = tasks.len(),
            outputs = outputs.len(),
            split_output = self.split_output,
            "Emitter started"
        );

        for result in join_all(tasks).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Emitter task panicked");
            }
        }

        tracing::info!("Emitter stopped");
    }
}

/// Copy payloads from one input to the outputs until the input closes or shutdown.
pub async fn copy_multi(
    input: Arc<dyn Input>,
    outputs: Arc<[Arc<dyn Output>]>,
    split_output: bool,
    mut stop: ShutdownSignal,
) {
    let mut next_output = 0usize;

    loop {
        let payload = tokio::select! {
            biased;
            _ = stop.recv() => break,
            payload = input.read() => match payload {
                Some(payload) => payload,
                None => {
                    tracing::debug!(input = %input, "Input closed");
                    break;
                }
            },
        };

        metrics::record_emitted();
        tracing::trace!(input = %input, payload = %String::from_utf8_lossy(&payload), "Sending");

        if outputs.is_empty() {
            continue;
        }

        let targets = if split_output {
            let index = next_output;
            next_output = (next_output + 1) % outputs.len();
            &outputs[index..=index]
        } else {
            &outputs[..]
        };

        for output in targets {
            let written = tokio::select! {
                biased;
                _ = stop.recv() => return,
                written = output.write(&payload) => written,
            };
            if let Err(e) = written {
                tracing::warn!(output = %output, error = %e, "Output write failed");
            }
        }
    }
}
