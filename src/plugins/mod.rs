//! Sources and sinks of framed payloads.
//!
//! # Responsibilities
//! - Define the `Input` / `Output` capability contracts the emitter drives
//! - Build the configured plugin lists through the static factory table
//!
//! # Design Decisions
//! - Inputs signal permanent closure by returning `None` from `read`
//! - An output may also act as an input (the replay pool tracking responses)

use std::fmt;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::config::ReplayConfig;
use crate::http::client::TargetError;
use crate::lifecycle::Shutdown;

pub mod channel;
pub mod dummy;
pub mod registry;
pub mod stdout;

pub use channel::{ChannelInput, ChannelInputHandle};
pub use dummy::DummyInput;
pub use registry::{Constructor, Factory, Role, FACTORIES};
pub use stdout::StdoutOutput;

/// Errors from building or writing to a plugin.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("unknown {role} kind '{kind}'")]
    UnknownKind { role: Role, kind: String },

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("{0} is closed")]
    Closed(String),

    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

/// A source of framed payloads.
#[async_trait]
pub trait Input: Send + Sync + fmt::Display {
    /// Next payload; `None` once the source is permanently closed.
    async fn read(&self) -> Option<Bytes>;
}

/// A sink of framed payloads.
#[async_trait]
pub trait Output: Send + Sync + fmt::Display {
    /// Consume one payload, returning the bytes accepted.
    async fn write(&self, payload: &[u8]) -> Result<usize, PluginError>;

    /// The same plugin viewed as a source, if it produces payloads too.
    fn as_input(self: Arc<Self>) -> Option<Arc<dyn Input>> {
        None
    }
}

/// The inputs and outputs the emitter runs.
#[derive(Default, Clone)]
pub struct Plugins {
    pub inputs: Vec<Arc<dyn Input>>,
    pub outputs: Vec<Arc<dyn Output>>,
}

impl Plugins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, input: Arc<dyn Input>) -> Self {
        self.inputs.push(input);
        self
    }

    /// Register an output, and its source side if it has one.
    pub fn with_output(mut self, output: Arc<dyn Output>) -> Self {
        if let Some(input) = output.clone().as_input() {
            self.inputs.push(input);
        }
        self.outputs.push(output);
        self
    }

    /// Construct every configured plugin. Must be called inside a tokio runtime.
    pub fn from_config(config: &ReplayConfig, shutdown: &Shutdown) -> Result<Self, PluginError> {
        let mut plugins = Plugins::new();

        for entry in &config.inputs {
            let factory = registry::find(Role::Input, &entry.kind).ok_or_else(|| PluginError::UnknownKind {
                role: Role::Input,
                kind: entry.kind.clone(),
            })?;
            if let Constructor::Input(build) = factory.build {
                let input = build(entry, config, shutdown)?;
                tracing::info!(input = %input, "Registered input");
                plugins = plugins.with_input(input);
            }
        }

        for entry in &config.outputs {
            let factory = registry::find(Role::Output, &entry.kind).ok_or_else(|| PluginError::UnknownKind {
                role: Role::Output,
                kind: entry.kind.clone(),
            })?;
            if let Constructor::Output(build) = factory.build {
                let output = build(entry, config, shutdown)?;
                tracing::info!(output = %output, "Registered output");
                plugins = plugins.with_output(output);
            }
        }

        Ok(plugins)
    }
}

impl fmt::Debug for Plugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs: Vec<String> = self.inputs.iter().map(|i| i.to_string()).collect();
        let outputs: Vec<String> = self.outputs.iter().map(|o| o.to_string()).collect();
        f.debug_struct("Plugins")
            .field("inputs", &inputs)
            .field("outputs", &outputs)
            .finish()
    }
}
