//! Static factory table mapping configured plugin kinds to constructors.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{PluginConfig, ReplayConfig};
use crate::lifecycle::Shutdown;
use crate::plugins::{DummyInput, Input, Output, PluginError, StdoutOutput};
use crate::replay::HttpOutput;

/// Which side of the emitter a plugin sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Input,
    Output,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Input => write!(f, "input"),
            Role::Output => write!(f, "output"),
        }
    }
}

pub type InputConstructor = fn(&PluginConfig, &ReplayConfig, &Shutdown) -> Result<Arc<dyn Input>, PluginError>;
pub type OutputConstructor = fn(&PluginConfig, &ReplayConfig, &Shutdown) -> Result<Arc<dyn Output>, PluginError>;

#[derive(Clone, Copy)]
pub enum Constructor {
    Input(InputConstructor),
    Output(OutputConstructor),
}

/// One registered plugin kind.
#[derive(Clone, Copy)]
pub struct Factory {
    pub kind: &'static str,
    pub needs_address: bool,
    pub build: Constructor,
}

impl Factory {
    pub fn role(&self) -> Role {
        match self.build {
            Constructor::Input(_) => Role::Input,
            Constructor::Output(_) => Role::Output,
        }
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("kind", &self.kind)
            .field("role", &self.role())
            .field("needs_address", &self.needs_address)
            .finish()
    }
}

pub static FACTORIES: &[Factory] = &[
    Factory {
        kind: "dummy",
        needs_address: false,
        build: Constructor::Input(build_dummy),
    },
    Factory {
        kind: "stdout",
        needs_address: false,
        build: Constructor::Output(build_stdout),
    },
    Factory {
        kind: "http",
        needs_address: true,
        build: Constructor::Output(build_http),
    },
];

/// Look up the factory for `kind` in the given role.
pub fn find(role: Role, kind: &str) -> Option<&'static Factory> {
    FACTORIES
        .iter()
        .find(|f| f.role() == role && f.kind.eq_ignore_ascii_case(kind.trim()))
}

fn build_dummy(_: &PluginConfig, config: &ReplayConfig, shutdown: &Shutdown) -> Result<Arc<dyn Input>, PluginError> {
    let interval = Duration::from_millis(config.dummy_input.interval_ms.max(1));
    Ok(Arc::new(DummyInput::new(interval, shutdown)))
}

fn build_stdout(_: &PluginConfig, _: &ReplayConfig, _: &Shutdown) -> Result<Arc<dyn Output>, PluginError> {
    Ok(Arc::new(StdoutOutput::new()))
}

fn build_http(entry: &PluginConfig, config: &ReplayConfig, shutdown: &Shutdown) -> Result<Arc<dyn Output>, PluginError> {
    let output = HttpOutput::new(entry.address.trim(), config.http_output.clone(), shutdown)?;
    Ok(Arc::new(output))
}
