//! Output that prints every payload, for debugging pipelines.

use std::fmt;

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

use crate::payload::PAYLOAD_SEPARATOR;
use crate::plugins::{Output, PluginError};

pub struct StdoutOutput {
    stdout: Mutex<Stdout>,
}

impl StdoutOutput {
    pub fn new() -> Self {
        Self {
            stdout: Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for StdoutOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StdoutOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stdout output")
    }
}

#[async_trait]
impl Output for StdoutOutput {
    async fn write(&self, payload: &[u8]) -> Result<usize, PluginError> {
        // Hold the lock across both writes so payloads never interleave.
        let mut stdout = self.stdout.lock().await;
        stdout.write_all(payload).await?;
        stdout.write_all(PAYLOAD_SEPARATOR.as_bytes()).await?;
        stdout.flush().await?;
        Ok(payload.len())
    }
}
