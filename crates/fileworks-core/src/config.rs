//! Engine configuration types.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default chunk size for copying file content (16 MiB).
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Configuration for bulk file operations.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct OpsConfig {
    /// Size of the chunk buffer used when copying file content.
    #[builder(default = "DEFAULT_BUFFER_SIZE")]
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Give copies the modification time of their source.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub preserve_timestamps: bool,

    /// How often the async executor publishes progress, in milliseconds.
    #[builder(default = "100")]
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Capacity of the executor's event channel.
    #[builder(default = "100")]
    #[serde(default = "default_channel_size")]
    pub channel_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_progress_interval_ms() -> u64 {
    100
}

fn default_channel_size() -> usize {
    100
}

impl OpsConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.buffer_size == Some(0) {
            return Err("Buffer size must be greater than zero".to_string());
        }
        if self.progress_interval_ms == Some(0) {
            return Err("Progress interval must be greater than zero".to_string());
        }
        if self.channel_size == Some(0) {
            return Err("Channel size must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl OpsConfig {
    /// Create a new config builder.
    pub fn builder() -> OpsConfigBuilder {
        OpsConfigBuilder::default()
    }

    /// Progress interval as a duration.
    pub fn progress_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.progress_interval_ms)
    }
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            preserve_timestamps: true,
            progress_interval_ms: 100,
            channel_size: 100,
        }
    }
}
