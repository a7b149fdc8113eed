//! Configuration. The numeric knobs are `serde`-loadable
//! from TOML; `log_sink` is a runtime closure and is supplied
//! separately, since it cannot round-trip through a config file.

use crate::pipeline::PipelineCapacities;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Receives a human-readable progress line. Has no effect on engine
/// behavior; a host application (e.g. a GUI's deferred-update glue, out
/// of scope here) can mirror these into its own log view.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Deserialize)]
pub struct ManagerConfig {
    #[serde(default = "defaults::high_capacity")]
    pub high_capacity: usize,
    #[serde(default = "defaults::normal_capacity")]
    pub normal_capacity: usize,
    #[serde(default = "defaults::low_capacity")]
    pub low_capacity: usize,
    #[serde(default = "defaults::reconnect_base_ms")]
    pub reconnect_base_ms: u64,
    #[serde(default = "defaults::reconnect_max_ms")]
    pub reconnect_max_ms: u64,
    #[serde(default = "defaults::default_command_timeout_ms")]
    pub default_command_timeout_ms: u64,
    #[serde(default = "defaults::max_transaction_commands")]
    pub max_transaction_commands: usize,
    #[serde(default = "defaults::max_reconnect_backoff_shift")]
    pub max_reconnect_backoff_shift: u32,

    #[serde(skip)]
    pub log_sink: Option<LogSink>,
}

mod defaults {
    pub fn high_capacity() -> usize {
        64
    }
    pub fn normal_capacity() -> usize {
        256
    }
    pub fn low_capacity() -> usize {
        256
    }
    pub fn reconnect_base_ms() -> u64 {
        500
    }
    pub fn reconnect_max_ms() -> u64 {
        30_000
    }
    pub fn default_command_timeout_ms() -> u64 {
        5_000
    }
    pub fn max_transaction_commands() -> usize {
        32
    }
    pub fn max_reconnect_backoff_shift() -> u32 {
        5
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            high_capacity: defaults::high_capacity(),
            normal_capacity: defaults::normal_capacity(),
            low_capacity: defaults::low_capacity(),
            reconnect_base_ms: defaults::reconnect_base_ms(),
            reconnect_max_ms: defaults::reconnect_max_ms(),
            default_command_timeout_ms: defaults::default_command_timeout_ms(),
            max_transaction_commands: defaults::max_transaction_commands(),
            max_reconnect_backoff_shift: defaults::max_reconnect_backoff_shift(),
            log_sink: None,
        }
    }
}

impl ManagerConfig {
    /// Parses the numeric knobs from a TOML document. `log_sink` is
    /// always `None` afterward; attach one with [`Self::with_log_sink`].
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn with_log_sink(mut self, sink: LogSink) -> Self {
        self.log_sink = Some(sink);
        self
    }

    pub fn emit(&self, line: impl AsRef<str>) {
        if let Some(sink) = &self.log_sink {
            sink(line.as_ref());
        }
    }

    pub(crate) fn capacities(&self) -> PipelineCapacities {
        PipelineCapacities {
            high: self.high_capacity,
            normal: self.normal_capacity,
            low: self.low_capacity,
        }
    }

    pub(crate) fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_command_timeout_ms)
    }
}
