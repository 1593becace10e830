//! Pool configuration
//!
//! Settings are read-only inputs to the engine. They can be built in code or
//! loaded from TOML, either at the top level of the document or under a
//! `[pool]` table:
//!
//! ```toml
//! [pool]
//! name = "orders"
//! max_connections = 16
//! min_connections = 2
//! max_idle_ms = 300000
//! allocation_timeout_ms = 5000
//! trace = true
//! ```
//!
//! | Field | Default | Zero means |
//! |-------|---------|------------|
//! | max_connections | 0 | unbounded |
//! | min_connections | 0 | no prefill |
//! | max_idle_ms | 0 | never expire |
//! | allocation_timeout_ms | 30000 | fail fast, never block |

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default allocation timeout (30 seconds)
pub const DEFAULT_ALLOCATION_TIMEOUT_MS: u64 = 30_000;

/// Configuration for one connection pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Pool name used in logs and the sweeper thread name
    pub name: String,
    /// Maximum number of connections (0 = unbounded)
    pub max_connections: usize,
    /// Connections created when the pool starts
    pub min_connections: usize,
    /// Idle time in milliseconds after which an available connection expires
    pub max_idle_ms: u64,
    /// How long allocate may block waiting for a connection, in milliseconds
    pub allocation_timeout_ms: u64,
    /// Emit per-connection lifecycle events at debug level
    pub trace: bool,
}

impl PoolConfig {
    /// Create a configuration with the given maximum and defaults elsewhere
    pub fn new(max_connections: usize) -> Self {
        Self {
            max_connections,
            ..Self::default()
        }
    }

    /// Set the pool name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the maximum pool size (0 = unbounded)
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the number of connections created at startup
    pub fn with_min_connections(mut self, min: usize) -> Self {
        self.min_connections = min;
        self
    }

    /// Set the idle expiration (zero disables expiration)
    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle_ms = duration_to_ms(max_idle);
        self
    }

    /// Set the allocation timeout (zero never blocks)
    pub fn with_allocation_timeout(mut self, timeout: Duration) -> Self {
        self.allocation_timeout_ms = duration_to_ms(timeout);
        self
    }

    /// Enable or disable per-connection trace events
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Whether the pool size is unbounded
    pub fn is_unbounded(&self) -> bool {
        self.max_connections == 0
    }

    /// Idle expiration, `None` when disabled
    pub fn max_idle(&self) -> Option<Duration> {
        (self.max_idle_ms > 0).then(|| Duration::from_millis(self.max_idle_ms))
    }

    /// Allocation timeout as a Duration
    pub fn allocation_timeout(&self) -> Duration {
        Duration::from_millis(self.allocation_timeout_ms)
    }

    /// Check the settings are consistent
    pub fn validate(&self) -> Result<()> {
        if !self.is_unbounded() && self.min_connections > self.max_connections {
            return Err(Error::InvalidConfig(format!(
                "min_connections ({}) cannot exceed max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        if self.name.is_empty() {
            return Err(Error::InvalidConfig("pool name must not be empty".into()));
        }
        Ok(())
    }

    /// Parse a TOML document
    ///
    /// Accepts the settings at the top level or under a `[pool]` table.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let doc: ConfigDocument = toml::from_str(s)?;
        let config = doc.pool.unwrap_or(doc.flat);
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }
}

impl Default for PoolConfig {
    /// Defaults:
    /// - name: "default"
    /// - max_connections: 0 (unbounded)
    /// - min_connections: 0
    /// - max_idle: disabled
    /// - allocation_timeout: 30 seconds
    /// - trace: off
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            max_connections: 0,
            min_connections: 0,
            max_idle_ms: 0,
            allocation_timeout_ms: DEFAULT_ALLOCATION_TIMEOUT_MS,
            trace: false,
        }
    }
}

#[derive(Deserialize)]
struct ConfigDocument {
    pool: Option<PoolConfig>,
    #[serde(flatten)]
    flat: PoolConfig,
}

fn duration_to_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
