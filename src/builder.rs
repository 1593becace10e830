//! Pool construction

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use xapool_core::{PoolConfig, Result, TransactionManager};
use xapool_engine::{ConnectionFactory, ConnectionPool};

/// Where the base configuration comes from
enum Source {
    Config(PoolConfig),
    File(PathBuf),
    Toml(String),
}

/// Builder for pool configuration.
///
/// Settings given directly on the builder override whatever the base
/// configuration (default, [`config`](Self::config), or a TOML source) says.
///
/// # Example
///
/// ```ignore
/// // Settings from a file, with a tighter timeout for this process
/// let pool = PoolBuilder::new(MyFactory::new())
///     .config_file("./xapool.toml")
///     .allocation_timeout(Duration::from_secs(2))
///     .transaction_manager(tm)
///     .build()?;
///
/// // Everything inline
/// let pool = PoolBuilder::new(MyFactory::new())
///     .name("orders")
///     .max_connections(16)
///     .max_idle(Duration::from_secs(300))
///     .build()?;
/// ```
pub struct PoolBuilder<F: ConnectionFactory> {
    factory: F,
    source: Source,
    name: Option<String>,
    max_connections: Option<usize>,
    min_connections: Option<usize>,
    max_idle: Option<Duration>,
    allocation_timeout: Option<Duration>,
    trace: Option<bool>,
    transaction_manager: Option<Arc<dyn TransactionManager>>,
}

impl<F: ConnectionFactory> PoolBuilder<F> {
    /// Create a builder with default settings.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            source: Source::Config(PoolConfig::default()),
            name: None,
            max_connections: None,
            min_connections: None,
            max_idle: None,
            allocation_timeout: None,
            trace: None,
            transaction_manager: None,
        }
    }

    /// Start from an existing configuration.
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.source = Source::Config(config);
        self
    }

    /// Load the base configuration from a TOML file when building.
    ///
    /// The file may hold the settings at top level or under a `[pool]` table.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.source = Source::File(path.as_ref().to_path_buf());
        self
    }

    /// Parse the base configuration from a TOML string when building.
    pub fn config_toml(mut self, toml: impl Into<String>) -> Self {
        self.source = Source::Toml(toml.into());
        self
    }

    /// Set the pool name used in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the maximum number of connections (0 = unbounded).
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Set the number of connections created up front.
    pub fn min_connections(mut self, min: usize) -> Self {
        self.min_connections = Some(min);
        self
    }

    /// Expire available connections idle for this long.
    ///
    /// `Duration::ZERO` disables expiration and the sweeper thread.
    pub fn max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = Some(max_idle);
        self
    }

    /// Set how long allocate may block.
    pub fn allocation_timeout(mut self, timeout: Duration) -> Self {
        self.allocation_timeout = Some(timeout);
        self
    }

    /// Emit per-connection lifecycle events at debug level.
    pub fn trace(mut self, trace: bool) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Enlist connections that expose a 2PC handle with this manager.
    pub fn transaction_manager(mut self, tm: Arc<dyn TransactionManager>) -> Self {
        self.transaction_manager = Some(tm);
        self
    }

    /// Resolve the final configuration without starting a pool.
    pub fn resolve_config(&self) -> Result<PoolConfig> {
        let mut config = match &self.source {
            Source::Config(config) => config.clone(),
            Source::File(path) => PoolConfig::from_file(path)?,
            Source::Toml(toml) => PoolConfig::from_toml_str(toml)?,
        };
        if let Some(name) = &self.name {
            config = config.with_name(name.clone());
        }
        if let Some(max) = self.max_connections {
            config = config.with_max_connections(max);
        }
        if let Some(min) = self.min_connections {
            config = config.with_min_connections(min);
        }
        if let Some(max_idle) = self.max_idle {
            config = config.with_max_idle(max_idle);
        }
        if let Some(timeout) = self.allocation_timeout {
            config = config.with_allocation_timeout(timeout);
        }
        if let Some(trace) = self.trace {
            config = config.with_trace(trace);
        }
        config.validate()?;
        Ok(config)
    }

    /// Start the pool.
    pub fn build(self) -> Result<ConnectionPool<F>> {
        let config = self.resolve_config()?;
        debug!(
            pool = %config.name,
            enlisting = self.transaction_manager.is_some(),
            "building pool"
        );
        match self.transaction_manager {
            Some(tm) => ConnectionPool::with_transaction_manager(config, self.factory, tm),
            None => ConnectionPool::new(config, self.factory),
        }
    }
}
