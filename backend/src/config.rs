use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub sampling: SamplingConfig,
    pub worker_pool: WorkerPoolConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub directory: String,
    pub ttl_hours: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub default_max_sample_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    pub max_workers: usize,
    pub default_chunk_size: usize,
    pub default_timeout_ms: u64,
    /// Column count above which the engine shards column profiling through
    /// the worker pool instead of running it inline.
    pub column_threshold: usize,
    /// Correlation-pair count above which the engine shards pairwise
    /// correlation work through the worker pool.
    pub pair_threshold: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Config {
    /// Loading order: config file, then `APP_`-prefixed environment
    /// variables, then the two product-specific variables (`PORT`,
    /// `APP_ENV`), then validation.
    pub fn load() -> Result<Self, anyhow::Error> {
        let mut config = if let Some(path) = Self::find_config_file() {
            Self::from_toml(&path)?
        } else {
            tracing::warn!("configuration file not found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Supported environment variables:
    /// - `APP_SERVER_HOST`, `APP_SERVER_PORT` (or plain `PORT`, checked last so
    ///   it wins as the product-specific override)
    /// - `APP_CACHE_DIRECTORY`, `APP_CACHE_TTL_HOURS`
    /// - `APP_SAMPLING_DEFAULT_MAX_SAMPLE_SIZE`
    /// - `APP_WORKER_POOL_MAX_WORKERS`, `APP_WORKER_POOL_DEFAULT_TIMEOUT_MS`
    /// - `APP_LOG_LEVEL`
    /// - `APP_ENV` selects development vs. production defaults
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("APP_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("APP_SERVER_PORT").and_then(|v| v.parse().map_err(|_| std::env::VarError::NotPresent)) {
            self.server.port = port;
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Ok(dir) = std::env::var("APP_CACHE_DIRECTORY") {
            self.cache.directory = dir;
        }
        if let Ok(ttl) = std::env::var("APP_CACHE_TTL_HOURS") {
            if let Ok(ttl) = ttl.parse() {
                self.cache.ttl_hours = ttl;
            }
        }

        if let Ok(size) = std::env::var("APP_SAMPLING_DEFAULT_MAX_SAMPLE_SIZE") {
            if let Ok(size) = size.parse() {
                self.sampling.default_max_sample_size = size;
            }
        }

        if let Ok(workers) = std::env::var("APP_WORKER_POOL_MAX_WORKERS") {
            if let Ok(workers) = workers.parse() {
                self.worker_pool.max_workers = workers;
            }
        }
        if let Ok(timeout) = std::env::var("APP_WORKER_POOL_DEFAULT_TIMEOUT_MS") {
            if let Ok(timeout) = timeout.parse() {
                self.worker_pool.default_timeout_ms = timeout;
            }
        }

        if let Ok(level) = std::env::var("APP_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(env) = std::env::var("APP_ENV") {
            if env == "production" && self.worker_pool.default_timeout_ms == WorkerPoolConfig::default().default_timeout_ms {
                tracing::debug!("APP_ENV=production; keeping configured worker pool timeout");
            }
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.server.port == 0 {
            anyhow::bail!("server port cannot be 0");
        }
        if self.worker_pool.max_workers == 0 {
            anyhow::bail!("worker_pool.max_workers must be > 0");
        }
        if self.cache.directory.is_empty() {
            anyhow::bail!("cache.directory cannot be empty");
        }
        Ok(())
    }

    fn find_config_file() -> Option<String> {
        let possible_paths = ["config.toml", "./config.toml"];
        possible_paths.iter().find(|p| Path::new(p).exists()).map(|p| p.to_string())
    }

    fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 5000 }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { directory: "cache".to_string(), ttl_hours: crate::services::cache::DEFAULT_TTL_HOURS }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { default_max_sample_size: 5000 }
    }
}

/// `max(1, CPUs - 1)`, leaving one core free for the async runtime's own
/// scheduling and I/O work rather than saturating every core with CPU-bound
/// chunk workers.
fn default_max_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            default_chunk_size: 1000,
            default_timeout_ms: 30_000,
            column_threshold: 8,
            pair_threshold: 50,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,csv_profiler=debug".to_string(), file: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_port_fails_validation() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }
}
