//! Configuration Module
//!
//! Loads service and cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which store backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Remote Redis server
    Redis,
    /// In-process map with TTL and LRU eviction
    Memory,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(BackendKind::Redis),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Admin HTTP server port
    pub server_port: u16,
    /// Master switch for caching
    pub cache_enabled: bool,
    /// Store implementation
    pub cache_backend: BackendKind,
    /// Redis host name
    pub redis_host: String,
    /// Redis port
    pub redis_port: u16,
    /// Redis database index
    pub redis_db: i64,
    /// Optional Redis password
    pub redis_password: Option<String>,
    /// Connect/read timeout for Redis, in seconds
    pub redis_timeout: u64,
    /// Fixed global prefix for every cache key
    pub cache_prefix: String,
    /// Capacity of the in-process backend
    pub memory_max_entries: usize,
    /// Expiry sweep interval for the in-process backend, in seconds
    pub cleanup_interval: u64,
    /// Whether operation metrics are recorded
    pub metrics_enabled: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `API_PORT` - Admin HTTP port (default: 8000)
    /// - `CACHE_ENABLED` - Enable caching (default: true)
    /// - `CACHE_BACKEND` - `redis` or `memory` (default: redis)
    /// - `REDIS_HOST` / `REDIS_PORT` / `REDIS_DB` / `REDIS_PASSWORD`
    /// - `REDIS_TIMEOUT` - Connect/read timeout in seconds (default: 5)
    /// - `CACHE_PREFIX` - Global key prefix (default: yfinance_api)
    /// - `MEMORY_MAX_ENTRIES` - In-process capacity (default: 10000)
    /// - `CLEANUP_INTERVAL` - In-process sweep frequency in seconds (default: 60)
    /// - `METRICS_ENABLED` - Record operation metrics (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: parse_var("API_PORT").unwrap_or(defaults.server_port),
            cache_enabled: bool_var("CACHE_ENABLED").unwrap_or(defaults.cache_enabled),
            cache_backend: parse_var("CACHE_BACKEND").unwrap_or(defaults.cache_backend),
            redis_host: env::var("REDIS_HOST").unwrap_or(defaults.redis_host),
            redis_port: parse_var("REDIS_PORT").unwrap_or(defaults.redis_port),
            redis_db: parse_var("REDIS_DB").unwrap_or(defaults.redis_db),
            redis_password: env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
            redis_timeout: parse_var("REDIS_TIMEOUT").unwrap_or(defaults.redis_timeout),
            cache_prefix: env::var("CACHE_PREFIX").unwrap_or(defaults.cache_prefix),
            memory_max_entries: parse_var("MEMORY_MAX_ENTRIES")
                .unwrap_or(defaults.memory_max_entries),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            metrics_enabled: bool_var("METRICS_ENABLED").unwrap_or(defaults.metrics_enabled),
        }
    }

    /// Redis connect/read timeout as a Duration.
    pub fn redis_timeout(&self) -> Duration {
        Duration::from_secs(self.redis_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8000,
            cache_enabled: true,
            cache_backend: BackendKind::Redis,
            redis_host: "localhost".to_string(),
            redis_port: 6379,
            redis_db: 0,
            redis_password: None,
            redis_timeout: 5,
            cache_prefix: "yfinance_api".to_string(),
            memory_max_entries: 10_000,
            cleanup_interval: 60,
            metrics_enabled: true,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn bool_var(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}
