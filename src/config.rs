//! Configuration Module
//!
//! Handles loading and validating configuration from environment variables.
//! Configuration is read once at startup; any malformed value is fatal there
//! and never surfaces at request time.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

/// Primary (in-process) tier settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Maximum number of entries the primary cache can hold
    pub capacity: usize,
    /// TTL applied to every primary entry
    pub ttl: Duration,
}

/// Secondary (Redis) tier settings. Absent when the tier is disabled.
#[derive(Debug, Clone, PartialEq)]
pub struct RedisSettings {
    /// Connection URL, e.g. `redis://localhost:6379`
    pub url: String,
    /// TTL applied to every secondary entry
    pub ttl: Duration,
    /// Connection pool size
    pub pool_size: usize,
    /// Bound on every Redis round trip and on pool waits
    pub timeout: Duration,
    /// Namespace prepended to every key
    pub key_prefix: String,
}

/// How full misses are resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum OriginMode {
    /// Serve files below `root`
    File { root: PathBuf },
    /// Forward to `backends[primary]`
    Proxy { backends: Vec<Url>, primary: usize },
}

/// Server configuration parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub cache: CacheSettings,
    pub redis: Option<RedisSettings>,
    pub origin: OriginMode,
    /// Deadline given to every inbound request
    pub request_timeout: Duration,
    /// HTTP server port
    pub server_port: u16,
    /// Expiry sweep interval in seconds, 0 disables the sweep
    pub cleanup_interval: u64,
}

const DEFAULT_BACKENDS: &str = "http://localhost:8081,http://localhost:8082";

impl Config {
    /// Creates a Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Primary cache entries (default: 1000)
    /// - `CACHE_TTL` - Primary TTL in seconds (default: 10)
    /// - `REDIS_URL` - Secondary tier endpoint, unset or empty disables it
    /// - `REDIS_TTL` - Secondary TTL in seconds (default: 60)
    /// - `REDIS_POOL_SIZE` - Pool size (default: 10)
    /// - `REDIS_TIMEOUT_MS` - Per-call timeout (default: 250)
    /// - `REDIS_KEY_PREFIX` - Key namespace (default: `cdn:`)
    /// - `ORIGIN_MODE` - `file` or `proxy` (default: file)
    /// - `FILE_ROOT` - Root directory in file mode (default: `.`)
    /// - `BACKENDS` - Comma separated backend URLs in proxy mode
    /// - `PRIMARY_BACKEND` - Index of the backend to forward to (default: 0)
    /// - `REQUEST_TIMEOUT_MS` - Per-request deadline (default: 5000)
    /// - `SERVER_PORT` - HTTP server port (default: 9000)
    /// - `CLEANUP_INTERVAL` - Expiry sweep in seconds (default: 0, disabled)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cache = CacheSettings {
            capacity: parse_var(&lookup, "CACHE_CAPACITY", defaults.cache.capacity)?,
            ttl: Duration::from_secs(parse_var(&lookup, "CACHE_TTL", defaults.cache.ttl.as_secs())?),
        };

        let redis = match lookup("REDIS_URL").filter(|url| !url.trim().is_empty()) {
            Some(url) => Some(RedisSettings {
                url: url.trim().to_string(),
                ttl: Duration::from_secs(parse_var(&lookup, "REDIS_TTL", 60u64)?),
                pool_size: parse_var(&lookup, "REDIS_POOL_SIZE", 10usize)?,
                timeout: Duration::from_millis(parse_var(&lookup, "REDIS_TIMEOUT_MS", 250u64)?),
                key_prefix: lookup("REDIS_KEY_PREFIX").unwrap_or_else(|| "cdn:".to_string()),
            }),
            None => None,
        };

        let mode = lookup("ORIGIN_MODE").unwrap_or_else(|| "file".to_string());
        let origin = match mode.trim().to_ascii_lowercase().as_str() {
            "file" => OriginMode::File {
                root: PathBuf::from(lookup("FILE_ROOT").unwrap_or_else(|| ".".to_string())),
            },
            "proxy" => {
                let raw = lookup("BACKENDS").unwrap_or_else(|| DEFAULT_BACKENDS.to_string());
                let backends = parse_backends(&raw)?;
                let primary = parse_var(&lookup, "PRIMARY_BACKEND", 0usize)?;
                if primary >= backends.len() {
                    return Err(ConfigError::BackendIndexOutOfRange {
                        index: primary,
                        len: backends.len(),
                    });
                }
                OriginMode::Proxy { backends, primary }
            }
            _ => return Err(ConfigError::UnknownOriginMode(mode)),
        };

        Ok(Self {
            cache,
            redis,
            origin,
            request_timeout: Duration::from_millis(parse_var(
                &lookup,
                "REQUEST_TIMEOUT_MS",
                defaults.request_timeout.as_millis() as u64,
            )?),
            server_port: parse_var(&lookup, "SERVER_PORT", defaults.server_port)?,
            cleanup_interval: parse_var(&lookup, "CLEANUP_INTERVAL", defaults.cleanup_interval)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheSettings {
                capacity: 1000,
                ttl: Duration::from_secs(10),
            },
            redis: None,
            origin: OriginMode::File {
                root: PathBuf::from("."),
            },
            request_timeout: Duration::from_millis(5000),
            server_port: 9000,
            cleanup_interval: 0,
        }
    }
}

/// Parses a comma separated list of backend base URLs.
///
/// Each entry must be an absolute `http` or `https` URL with a host.
pub fn parse_backends(raw: &str) -> Result<Vec<Url>, ConfigError> {
    let backends = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_backend)
        .collect::<Result<Vec<_>, _>>()?;

    if backends.is_empty() {
        return Err(ConfigError::NoBackends);
    }
    Ok(backends)
}

fn parse_backend(address: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBackend {
        address: address.to_string(),
        reason,
    };

    let url = Url::parse(address).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache.capacity, 1000);
        assert_eq!(config.cache.ttl, Duration::from_secs(10));
        assert_eq!(config.server_port, 9000);
        assert_eq!(config.cleanup_interval, 0);
        assert!(config.redis.is_none());
    }

    #[test]
    fn test_config_from_empty_lookup_matches_default() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_proxy_mode() {
        let config = Config::from_lookup(lookup(&[
            ("ORIGIN_MODE", "proxy"),
            ("BACKENDS", "http://a:8081 , http://b:8082/base"),
            ("PRIMARY_BACKEND", "1"),
            ("CACHE_CAPACITY", "50"),
        ]))
        .unwrap();

        assert_eq!(config.cache.capacity, 50);
        match config.origin {
            OriginMode::Proxy { backends, primary } => {
                assert_eq!(backends.len(), 2);
                assert_eq!(primary, 1);
                assert_eq!(backends[1].as_str(), "http://b:8082/base");
            }
            other => panic!("expected proxy mode, got {other:?}"),
        }
    }

    #[test]
    fn test_config_proxy_default_backends() {
        let config = Config::from_lookup(lookup(&[("ORIGIN_MODE", "proxy")])).unwrap();
        match config.origin {
            OriginMode::Proxy { backends, primary } => {
                assert_eq!(primary, 0);
                assert_eq!(backends[0].as_str(), "http://localhost:8081/");
            }
            other => panic!("expected proxy mode, got {other:?}"),
        }
    }

    #[test]
    fn test_config_redis_settings() {
        let config = Config::from_lookup(lookup(&[
            ("REDIS_URL", "redis://cache:6379"),
            ("REDIS_TTL", "120"),
        ]))
        .unwrap();

        let redis = config.redis.unwrap();
        assert_eq!(redis.url, "redis://cache:6379");
        assert_eq!(redis.ttl, Duration::from_secs(120));
        assert_eq!(redis.timeout, Duration::from_millis(250));
        assert_eq!(redis.key_prefix, "cdn:");
    }

    #[test]
    fn test_empty_redis_url_disables_tier() {
        let config = Config::from_lookup(lookup(&[("REDIS_URL", "  ")])).unwrap();
        assert!(config.redis.is_none());
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = Config::from_lookup(lookup(&[("CACHE_CAPACITY", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "CACHE_CAPACITY", .. }));
    }

    #[test]
    fn test_unknown_origin_mode_is_rejected() {
        let err = Config::from_lookup(lookup(&[("ORIGIN_MODE", "ftp")])).unwrap_err();
        assert_eq!(err, ConfigError::UnknownOriginMode("ftp".to_string()));
    }

    #[test]
    fn test_unparsable_backend_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("ORIGIN_MODE", "proxy"),
            ("BACKENDS", "http://ok:1,not a url"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBackend { .. }));

        let err = parse_backends("ftp://files.example").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBackend { .. }));
    }

    #[test]
    fn test_empty_backend_list_is_rejected() {
        assert_eq!(parse_backends(" , ").unwrap_err(), ConfigError::NoBackends);
    }

    #[test]
    fn test_backend_index_out_of_range() {
        let err = Config::from_lookup(lookup(&[
            ("ORIGIN_MODE", "proxy"),
            ("BACKENDS", "http://a:1"),
            ("PRIMARY_BACKEND", "2"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::BackendIndexOutOfRange { index: 2, len: 1 });
    }
}
