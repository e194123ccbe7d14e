use std::collections::HashMap;
use std::env;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;
use url::Url;

use crate::index::DEFAULT_INDEX_PREFIX;

const ENV_PREFIX: &str = "BULK_EMITTER_";

/// Records buffered before a flush is forced.
pub const DEFAULT_MAX_BATCH: usize = 50;
/// Minimum age of the last flush before a tick flushes a non-empty buffer.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BULK_EMITTER_ENDPOINT is not set")]
    EndpointMissing,

    #[error("BULK_EMITTER_ENDPOINT is not a valid URL: {0}")]
    EndpointInvalidUrl(String),

    #[error("{0} has invalid value: {1}")]
    InvalidNumeric(String, String),

    #[error("invalid export header {0:?}")]
    InvalidHeader(String),
}

/// Recognized emitter options, as supplied by the host.
///
/// A missing endpoint is not an error here: it only means an emitter
/// initialized with these options stays disabled.
#[derive(Debug, Clone)]
pub struct EmitterOptions {
    pub endpoint: Option<String>,
    pub index_prefix: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub max_batch: usize,
    pub flush_interval: Duration,
    /// Per-request timeout applied by the HTTP transport. `None` waits forever.
    pub export_timeout: Option<Duration>,
    pub export_headers: Vec<(String, String)>,
    /// How often the relay binary ticks its emitter.
    pub tick_interval: Duration,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            endpoint: None,
            index_prefix: None,
            username: None,
            password: None,
            max_batch: DEFAULT_MAX_BATCH,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            export_timeout: None,
            export_headers: Vec::new(),
            tick_interval: Duration::from_millis(200),
        }
    }
}

impl EmitterOptions {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = env::vars()
            .filter(|(k, _)| k.starts_with(ENV_PREFIX))
            .collect();
        Self::parse(&vars)
    }

    fn parse(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_batch = parse_max_batch(vars, "BULK_EMITTER_MAX_BATCH", defaults.max_batch)?;
        let flush_interval =
            parse_duration_ms(vars, "BULK_EMITTER_FLUSH_INTERVAL_MS", defaults.flush_interval)?;
        let export_timeout = parse_timeout_ms(vars, "BULK_EMITTER_EXPORT_TIMEOUT_MS", 0)?;
        let tick_interval =
            parse_duration_ms(vars, "BULK_EMITTER_TICK_MS", defaults.tick_interval)?;
        let export_headers = parse_headers(vars);
        header_map(&export_headers)?;

        Ok(Self {
            endpoint: vars.get("BULK_EMITTER_ENDPOINT").cloned(),
            index_prefix: vars.get("BULK_EMITTER_INDEX_PREFIX").cloned(),
            username: vars.get("BULK_EMITTER_USERNAME").cloned(),
            password: vars.get("BULK_EMITTER_PASSWORD").cloned(),
            max_batch,
            flush_interval,
            export_timeout,
            export_headers,
            tick_interval,
        })
    }
}

/// Basic-auth credentials for the bulk endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

/// Immutable per-emitter configuration, resolved from [`EmitterOptions`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: Url,
    pub bulk_url: Url,
    pub index_prefix: String,
    pub credentials: Option<Credentials>,
    pub max_batch: usize,
    pub flush_interval_ms: u64,
}

impl Settings {
    pub fn resolve(options: &EmitterOptions) -> Result<Self, ConfigError> {
        let raw = options
            .endpoint
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::EndpointMissing)?;

        let endpoint =
            Url::parse(raw).map_err(|_| ConfigError::EndpointInvalidUrl(raw.to_owned()))?;
        // Appended rather than `Url::join`ed so a base path without a trailing
        // slash keeps its last segment.
        let bulk_url = Url::parse(&format!("{}/_bulk", raw.trim_end_matches('/')))
            .map_err(|_| ConfigError::EndpointInvalidUrl(raw.to_owned()))?;

        let credentials = options.username.as_ref().map(|username| Credentials {
            username: username.clone(),
            password: options.password.clone(),
        });

        Ok(Self {
            endpoint,
            bulk_url,
            index_prefix: options
                .index_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_INDEX_PREFIX.to_owned()),
            credentials,
            max_batch: options.max_batch.max(1),
            flush_interval_ms: options.flush_interval.as_millis() as u64,
        })
    }
}

fn parse_max_batch(
    vars: &HashMap<String, String>,
    name: &str,
    default: usize,
) -> Result<usize, ConfigError> {
    match vars.get(name) {
        Some(val) => match val.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::InvalidNumeric(name.to_owned(), val.clone())),
        },
        None => Ok(default),
    }
}

fn parse_duration_ms(
    vars: &HashMap<String, String>,
    name: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match vars.get(name) {
        Some(val) => {
            let ms: u64 = val
                .parse()
                .map_err(|_| ConfigError::InvalidNumeric(name.to_owned(), val.clone()))?;
            Ok(Duration::from_millis(ms))
        }
        None => Ok(default),
    }
}

fn parse_timeout_ms(
    vars: &HashMap<String, String>,
    name: &str,
    default_ms: u64,
) -> Result<Option<Duration>, ConfigError> {
    let ms = match vars.get(name) {
        Some(val) => val
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumeric(name.to_owned(), val.clone()))?,
        None => default_ms,
    };
    if ms == 0 {
        Ok(None)
    } else {
        Ok(Some(Duration::from_millis(ms)))
    }
}

fn parse_headers(vars: &HashMap<String, String>) -> Vec<(String, String)> {
    vars.get("BULK_EMITTER_EXPORT_HEADERS")
        .filter(|s| !s.is_empty())
        .map(|raw| {
            raw.split(',')
                .filter_map(|pair| {
                    let (k, v) = pair.split_once('=')?;
                    let k = k.trim();
                    if k.is_empty() {
                        return None;
                    }
                    Some((k.to_owned(), v.trim().to_owned()))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Build the extra request headers, rejecting names or values HTTP cannot carry.
pub fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, ConfigError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (k, v) in headers {
        let name = HeaderName::from_bytes(k.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(k.clone()))?;
        let value =
            HeaderValue::from_str(v).map_err(|_| ConfigError::InvalidHeader(format!("{k}={v}")))?;
        map.append(name, value);
    }
    Ok(map)
}
