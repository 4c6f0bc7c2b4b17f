//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::ConfigArgs;

use std::{fmt, fs, path::PathBuf, str::FromStr, time::Duration};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const LOCAL_CONFIG_BASENAME: &str = "reportobello";
const ENV_PREFIX: &str = "REPORTOBELLO";
pub const DEFAULT_HOST: &str = "https://reportobello.com";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INITIAL_DELAY_MS: u64 = 250;
const DEFAULT_POLL_MAX_DELAY_MS: u64 = 2_000;
const DEFAULT_POLL_MULTIPLIER: u32 = 2;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

/// Fully-resolved client settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub logging: LoggingSettings,
    pub polling: PollSettings,
}

#[derive(Clone)]
pub struct ApiSettings {
    pub host: Url,
    pub api_key: String,
    pub request_timeout: Duration,
}

impl fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiSettings")
            .field("host", &self.host.as_str())
            .field("api_key", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::WARN,
            format: LogFormat::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Backoff schedule for build status polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(DEFAULT_POLL_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_POLL_MAX_DELAY_MS),
            multiplier: DEFAULT_POLL_MULTIPLIER,
            timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("api key is required (set REPORTOBELLO_API_KEY or use --api-key-file)")]
    MissingApiKey,
    #[error("failed to read api key file {path}: {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(args: &ConfigArgs) -> Result<Settings, LoadError> {
    let mut builder =
        Config::builder().add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = args.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__"),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(args)?;

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    host: Option<String>,
    /// Older deployments exported `REPORTOBELLO_DOMAIN`.
    domain: Option<String>,
    api_key: Option<String>,
    request_timeout_seconds: Option<u64>,
    logging: RawLoggingSettings,
    polling: RawPollSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, args: &ConfigArgs) -> Result<(), LoadError> {
        if let Some(host) = args.host.as_ref() {
            self.host = Some(host.clone());
        }
        if let Some(path) = args.api_key_file.as_ref() {
            let key = fs::read_to_string(path).map_err(|source| LoadError::KeyFile {
                path: path.clone(),
                source,
            })?;
            self.api_key = Some(key.trim().to_string());
        }
        if let Some(level) = args.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = args.log_json {
            self.logging.json = Some(json);
        }
        if let Some(seconds) = args.timeout_seconds {
            self.polling.timeout_seconds = Some(seconds);
        }
        Ok(())
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            host,
            domain,
            api_key,
            request_timeout_seconds,
            logging,
            polling,
        } = raw;

        let api = build_api_settings(host.or(domain), api_key, request_timeout_seconds)?;
        let logging = build_logging_settings(logging)?;
        let polling = build_poll_settings(polling)?;

        Ok(Self {
            api,
            logging,
            polling,
        })
    }
}

fn build_api_settings(
    host: Option<String>,
    api_key: Option<String>,
    request_timeout_seconds: Option<u64>,
) -> Result<ApiSettings, LoadError> {
    let host = host
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let host = Url::parse(&host)
        .map_err(|err| LoadError::invalid("host", format!("invalid URL `{host}`: {err}")))?;
    if !matches!(host.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "host",
            format!("unsupported scheme `{}`", host.scheme()),
        ));
    }

    let api_key = api_key
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(LoadError::MissingApiKey)?;

    let timeout_secs = request_timeout_seconds.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "request_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ApiSettings {
        host,
        api_key,
        request_timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::WARN,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_poll_settings(polling: RawPollSettings) -> Result<PollSettings, LoadError> {
    let initial_ms = polling
        .initial_delay_ms
        .unwrap_or(DEFAULT_POLL_INITIAL_DELAY_MS);
    if initial_ms == 0 {
        return Err(LoadError::invalid(
            "polling.initial_delay_ms",
            "must be greater than zero",
        ));
    }

    let max_ms = polling.max_delay_ms.unwrap_or(DEFAULT_POLL_MAX_DELAY_MS);
    if max_ms < initial_ms {
        return Err(LoadError::invalid(
            "polling.max_delay_ms",
            "must not be smaller than polling.initial_delay_ms",
        ));
    }

    let multiplier = polling.multiplier.unwrap_or(DEFAULT_POLL_MULTIPLIER);
    if multiplier == 0 {
        return Err(LoadError::invalid(
            "polling.multiplier",
            "must be at least 1",
        ));
    }

    let timeout_secs = polling.timeout_seconds.unwrap_or(DEFAULT_POLL_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "polling.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(PollSettings {
        initial_delay: Duration::from_millis(initial_ms),
        max_delay: Duration::from_millis(max_ms),
        multiplier,
        timeout: Duration::from_secs(timeout_secs),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPollSettings {
    initial_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    multiplier: Option<u32>,
    timeout_seconds: Option<u64>,
}
