use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "tramite.toml";
pub const ENV_PREFIX: &str = "TRAMITE";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory holding the durable session files (token + profile).
    pub dir: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollingConfig {
    pub notifications_secs: u64,
    pub request_detail_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub storage_dir: Option<PathBuf>,
    pub notifications_secs: Option<u64>,
    pub request_detail_secs: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    api: RawApi,
    #[serde(default)]
    storage: RawStorage,
    #[serde(default)]
    polling: RawPolling,
    #[serde(default)]
    logging: RawLogging,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawApi {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawStorage {
    dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawPolling {
    notifications_secs: Option<u64>,
    request_detail_secs: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawLogging {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    /// Resolution order, later wins: built-in defaults, config file,
    /// `TRAMITE_*` environment variables, explicit overrides.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let path = options
            .config_path
            .or_else(|| env::var_os(format!("{ENV_PREFIX}_CONFIG")).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let raw = match read_raw(&path) {
            Ok(raw) => raw,
            Err(ConfigError::MissingConfigFile(_)) if !options.require_file => {
                RawConfig::default()
            }
            Err(error) => return Err(error),
        };

        let env_overrides = overrides_from_env()?;
        let config = Self::resolve(raw, env_overrides, options.overrides);
        config.validate()?;
        Ok(config)
    }

    fn resolve(raw: RawConfig, env: ConfigOverrides, explicit: ConfigOverrides) -> Self {
        let pick = |explicit: Option<String>, env: Option<String>, file: Option<String>, default: &str| {
            explicit.or(env).or(file).unwrap_or_else(|| default.to_owned())
        };
        let pick_u64 = |explicit: Option<u64>, env: Option<u64>, file: Option<u64>, default: u64| {
            explicit.or(env).or(file).unwrap_or(default)
        };

        Self {
            api: ApiConfig {
                base_url: pick(
                    explicit.base_url,
                    env.base_url,
                    raw.api.base_url,
                    "http://localhost:4000/api",
                ),
                timeout_secs: pick_u64(explicit.timeout_secs, env.timeout_secs, raw.api.timeout_secs, 15),
            },
            storage: StorageConfig {
                dir: explicit
                    .storage_dir
                    .or(env.storage_dir)
                    .or(raw.storage.dir)
                    .unwrap_or_else(default_storage_dir),
            },
            polling: PollingConfig {
                notifications_secs: pick_u64(
                    explicit.notifications_secs,
                    env.notifications_secs,
                    raw.polling.notifications_secs,
                    30,
                ),
                request_detail_secs: pick_u64(
                    explicit.request_detail_secs,
                    env.request_detail_secs,
                    raw.polling.request_detail_secs,
                    10,
                ),
            },
            logging: LoggingConfig {
                level: pick(explicit.log_level, env.log_level, raw.logging.level, "info"),
                format: explicit
                    .log_format
                    .or(env.log_format)
                    .or(raw.logging.format)
                    .unwrap_or(LogFormat::Compact),
            },
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "api.base_url must be an http(s) URL, got `{}`",
                self.api.base_url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Validation("api.timeout_secs must be positive".to_owned()));
        }
        if self.polling.notifications_secs == 0 || self.polling.request_detail_secs == 0 {
            return Err(ConfigError::Validation(
                "polling periods must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}

fn read_raw(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::MissingConfigFile(path.to_path_buf()));
        }
        Err(source) => return Err(ConfigError::ReadFile { path: path.to_path_buf(), source }),
    };

    toml::from_str(&contents)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn overrides_from_env() -> Result<ConfigOverrides, ConfigError> {
    let mut overrides = ConfigOverrides {
        base_url: env::var(format!("{ENV_PREFIX}_API_URL")).ok(),
        log_level: env::var(format!("{ENV_PREFIX}_LOG_LEVEL")).ok(),
        storage_dir: env::var_os(format!("{ENV_PREFIX}_STORAGE_DIR")).map(PathBuf::from),
        ..ConfigOverrides::default()
    };

    overrides.timeout_secs = parse_u64_env(&format!("{ENV_PREFIX}_API_TIMEOUT_SECS"))?;
    overrides.notifications_secs =
        parse_u64_env(&format!("{ENV_PREFIX}_NOTIFICATIONS_POLL_SECS"))?;
    overrides.request_detail_secs = parse_u64_env(&format!("{ENV_PREFIX}_DETAIL_POLL_SECS"))?;

    if let Ok(value) = env::var(format!("{ENV_PREFIX}_LOG_FORMAT")) {
        overrides.log_format = Some(match value.to_ascii_lowercase().as_str() {
            "compact" => LogFormat::Compact,
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            _ => {
                return Err(ConfigError::InvalidEnvOverride {
                    key: format!("{ENV_PREFIX}_LOG_FORMAT"),
                    value,
                })
            }
        });
    }

    Ok(overrides)
}

fn parse_u64_env(key: &str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_owned(), value }),
        Err(_) => Ok(None),
    }
}

fn default_storage_dir() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tramite")
}
