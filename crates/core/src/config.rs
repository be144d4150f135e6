use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "customer-api.toml";
pub const NESTED_CONFIG_FILE: &str = "config/customer-api.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Values set by the embedding program. They win over every other source.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

/// Where the effective value of one setting came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueSource {
    Default,
    File(PathBuf),
    Env(&'static str),
    Override,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::File(path) => write!(f, "file ({})", path.display()),
            Self::Env(key) => write!(f, "env ({key})"),
            Self::Override => f.write_str("override"),
        }
    }
}

/// Per-setting provenance recorded while loading. Unrecorded keys are defaults.
#[derive(Clone, Debug, Default)]
pub struct ConfigSources(BTreeMap<&'static str, ValueSource>);

static DEFAULT_SOURCE: ValueSource = ValueSource::Default;

impl ConfigSources {
    pub fn get(&self, key_path: &str) -> &ValueSource {
        self.0.get(key_path).unwrap_or(&DEFAULT_SOURCE)
    }

    fn record(&mut self, key_path: &'static str, source: ValueSource) {
        self.0.insert(key_path, source);
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://customers.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

/// One configurable value: its dotted key, the env vars that set it (first
/// non-empty one wins), and how to write and read it on an `AppConfig`.
struct Setting {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    set_from_env: fn(&mut AppConfig, &'static str, String) -> Result<(), ConfigError>,
    render: fn(&AppConfig) -> String,
}

const SETTINGS: &[Setting] = &[
    Setting {
        key_path: "database.url",
        env_keys: &["CUSTOMER_API_DATABASE_URL"],
        set_from_env: |config, _, value| {
            config.database.url = value;
            Ok(())
        },
        render: |config| config.database.url.clone(),
    },
    Setting {
        key_path: "database.max_connections",
        env_keys: &["CUSTOMER_API_DATABASE_MAX_CONNECTIONS"],
        set_from_env: |config, key, value| {
            config.database.max_connections = parse_env(key, &value)?;
            Ok(())
        },
        render: |config| config.database.max_connections.to_string(),
    },
    Setting {
        key_path: "database.timeout_secs",
        env_keys: &["CUSTOMER_API_DATABASE_TIMEOUT_SECS"],
        set_from_env: |config, key, value| {
            config.database.timeout_secs = parse_env(key, &value)?;
            Ok(())
        },
        render: |config| config.database.timeout_secs.to_string(),
    },
    Setting {
        key_path: "server.bind_address",
        env_keys: &["CUSTOMER_API_SERVER_BIND_ADDRESS"],
        set_from_env: |config, _, value| {
            config.server.bind_address = value;
            Ok(())
        },
        render: |config| config.server.bind_address.clone(),
    },
    Setting {
        key_path: "server.port",
        env_keys: &["CUSTOMER_API_SERVER_PORT"],
        set_from_env: |config, key, value| {
            config.server.port = parse_env(key, &value)?;
            Ok(())
        },
        render: |config| config.server.port.to_string(),
    },
    Setting {
        key_path: "server.graceful_shutdown_secs",
        env_keys: &["CUSTOMER_API_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        set_from_env: |config, key, value| {
            config.server.graceful_shutdown_secs = parse_env(key, &value)?;
            Ok(())
        },
        render: |config| config.server.graceful_shutdown_secs.to_string(),
    },
    Setting {
        key_path: "logging.level",
        env_keys: &["CUSTOMER_API_LOGGING_LEVEL", "CUSTOMER_API_LOG_LEVEL"],
        set_from_env: |config, _, value| {
            config.logging.level = value;
            Ok(())
        },
        render: |config| config.logging.level.clone(),
    },
    Setting {
        key_path: "logging.format",
        env_keys: &["CUSTOMER_API_LOGGING_FORMAT", "CUSTOMER_API_LOG_FORMAT"],
        set_from_env: |config, _, value| {
            config.logging.format = value.parse()?;
            Ok(())
        },
        render: |config| config.logging.format.as_str().to_string(),
    },
];

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        Self::load_with_sources(options).map(|(config, _)| config)
    }

    /// Loads like [`AppConfig::load`] and also reports which layer supplied
    /// each setting. Precedence is default < file < env < override.
    pub fn load_with_sources(options: LoadOptions) -> Result<(Self, ConfigSources), ConfigError> {
        let mut config = Self::default();
        let mut sources = ConfigSources::default();

        match resolve_config_path(options.config_path.as_deref()) {
            Some(path) => config.apply_file(&path, &mut sources)?,
            None if options.require_file => {
                let expected =
                    options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => {}
        }

        config.apply_env(&mut sources)?;
        config.apply_overrides(options.overrides, &mut sources);
        config.validate()?;

        Ok((config, sources))
    }

    /// `host:port` the HTTP listener binds to.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }

    /// Every setting as `(key_path, rendered value)`, in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, String)> + '_ {
        SETTINGS.iter().map(move |setting| (setting.key_path, (setting.render)(self)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    fn apply_file(&mut self, path: &Path, sources: &mut ConfigSources) -> Result<(), ConfigError> {
        let document = read_document(path)?;
        let patch: ConfigPatch = document
            .clone()
            .try_into()
            .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })?;

        patch.apply_to(self);
        for setting in SETTINGS {
            if contains_path(&document, setting.key_path) {
                sources.record(setting.key_path, ValueSource::File(path.to_path_buf()));
            }
        }
        Ok(())
    }

    fn apply_env(&mut self, sources: &mut ConfigSources) -> Result<(), ConfigError> {
        for setting in SETTINGS {
            let found = setting
                .env_keys
                .iter()
                .find_map(|key| read_env(key).map(|value| (*key, value)));
            if let Some((key, value)) = found {
                (setting.set_from_env)(self, key, value)?;
                sources.record(setting.key_path, ValueSource::Env(key));
            }
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides, sources: &mut ConfigSources) {
        if let Some(url) = overrides.database_url {
            self.database.url = url;
            sources.record("database.url", ValueSource::Override);
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
            sources.record("server.bind_address", ValueSource::Override);
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
            sources.record("server.port", ValueSource::Override);
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
            sources.record("logging.level", ValueSource::Override);
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
            sources.record("logging.format", ValueSource::Override);
        }
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_document(path: &Path) -> Result<toml::Value, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &after[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &after[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

fn contains_path(document: &toml::Value, key_path: &str) -> bool {
    key_path
        .split('.')
        .try_fold(document, |current, key| current.get(key))
        .is_some()
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(invalid(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)",
        ));
    }
    if database.max_connections == 0 {
        return Err(invalid("database.max_connections must be greater than zero"));
    }
    if !(1..=300).contains(&database.timeout_secs) {
        return Err(invalid("database.timeout_secs must be in range 1..=300"));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(invalid("server.bind_address must not be empty"));
    }
    if server.port == 0 {
        return Err(invalid("server.port must be greater than zero"));
    }
    if server.graceful_shutdown_secs == 0 {
        return Err(invalid("server.graceful_shutdown_secs must be greater than zero"));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    match logging.level.trim().to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(invalid("logging.level must be one of trace|debug|info|warn|error")),
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Validation(message.to_string())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Typed view of a config file; absent keys leave the current value alone.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    #[serde(default)]
    database: DatabasePatch,
    #[serde(default)]
    server: ServerPatch,
    #[serde(default)]
    logging: LoggingPatch,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl ConfigPatch {
    fn apply_to(self, config: &mut AppConfig) {
        let ConfigPatch { database, server, logging } = self;

        replace(&mut config.database.url, database.url);
        replace(&mut config.database.max_connections, database.max_connections);
        replace(&mut config.database.timeout_secs, database.timeout_secs);
        replace(&mut config.server.bind_address, server.bind_address);
        replace(&mut config.server.port, server.port);
        replace(&mut config.server.graceful_shutdown_secs, server.graceful_shutdown_secs);
        replace(&mut config.logging.level, logging.level);
        replace(&mut config.logging.format, logging.format);
    }
}

fn replace<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}
