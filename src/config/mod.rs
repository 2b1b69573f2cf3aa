//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr, num::NonZeroUsize, path::PathBuf, str::FromStr, time::Duration,
};

use clap::{Parser, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "taccuino";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8788;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_STORE_ROOT: &str = "content";
const DEFAULT_CACHE_CAPACITY: usize = 256;
const DEFAULT_CLIENT_MAX_AGE_SECS: u64 = 300;
const DEFAULT_SHARED_MAX_AGE_SECS: u64 = 30;

/// Command-line arguments for the Taccuino binary.
#[derive(Debug, Parser, Default)]
#[command(name = "taccuino", version, about = "Taccuino content server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "TACCUINO_CONFIG_FILE",
        value_name = "PATH"
    )]
    pub config_file: Option<PathBuf>,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the content store backend (memory|filesystem).
    #[arg(long = "store-backend", value_name = "BACKEND")]
    pub store_backend: Option<String>,

    /// Override the filesystem store root directory.
    #[arg(long = "store-root", value_name = "PATH")]
    pub store_root: Option<PathBuf>,

    /// Override the response cache capacity. Zero disables the cache.
    #[arg(long = "cache-capacity", value_name = "COUNT")]
    pub cache_capacity: Option<usize>,

    /// Override the shared cache lifetime in seconds.
    #[arg(long = "cache-shared-max-age-seconds", value_name = "SECONDS")]
    pub cache_shared_max_age_seconds: Option<u64>,

    /// Override the client cache lifetime in seconds.
    #[arg(long = "cache-client-max-age-seconds", value_name = "SECONDS")]
    pub cache_client_max_age_seconds: Option<u64>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub auth: AuthSettings,
    pub store: StoreSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Bearer secrets for the write surfaces. Either may be unset, which locks
/// the corresponding surface closed.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub publish_secret: Option<String>,
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub root: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Filesystem,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// `None` disables response caching entirely.
    pub capacity: Option<NonZeroUsize>,
    pub client_max_age: Duration,
    pub shared_max_age: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
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
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("TACCUINO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_cli_overrides(cli);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    auth: RawAuthSettings,
    store: RawStoreSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_cli_overrides(&mut self, cli: &CliArgs) {
        if let Some(host) = cli.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = cli.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = cli.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = cli.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = cli.log_json {
            self.logging.json = Some(json);
        }
        if let Some(backend) = cli.store_backend.as_ref() {
            self.store.backend = Some(backend.clone());
        }
        if let Some(root) = cli.store_root.as_ref() {
            self.store.root = Some(root.clone());
        }
        if let Some(capacity) = cli.cache_capacity {
            self.cache.capacity = Some(capacity);
        }
        if let Some(seconds) = cli.cache_shared_max_age_seconds {
            self.cache.shared_max_age_seconds = Some(seconds);
        }
        if let Some(seconds) = cli.cache_client_max_age_seconds {
            self.cache.client_max_age_seconds = Some(seconds);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            auth,
            store,
            cache,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            auth: build_auth_settings(auth),
            store: build_store_settings(store)?,
            cache: build_cache_settings(cache),
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_auth_settings(auth: RawAuthSettings) -> AuthSettings {
    AuthSettings {
        publish_secret: non_empty(auth.publish_secret),
        webhook_secret: non_empty(auth.webhook_secret),
    }
}

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let backend = match store.backend.as_deref() {
        None | Some("memory") => StoreBackend::Memory,
        Some("filesystem") => StoreBackend::Filesystem,
        Some(other) => {
            return Err(LoadError::invalid(
                "store.backend",
                format!("unknown backend `{other}`, expected memory or filesystem"),
            ));
        }
    };

    let root = store
        .root
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_ROOT));
    if root.as_os_str().is_empty() {
        return Err(LoadError::invalid("store.root", "path must not be empty"));
    }

    Ok(StoreSettings { backend, root })
}

fn build_cache_settings(cache: RawCacheSettings) -> CacheSettings {
    let capacity = NonZeroUsize::new(cache.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY));
    let client_max_age = Duration::from_secs(
        cache
            .client_max_age_seconds
            .unwrap_or(DEFAULT_CLIENT_MAX_AGE_SECS),
    );
    let shared_max_age = Duration::from_secs(
        cache
            .shared_max_age_seconds
            .unwrap_or(DEFAULT_SHARED_MAX_AGE_SECS),
    );

    CacheSettings {
        capacity,
        client_max_age,
        shared_max_age,
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    publish_secret: Option<String>,
    webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    backend: Option<String>,
    root: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    capacity: Option<usize>,
    client_max_age_seconds: Option<u64>,
    shared_max_age_seconds: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|secret| {
        let trimmed = secret.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}
