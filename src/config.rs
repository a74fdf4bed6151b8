use serde::Deserialize;
use url::Url;

use crate::history::DEFAULT_WINDOW;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Dashboard origin, e.g. "http://127.0.0.1:8000". The push URL is derived from it.
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Samples kept per series (W).
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Reconnect attempts before giving up for the session.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First reconnect delay; doubles per attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Remote-agent directory refresh period.
    #[serde(default = "default_directory_interval_ms")]
    pub directory_interval_ms: u64,
    /// Periodic /api/system + /api/docker re-pull; 0 disables it (startup pull only).
    #[serde(default)]
    pub snapshot_interval_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_directory_interval_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            directory_interval_ms: default_directory_interval_ms(),
            snapshot_interval_ms: 0,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// How often the binary logs the synchronized view at INFO level.
    #[serde(default = "default_status_log_interval_secs")]
    pub status_log_interval_secs: u64,
}

fn default_status_log_interval_secs() -> u64 {
    5
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            status_log_interval_secs: default_status_log_interval_secs(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Config pointing at `base_url` with every other setting at its default.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            server: ServerConfig {
                base_url: base_url.into(),
            },
            history: HistoryConfig::default(),
            connection: ConnectionConfig::default(),
            polling: PollingConfig::default(),
            display: DisplayConfig::default(),
        }
    }

    /// Parsed `server.base_url`.
    pub fn base_url(&self) -> anyhow::Result<Url> {
        Ok(Url::parse(&self.server.base_url)?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let base = Url::parse(&self.server.base_url).map_err(|e| {
            anyhow::anyhow!(
                "server.base_url must be an absolute URL, got {:?}: {}",
                self.server.base_url,
                e
            )
        })?;
        anyhow::ensure!(
            matches!(base.scheme(), "http" | "https"),
            "server.base_url must use http or https, got {}",
            base.scheme()
        );
        anyhow::ensure!(
            base.host_str().is_some(),
            "server.base_url must include a host"
        );
        anyhow::ensure!(
            self.history.window_size > 0,
            "history.window_size must be > 0, got {}",
            self.history.window_size
        );
        anyhow::ensure!(
            self.connection.base_delay_ms > 0,
            "connection.base_delay_ms must be > 0, got {}",
            self.connection.base_delay_ms
        );
        anyhow::ensure!(
            self.connection.max_attempts <= 30,
            "connection.max_attempts must be <= 30, got {}",
            self.connection.max_attempts
        );
        anyhow::ensure!(
            self.connection.connect_timeout_ms > 0,
            "connection.connect_timeout_ms must be > 0, got {}",
            self.connection.connect_timeout_ms
        );
        anyhow::ensure!(
            self.polling.directory_interval_ms > 0,
            "polling.directory_interval_ms must be > 0, got {}",
            self.polling.directory_interval_ms
        );
        anyhow::ensure!(
            self.polling.request_timeout_ms > 0,
            "polling.request_timeout_ms must be > 0, got {}",
            self.polling.request_timeout_ms
        );
        anyhow::ensure!(
            self.display.status_log_interval_secs > 0,
            "display.status_log_interval_secs must be > 0, got {}",
            self.display.status_log_interval_secs
        );
        Ok(())
    }
}
