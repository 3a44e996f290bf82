use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::TrainingOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Training runs synchronously on the backend and outlives the normal timeout.
    #[serde(default = "default_training_timeout_secs")]
    pub training_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_top_n")]
    pub top_n: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_true")]
    pub use_synthetic: bool,
    #[serde(default = "default_employee_count")]
    pub employee_count: u32,
    #[serde(default = "default_month_count")]
    pub month_count: u32,
    #[serde(default = "default_filepath")]
    pub filepath: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend_url: Option<String>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/turnover-dashboard/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.backend_url {
            self.backend.base_url = url;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn default_template() -> String {
        let template = r#"[backend]
base_url = "http://localhost:8000"
timeout_secs = 30
connect_timeout_secs = 6
training_timeout_secs = 900

[server]
host = "127.0.0.1"
port = 4300

[analytics]
top_n = 15

[training]
use_synthetic = true
employee_count = 500
month_count = 12
filepath = "data/employees_data.csv"
poll_interval_secs = 2
max_polls = 300

[logging]
level = "info"
"#;
        template.to_string()
    }
}

impl TrainingConfig {
    /// Request defaults; the file path is only sent for non-synthetic runs.
    pub fn options(&self) -> TrainingOptions {
        TrainingOptions {
            use_synthetic: self.use_synthetic,
            employee_count: self.employee_count,
            month_count: self.month_count,
            filepath: (!self.use_synthetic).then(|| self.filepath.clone()),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            training_timeout_secs: default_training_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            use_synthetic: default_true(),
            employee_count: default_employee_count(),
            month_count: default_month_count(),
            filepath: default_filepath(),
            poll_interval_secs: default_poll_interval_secs(),
            max_polls: default_max_polls(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    6
}

fn default_training_timeout_secs() -> u64 {
    900
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4300
}

fn default_top_n() -> u32 {
    crate::backend::DEFAULT_TOP_N
}

fn default_true() -> bool {
    true
}

fn default_employee_count() -> u32 {
    500
}

fn default_month_count() -> u32 {
    12
}

fn default_filepath() -> String {
    "data/employees_data.csv".to_string()
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_max_polls() -> u32 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}
