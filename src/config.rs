use crate::error::SyncError;
use crate::zones::ActivePolicy;
use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Placeholder substituted with the zone name in `zones.endpoint_template`.
pub const ZONE_PLACEHOLDER: &str = "{zone}";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub appliance: ApplianceConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub zones: ZonesConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub reload: ReloadConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplianceConfig {
    /// Candidate appliances in priority order (`host` or `host:port`).
    pub hosts: Vec<String>,
    pub username: String,
    pub password: SecretString,
    #[serde(default = "default_true")]
    pub use_tls: bool,
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_auth_scheme")]
    pub auth_scheme: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    /// TCP connect to the appliance API port
    Tcp,
    /// Single ICMP echo through the system `ping` binary
    Ping,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_method")]
    pub method: ProbeMethod,
    #[serde(default = "default_probe_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ZonesConfig {
    #[serde(default)]
    pub active_policy: ActivePolicy,
    #[serde(default = "default_endpoint_template")]
    pub endpoint_template: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrapeConfig {
    #[serde(default = "default_scrape_config_path")]
    pub config_path: PathBuf,
    #[serde(default = "default_job_prefix")]
    pub job_prefix: String,
    /// When non-empty, jobs are selected by exact name instead of by prefix.
    #[serde(default)]
    pub job_names: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReloadMethod {
    Http,
    Command,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReloadConfig {
    #[serde(default = "default_reload_method")]
    pub method: ReloadMethod,
    #[serde(default = "default_reload_url")]
    pub url: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default = "default_reload_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MetricsConfig {
    /// Node-exporter textfile collector target, written after every run.
    #[serde(default)]
    pub textfile_path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_api_base() -> String {
    "/axapi/v3".to_string()
}

fn default_auth_scheme() -> String {
    "A10".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_probe_method() -> ProbeMethod {
    ProbeMethod::Tcp
}

fn default_probe_timeout() -> u64 {
    2
}

fn default_endpoint_template() -> String {
    "/ddos/dst/zone/{zone}/stats".to_string()
}

fn default_scrape_config_path() -> PathBuf {
    PathBuf::from("./configuration/prometheus/prometheus.yml")
}

fn default_job_prefix() -> String {
    "a10-tps".to_string()
}

fn default_reload_method() -> ReloadMethod {
    ReloadMethod::Http
}

fn default_reload_url() -> String {
    "http://localhost:9090/-/reload".to_string()
}

fn default_reload_timeout() -> u64 {
    10
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            method: default_probe_method(),
            timeout_seconds: default_probe_timeout(),
        }
    }
}

impl Default for ZonesConfig {
    fn default() -> Self {
        Self {
            active_policy: ActivePolicy::default(),
            endpoint_template: default_endpoint_template(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            config_path: default_scrape_config_path(),
            job_prefix: default_job_prefix(),
            job_names: Vec::new(),
        }
    }
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            method: default_reload_method(),
            url: default_reload_url(),
            command: Vec::new(),
            timeout_seconds: default_reload_timeout(),
        }
    }
}

impl ApplianceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl ReloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("TPS_ZONE_SYNC")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("appliance.hosts")
                    .with_list_parse_key("scrape.job_names")
                    .with_list_parse_key("reload.command"),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.appliance.hosts.iter().all(|h| h.trim().is_empty()) {
            return Err(SyncError::Config(
                "appliance.hosts must name at least one appliance".to_string(),
            ));
        }
        if self.appliance.username.trim().is_empty() {
            return Err(SyncError::Config(
                "appliance.username must not be empty".to_string(),
            ));
        }
        if self.appliance.request_timeout_seconds == 0
            || self.probe.timeout_seconds == 0
            || self.reload.timeout_seconds == 0
        {
            return Err(SyncError::Config("timeouts must be non-zero".to_string()));
        }
        if !self.zones.endpoint_template.contains(ZONE_PLACEHOLDER) {
            return Err(SyncError::Config(format!(
                "zones.endpoint_template must contain {}",
                ZONE_PLACEHOLDER
            )));
        }
        if self.scrape.job_names.is_empty() && self.scrape.job_prefix.is_empty() {
            return Err(SyncError::Config(
                "scrape.job_prefix must not be empty when scrape.job_names is unset".to_string(),
            ));
        }
        if self.reload.method == ReloadMethod::Command && self.reload.command.is_empty() {
            return Err(SyncError::Config(
                "reload.command is required when reload.method = \"command\"".to_string(),
            ));
        }
        Ok(())
    }
}
