//! Run Metrics
//!
//! Outcome of the last reconciliation pass in Prometheus text format, meant for
//! the node-exporter textfile collector (`metrics.textfile_path`). The file is
//! rewritten atomically after every run.
//!
//! # Metrics
//!
//! - `tps_zone_sync_last_run_timestamp_seconds` - Start time of the last run
//! - `tps_zone_sync_success` - 1 if the scrape configuration reflects an appliance
//! - `tps_zone_sync_zones` - Zones seen in the inventory
//!   - Labels: state (active, omitted)
//! - `tps_zone_sync_endpoints` - Scrape endpoints derived
//! - `tps_zone_sync_jobs_updated` - Scrape jobs whose endpoint list was set
//! - `tps_zone_sync_config_written` - 1 if the configuration file was rewritten
//! - `tps_zone_sync_appliance_up` - Probe result per candidate appliance
//!   - Labels: appliance
//! - `tps_zone_sync_reload_success` - 0 when a reload was attempted and failed

use crate::pipeline::{AttemptOutcome, ReloadStatus, RunReport};
use prometheus::{Encoder, Gauge, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

const NAMESPACE: &str = "tps_zone_sync";

#[derive(Clone)]
pub struct RunMetrics {
    registry: Arc<Registry>,

    pub last_run_timestamp_seconds: Arc<Gauge>,
    pub success: Arc<IntGauge>,
    pub zones: Arc<IntGaugeVec>,
    pub endpoints: Arc<IntGauge>,
    pub jobs_updated: Arc<IntGauge>,
    pub config_written: Arc<IntGauge>,
    pub appliance_up: Arc<IntGaugeVec>,
    pub reload_success: Arc<IntGauge>,
}

impl RunMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let last_run_timestamp_seconds = Gauge::with_opts(
            Opts::new(
                "last_run_timestamp_seconds",
                "Unix time the last reconciliation run started",
            )
            .namespace(NAMESPACE),
        )?;

        let success = IntGauge::with_opts(
            Opts::new(
                "success",
                "Whether the last run left the scrape configuration matching an appliance (1=yes)",
            )
            .namespace(NAMESPACE),
        )?;

        let zones = IntGaugeVec::new(
            Opts::new("zones", "Zones in the appliance inventory by scrape state")
                .namespace(NAMESPACE),
            &["state"],
        )?;

        let endpoints = IntGauge::with_opts(
            Opts::new("endpoints", "Scrape endpoints derived from active zones")
                .namespace(NAMESPACE),
        )?;

        let jobs_updated = IntGauge::with_opts(
            Opts::new("jobs_updated", "Scrape jobs whose endpoint list was set")
                .namespace(NAMESPACE),
        )?;

        let config_written = IntGauge::with_opts(
            Opts::new(
                "config_written",
                "Whether the last run rewrote the scrape configuration (1=yes)",
            )
            .namespace(NAMESPACE),
        )?;

        let appliance_up = IntGaugeVec::new(
            Opts::new(
                "appliance_up",
                "Probe result for each candidate appliance tried (1=reachable)",
            )
            .namespace(NAMESPACE),
            &["appliance"],
        )?;

        let reload_success = IntGauge::with_opts(
            Opts::new(
                "reload_success",
                "0 if the collector reload failed after writing the configuration",
            )
            .namespace(NAMESPACE),
        )?;

        registry.register(Box::new(last_run_timestamp_seconds.clone()))?;
        registry.register(Box::new(success.clone()))?;
        registry.register(Box::new(zones.clone()))?;
        registry.register(Box::new(endpoints.clone()))?;
        registry.register(Box::new(jobs_updated.clone()))?;
        registry.register(Box::new(config_written.clone()))?;
        registry.register(Box::new(appliance_up.clone()))?;
        registry.register(Box::new(reload_success.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            last_run_timestamp_seconds: Arc::new(last_run_timestamp_seconds),
            success: Arc::new(success),
            zones: Arc::new(zones),
            endpoints: Arc::new(endpoints),
            jobs_updated: Arc::new(jobs_updated),
            config_written: Arc::new(config_written),
            appliance_up: Arc::new(appliance_up),
            reload_success: Arc::new(reload_success),
        })
    }

    /// Mirror a finished run into the gauges
    pub fn record(&self, report: &RunReport) {
        self.last_run_timestamp_seconds
            .set(report.started_at.timestamp_millis() as f64 / 1000.0);
        self.success.set(i64::from(report.is_success()));

        let active = report.derivation.endpoints.len();
        let omitted = report.derivation.omitted.len();
        self.zones.with_label_values(&["active"]).set(active as i64);
        self.zones.with_label_values(&["omitted"]).set(omitted as i64);
        self.endpoints.set(active as i64);
        self.jobs_updated.set(report.jobs_updated.len() as i64);
        self.config_written.set(i64::from(report.persisted));

        self.appliance_up.reset();
        for attempt in &report.attempts {
            let up = attempt.outcome != AttemptOutcome::Unreachable;
            self.appliance_up
                .with_label_values(&[attempt.host.as_str()])
                .set(i64::from(up));
        }

        let reload_ok = !matches!(report.reload, ReloadStatus::Failed(_));
        self.reload_success.set(i64::from(reload_ok));
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Atomically replace `path` with the rendered metrics
    pub fn write_textfile(&self, path: &Path) -> anyhow::Result<()> {
        let rendered = self.render()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(rendered.as_bytes())?;
        tmp.flush()?;

        // node-exporter usually runs as a different user
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o644))?;
        }

        tmp.persist(path)?;
        Ok(())
    }
}
