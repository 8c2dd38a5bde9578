//! A10 Thunder TPS Zone Sync
//!
//! Keeps the Prometheus scrape targets for A10 Thunder TPS zone statistics in
//! line with the zones that are actually under protection.
//!
//! # Overview
//!
//! A run probes the configured appliances in priority order, logs in to the
//! first healthy one, reads the DDoS destination zone inventory, and rewrites
//! `params.api_endpoint` on the appliance scrape jobs so that only active
//! zones are scraped. The collector is then asked to reload. Scheduling is left
//! to cron or a systemd timer; every run is self-contained.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   probe / aXAPI v3   ┌──────────────┐   backup + atomic   ┌────────────────┐
//! │ TPS primary │ ◄──────────────────► │              │ ──────────────────► │ prometheus.yml │
//! ├─────────────┤                      │  Zone Sync   │                     └────────────────┘
//! │ TPS standby │ ◄──────────────────► │              │   POST /-/reload    ┌────────────────┐
//! └─────────────┘   (failover only)    │              │ ──────────────────► │   Prometheus   │
//!                                      └──────────────┘                     └────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`probe`] - Appliance reachability
//! - [`appliance`] - aXAPI client and session lifecycle
//! - [`zones`] - Zone classification and endpoint derivation
//! - [`scrape_config`] - Scrape configuration load, reconcile, backup, persist
//! - [`reload`] - Collector reload notification
//! - [`pipeline`] - The reconciliation pass tying the above together
//! - [`metrics`] - Run outcome metrics for the textfile collector
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use tps_zone_sync::{config::Config, pipeline::Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     config.validate()?;
//!     let report = Pipeline::from_config(config)?.run().await;
//!     assert!(report.is_success());
//!     Ok(())
//! }
//! ```

pub mod appliance;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod probe;
pub mod reload;
pub mod scrape_config;
pub mod zones;
