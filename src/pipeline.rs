//! Zone Reconciliation Pipeline
//!
//! One call to [`Pipeline::run`] is one complete, blocking reconciliation pass:
//!
//! 1. Probe candidates in priority order until one is reachable
//! 2. Open a session on it; on failure move to the next candidate
//! 3. Fetch the zone inventory; on failure log off and move on
//! 4. Derive scrape paths for the active zones
//! 5. Load, reconcile, back up and atomically persist the scrape configuration
//! 6. Ask the collector to reload
//! 7. Log off
//!
//! Appliance-side failures fall through to the next candidate. Failures around
//! the scrape configuration abort the run immediately, leaving the file as it
//! was. Every path ends in a [`RunReport`]; nothing escapes as a panic or an
//! unclassified error.

use crate::appliance::{ApplianceClient, Scoped, SessionManager};
use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::probe::{self, Prober};
use crate::reload::{self, ReloadNotifier};
use crate::scrape_config::{self, JobSelector};
use crate::zones::{self, Derivation, Zone};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// How one candidate appliance fared
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Unreachable,
    /// Reachable, but authentication, fetch, or a later stage failed
    Failed(String),
    Reconciled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplianceAttempt {
    pub host: String,
    pub outcome: AttemptOutcome,
    /// `None` when no session was opened
    pub logged_off: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadStatus {
    /// Nothing was written, or the run failed before writing
    NotAttempted,
    Succeeded,
    Failed(String),
}

/// Everything a run did, for the final summary and run metrics
#[derive(Debug)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    pub attempts: Vec<ApplianceAttempt>,
    /// Appliance whose zone set ended up in the configuration
    pub appliance: Option<String>,
    pub zones_total: usize,
    pub derivation: Derivation,
    pub jobs_updated: Vec<String>,
    /// Whether reconciling produced a different document
    pub changed: bool,
    pub persisted: bool,
    pub backup_path: Option<PathBuf>,
    pub reload: ReloadStatus,
    pub error: Option<SyncError>,
}

impl RunReport {
    fn new(started_at: DateTime<Utc>, dry_run: bool) -> Self {
        Self {
            started_at,
            dry_run,
            attempts: Vec::new(),
            appliance: None,
            zones_total: 0,
            derivation: Derivation::default(),
            jobs_updated: Vec::new(),
            changed: false,
            persisted: false,
            backup_path: None,
            reload: ReloadStatus::NotAttempted,
            error: None,
        }
    }

    /// The on-disk configuration reflects an appliance's zone set.
    ///
    /// A failed reload does not count against success.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.appliance.is_some()
    }

    pub fn endpoints(&self) -> &[String] {
        &self.derivation.endpoints
    }
}

/// What the work inside a session produced
struct Applied {
    zones_total: usize,
    derivation: Derivation,
    jobs_updated: Vec<String>,
    changed: bool,
    persisted: bool,
    backup_path: Option<PathBuf>,
    reload: ReloadStatus,
}

pub struct Pipeline {
    config: Config,
    prober: Box<dyn Prober>,
    notifier: Box<dyn ReloadNotifier>,
    dry_run: bool,
}

impl Pipeline {
    pub fn new(config: Config, prober: Box<dyn Prober>, notifier: Box<dyn ReloadNotifier>) -> Self {
        Self {
            config,
            prober,
            notifier,
            dry_run: false,
        }
    }

    /// Pipeline with the prober and notifier selected in `config`
    pub fn from_config(config: Config) -> Result<Self> {
        let prober = probe::from_config(&config.probe, &config.appliance);
        let notifier = reload::from_config(&config.reload)?;
        Ok(Self::new(config, prober, notifier))
    }

    /// Stop after reconciling in memory: no backup, write, or reload
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self) -> RunReport {
        let mut report = RunReport::new(Utc::now(), self.dry_run);
        let hosts = &self.config.appliance.hosts;
        let mut next = 0;

        while next < hosts.len() {
            let remaining = &hosts[next..];
            let Some(offset) = probe::first_reachable(self.prober.as_ref(), remaining).await
            else {
                for host in remaining {
                    report.attempts.push(ApplianceAttempt {
                        host: host.clone(),
                        outcome: AttemptOutcome::Unreachable,
                        logged_off: None,
                    });
                }
                break;
            };

            for host in &remaining[..offset] {
                report.attempts.push(ApplianceAttempt {
                    host: host.clone(),
                    outcome: AttemptOutcome::Unreachable,
                    logged_off: None,
                });
            }

            let host = &remaining[offset];
            next += offset + 1;

            match self.attempt(host, report.started_at).await {
                Ok(Scoped {
                    result: Ok(applied),
                    logged_off,
                }) => {
                    report.attempts.push(ApplianceAttempt {
                        host: host.clone(),
                        outcome: AttemptOutcome::Reconciled,
                        logged_off: Some(logged_off),
                    });
                    report.appliance = Some(host.clone());
                    report.zones_total = applied.zones_total;
                    report.derivation = applied.derivation;
                    report.jobs_updated = applied.jobs_updated;
                    report.changed = applied.changed;
                    report.persisted = applied.persisted;
                    report.backup_path = applied.backup_path;
                    report.reload = applied.reload;
                    return report;
                }
                Ok(Scoped {
                    result: Err(e),
                    logged_off,
                }) => {
                    report.attempts.push(ApplianceAttempt {
                        host: host.clone(),
                        outcome: AttemptOutcome::Failed(e.to_string()),
                        logged_off: Some(logged_off),
                    });
                    if !e.is_failover() {
                        error!("Aborting run: {}", e);
                        report.error = Some(e);
                        return report;
                    }
                    warn!("Appliance {} failed, trying next candidate: {}", host, e);
                }
                Err(e) => {
                    report.attempts.push(ApplianceAttempt {
                        host: host.clone(),
                        outcome: AttemptOutcome::Failed(e.to_string()),
                        logged_off: None,
                    });
                    if !e.is_failover() {
                        error!("Aborting run: {}", e);
                        report.error = Some(e);
                        return report;
                    }
                    warn!("Appliance {} failed, trying next candidate: {}", host, e);
                }
            }
        }

        let summary = report
            .attempts
            .iter()
            .map(|a| match &a.outcome {
                AttemptOutcome::Unreachable => format!("{}: unreachable", a.host),
                AttemptOutcome::Failed(reason) => format!("{}: {}", a.host, reason),
                AttemptOutcome::Reconciled => format!("{}: reconciled", a.host),
            })
            .collect::<Vec<_>>()
            .join("; ");
        report.error = Some(SyncError::NoApplianceReconciled(if summary.is_empty() {
            "no candidates configured".to_string()
        } else {
            summary
        }));
        report
    }

    /// Session-scoped work against one reachable appliance.
    ///
    /// `Err` means the session could not be opened.
    async fn attempt(&self, host: &str, started_at: DateTime<Utc>) -> Result<Scoped<Applied>> {
        let appliance = &self.config.appliance;
        let client = ApplianceClient::new(host, appliance)?;
        let sessions = SessionManager::new(&client, &appliance.username, &appliance.password);
        let api = sessions.client();

        sessions
            .with_session(|session| async move {
                let zones = api.fetch_zones(&session).await?;
                self.apply(zones, started_at).await
            })
            .await
    }

    async fn apply(&self, zones: Vec<Zone>, started_at: DateTime<Utc>) -> Result<Applied> {
        let derivation = zones::derive(
            &zones,
            self.config.zones.active_policy,
            &self.config.zones.endpoint_template,
        );

        info!(
            "{} of {} zone(s) are active",
            derivation.endpoints.len(),
            zones.len()
        );
        if !derivation.omitted.is_empty() {
            let omitted = derivation
                .omitted
                .iter()
                .map(|z| format!("{} ({})", z.name, z.mode))
                .collect::<Vec<_>>()
                .join(", ");
            warn!("Omitting zones not under active protection: {}", omitted);
        }

        let path = &self.config.scrape.config_path;
        let selector = JobSelector::from_config(&self.config.scrape);

        let current = scrape_config::load(path)?;
        let reconciled = scrape_config::reconcile(&current, &derivation.endpoints, &selector)?;
        let changed = reconciled.document != current;

        let mut applied = Applied {
            zones_total: zones.len(),
            derivation,
            jobs_updated: reconciled.jobs.clone(),
            changed,
            persisted: false,
            backup_path: None,
            reload: ReloadStatus::NotAttempted,
        };

        if self.dry_run {
            info!(
                "Dry run: would set endpoints {:?} on {} job(s)",
                applied.derivation.endpoints,
                applied.jobs_updated.len()
            );
            return Ok(applied);
        }

        if !changed {
            info!("Scrape configuration {} already up to date", path.display());
            return Ok(applied);
        }

        applied.backup_path = Some(scrape_config::backup(path, started_at)?);
        scrape_config::persist(&reconciled.document, path)?;
        applied.persisted = true;

        applied.reload = match self.notifier.notify().await {
            Ok(()) => ReloadStatus::Succeeded,
            Err(e) => {
                error!(
                    "Collector reload via {} failed; on-disk configuration is newer than the running one: {}",
                    self.notifier.target(),
                    e
                );
                ReloadStatus::Failed(e.to_string())
            }
        };

        Ok(applied)
    }
}
