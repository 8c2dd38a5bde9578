//! Scrape Configuration Reconciliation
//!
//! Loads the collector's YAML configuration, replaces `params.api_endpoint` on
//! the appliance jobs, and writes the result back without ever leaving a
//! truncated file behind.
//!
//! # Guarantees
//!
//! - Only jobs picked by the [`JobSelector`] are modified; every other key,
//!   job, and key order in the document is carried over as loaded.
//! - [`backup`] copies the current file to a timestamped sibling and never
//!   overwrites an earlier backup.
//! - [`persist`] writes to a temporary file in the target directory and
//!   renames it over the original, so an interrupted run leaves either the old
//!   or the new document on disk.
//! - Output never contains YAML anchors or aliases; repeated structures are
//!   written out in full.

use crate::config::ScrapeConfig;
use crate::error::{Result, SyncError};
use chrono::{DateTime, Utc};
use serde_yaml::{Mapping, Value};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SCRAPE_CONFIGS_KEY: &str = "scrape_configs";
const JOB_NAME_KEY: &str = "job_name";
const PARAMS_KEY: &str = "params";
const ENDPOINT_PARAM_KEY: &str = "api_endpoint";

/// Upper bound on `-N` suffixes tried when a backup name is already taken
const MAX_BACKUP_SUFFIX: u32 = 1000;

/// Parsed collector configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeDocument(Value);

impl ScrapeDocument {
    /// Parse YAML text; the top level must be a mapping.
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let value: Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
        match &value {
            Value::Mapping(_) => Ok(Self(value)),
            other => Err(format!(
                "top level must be a mapping, found {}",
                value_kind(other)
            )),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.0).map_err(|e| SyncError::ConfigWrite(e.to_string()))
    }

    /// `job_name` of every job, in document order
    pub fn job_names(&self) -> Vec<String> {
        self.0
            .get(SCRAPE_CONFIGS_KEY)
            .and_then(Value::as_sequence)
            .map(|jobs| {
                jobs.iter()
                    .filter_map(|job| job.get(JOB_NAME_KEY).and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Current `params.api_endpoint` of the named job
    pub fn endpoints_of(&self, job_name: &str) -> Option<Vec<String>> {
        let jobs = self.0.get(SCRAPE_CONFIGS_KEY)?.as_sequence()?;
        let job = jobs
            .iter()
            .find(|job| job.get(JOB_NAME_KEY).and_then(Value::as_str) == Some(job_name))?;
        let endpoints = job.get(PARAMS_KEY)?.get(ENDPOINT_PARAM_KEY)?.as_sequence()?;
        Some(
            endpoints
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        )
    }
}

impl From<Value> for ScrapeDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Which scrape jobs belong to the appliance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSelector {
    Prefix(String),
    Exact(Vec<String>),
}

impl JobSelector {
    pub fn from_config(config: &ScrapeConfig) -> Self {
        if config.job_names.is_empty() {
            JobSelector::Prefix(config.job_prefix.clone())
        } else {
            JobSelector::Exact(config.job_names.clone())
        }
    }

    pub fn matches(&self, job_name: &str) -> bool {
        match self {
            JobSelector::Prefix(prefix) => job_name.starts_with(prefix.as_str()),
            JobSelector::Exact(names) => names.iter().any(|n| n == job_name),
        }
    }
}

/// Result of [`reconcile`]
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub document: ScrapeDocument,
    /// Names of the jobs whose endpoint list was replaced
    pub jobs: Vec<String>,
}

impl Reconciled {
    pub fn jobs_updated(&self) -> usize {
        self.jobs.len()
    }
}

/// Read and parse the configuration at `path`
pub fn load(path: &Path) -> Result<ScrapeDocument> {
    let text = fs::read_to_string(path)
        .map_err(|e| SyncError::ConfigRead(format!("{}: {}", path.display(), e)))?;

    ScrapeDocument::parse(&text)
        .map_err(|e| SyncError::ConfigParse(format!("{}: {}", path.display(), e)))
}

/// Replace the endpoint list of every selected job.
///
/// Returns a new document; `document` itself is not modified. Zero matching
/// jobs is not an error but is logged as a likely misconfiguration.
pub fn reconcile(
    document: &ScrapeDocument,
    endpoints: &[String],
    selector: &JobSelector,
) -> Result<Reconciled> {
    let mut value = document.0.clone();
    let mut jobs = Vec::new();

    match value.get_mut(SCRAPE_CONFIGS_KEY) {
        Some(Value::Sequence(entries)) => {
            for job in entries.iter_mut() {
                let Some(name) = job.get(JOB_NAME_KEY).and_then(Value::as_str) else {
                    continue;
                };
                if !selector.matches(name) {
                    continue;
                }
                let name = name.to_string();
                set_job_endpoints(job, &name, endpoints)?;
                jobs.push(name);
            }
        }
        Some(Value::Null) | None => {}
        Some(other) => {
            return Err(SyncError::ConfigParse(format!(
                "{} must be a sequence, found {}",
                SCRAPE_CONFIGS_KEY,
                value_kind(other)
            )))
        }
    }

    if jobs.is_empty() {
        warn!(
            "No scrape job matched {:?}; configuration left unchanged",
            selector
        );
    } else {
        info!(
            "Set {} endpoint(s) on {} job(s): {}",
            endpoints.len(),
            jobs.len(),
            jobs.join(", ")
        );
    }

    Ok(Reconciled {
        document: ScrapeDocument(value),
        jobs,
    })
}

fn set_job_endpoints(job: &mut Value, name: &str, endpoints: &[String]) -> Result<()> {
    let Value::Mapping(job) = job else {
        return Err(SyncError::ConfigParse(format!(
            "job {} is not a mapping",
            name
        )));
    };

    let endpoint_list = Value::Sequence(endpoints.iter().cloned().map(Value::String).collect());

    if matches!(job.get(PARAMS_KEY), None | Some(Value::Null)) {
        job.insert(
            Value::String(PARAMS_KEY.to_string()),
            Value::Mapping(Mapping::new()),
        );
    }

    match job.get_mut(PARAMS_KEY) {
        Some(Value::Mapping(params)) => {
            params.insert(Value::String(ENDPOINT_PARAM_KEY.to_string()), endpoint_list);
            Ok(())
        }
        other => Err(SyncError::ConfigParse(format!(
            "job {}: {} must be a mapping, found {}",
            name,
            PARAMS_KEY,
            other.map(|v| value_kind(v)).unwrap_or("nothing")
        ))),
    }
}

fn backup_candidate(path: &Path, stamp: &str, attempt: u32) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scrape-config".to_string());
    let name = if attempt == 0 {
        format!("{}.{}.bak", file_name, stamp)
    } else {
        format!("{}.{}-{}.bak", file_name, stamp, attempt)
    };
    path.with_file_name(name)
}

/// Copy `path` to `<file>.<YYYYMMDDTHHMMSSZ>.bak` beside it.
///
/// Never overwrites an existing backup. Any failure here must stop the run
/// before the original is touched.
pub fn backup(path: &Path, at: DateTime<Utc>) -> Result<PathBuf> {
    let mut source = File::open(path)
        .map_err(|e| SyncError::ConfigWrite(format!("backup of {}: {}", path.display(), e)))?;
    let stamp = at.format("%Y%m%dT%H%M%SZ").to_string();

    for attempt in 0..MAX_BACKUP_SUFFIX {
        let candidate = backup_candidate(path, &stamp, attempt);
        let mut dest = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(SyncError::ConfigWrite(format!(
                    "backup {}: {}",
                    candidate.display(),
                    e
                )))
            }
        };

        if let Err(e) = io::copy(&mut source, &mut dest).and_then(|_| dest.sync_all()) {
            // a partial copy must not pass for a backup
            drop(dest);
            if let Err(remove) = fs::remove_file(&candidate) {
                warn!(
                    "Could not remove incomplete backup {}: {}",
                    candidate.display(),
                    remove
                );
            }
            return Err(SyncError::ConfigWrite(format!(
                "backup {}: {}",
                candidate.display(),
                e
            )));
        }

        info!("Backed up {} to {}", path.display(), candidate.display());
        return Ok(candidate);
    }

    Err(SyncError::ConfigWrite(format!(
        "backup of {}: no free backup name for {}",
        path.display(),
        stamp
    )))
}

/// Atomically replace `path` with the serialized document.
pub fn persist(document: &ScrapeDocument, path: &Path) -> Result<()> {
    let yaml = document.to_yaml()?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let write_err =
        |e: io::Error| SyncError::ConfigWrite(format!("{}: {}", path.display(), e));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(yaml.as_bytes()).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;

    // keep the collector's read access to the replaced file
    if let Ok(metadata) = fs::metadata(path) {
        tmp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;

    tmp.persist(path).map_err(|e| write_err(e.error))?;
    info!("Wrote scrape configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn backup_names_are_timestamped_siblings() {
        let path = Path::new("/etc/prometheus/prometheus.yml");
        assert_eq!(
            backup_candidate(path, "20261018T120000Z", 0),
            PathBuf::from("/etc/prometheus/prometheus.yml.20261018T120000Z.bak")
        );
        assert_eq!(
            backup_candidate(path, "20261018T120000Z", 2),
            PathBuf::from("/etc/prometheus/prometheus.yml.20261018T120000Z-2.bak")
        );
    }

    #[test]
    fn backup_never_overwrites_previous_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prometheus.yml");
        fs::write(&path, "first: 1\n").unwrap();
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();

        let first = backup(&path, at).unwrap();
        fs::write(&path, "second: 2\n").unwrap();
        let second = backup(&path, at).unwrap();

        assert_ne!(first, second);
        assert_eq!(fs::read_to_string(first).unwrap(), "first: 1\n");
        assert_eq!(fs::read_to_string(second).unwrap(), "second: 2\n");
    }

    #[test]
    fn non_mapping_params_is_rejected() {
        let doc = ScrapeDocument::parse(
            "scrape_configs:\n  - job_name: a10-tps-1\n    params: [1, 2]\n",
        )
        .unwrap();
        let selector = JobSelector::Prefix("a10-tps".to_string());
        let err = reconcile(&doc, &[], &selector).unwrap_err();
        assert!(matches!(err, SyncError::ConfigParse(_)));
    }
}
