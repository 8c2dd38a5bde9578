//! Zone Classification and Endpoint Derivation
//!
//! Zones come from the appliance inventory as a point-in-time snapshot. Each
//! zone carries an operational mode; only zones under active protection are
//! worth scraping, so idle zones are dropped before the scrape target list is
//! built.
//!
//! # Policies
//!
//! - [`ActivePolicy::NonIdle`] (default): every mode except `idle` is active,
//!   including modes introduced by newer appliance firmware.
//! - [`ActivePolicy::Strict`]: only `monitor` and `learning` are active.
//!
//! Derivation is pure and order-preserving: the same zone sequence always
//! yields the same endpoint sequence, in appliance response order.

use crate::config::ZONE_PLACEHOLDER;
use serde::Deserialize;
use std::fmt;

/// Operational mode reported for a zone
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "Option<String>")]
pub enum ZoneMode {
    Monitor,
    Learning,
    Idle,
    /// Any mode this crate does not know about, kept verbatim
    Other(String),
}

impl From<Option<String>> for ZoneMode {
    fn from(raw: Option<String>) -> Self {
        let raw = raw.unwrap_or_default();
        match raw.trim().to_ascii_lowercase().as_str() {
            "monitor" => ZoneMode::Monitor,
            "learning" => ZoneMode::Learning,
            "idle" => ZoneMode::Idle,
            _ => ZoneMode::Other(raw),
        }
    }
}

impl From<&str> for ZoneMode {
    fn from(raw: &str) -> Self {
        ZoneMode::from(Some(raw.to_string()))
    }
}

impl Default for ZoneMode {
    fn default() -> Self {
        ZoneMode::Other(String::new())
    }
}

impl fmt::Display for ZoneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneMode::Monitor => f.write_str("monitor"),
            ZoneMode::Learning => f.write_str("learning"),
            ZoneMode::Idle => f.write_str("idle"),
            ZoneMode::Other(raw) if raw.is_empty() => f.write_str("<unset>"),
            ZoneMode::Other(raw) => f.write_str(raw),
        }
    }
}

/// One entry of the appliance zone inventory
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Zone {
    #[serde(rename = "zone-name")]
    pub name: String,
    #[serde(rename = "operational-mode", default)]
    pub mode: ZoneMode,
}

impl Zone {
    pub fn new(name: impl Into<String>, mode: impl Into<ZoneMode>) -> Self {
        Self {
            name: name.into(),
            mode: mode.into(),
        }
    }
}

/// Which zone modes count as actively protected
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivePolicy {
    #[default]
    NonIdle,
    Strict,
}

impl ActivePolicy {
    pub fn is_active(self, mode: &ZoneMode) -> bool {
        match self {
            ActivePolicy::NonIdle => *mode != ZoneMode::Idle,
            ActivePolicy::Strict => matches!(mode, ZoneMode::Monitor | ZoneMode::Learning),
        }
    }
}

/// A zone left out of the scrape targets, kept for the audit trail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OmittedZone {
    pub name: String,
    pub mode: ZoneMode,
}

/// Result of [`derive`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Derivation {
    /// Scrape paths for active zones, in source order
    pub endpoints: Vec<String>,
    /// Zones that were not scraped, in source order
    pub omitted: Vec<OmittedZone>,
}

impl Derivation {
    pub fn omitted_names(&self) -> Vec<&str> {
        self.omitted.iter().map(|z| z.name.as_str()).collect()
    }
}

/// Render the scrape path for a single zone.
pub fn endpoint_for(template: &str, zone_name: &str) -> String {
    template.replace(ZONE_PLACEHOLDER, zone_name)
}

/// Map a zone snapshot to the ordered list of scrape paths.
pub fn derive(zones: &[Zone], policy: ActivePolicy, template: &str) -> Derivation {
    let mut derivation = Derivation::default();

    for zone in zones {
        if policy.is_active(&zone.mode) {
            derivation.endpoints.push(endpoint_for(template, &zone.name));
        } else {
            derivation.omitted.push(OmittedZone {
                name: zone.name.clone(),
                mode: zone.mode.clone(),
            });
        }
    }

    derivation
}
