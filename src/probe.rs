//! Appliance Reachability Probing
//!
//! Candidates are probed strictly one after another in priority order, so a
//! fast secondary can never win over a slow but reachable primary. An
//! unreachable host (refused, timed out, unresolvable) is a normal outcome and
//! is only ever logged as a warning.

use crate::config::{ApplianceConfig, ProbeConfig, ProbeMethod};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::{debug, info, warn};

#[async_trait]
pub trait Prober: Send + Sync {
    /// Whether `host` answered the probe within the timeout
    async fn is_reachable(&self, host: &str) -> bool;
}

/// Probe `candidates` in order and return the index of the first reachable one.
pub async fn first_reachable(prober: &dyn Prober, candidates: &[String]) -> Option<usize> {
    for (index, host) in candidates.iter().enumerate() {
        if prober.is_reachable(host).await {
            info!("Appliance {} is reachable", host);
            return Some(index);
        }
        warn!("Appliance {} is unreachable", host);
    }
    None
}

/// Build the prober selected by `probe.method`
pub fn from_config(probe: &ProbeConfig, appliance: &ApplianceConfig) -> Box<dyn Prober> {
    match probe.method {
        ProbeMethod::Tcp => {
            let default_port = if appliance.use_tls { 443 } else { 80 };
            Box::new(TcpProber::new(probe.timeout(), default_port))
        }
        ProbeMethod::Ping => Box::new(PingProber::new(probe.timeout())),
    }
}

/// Split `host`, `host:port`, `[v6]` or `[v6]:port` into a host and port.
pub fn split_host_port(host: &str, default_port: u16) -> (String, u16) {
    if let Some(rest) = host.strip_prefix('[') {
        if let Some((addr, tail)) = rest.split_once(']') {
            let port = tail
                .strip_prefix(':')
                .and_then(|p| p.parse().ok())
                .unwrap_or(default_port);
            return (addr.to_string(), port);
        }
    }

    match host.rsplit_once(':') {
        // a bare IPv6 address has several colons and no port
        Some((name, port)) if !name.contains(':') => match port.parse() {
            Ok(port) => (name.to_string(), port),
            Err(_) => (host.to_string(), default_port),
        },
        _ => (host.to_string(), default_port),
    }
}

/// TCP connect to the appliance API port
pub struct TcpProber {
    timeout: Duration,
    default_port: u16,
}

impl TcpProber {
    pub fn new(timeout: Duration, default_port: u16) -> Self {
        Self {
            timeout,
            default_port,
        }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn is_reachable(&self, host: &str) -> bool {
        let (name, port) = split_host_port(host, self.default_port);
        match tokio::time::timeout(self.timeout, TcpStream::connect((name.as_str(), port))).await
        {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("TCP probe of {}:{} failed: {}", name, port, e);
                false
            }
            Err(_) => {
                debug!("TCP probe of {}:{} timed out", name, port);
                false
            }
        }
    }
}

/// Single ICMP echo through the system `ping` binary
pub struct PingProber {
    timeout: Duration,
}

impl PingProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Prober for PingProber {
    async fn is_reachable(&self, host: &str) -> bool {
        let (name, _) = split_host_port(host, 0);
        let wait = self.timeout.as_secs().max(1).to_string();

        let mut command = Command::new("ping");
        command
            .args(["-c", "1", "-W", &wait, &name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        let status = command.status();

        // ping enforces -W itself; the outer bound covers resolver stalls
        match tokio::time::timeout(self.timeout + Duration::from_secs(1), status).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                warn!("Failed to run ping for {}: {}", name, e);
                false
            }
            Err(_) => {
                debug!("ping of {} timed out", name);
                false
            }
        }
    }
}
