//! Appliance HTTP API Client
//!
//! Thin client over the aXAPI v3 REST interface of an A10 Thunder TPS
//! appliance. Every call is bounded by `appliance.request_timeout_seconds`.
//!
//! # Architecture
//!
//! - **Transport**: HTTPS (or plain HTTP when `use_tls = false`) via `reqwest`
//! - **Authentication**: `POST /auth` exchanges credentials for a signature,
//!   sent back as `Authorization: <scheme> <signature>` on later calls
//! - **Certificates**: `verify_ssl = false` installs a `native-tls` connector
//!   that accepts self-signed certificates and mismatched hostnames
//!
//! Failures are classified, never raised as transport errors past this
//! boundary: anything going wrong during `/auth` is [`SyncError::Auth`],
//! anything during the zone query is [`SyncError::Fetch`].
//!
//! # Example
//!
//! ```no_run
//! use tps_zone_sync::appliance::ApplianceClient;
//! use tps_zone_sync::config::ApplianceConfig;
//! use secrecy::SecretString;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ApplianceConfig {
//!     hosts: vec!["tps-primary.example.net".to_string()],
//!     username: "admin".to_string(),
//!     password: SecretString::from("secret"),
//!     use_tls: true,
//!     verify_ssl: false,
//!     api_base: "/axapi/v3".to_string(),
//!     auth_scheme: "A10".to_string(),
//!     request_timeout_seconds: 10,
//! };
//!
//! let client = ApplianceClient::new("tps-primary.example.net", &config)?;
//! let session = client.authenticate("admin", &config.password).await?;
//! let zones = client.fetch_zones(&session).await?;
//! println!("{} zone(s)", zones.len());
//! client.logoff(&session).await?;
//! # Ok(())
//! # }
//! ```

use crate::appliance::session::Session;
use crate::appliance::types::{AuthCredentials, AuthRequest, AuthResponse, ZoneListResponse};
use crate::config::ApplianceConfig;
use crate::error::{Result, SyncError};
use crate::zones::Zone;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info, warn};

const AUTH_PATH: &str = "/auth";
const ZONE_LIST_PATH: &str = "/ddos/dst/zone/";
const LOGOFF_PATH: &str = "/logoff";

/// Build the HTTP client shared by all calls to one appliance
pub fn build_http_client(config: &ApplianceConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(config.request_timeout());

    if config.use_tls && !config.verify_ssl {
        warn!("TLS certificate verification is disabled for appliance connections");
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?;
        builder = builder.use_preconfigured_tls(connector);
    }

    Ok(builder.build()?)
}

/// Client bound to a single appliance
pub struct ApplianceClient {
    host: String,
    base_url: String,
    auth_scheme: String,
    http: reqwest::Client,
}

impl ApplianceClient {
    pub fn new(host: &str, config: &ApplianceConfig) -> Result<Self> {
        let http = build_http_client(config)?;
        Ok(Self::with_http_client(host, config, http))
    }

    /// Reuse an existing `reqwest::Client` (connection pool and TLS settings)
    pub fn with_http_client(host: &str, config: &ApplianceConfig, http: reqwest::Client) -> Self {
        let protocol = if config.use_tls { "https" } else { "http" };
        let api_base = config.api_base.trim_end_matches('/');
        Self {
            host: host.to_string(),
            base_url: format!("{}://{}{}", protocol, host, api_base),
            auth_scheme: config.auth_scheme.clone(),
            http,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorization(&self, session: &Session) -> String {
        format!("{} {}", self.auth_scheme, session.signature().expose_secret())
    }

    /// Exchange credentials for a session signature
    pub async fn authenticate(&self, username: &str, password: &SecretString) -> Result<Session> {
        let body = AuthRequest {
            credentials: AuthCredentials {
                username,
                password: password.expose_secret(),
            },
        };

        debug!("Authenticating to {}", self.url(AUTH_PATH));
        let response = self
            .http
            .post(self.url(AUTH_PATH))
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Auth(format!("{}: request failed: {}", self.host, e)))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!(
                "Authentication to {} failed with status {}: {}",
                self.host,
                status.as_u16(),
                text
            );
            return Err(SyncError::Auth(format!(
                "{}: HTTP {}",
                self.host,
                status.as_u16()
            )));
        }

        let auth: AuthResponse = serde_json::from_str(&text).map_err(|e| {
            error!("Malformed authentication response from {}: {}", self.host, text);
            SyncError::Auth(format!("{}: malformed response: {}", self.host, e))
        })?;

        if auth.authresponse.signature.trim().is_empty() {
            error!("Authentication response from {} carried no signature", self.host);
            return Err(SyncError::Auth(format!("{}: empty signature", self.host)));
        }

        info!("Authenticated to appliance {}", self.host);
        Ok(Session::new(
            &self.host,
            SecretString::from(auth.authresponse.signature),
        ))
    }

    /// Query the zone inventory
    ///
    /// A missing or empty `zone-list` yields an empty vector.
    pub async fn fetch_zones(&self, session: &Session) -> Result<Vec<Zone>> {
        let response = self
            .http
            .get(self.url(ZONE_LIST_PATH))
            .header(reqwest::header::AUTHORIZATION, self.authorization(session))
            .send()
            .await
            .map_err(|e| SyncError::Fetch(format!("{}: request failed: {}", self.host, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SyncError::Fetch(format!("{}: reading body failed: {}", self.host, e)))?;

        if !status.is_success() {
            error!(
                "Failed to retrieve zone data from {}: status {}: {}",
                self.host,
                status.as_u16(),
                text
            );
            return Err(SyncError::Fetch(format!(
                "{}: HTTP {}: {}",
                self.host,
                status.as_u16(),
                text
            )));
        }

        let inventory: ZoneListResponse = serde_json::from_str(&text).map_err(|e| {
            error!("Malformed zone inventory from {}: {}", self.host, e);
            SyncError::Fetch(format!("{}: malformed zone inventory: {}", self.host, e))
        })?;

        let zones = inventory.into_zones();
        info!("Fetched {} zone(s) from {}", zones.len(), self.host);
        Ok(zones)
    }

    /// End the session on the appliance
    pub async fn logoff(&self, session: &Session) -> Result<()> {
        let response = self
            .http
            .post(self.url(LOGOFF_PATH))
            .header(reqwest::header::AUTHORIZATION, self.authorization(session))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Auth(format!(
                "{}: logoff returned HTTP {}",
                self.host,
                status.as_u16()
            )));
        }

        Ok(())
    }
}
