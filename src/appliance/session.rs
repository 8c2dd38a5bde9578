//! Appliance Session Lifecycle
//!
//! A session is opened once per appliance attempt and must be closed before the
//! pipeline moves on, whatever happened in between. [`SessionManager::with_session`]
//! is the only way the pipeline uses a session: it opens, runs the caller's work,
//! and always attempts logoff afterwards, so a valid signature is never left
//! behind on the appliance.

use crate::appliance::client::ApplianceClient;
use crate::error::Result;
use secrecy::SecretString;
use std::fmt;
use std::future::Future;
use tracing::{info, warn};

/// Authenticated session against one appliance
#[derive(Clone)]
pub struct Session {
    appliance: String,
    signature: SecretString,
}

impl Session {
    pub fn new(appliance: &str, signature: SecretString) -> Self {
        Self {
            appliance: appliance.to_string(),
            signature,
        }
    }

    pub fn appliance(&self) -> &str {
        &self.appliance
    }

    pub fn signature(&self) -> &SecretString {
        &self.signature
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("appliance", &self.appliance)
            .field("signature", &"[REDACTED]")
            .finish()
    }
}

/// Outcome of work done inside a scoped session
#[derive(Debug)]
pub struct Scoped<T> {
    pub result: Result<T>,
    /// Whether logoff was acknowledged by the appliance
    pub logged_off: bool,
}

/// Opens and closes sessions against a single appliance
pub struct SessionManager<'a> {
    client: &'a ApplianceClient,
    username: &'a str,
    password: &'a SecretString,
}

impl<'a> SessionManager<'a> {
    pub fn new(client: &'a ApplianceClient, username: &'a str, password: &'a SecretString) -> Self {
        Self {
            client,
            username,
            password,
        }
    }

    pub fn client(&self) -> &'a ApplianceClient {
        self.client
    }

    /// Authenticate; failures are already logged by the client
    pub async fn open(&self) -> Result<Session> {
        self.client.authenticate(self.username, self.password).await
    }

    /// Best-effort logoff. Returns whether the appliance acknowledged it.
    pub async fn close(&self, session: Session) -> bool {
        match self.client.logoff(&session).await {
            Ok(()) => {
                info!("Logged off from appliance {}", session.appliance());
                true
            }
            Err(e) => {
                warn!(
                    "Failed to log off from appliance {}: {}",
                    session.appliance(),
                    e
                );
                false
            }
        }
    }

    /// Open a session, run `work` with it, then close it.
    ///
    /// Returns `Err` only when the session could not be opened. Once open, the
    /// session is closed on every path and the work's own result is handed back
    /// in [`Scoped::result`].
    pub async fn with_session<T, F, Fut>(&self, work: F) -> Result<Scoped<T>>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let session = self.open().await?;
        let result = work(session.clone()).await;
        let logged_off = self.close(session).await;
        Ok(Scoped { result, logged_off })
    }
}
