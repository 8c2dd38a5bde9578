use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Appliance unreachable: {0}")]
    Unreachable(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Zone fetch failed: {0}")]
    Fetch(String),

    #[error("Failed to read scrape configuration: {0}")]
    ConfigRead(String),

    #[error("Failed to parse scrape configuration: {0}")]
    ConfigParse(String),

    #[error("Failed to write scrape configuration: {0}")]
    ConfigWrite(String),

    #[error("Reload failed: {0}")]
    Reload(String),

    #[error("No appliance could be reconciled: {0}")]
    NoApplianceReconciled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Whether the pipeline may recover by moving on to the next appliance.
    ///
    /// Appliance-side failures are recoverable; anything touching the scrape
    /// configuration on disk aborts the run.
    pub fn is_failover(&self) -> bool {
        matches!(
            self,
            SyncError::Unreachable(_)
                | SyncError::Auth(_)
                | SyncError::Fetch(_)
                | SyncError::Http(_)
                | SyncError::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
