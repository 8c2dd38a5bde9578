use anyhow::Result;
use clap::Parser;
use tps_zone_sync::{
    config::Config,
    metrics::RunMetrics,
    pipeline::{Pipeline, ReloadStatus, RunReport},
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// Appliance hosts in priority order, comma separated (overrides config)
    #[arg(long, env = "TPS_HOSTS", value_delimiter = ',')]
    hosts: Vec<String>,

    /// Appliance username (overrides config)
    #[arg(long, env = "TPS_USERNAME")]
    username: Option<String>,

    /// Appliance password (overrides config)
    #[arg(long, env = "TPS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Scrape configuration file to reconcile (overrides config)
    #[arg(long, env = "TPS_SCRAPE_CONFIG")]
    scrape_config: Option<std::path::PathBuf>,

    /// Reconcile in memory only; do not back up, write, or reload
    #[arg(long)]
    dry_run: bool,
}

fn log_summary(report: &RunReport) {
    if let Some(e) = &report.error {
        error!("Reconciliation failed: {}", e);
        return;
    }

    let appliance = report.appliance.as_deref().unwrap_or("-");
    info!(
        "Reconciliation finished: appliance={} zones={} endpoints={} jobs_updated={} written={} dry_run={}",
        appliance,
        report.zones_total,
        report.endpoints().len(),
        report.jobs_updated.len(),
        report.persisted,
        report.dry_run
    );
    if let ReloadStatus::Failed(reason) = &report.reload {
        error!(
            "Configuration written but the collector did not reload: {}",
            reason
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting TPS zone sync v{}", env!("CARGO_PKG_VERSION"));

    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let mut config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Override with CLI arguments if provided
    if !args.hosts.is_empty() {
        config.appliance.hosts = args.hosts;
    }
    if let Some(username) = args.username {
        config.appliance.username = username;
    }
    if let Some(password) = args.password {
        config.appliance.password = secrecy::SecretString::from(password);
    }
    if let Some(path) = args.scrape_config {
        config.scrape.config_path = path;
    }

    if let Err(e) = config.validate() {
        error!("{}", e);
        std::process::exit(1);
    }

    info!("Configuration loaded successfully");
    info!("Appliances: {}", config.appliance.hosts.join(", "));
    info!(
        "Scrape configuration: {}",
        config.scrape.config_path.display()
    );

    let textfile = config.metrics.textfile_path.clone();
    let pipeline = match Pipeline::from_config(config) {
        Ok(pipeline) => pipeline.with_dry_run(args.dry_run),
        Err(e) => {
            error!("Failed to set up pipeline: {}", e);
            std::process::exit(1);
        }
    };

    let report = pipeline.run().await;

    if let Some(path) = textfile {
        let written = RunMetrics::new().and_then(|metrics| {
            metrics.record(&report);
            metrics.write_textfile(&path)
        });
        if let Err(e) = written {
            warn!("Failed to write run metrics to {}: {:#}", path.display(), e);
        }
    }

    log_summary(&report);

    if !report.is_success() {
        std::process::exit(1);
    }

    Ok(())
}
