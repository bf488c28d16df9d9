use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use repo_courier::config::{AppConfig, LogFormat, Mode};
use repo_courier::shutdown::wait_for_shutdown;
use repo_courier::workflow::pipeline::Pipeline;
use repo_courier::workflow::report;
use repo_courier::workflow::types::RunLedger;

#[derive(Parser)]
#[command(
    name = "repo-courier",
    about = "Accept GitHub collaboration invitations and clone the repositories"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Where to look for invitations
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Maximum number of messages, notifications or invitations to inspect
    #[arg(long)]
    max_items: Option<usize>,

    /// Repository to clone in public mode
    #[arg(long)]
    repo_url: Option<String>,
}

enum RunEnd {
    Finished(repo_courier::error::Result<()>),
    Interrupted,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(mode) = cli.mode {
        config.pipeline.mode = mode;
    }
    if let Some(max_items) = cli.max_items {
        config.pipeline.max_items = max_items;
    }
    if let Some(repo_url) = &cli.repo_url {
        config.github.public_repo_url = Some(repo_url.clone());
    }
}

fn warn_unused_settings(config: &AppConfig) {
    if let Some(secs) = config.pipeline.check_interval_secs {
        tracing::warn!(check_interval_secs = secs, "pipeline.check_interval_secs is ignored; each run is a single pass");
    }
    if let Some(retries) = config.pipeline.max_retries {
        tracing::warn!(max_retries = retries, "pipeline.max_retries is ignored; failed items are never retried");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = AppConfig::load(cli.config.as_deref());
    init_tracing(
        loaded
            .as_ref()
            .map(|c| c.logging.format)
            .unwrap_or_default(),
    );

    let mut config = loaded.context("Failed to load configuration")?;
    apply_overrides(&mut config, &cli);
    config.validate().context("Invalid configuration")?;
    warn_unused_settings(&config);

    tracing::info!(
        mode = %config.pipeline.mode,
        max_items = config.pipeline.max_items,
        base_dir = %config.workspace.base_dir.display(),
        "Starting repo-courier"
    );

    let pipeline = Pipeline::from_config(&config)
        .await
        .context("Failed to set up pipeline")?;

    let mut ledger = RunLedger::new();
    let end = tokio::select! {
        result = pipeline.run(&mut ledger) => RunEnd::Finished(result),
        _ = wait_for_shutdown() => RunEnd::Interrupted,
    };

    let summary = report::synthesize(&ledger);
    match report::persist(&summary, &config.report.dir) {
        Ok(path) => tracing::info!(
            path = %path.display(),
            checked = summary.emails_checked,
            valid = summary.valid_invitations,
            accepted = summary.accepted,
            cloned = summary.cloned,
            errors = summary.errors.len(),
            "Run complete"
        ),
        Err(e) => tracing::error!(error = %e, "Failed to save report"),
    }

    match end {
        RunEnd::Finished(Ok(())) => Ok(()),
        RunEnd::Finished(Err(e)) => {
            tracing::error!(error = %e, "Run aborted");
            Err(e.into())
        }
        RunEnd::Interrupted => {
            tracing::warn!("Run interrupted, partial report written");
            anyhow::bail!("interrupted")
        }
    }
}
