//! Ordo CLI - loads configuration, installs logging and runs the self-check.
//!
//! ```text
//! main() -> OrdoConfig::load() -> init_tracing() -> LaunchDomain::install_global()
//!                                                        |
//!                                                        v
//!                                           selfcheck::run() -> report
//! ```
//!
//! Exit status is non-zero when any check fails.

mod selfcheck;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ordo_config::OrdoConfig;
use ordo_queue::LaunchDomain;

fn init_tracing(default_filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = OrdoConfig::load()
        .context("failed to load configuration")?
        .unwrap_or_default();

    init_tracing(config.logging.filter_or_default());

    match OrdoConfig::path() {
        Some(path) => tracing::debug!(path = %path.display(), "Configuration location"),
        None => tracing::debug!("No configuration location available"),
    }

    let mut domain = LaunchDomain::new();
    if let Some(priority) = config.launch.default_priority {
        domain = domain.with_default_priority(priority);
    }
    let domain = LaunchDomain::install_global(domain)
        .map_err(|_| anyhow!("launch domain was installed twice"))?;

    let report = selfcheck::run(domain, config.bridge.reply_timeout()).await;
    let mut failed = 0usize;
    for outcome in &report {
        match &outcome.result {
            Ok(detail) => println!("ok    {:<10} {detail}", outcome.name),
            Err(err) => {
                failed += 1;
                println!("FAIL  {:<10} {err:#}", outcome.name);
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!("{failed} of {} checks failed", report.len()));
    }
    tracing::info!(checks = report.len(), "Self-check passed");
    Ok(())
}
