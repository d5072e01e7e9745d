use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dirjanitor::{
    cli::{Cli, Command},
    config::Settings,
    perform_cleanup, Scheduler,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli)?;
    let filter = EnvFilter::new(settings.max_level().to_string().to_ascii_lowercase());
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cleaner = settings.cleaner_config();

    match cli.command {
        Command::Run => {
            let handle = Scheduler::new(cleaner).start();
            info!(
                directory = %settings.directory.display(),
                retention_days = settings.retention_days,
                frequency_secs = settings.frequency_secs,
                "cleanup interval running - press Ctrl+C to exit"
            );
            tokio::signal::ctrl_c().await?;
            info!("stopping at the end of the current period - press Ctrl+C again to exit now");
            let second_ctrl_c = async {
                // an unavailable signal handler means nobody can press it again
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            };
            if !handle.shutdown(second_ctrl_c).await {
                warn!("cleanup interval aborted");
            }
        }
        Command::Clean { json } => {
            let report = tokio::task::spawn_blocking(move || perform_cleanup(&cleaner))
                .await?
                .with_context(|| format!("cleanup of {} failed", settings.directory.display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
        }
    }
    Ok(())
}
