use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, error, warn};

mod cli;
mod crawler;
mod browser;
mod extract;
mod fetch;
mod storage;
mod utils;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = cli::parse_args();

    // Initialize logging
    let log_file = args.log_file.clone().or_else(|| args.log.then(utils::default_log_file));
    utils::init_logging(args.verbose, log_file)?;

    info!("Starting Site Harvester v{}", env!("CARGO_PKG_VERSION"));

    // Ctrl-C stops the harvest between fetches and keeps what was gathered
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after in-flight fetches");
                cancel.cancel();
            }
        });
    }

    // Process commands
    match cli::process_command(args, cancel).await {
        Ok(_) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            Err(e)
        }
    }
}
