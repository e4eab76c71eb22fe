pub mod commands;
pub mod config;
pub mod input;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::crawler::task::ExtractorKind;
use config::OutputFormat;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Also write logs to the default log file
    #[arg(long, global = true, conflicts_with = "log_file")]
    pub log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl sites and collect email addresses
    Emails(HarvestArgs),

    /// Crawl sites and collect the external domains they link to
    Links(HarvestArgs),

    /// Manage configuration profiles
    Config {
        /// Profile name to manage
        #[arg(required = false)]
        profile: Option<String>,

        /// List all available profiles
        #[arg(short, long)]
        list: bool,
    },
}

/// Options shared by the harvesting commands
#[derive(Args, Debug, Clone)]
pub struct HarvestArgs {
    /// Seed URLs, separated by spaces, commas or newlines
    pub urls: Vec<String>,

    /// Read seed URLs from a .csv or .xlsx (first column) or .txt file
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Render pages in a browser so script-built content is seen
    #[arg(short, long)]
    pub render: bool,

    /// Configuration profile to use instead of the default
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Maximum link depth from each seed
    #[arg(short, long)]
    pub depth: Option<u32>,

    /// Concurrent fetches per site
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Output file for the result table
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

/// Parse command line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Process the command
pub async fn process_command(cli: Cli, cancel: CancellationToken) -> Result<()> {
    match cli.command {
        Commands::Emails(args) => {
            info!("Starting email harvest");
            commands::harvest(args, ExtractorKind::Emails, cancel).await
        },
        Commands::Links(args) => {
            info!("Starting outgoing link harvest");
            commands::harvest(args, ExtractorKind::OutgoingLinks, cancel).await
        },
        Commands::Config { profile, list } => {
            if list {
                info!("Listing all configuration profiles");
                commands::list_profiles()
            } else if let Some(profile_name) = profile {
                info!("Managing configuration profile: {}", profile_name);
                commands::manage_profile(profile_name)
            } else {
                info!("Showing current configuration");
                commands::show_config()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert()
    }

    #[test]
    fn test_parse_harvest_flags() {
        let cli = Cli::try_parse_from([
            "harvester", "-v", "links", "https://a.com/,https://b.com/", "--render", "--depth", "0",
            "--format", "json",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert!(!cli.log);
        match cli.command {
            Commands::Links(args) => {
                assert_eq!(args.urls, vec!["https://a.com/,https://b.com/"]);
                assert!(args.render);
                assert_eq!(args.depth, Some(0));
                assert_eq!(args.format, Some(OutputFormat::Json));
                assert!(args.file.is_none());
            }
            _ => panic!("expected the links command"),
        }
    }
}
