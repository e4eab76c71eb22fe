use anyhow::{Result, Context};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::config::HarvesterConfig;
use crate::cli::input::{collect_seeds, read_url_file, split_urls};
use crate::cli::HarvestArgs;
use crate::crawler::controller::CrawlerController;
use crate::crawler::results::SiteResult;
use crate::crawler::task::{ExtractorKind, FetchStrategy};
use crate::storage::export;

/// Load the requested profile, or the default configuration
fn load_config(profile: Option<&str>) -> Result<HarvesterConfig> {
    match profile {
        Some(profile) => HarvesterConfig::load_profile(profile)
            .context(format!("Failed to load profile: {}", profile)),
        None => HarvesterConfig::load_default(),
    }
}

/// Apply command line overrides on top of the loaded configuration
fn apply_overrides(config: &mut HarvesterConfig, args: &HarvestArgs) {
    if let Some(depth) = args.depth {
        config.crawler.max_depth = depth;
    }

    if let Some(workers) = args.workers {
        config.crawler.workers = workers;
    }

    if let Some(format) = args.format {
        config.output.format = format;
    }
}

/// Gather seeds from the input file and the free-text arguments, file first
fn gather_seeds(args: &HarvestArgs) -> Result<Vec<String>> {
    let mut raw = Vec::new();

    if let Some(file) = &args.file {
        raw.extend(read_url_file(file)?);
    }

    raw.extend(split_urls(&args.urls.join(" ")));

    Ok(collect_seeds(raw)?)
}

/// Crawl every seed with the chosen extractor and export the result table
pub async fn harvest(args: HarvestArgs, kind: ExtractorKind, cancel: CancellationToken) -> Result<()> {
    let seeds = gather_seeds(&args)?;

    let mut config = load_config(args.profile.as_deref())?;
    apply_overrides(&mut config, &args);

    let strategy = if args.render {
        FetchStrategy::Rendered
    } else {
        FetchStrategy::Static
    };

    let controller = CrawlerController::new(config.clone(), kind, strategy)?;
    let results = controller.run(&seeds, &cancel).await;

    print_table(&results, kind);

    if results.is_empty() {
        warn!("No results to export");
        return Ok(());
    }

    let written = export::export(
        &results,
        kind,
        config.output.format,
        &config.output.directory,
        args.output.clone(),
    )?;

    for path in written {
        info!("Results exported to: {}", path.display());
    }

    Ok(())
}

/// Print the result table
fn print_table(results: &[SiteResult], kind: ExtractorKind) {
    println!("{:<40} {:<8} {}", "Website", "Time (s)", kind.column());
    println!("{}", "=".repeat(80));

    for result in results {
        let values = result.display_values(kind);
        let mut lines = values.split('\n');

        println!("{:<40} {:<8} {}", result.website, result.display_time(), lines.next().unwrap_or(""));
        for line in lines {
            println!("{:<40} {:<8} {}", "", "", line);
        }
    }

    let failed = results.iter().filter(|r| !r.is_ok()).count();
    println!();
    println!("Sites: {}  OK: {}  Failed: {}", results.len(), results.len() - failed, failed);
}

/// List all available configuration profiles
pub fn list_profiles() -> Result<()> {
    let profiles = HarvesterConfig::list_profiles()?;

    println!("Available configuration profiles:");
    for profile in profiles {
        println!("  - {}", profile);
    }

    Ok(())
}

/// Manage a specific configuration profile
pub fn manage_profile(profile_name: String) -> Result<()> {
    // Load the profile if it exists
    match HarvesterConfig::load_profile(&profile_name) {
        Ok(config) => {
            // Display the configuration
            println!("Profile: {}", profile_name);
            println!("{}", serde_yaml::to_string(&config)?);
        },
        Err(_) => {
            // Profile doesn't exist, create a new one
            warn!("Profile '{}' does not exist. Creating a default profile.", profile_name);
            let config = HarvesterConfig::default();
            config.save_as_profile(&profile_name)?;
            println!("Created default profile: {}", profile_name);
        }
    }

    Ok(())
}

/// Show the current configuration
pub fn show_config() -> Result<()> {
    let config = HarvesterConfig::load_default()?;
    println!("Current configuration:");
    println!("{}", serde_yaml::to_string(&config)?);

    Ok(())
}
