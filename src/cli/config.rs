use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fs;
use tracing::{info, debug, error};

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HarvesterConfig {
    pub crawler: CrawlerSettings,
    pub browser: BrowserSettings,
    pub extractor: ExtractorSettings,
    pub output: OutputSettings,
}

/// Crawler-specific settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CrawlerSettings {
    pub max_depth: u32,
    pub workers: usize,             // Concurrent fetches per site
    pub politeness_delay: u64,      // Delay between fetches to one site in milliseconds
    pub fetch_timeout_secs: u64,    // Ceiling for a single static fetch
    pub site_concurrency: usize,    // Sites crawled at once
    pub user_agent: String,
}

/// Rendering browser settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BrowserSettings {
    pub webdriver_url: String,
    pub headless: bool,
    pub settle_ms: u64,             // Wait after navigation for scripts to render
    pub page_load_timeout_secs: u64,
    pub launch_timeout_secs: u64,
    pub chrome_args: Vec<String>,
}

/// Content extractor settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ExtractorSettings {
    /// Path keywords of pages that get a second email scan
    pub contact_keywords: Vec<String>,

    /// Domains never reported as outgoing links
    pub excluded_domains: Vec<String>,

    /// URL fragments that disqualify an outgoing link
    pub excluded_patterns: Vec<String>,
}

/// Output settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OutputSettings {
    pub directory: PathBuf,
    pub format: OutputFormat,
}

/// Export format of the result table
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            max_depth: 3,
            workers: 5,
            politeness_delay: 1000,
            fetch_timeout_secs: 30,
            site_concurrency: 1,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:4444".to_string(),
            headless: true,
            settle_ms: 3000,
            page_load_timeout_secs: 30,
            launch_timeout_secs: 30,
            chrome_args: vec![
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-gpu".to_string(),
                "--ignore-certificate-errors".to_string(),
            ],
        }
    }
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();

        Self {
            contact_keywords: strings(&["contact", "about", "write-for-us", "support"]),
            excluded_domains: strings(&[
                "facebook.com", "instagram.com", "twitter.com", "youtube.com", "linkedin.com",
                "forbes.com", "amazon.com", "pinterest.com", "imdb.com", "indeed.com", "moz.com",
                "quora.com", "semrush.com", "google.com", "google.org", "bbc.co.uk", ".gov",
            ]),
            excluded_patterns: strings(&["#", "/contact", "/privacy", "/terms"]),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            format: OutputFormat::Csv,
        }
    }
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

impl HarvesterConfig {
    /// Get the path to the config directory
    fn config_dir() -> PathBuf {
        let mut path = if let Some(proj_dirs) = directories::ProjectDirs::from("com", "site-harvester", "site-harvester") {
            proj_dirs.config_dir().to_path_buf()
        } else {
            PathBuf::from("./config")
        };

        // Create the sites directory if it doesn't exist
        path.push("sites");
        if !path.exists() {
            if let Err(e) = fs::create_dir_all(&path) {
                error!("Failed to create config directory: {}", e);
            }
        }

        // Move back up to the config directory
        path.pop();
        path
    }

    /// Load the default configuration
    pub fn load_default() -> Result<Self> {
        let config_dir = Self::config_dir();
        let config_path = config_dir.join("default.yaml");

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            // Create and save the default configuration
            info!("Default configuration not found. Creating...");
            let config = Self::default();
            config.save_as_default()?;
            Ok(config)
        }
    }

    /// Load a configuration profile
    pub fn load_profile(profile: &str) -> Result<Self> {
        let config_dir = Self::config_dir();
        let profile_path = config_dir.join("sites").join(format!("{}.yaml", profile));

        if profile_path.exists() {
            Self::load_from_file(&profile_path)
        } else {
            anyhow::bail!("Profile '{}' not found", profile)
        }
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());
        let contents = fs::read_to_string(path)
            .context(format!("Failed to read configuration file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .context(format!("Failed to parse configuration file: {}", path.display()))
    }

    /// Parse configuration from YAML; missing keys fall back to defaults
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents)?;
        Ok(config)
    }

    /// Save the configuration as the default
    pub fn save_as_default(&self) -> Result<()> {
        let config_dir = Self::config_dir();
        let config_path = config_dir.join("default.yaml");

        self.save_to_file(&config_path)
    }

    /// Save the configuration as a profile
    pub fn save_as_profile(&self, profile: &str) -> Result<()> {
        let config_dir = Self::config_dir();
        let sites_dir = config_dir.join("sites");

        // Create the sites directory if it doesn't exist
        if !sites_dir.exists() {
            fs::create_dir_all(&sites_dir)
                .context(format!("Failed to create sites directory: {}", sites_dir.display()))?;
        }

        let profile_path = sites_dir.join(format!("{}.yaml", profile));
        self.save_to_file(&profile_path)
    }

    /// Save the configuration to a file
    fn save_to_file(&self, path: &Path) -> Result<()> {
        debug!("Saving configuration to: {}", path.display());

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .context(format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let contents = serde_yaml::to_string(self)
            .context("Failed to serialize configuration")?;

        fs::write(path, contents)
            .context(format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// List all available profiles
    pub fn list_profiles() -> Result<Vec<String>> {
        let config_dir = Self::config_dir();
        let sites_dir = config_dir.join("sites");

        if !sites_dir.exists() {
            return Ok(vec![]);
        }

        let mut profiles = Vec::new();

        for entry in fs::read_dir(sites_dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() && path.extension().map_or(false, |ext| ext == "yaml") {
                if let Some(stem) = path.file_stem() {
                    if let Some(name) = stem.to_str() {
                        profiles.push(name.to_string());
                    }
                }
            }
        }

        profiles.sort();
        Ok(profiles)
    }
}
