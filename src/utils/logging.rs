use anyhow::{Result, Context};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Directives used when `RUST_LOG` is unset
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "warn,site_harvester=debug"
    } else {
        "warn,site_harvester=info"
    }
}

/// Filter from `RUST_LOG`, falling back to the harvester's own levels
fn build_filter(verbose: bool) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_directives(verbose))
            .context("Invalid default log directives"),
    }
}

/// Open a log file for appending, so repeated runs on the same day share one file
fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .context(format!("Failed to create log directory: {}", parent.display()))?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context(format!("Failed to open log file: {}", path.display()))
}

/// Install the global subscriber.
///
/// Human-readable events go to stderr, leaving stdout to the result table.
/// Events inside a site's crawl carry that site's `seed` span field.
pub fn init_logging(verbose: bool, log_file: Option<PathBuf>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .compact()
        .with_target(verbose)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            let file = open_log_file(&path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(build_filter(verbose)?)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Logging was already initialized")?;

    Ok(())
}

/// Per-day log file in the platform data directory
pub fn default_log_file() -> PathBuf {
    let dir = directories::ProjectDirs::from("com", "site-harvester", "site-harvester")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"));

    dir.join(format!("harvester-{}.log", chrono::Local::now().format("%Y-%m-%d")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        assert!(EnvFilter::try_new(default_directives(true)).is_ok());
        assert!(EnvFilter::try_new(default_directives(false)).is_ok());
    }

    #[test]
    fn test_default_log_file_is_dated() {
        let path = default_log_file();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap();

        assert!(name.starts_with("harvester-"));
        assert!(name.ends_with(".log"));
        assert_eq!(path.parent().and_then(|p| p.file_name()).and_then(|n| n.to_str()), Some("logs"));
    }

    #[test]
    fn test_log_file_appends() {
        let path = std::env::temp_dir()
            .join(format!("harvester-log-{}", std::process::id()))
            .join("run.log");

        {
            use std::io::Write;
            writeln!(open_log_file(&path).unwrap(), "first").unwrap();
            writeln!(open_log_file(&path).unwrap(), "second").unwrap();
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
}
