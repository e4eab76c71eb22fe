use anyhow::{Result, Context};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

use crate::cli::config::OutputFormat;
use crate::crawler::results::SiteResult;
use crate::crawler::task::ExtractorKind;

/// Files written this run, so two exports in the same second get distinct names
static EXPORT_SEQUENCE: AtomicU32 = AtomicU32::new(0);

/// Header of the time column
const TIME_COLUMN: &str = "Time Taken (s)";

/// Timestamped output path `<dir>/<prefix>_<unix seconds>[_<n>].<ext>`
pub fn timestamped_path(directory: &Path, prefix: &str, extension: &str) -> PathBuf {
    let timestamp = chrono::Utc::now().timestamp();
    let sequence = EXPORT_SEQUENCE.fetch_add(1, Ordering::Relaxed);

    let name = if sequence == 0 {
        format!("{}_{}.{}", prefix, timestamp, extension)
    } else {
        format!("{}_{}_{}.{}", prefix, timestamp, sequence, extension)
    };

    directory.join(name)
}

/// Write the per-site summary table as CSV
pub fn write_summary_csv<W: Write>(writer: W, results: &[SiteResult], kind: ExtractorKind) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    csv.write_record(["Website", kind.column(), TIME_COLUMN])
        .context("Failed to write CSV header")?;

    for result in results {
        csv.write_record([
            result.website.as_str(),
            result.display_values(kind).as_str(),
            result.display_time().as_str(),
        ])
        .context("Failed to write CSV row")?;
    }

    csv.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Write outgoing links in long format, one `(Base URL, Outgoing Link)` row per link
pub fn write_links_csv<W: Write>(writer: W, results: &[SiteResult]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    csv.write_record(["Base URL", "Outgoing Link"])
        .context("Failed to write CSV header")?;

    for result in results.iter().filter(|r| r.is_ok()) {
        for link in &result.values {
            csv.write_record([result.website.as_str(), link.as_str()])
                .context("Failed to write CSV row")?;
        }
    }

    csv.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Write outgoing links in long format as a spreadsheet with a frozen header row
pub fn write_links_xlsx(path: &Path, results: &[SiteResult]) -> Result<()> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Outgoing Links")?;
    sheet.write_string_with_format(0, 0, "Base URL", &header)?;
    sheet.write_string_with_format(0, 1, "Outgoing Link", &header)?;
    sheet.set_freeze_panes(1, 0)?;
    sheet.set_column_width(0, 40)?;
    sheet.set_column_width(1, 40)?;

    let mut row: u32 = 1;
    for result in results.iter().filter(|r| r.is_ok()) {
        for link in &result.values {
            sheet.write_string(row, 0, result.website.as_str())?;
            sheet.write_string(row, 1, link.as_str())?;
            row += 1;
        }
    }

    workbook.save(path)
        .context(format!("Failed to write spreadsheet: {}", path.display()))?;

    Ok(())
}

#[derive(Serialize)]
struct JsonRow<'a> {
    website: &'a str,
    values: &'a [String],
    time_taken_secs: Option<f64>,
    status: crate::crawler::results::SiteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

/// Write the summary table as a pretty-printed JSON array
pub fn write_summary_json<W: Write>(writer: W, results: &[SiteResult]) -> Result<()> {
    let rows: Vec<JsonRow<'_>> = results
        .iter()
        .map(|r| JsonRow {
            website: &r.website,
            values: &r.values,
            time_taken_secs: r.elapsed_secs,
            status: r.status,
            error: r.error.as_deref(),
        })
        .collect();

    serde_json::to_writer_pretty(writer, &rows)
        .context("Failed to write JSON data")?;

    Ok(())
}

/// Export the result table to disk and return the files written.
///
/// Link harvests also get the long-format link table next to the summary, as
/// CSV and as a spreadsheet.
pub fn export(
    results: &[SiteResult],
    kind: ExtractorKind,
    format: OutputFormat,
    directory: &Path,
    output: Option<PathBuf>,
) -> Result<Vec<PathBuf>> {
    let prefix = match kind {
        ExtractorKind::Emails => "scraped_emails",
        ExtractorKind::OutgoingLinks => "outgoing_links",
    };

    let summary_path = output.unwrap_or_else(|| timestamped_path(directory, prefix, format.extension()));

    if let Some(parent) = summary_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let file = fs::File::create(&summary_path)
        .context(format!("Failed to create output file: {}", summary_path.display()))?;

    match format {
        OutputFormat::Csv => write_summary_csv(file, results, kind)?,
        OutputFormat::Json => write_summary_json(file, results)?,
    }
    debug!("Exported {} row(s) to {}", results.len(), summary_path.display());

    let mut written = vec![summary_path];

    if kind == ExtractorKind::OutgoingLinks {
        // Lives next to the summary, wherever that was written
        let links_dir = written[0].parent().unwrap_or(directory).to_path_buf();
        let links_path = timestamped_path(&links_dir, "outgoing_links_long", "csv");
        let file = fs::File::create(&links_path)
            .context(format!("Failed to create output file: {}", links_path.display()))?;

        write_links_csv(file, results)?;
        debug!("Exported link table to {}", links_path.display());
        written.push(links_path);

        let sheet_path = timestamped_path(&links_dir, "outgoing_links", "xlsx");
        write_links_xlsx(&sheet_path, results)?;
        debug!("Exported link spreadsheet to {}", sheet_path.display());
        written.push(sheet_path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn results() -> Vec<SiteResult> {
        let links: BTreeSet<String> = ["https://partner.org/", "https://vendor.io/"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        vec![
            SiteResult::completed("https://example.com/", links, Duration::from_millis(1500)),
            SiteResult::failed("https://down.com/", "seed page could not be fetched: timeout"),
        ]
    }

    #[test]
    fn test_summary_csv() {
        let mut out = Vec::new();
        write_summary_csv(&mut out, &results(), ExtractorKind::OutgoingLinks).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Website,Links,Time Taken (s)\n\
             https://example.com/,\"https://partner.org/\nhttps://vendor.io/\",1.50\n\
             https://down.com/,seed page could not be fetched: timeout,N/A\n"
        );
    }

    #[test]
    fn test_links_csv_is_long_format() {
        let mut out = Vec::new();
        write_links_csv(&mut out, &results()).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Base URL,Outgoing Link\n\
             https://example.com/,https://partner.org/\n\
             https://example.com/,https://vendor.io/\n"
        );
    }

    #[test]
    fn test_summary_json() {
        let mut out = Vec::new();
        write_summary_json(&mut out, &results()).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["status"], "ok");
        assert_eq!(parsed[0]["time_taken_secs"], 1.5);
        assert_eq!(parsed[1]["status"], "error");
        assert!(parsed[1]["time_taken_secs"].is_null());
        assert!(parsed[0].get("error").is_none());
    }

    #[test]
    fn test_links_xlsx_is_long_format() {
        use calamine::{open_workbook_auto, Reader};

        let path = std::env::temp_dir().join(format!("harvester-links-{}.xlsx", std::process::id()));
        write_links_xlsx(&path, &results()).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Outgoing Links".to_string()]);

        let sheet = workbook.worksheet_range_at(0).unwrap().unwrap();
        let rows: Vec<Vec<String>> = sheet
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();

        assert_eq!(
            rows,
            vec![
                vec!["Base URL", "Outgoing Link"],
                vec!["https://example.com/", "https://partner.org/"],
                vec!["https://example.com/", "https://vendor.io/"],
            ]
        );

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_timestamped_paths_are_unique() {
        let dir = Path::new("out");
        let first = timestamped_path(dir, "scraped_emails", "csv");
        let second = timestamped_path(dir, "scraped_emails", "csv");

        assert_ne!(first, second);
        assert!(first.starts_with("out"));
        assert_eq!(first.extension().and_then(|e| e.to_str()), Some("csv"));
    }

    #[test]
    fn test_export_writes_files() {
        let dir = std::env::temp_dir().join(format!("harvester-export-{}", std::process::id()));

        let written = export(&results(), ExtractorKind::OutgoingLinks, OutputFormat::Csv, &dir, None).unwrap();

        assert_eq!(written.len(), 3);
        assert_eq!(written[2].extension().and_then(|e| e.to_str()), Some("xlsx"));
        for path in &written {
            assert!(path.exists());
        }

        let summary = fs::read_to_string(&written[0]).unwrap();
        assert!(summary.starts_with("Website,Links,Time Taken (s)"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
