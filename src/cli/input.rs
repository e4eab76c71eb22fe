use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use calamine::{open_workbook_auto, Reader};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::utils::domain::parse_seed;

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\s]+").expect("separator pattern is valid"));

/// Problems with the seed list, reported before any crawling starts
#[derive(Debug, Error)]
pub enum InputError {
    #[error("no valid URLs supplied")]
    NoUrls,

    #[error("unsupported input file format: {0} (use .csv, .xlsx or .txt)")]
    UnsupportedFormat(String),

    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },
}

/// Split free text on commas, whitespace and newlines
pub fn split_urls(text: &str) -> Vec<String> {
    SEPARATORS
        .split(text)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Seeds from a file: the first column of a CSV or spreadsheet (after its header row), or free text
pub fn read_url_file(path: &Path) -> Result<Vec<String>, InputError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    let read_error = |reason: String| InputError::Read {
        path: path.display().to_string(),
        reason,
    };

    match extension.as_str() {
        "csv" => {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .from_path(path)
                .map_err(|e| read_error(e.to_string()))?;

            let mut urls = Vec::new();
            for record in reader.records() {
                let record = record.map_err(|e| read_error(e.to_string()))?;
                if let Some(cell) = record.get(0).map(str::trim).filter(|cell| !cell.is_empty()) {
                    urls.push(cell.to_string());
                }
            }

            debug!("Read {} URL cell(s) from {}", urls.len(), path.display());
            Ok(urls)
        }
        "xlsx" | "xls" => {
            let mut workbook = open_workbook_auto(path).map_err(|e| read_error(e.to_string()))?;
            let sheet = workbook
                .worksheet_range_at(0)
                .ok_or_else(|| read_error("workbook has no sheets".to_string()))?
                .map_err(|e| read_error(e.to_string()))?;

            let urls: Vec<String> = sheet
                .rows()
                .skip(1)
                .filter_map(|row| row.first())
                .map(|cell| cell.to_string().trim().to_string())
                .filter(|cell| !cell.is_empty())
                .collect();

            debug!("Read {} URL cell(s) from {}", urls.len(), path.display());
            Ok(urls)
        }
        "txt" => {
            let text = fs::read_to_string(path).map_err(|e| read_error(e.to_string()))?;
            Ok(split_urls(&text))
        }
        other => Err(InputError::UnsupportedFormat(format!(".{}", other))),
    }
}

/// Validate and deduplicate seeds, keeping first-seen order.
///
/// Entries that are not web URLs are skipped with a warning.
pub fn collect_seeds(raw: Vec<String>) -> Result<Vec<String>, InputError> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for entry in raw {
        let Some(url) = parse_seed(&entry) else {
            warn!("Ignoring invalid URL: {}", entry);
            continue;
        };

        if seen.insert(url.to_string()) {
            seeds.push(entry);
        }
    }

    if seeds.is_empty() {
        return Err(InputError::NoUrls);
    }

    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("harvester-input-{}-{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_split_urls() {
        let text = "https://a.com/, https://b.com/\nhttps://c.com/  https://d.com/,,\n\n";
        assert_eq!(
            split_urls(text),
            vec!["https://a.com/", "https://b.com/", "https://c.com/", "https://d.com/"]
        );
        assert!(split_urls(" ,\n ").is_empty());
    }

    #[test]
    fn test_csv_first_column() {
        let path = temp_file("sites.csv", "Website,Owner\nhttps://a.com/,Ann\n,Nobody\nhttps://b.com/\n");

        let urls = read_url_file(&path).unwrap();
        assert_eq!(urls, vec!["https://a.com/", "https://b.com/"]);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_txt_file_is_free_text() {
        let path = temp_file("sites.txt", "https://a.com/, https://b.com/\nhttps://c.com/\n");

        assert_eq!(read_url_file(&path).unwrap().len(), 3);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_xlsx_first_column() {
        let path = std::env::temp_dir().join(format!("harvester-input-{}-sites.xlsx", std::process::id()));

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Website").unwrap();
        sheet.write_string(0, 1, "Owner").unwrap();
        sheet.write_string(1, 0, "https://a.com/").unwrap();
        sheet.write_string(1, 1, "Ann").unwrap();
        sheet.write_string(2, 1, "Nobody").unwrap();
        sheet.write_string(3, 0, " b.com ").unwrap();
        workbook.save(&path).unwrap();

        let urls = read_url_file(&path).unwrap();
        assert_eq!(urls, vec!["https://a.com/", "b.com"]);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_unknown_extensions_are_unsupported() {
        let err = read_url_file(Path::new("sites.json")).unwrap_err();
        assert!(matches!(err, InputError::UnsupportedFormat(ext) if ext == ".json"));
    }

    #[test]
    fn test_broken_spreadsheet_is_a_read_error() {
        let path = temp_file("broken.xlsx", "not a zip archive");

        assert!(matches!(read_url_file(&path), Err(InputError::Read { .. })));

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_collect_seeds_dedupes_and_validates() {
        let raw = vec![
            "https://a.com/".to_string(),
            "a.com".to_string(),
            "not a url".to_string(),
            "https://b.com/x".to_string(),
        ];

        assert_eq!(collect_seeds(raw).unwrap(), vec!["https://a.com/", "https://b.com/x"]);
        assert!(matches!(collect_seeds(vec!["ftp://files.example.com".to_string()]), Err(InputError::NoUrls)));
        assert!(matches!(collect_seeds(vec![]), Err(InputError::NoUrls)));
    }
}
