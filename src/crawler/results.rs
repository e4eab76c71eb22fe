use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Serialize, Deserialize};

use crate::crawler::task::ExtractorKind;

/// Whether a site's crawl produced values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    Ok,
    Error,
}

/// Outcome of one seed job, one row of the final table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteResult {
    /// Seed URL as supplied
    pub website: String,

    /// Harvested values, sorted
    pub values: Vec<String>,

    /// Wall-clock seconds, absent when the job failed
    pub elapsed_secs: Option<f64>,

    pub status: SiteStatus,

    /// Description of the failure for `error` rows
    pub error: Option<String>,
}

impl SiteResult {
    pub fn completed(website: &str, values: BTreeSet<String>, elapsed: Duration) -> Self {
        Self {
            website: website.to_string(),
            values: values.into_iter().collect(),
            elapsed_secs: Some(round_secs(elapsed)),
            status: SiteStatus::Ok,
            error: None,
        }
    }

    pub fn failed(website: &str, error: impl ToString) -> Self {
        Self {
            website: website.to_string(),
            values: Vec::new(),
            elapsed_secs: None,
            status: SiteStatus::Error,
            error: Some(error.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == SiteStatus::Ok
    }

    /// Values joined into one cell; failed rows show the error instead
    pub fn display_values(&self, kind: ExtractorKind) -> String {
        match &self.error {
            Some(error) => error.clone(),
            None => self.values.join(kind.separator()),
        }
    }

    /// Elapsed seconds with two decimals, or `N/A`
    pub fn display_time(&self) -> String {
        match self.elapsed_secs {
            Some(secs) => format!("{:.2}", secs),
            None => "N/A".to_string(),
        }
    }
}

fn round_secs(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}

/// Collects site results in seed order regardless of completion order
#[derive(Debug)]
pub struct ResultAggregator {
    slots: Vec<Option<SiteResult>>,
}

impl ResultAggregator {
    pub fn new(seed_count: usize) -> Self {
        Self {
            slots: vec![None; seed_count],
        }
    }

    /// Store the result of the seed at `index`
    pub fn record(&mut self, index: usize, result: SiteResult) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(result);
        }
    }

    pub fn recorded(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Results in seed order; seeds never run (cancelled batch) are left out
    pub fn finish(self) -> Vec<SiteResult> {
        self.slots.into_iter().flatten().collect()
    }
}
