pub mod controller;
pub mod frontier;
pub mod results;
pub mod scheduler;
pub mod task;

// Re-export common types
pub use controller::CrawlerController;
pub use results::{SiteResult, SiteStatus};
pub use task::{CrawlJob, ExtractorKind, FetchStrategy, JobError};
