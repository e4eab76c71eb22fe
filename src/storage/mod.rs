pub mod export;

// Re-export common functions
pub use export::{export, write_summary_csv, write_links_csv, write_links_xlsx};
