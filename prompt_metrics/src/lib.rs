pub mod aggregator;
pub mod exposition;

pub use aggregator::{ScrapeAggregator, ScrapeResponse, ScrapeStatus};
pub use exposition::{SelfMetrics, ERRORS_METRIC};
