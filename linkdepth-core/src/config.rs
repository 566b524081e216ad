use linkdepth_scanner::crawler::DEFAULT_MAX_CONNECTIONS;
use linkdepth_scanner::extract::ExtractOptions;
use linkdepth_scanner::fetch::DEFAULT_TIMEOUT;
use linkdepth_scanner::scope::default_excluded_keywords;
use std::time::Duration;

pub const DEFAULT_SEED_WORKERS: usize = 4;

/// Settings for one batch run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Requests in flight across all seeds.
    pub max_connections: usize,
    /// Seeds crawled at the same time.
    pub seed_workers: usize,
    /// Per-fetch timeout.
    pub timeout: Duration,
    /// Bound on the whole batch; `None` waits for every seed.
    pub batch_timeout: Option<Duration>,
    pub excluded_keywords: Vec<String>,
    /// Extract page text while crawling when set.
    pub text_extraction: Option<ExtractOptions>,
    pub show_progress: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            seed_workers: DEFAULT_SEED_WORKERS,
            timeout: DEFAULT_TIMEOUT,
            batch_timeout: None,
            excluded_keywords: default_excluded_keywords(),
            text_extraction: None,
            show_progress: false,
        }
    }
}
