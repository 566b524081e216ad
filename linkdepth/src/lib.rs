// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    CrawlSettings, DEFAULT_OUTPUT, default_text_output, expand_path, extract_page, run_crawl,
};

// Re-export batch types from linkdepth-core
pub use linkdepth_core::{BatchReport, CrawlConfig, CrawlEngine, run_batch};
