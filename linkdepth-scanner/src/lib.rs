pub mod crawler;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod result;
pub mod scope;

pub use crawler::{Crawler, ProgressCallback};
pub use error::ScanError;
pub use extract::{ExtractOptions, SelectorPolicy, extract_text};
pub use result::{DepthLevel, LinkEdge, PageText, SeedCrawl, SeedStats};
pub use scope::SeedUrl;
