use serde::{Deserialize, Serialize};
use std::fmt;

/// Which hop from the seed produced an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DepthLevel {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
}

impl DepthLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepthLevel::One => "1",
            DepthLevel::Two => "2",
        }
    }
}

impl fmt::Display for DepthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded relationship in a seed's crawl tree.
///
/// Depth-1 edges carry an empty `depth2_url`. Field order doubles as the
/// sort order used for reproducible exports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkEdge {
    pub base_url: String,
    pub depth1_url: String,
    pub depth2_url: String,
    pub level: DepthLevel,
}

impl LinkEdge {
    pub fn depth1(base_url: &str, depth1_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            depth1_url: depth1_url.to_string(),
            depth2_url: String::new(),
            level: DepthLevel::One,
        }
    }

    pub fn depth2(base_url: &str, depth1_url: &str, depth2_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            depth1_url: depth1_url.to_string(),
            depth2_url: depth2_url.to_string(),
            level: DepthLevel::Two,
        }
    }
}

/// Readable text pulled from one fetched page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub url: String,
    /// 0 for the seed page, 1 for depth-1 pages.
    pub depth: u8,
    pub text: String,
}

/// Counters for everything a seed run dropped or skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedStats {
    pub pages_fetched: usize,
    pub fetch_failures: usize,
    pub anchors_seen: usize,
    pub anchors_unresolvable: usize,
    pub anchors_out_of_scope: usize,
    pub anchors_excluded: usize,
    pub duplicates: usize,
    pub parse_failures: usize,
}

impl SeedStats {
    pub fn merge(&mut self, other: &SeedStats) {
        self.pages_fetched += other.pages_fetched;
        self.fetch_failures += other.fetch_failures;
        self.anchors_seen += other.anchors_seen;
        self.anchors_unresolvable += other.anchors_unresolvable;
        self.anchors_out_of_scope += other.anchors_out_of_scope;
        self.anchors_excluded += other.anchors_excluded;
        self.duplicates += other.duplicates;
        self.parse_failures += other.parse_failures;
    }
}

/// Everything one seed's run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCrawl {
    pub seed: String,
    pub edges: Vec<LinkEdge>,
    pub pages: Vec<PageText>,
    pub stats: SeedStats,
    pub root_error: Option<String>,
}

impl SeedCrawl {
    pub fn depth1_count(&self) -> usize {
        self.edges
            .iter()
            .filter(|e| e.level == DepthLevel::One)
            .count()
    }

    pub fn depth2_count(&self) -> usize {
        self.edges.len() - self.depth1_count()
    }
}
