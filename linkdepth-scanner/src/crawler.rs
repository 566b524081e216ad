use crate::error::Result;
use crate::extract::{ExtractOptions, extract_links, extract_text};
use crate::fetch::{DEFAULT_MAX_BODY_BYTES, DEFAULT_TIMEOUT, FetchedPage, build_client, fetch_page};
use crate::result::{LinkEdge, PageText, SeedCrawl, SeedStats};
use crate::scope::{LinkFilter, LinkVerdict, SeedUrl, default_excluded_keywords, resolve};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

/// Called with each URL just before it is fetched.
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Crawls one seed two links deep.
///
/// A single `Crawler` can serve many seeds at once; the HTTP client and the
/// connection permits are shared, everything else lives in the per-seed run.
pub struct Crawler {
    client: Client,
    permits: Arc<Semaphore>,
    max_connections: usize,
    timeout: Duration,
    max_body_bytes: usize,
    excluded_keywords: Vec<String>,
    text_extraction: Option<ExtractOptions>,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONNECTIONS)),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            timeout,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            excluded_keywords: default_excluded_keywords(),
            text_extraction: None,
            progress_callback: None,
        })
    }

    /// Upper bound on requests in flight across every seed using this crawler.
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        let max_connections = max_connections.max(1);
        self.permits = Arc::new(Semaphore::new(max_connections));
        self.max_connections = max_connections;
        self
    }

    /// Keep at most this many bytes of each response body.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn with_excluded_keywords(mut self, keywords: Vec<String>) -> Self {
        self.excluded_keywords = keywords;
        self
    }

    pub fn with_text_extraction(mut self, options: ExtractOptions) -> Self {
        self.text_extraction = Some(options);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn excluded_keywords(&self) -> &[String] {
        &self.excluded_keywords
    }

    /// Stop handing out connection permits. Fetches that have not started
    /// yet fail with `ScanError::Closed`.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        if let Some(ref callback) = self.progress_callback {
            callback(url);
        }
        fetch_page(&self.client, &self.permits, url, self.max_body_bytes).await
    }

    /// Fetch a single page and return its readable text.
    pub async fn fetch_text(&self, url: &str, options: &ExtractOptions) -> Result<String> {
        let page = self.fetch(url).await?;
        Ok(extract_text(&page.body, options))
    }

    /// Validate `seed` and crawl it. Only an invalid seed is an error; fetch
    /// failures are reported on the returned `SeedCrawl`.
    pub async fn crawl(&self, seed: &str) -> Result<SeedCrawl> {
        let seed = SeedUrl::parse(seed)?;
        Ok(self.crawl_seed(&seed).await)
    }

    pub async fn crawl_seed(&self, seed: &SeedUrl) -> SeedCrawl {
        let mut run = SeedRun::new(seed, &self.excluded_keywords, self.text_extraction.as_ref());
        let mut state = CrawlState::Start;

        loop {
            debug!("[{}] entering {}", seed, state.name());
            state = match state {
                CrawlState::Start => run.on_start(),
                CrawlState::FetchRoot => self.on_fetch_root(&mut run).await,
                CrawlState::CollectDepth1(root) => run.on_collect_depth1(root),
                CrawlState::FetchDepth1 => self.on_fetch_depth1(&mut run).await,
                CrawlState::CollectDepth2(pages) => run.on_collect_depth2(pages),
                CrawlState::Done => break,
            };
        }

        run.finish()
    }

    async fn on_fetch_root(&self, run: &mut SeedRun<'_>) -> CrawlState {
        match self.fetch(run.seed.url().as_str()).await {
            Ok(page) => {
                run.stats.pages_fetched += 1;
                CrawlState::CollectDepth1(page)
            }
            Err(e) => {
                warn!("Root fetch failed for {}: {}", run.seed, e);
                run.stats.fetch_failures += 1;
                run.root_error = Some(e.to_string());
                CrawlState::Done
            }
        }
    }

    async fn on_fetch_depth1(&self, run: &mut SeedRun<'_>) -> CrawlState {
        let outcomes: Vec<_> = stream::iter(run.depth1.clone())
            .map(|url| async move {
                let outcome = self.fetch(&url).await;
                (url, outcome)
            })
            .buffer_unordered(self.max_connections)
            .collect()
            .await;

        let mut pages = Vec::with_capacity(outcomes.len());
        for (url, outcome) in outcomes {
            match outcome {
                Ok(page) => {
                    run.stats.pages_fetched += 1;
                    pages.push((url, page));
                }
                Err(e) => {
                    warn!("Crawl error for {}: {}", url, e);
                    run.stats.fetch_failures += 1;
                }
            }
        }

        CrawlState::CollectDepth2(pages)
    }
}

enum CrawlState {
    Start,
    FetchRoot,
    CollectDepth1(FetchedPage),
    FetchDepth1,
    CollectDepth2(Vec<(String, FetchedPage)>),
    Done,
}

impl CrawlState {
    fn name(&self) -> &'static str {
        match self {
            CrawlState::Start => "START",
            CrawlState::FetchRoot => "FETCH_ROOT",
            CrawlState::CollectDepth1(_) => "COLLECT_DEPTH1",
            CrawlState::FetchDepth1 => "FETCH_DEPTH1",
            CrawlState::CollectDepth2(_) => "COLLECT_DEPTH2",
            CrawlState::Done => "DONE",
        }
    }
}

/// State owned by exactly one seed's run.
struct SeedRun<'a> {
    seed: &'a SeedUrl,
    filter: LinkFilter,
    text_extraction: Option<&'a ExtractOptions>,
    depth1: Vec<String>,
    depth1_seen: HashSet<String>,
    depth2: HashMap<String, Vec<String>>,
    pages: Vec<PageText>,
    stats: SeedStats,
    root_error: Option<String>,
}

impl<'a> SeedRun<'a> {
    fn new(
        seed: &'a SeedUrl,
        keywords: &[String],
        text_extraction: Option<&'a ExtractOptions>,
    ) -> Self {
        Self {
            seed,
            filter: LinkFilter::for_seed(seed, keywords),
            text_extraction,
            depth1: Vec::new(),
            depth1_seen: HashSet::new(),
            depth2: HashMap::new(),
            pages: Vec::new(),
            stats: SeedStats::default(),
            root_error: None,
        }
    }

    fn on_start(&mut self) -> CrawlState {
        info!("Starting crawl of {}", self.seed);
        CrawlState::FetchRoot
    }

    fn on_collect_depth1(&mut self, root: FetchedPage) -> CrawlState {
        self.record_text(&root, 0);

        let prefix = self.seed.prefix().to_string();
        for url in self.admitted_links(&root, &prefix) {
            if self.depth1_seen.insert(url.clone()) {
                self.depth1.push(url);
            } else {
                self.stats.duplicates += 1;
            }
        }

        debug!("[{}] {} depth-1 URLs", self.seed, self.depth1.len());
        CrawlState::FetchDepth1
    }

    fn on_collect_depth2(&mut self, pages: Vec<(String, FetchedPage)>) -> CrawlState {
        for (depth1_url, page) in pages {
            self.record_text(&page, 1);

            let mut seen = HashSet::new();
            let mut children = Vec::new();
            for url in self.admitted_links(&page, &depth1_url) {
                if seen.insert(url.clone()) {
                    children.push(url);
                } else {
                    self.stats.duplicates += 1;
                }
            }

            debug!("[{}] {} depth-2 URLs under {}", self.seed, children.len(), depth1_url);
            self.depth2.insert(depth1_url, children);
        }

        CrawlState::Done
    }

    /// Anchors of `page` that resolve, stay under `prefix` on the seed's host,
    /// and carry no excluded keyword. Every rejection is counted.
    fn admitted_links(&mut self, page: &FetchedPage, prefix: &str) -> Vec<String> {
        if !page.has_markup() {
            debug!("Skipping link extraction for non-markup {}", page.url);
            return Vec::new();
        }

        let links = match extract_links(&page.body) {
            Ok(links) => links,
            Err(e) => {
                warn!("Failed to extract links from {}: {}", page.url, e);
                self.stats.parse_failures += 1;
                return Vec::new();
            }
        };

        let base = links
            .base_href
            .as_deref()
            .and_then(|href| resolve(&page.final_url, href))
            .unwrap_or_else(|| page.final_url.clone());

        let mut admitted = Vec::new();
        for href in &links.hrefs {
            self.stats.anchors_seen += 1;

            let Some(url) = resolve(&base, href) else {
                debug!("  -> Unresolvable href '{}' on {}", href, page.url);
                self.stats.anchors_unresolvable += 1;
                continue;
            };

            match self.filter.classify(&url, prefix) {
                LinkVerdict::Admitted => admitted.push(url.to_string()),
                LinkVerdict::OutOfScope => {
                    debug!("  -> Out of scope: {}", url);
                    self.stats.anchors_out_of_scope += 1;
                }
                LinkVerdict::Excluded => {
                    debug!("  -> Excluded keyword: {}", url);
                    self.stats.anchors_excluded += 1;
                }
            }
        }

        admitted
    }

    fn record_text(&mut self, page: &FetchedPage, depth: u8) {
        if let Some(options) = self.text_extraction
            && page.has_markup()
        {
            self.pages.push(PageText {
                url: page.url.clone(),
                depth,
                text: extract_text(&page.body, options),
            });
        }
    }

    fn finish(mut self) -> SeedCrawl {
        let seed = self.seed;
        let base = seed.as_str();
        let mut edges = Vec::new();

        for depth1_url in &self.depth1 {
            edges.push(LinkEdge::depth1(base, depth1_url));
            if let Some(children) = self.depth2.remove(depth1_url) {
                for depth2_url in children {
                    edges.push(LinkEdge::depth2(base, depth1_url, &depth2_url));
                }
            }
        }

        info!(
            "Crawl of {} complete: {} depth-1, {} depth-2 URLs ({} fetch failures)",
            self.seed,
            self.depth1.len(),
            edges.len() - self.depth1.len(),
            self.stats.fetch_failures
        );

        SeedCrawl {
            seed: base.to_string(),
            edges,
            pages: self.pages,
            stats: self.stats,
            root_error: self.root_error,
        }
    }
}
