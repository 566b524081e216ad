use crate::config::CrawlConfig;
use crate::error::Result;
use crate::input::parse_seeds;
use indicatif::{ProgressBar, ProgressStyle};
use linkdepth_scanner::{Crawler, LinkEdge, PageText, ProgressCallback, SeedCrawl, SeedStats, SeedUrl};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Per-seed line of a batch report.
#[derive(Debug, Clone, Serialize)]
pub struct SeedSummary {
    pub seed: String,
    pub depth1: usize,
    pub depth2: usize,
    pub stats: SeedStats,
    pub root_error: Option<String>,
}

impl From<&SeedCrawl> for SeedSummary {
    fn from(crawl: &SeedCrawl) -> Self {
        Self {
            seed: crawl.seed.clone(),
            depth1: crawl.depth1_count(),
            depth2: crawl.depth2_count(),
            stats: crawl.stats.clone(),
            root_error: crawl.root_error.clone(),
        }
    }
}

/// Aggregated output of every seed that finished.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Sorted by base, depth-1, depth-2.
    pub edges: Vec<LinkEdge>,
    pub pages: Vec<PageText>,
    pub seeds: Vec<SeedSummary>,
    pub totals: SeedStats,
    /// Seeds cut off by the batch timeout.
    pub unfinished: Vec<String>,
    pub timed_out: bool,
}

impl BatchReport {
    fn from_outcomes(mut outcomes: Vec<SeedCrawl>, unfinished: Vec<String>, timed_out: bool) -> Self {
        outcomes.sort_by(|a, b| a.seed.cmp(&b.seed));

        let mut report = BatchReport {
            unfinished,
            timed_out,
            ..Default::default()
        };

        for outcome in outcomes {
            report.seeds.push(SeedSummary::from(&outcome));
            report.totals.merge(&outcome.stats);
            report.edges.extend(outcome.edges);
            report.pages.extend(outcome.pages);
        }

        report.edges.sort();
        report
            .pages
            .sort_by(|a, b| a.url.cmp(&b.url).then(a.depth.cmp(&b.depth)));
        report
    }

    pub fn failed_roots(&self) -> usize {
        self.seeds.iter().filter(|s| s.root_error.is_some()).count()
    }
}

/// Crawls a batch of seeds with a shared HTTP client and connection pool.
///
/// Seeds run as independent tasks and hand their results back over a
/// channel; the engine is the only writer of the aggregated report.
pub struct CrawlEngine {
    crawler: Arc<Crawler>,
    seed_permits: Arc<Semaphore>,
    batch_timeout: Option<Duration>,
    tasks: JoinSet<()>,
    progress_bar: Option<Arc<ProgressBar>>,
    fetched: Arc<AtomicUsize>,
}

impl CrawlEngine {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let fetched = Arc::new(AtomicUsize::new(0));

        let progress_bar = if config.show_progress {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb.set_message("Starting crawl...");
            Some(Arc::new(pb))
        } else {
            None
        };

        let progress_callback: ProgressCallback = {
            let fetched = fetched.clone();
            let pb = progress_bar.clone();
            Arc::new(move |url: &str| {
                let count = fetched.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(ref pb) = pb {
                    pb.set_message(format!("Crawling... {} URLs fetched ({})", count, url));
                }
            })
        };

        let mut crawler = Crawler::with_timeout(config.timeout)?
            .with_max_connections(config.max_connections)
            .with_excluded_keywords(config.excluded_keywords.clone())
            .with_progress_callback(progress_callback);
        if let Some(ref options) = config.text_extraction {
            crawler = crawler.with_text_extraction(options.clone());
        }

        Ok(Self {
            crawler: Arc::new(crawler),
            seed_permits: Arc::new(Semaphore::new(config.seed_workers.max(1))),
            batch_timeout: config.batch_timeout,
            tasks: JoinSet::new(),
            progress_bar,
            fetched,
        })
    }

    pub fn crawler(&self) -> &Crawler {
        &self.crawler
    }

    /// URLs fetched (or attempted) so far by this engine.
    pub fn fetched_count(&self) -> usize {
        self.fetched.load(Ordering::Relaxed)
    }

    /// Crawl every seed and wait for all of them, or for the batch timeout.
    pub async fn run(&mut self, seeds: &[SeedUrl]) -> BatchReport {
        info!("Starting batch of {} seed(s)", seeds.len());
        let (tx, mut rx) = mpsc::unbounded_channel::<SeedCrawl>();

        for seed in seeds {
            let crawler = self.crawler.clone();
            let permits = self.seed_permits.clone();
            let tx = tx.clone();
            let seed = seed.clone();

            self.tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    debug!("Seed pool closed before {} started", seed);
                    return;
                };
                let outcome = crawler.crawl_seed(&seed).await;
                if tx.send(outcome).is_err() {
                    debug!("Batch stopped collecting before {} finished", seed);
                }
            });
        }
        drop(tx);

        let total = seeds.len();
        let mut outcomes: Vec<SeedCrawl> = Vec::with_capacity(total);
        let pb = self.progress_bar.clone();
        let collect = async {
            while let Some(outcome) = rx.recv().await {
                outcomes.push(outcome);
                if let Some(ref pb) = pb {
                    pb.set_message(format!("Seeds finished: {}/{}", outcomes.len(), total));
                }
            }
        };

        let timed_out = match self.batch_timeout {
            Some(limit) => tokio::time::timeout(limit, collect).await.is_err(),
            None => {
                collect.await;
                false
            }
        };

        if timed_out {
            warn!(
                "Batch timeout reached with {}/{} seeds finished; aborting the rest",
                outcomes.len(),
                total
            );
            self.tasks.abort_all();
        }

        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined
                && !e.is_cancelled()
            {
                warn!("Seed task failed: {}", e);
            }
        }

        let finished: HashSet<&str> = outcomes.iter().map(|o| o.seed.as_str()).collect();
        let unfinished: Vec<String> = seeds
            .iter()
            .map(|s| s.as_str())
            .filter(|s| !finished.contains(s))
            .map(|s| s.to_string())
            .collect();

        let report = BatchReport::from_outcomes(outcomes, unfinished, timed_out);

        if let Some(ref pb) = self.progress_bar {
            pb.finish_with_message(format!(
                "Crawl complete! {} URLs fetched, {} edges",
                self.fetched_count(),
                report.edges.len()
            ));
        }
        info!(
            "Batch complete: {} edges from {} seed(s), {} fetch failures",
            report.edges.len(),
            report.seeds.len(),
            report.totals.fetch_failures
        );

        report
    }

    /// Abort anything still running and release the connection pool.
    pub async fn shutdown(mut self) {
        self.tasks.shutdown().await;
        self.seed_permits.close();
        self.crawler.close();
        if let Some(pb) = self.progress_bar.take() {
            pb.finish_and_clear();
        }
        debug!("Crawl engine shut down");
    }
}

/// Crawl `seeds` and return every edge, sorted.
///
/// All seeds are validated before the first request goes out.
pub async fn run_batch(seeds: &[String], config: &CrawlConfig) -> Result<Vec<LinkEdge>> {
    let seeds = parse_seeds(seeds)?;
    let mut engine = CrawlEngine::new(config)?;
    let report = engine.run(&seeds).await;
    engine.shutdown().await;
    Ok(report.edges)
}
