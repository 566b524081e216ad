use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use linkdepth_core::export::{ExportFormat, text_rows, to_rows, write_table};
use linkdepth_core::input::load_seeds_from_source;
use linkdepth_core::{BatchReport, CrawlConfig, CrawlEngine};
use linkdepth_scanner::scope::default_excluded_keywords;
use linkdepth_scanner::{Crawler, ExtractOptions, SelectorPolicy, SeedUrl};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_OUTPUT: &str = "combined_extracted_urls.xlsx";

/// Route logs to stderr so stdout carries only command output.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    // Already initialized when handlers run more than once in a process.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Expand a leading `~` in a user-supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// `out.xlsx` -> `out_text.xlsx`
pub fn default_text_output(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "combined_extracted_urls".to_string());
    let file_name = match output.extension() {
        Some(ext) => format!("{}_text.{}", stem, ext.to_string_lossy()),
        None => format!("{}_text", stem),
    };
    output.with_file_name(file_name)
}

/// Everything `crawl` needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub url: Option<String>,
    pub input: Option<PathBuf>,
    pub output: PathBuf,
    pub format: ExportFormat,
    pub text_output: Option<PathBuf>,
    pub config: CrawlConfig,
}

impl CrawlSettings {
    pub fn from_matches(args: &ArgMatches) -> Result<Self> {
        let output = expand_path(
            args.get_one::<String>("output")
                .map(String::as_str)
                .unwrap_or(DEFAULT_OUTPUT),
        );

        let format = match args.get_one::<String>("format") {
            Some(name) => ExportFormat::from_str(name)
                .ok_or_else(|| anyhow!("Unsupported output format '{}'", name))?,
            None => ExportFormat::from_path(&output),
        };

        let text_extraction = if args.get_flag("extract-text") {
            Some(extract_options(args)?)
        } else {
            None
        };

        let text_output = text_extraction.as_ref().map(|_| {
            args.get_one::<String>("text-output")
                .map(|p| expand_path(p))
                .unwrap_or_else(|| default_text_output(&output))
        });

        let excluded_keywords = match args.get_many::<String>("exclude") {
            Some(keywords) => keywords.cloned().collect(),
            None => default_excluded_keywords(),
        };

        let quiet = args.get_flag("quiet");

        let config = CrawlConfig {
            max_connections: *args.get_one::<usize>("threads").unwrap_or(&10),
            seed_workers: *args.get_one::<usize>("seed-workers").unwrap_or(&4),
            timeout: Duration::from_secs(*args.get_one::<u64>("timeout").unwrap_or(&10)),
            batch_timeout: args
                .get_one::<u64>("batch-timeout")
                .map(|secs| Duration::from_secs(*secs)),
            excluded_keywords,
            text_extraction,
            show_progress: !quiet && !args.get_flag("no-progress"),
        };

        Ok(Self {
            url: args.get_one::<String>("url").cloned(),
            input: args.get_one::<String>("input").map(|p| expand_path(p)),
            output,
            format,
            text_output,
            config,
        })
    }
}

/// Build extraction options from `--policy`, `--char-limit` and `--min-fragment`.
pub fn extract_options(args: &ArgMatches) -> Result<ExtractOptions> {
    let name = args
        .get_one::<String>("policy")
        .map(String::as_str)
        .unwrap_or("paragraphs");
    let policy =
        SelectorPolicy::from_str(name).ok_or_else(|| anyhow!("Unknown text policy '{}'", name))?;

    let mut options = ExtractOptions::for_policy(policy);
    if let Some(limit) = args.get_one::<usize>("char-limit") {
        options = options.with_char_limit(*limit);
    }
    if let Some(min) = args.get_one::<usize>("min-fragment") {
        options = options.with_min_fragment_len(*min);
    }
    Ok(options)
}

/// Load seeds, crawl them and write the exports. Returns the batch report.
pub async fn run_crawl(settings: &CrawlSettings) -> Result<BatchReport> {
    let seeds = load_seeds_from_source(settings.url.as_deref(), settings.input.as_deref())
        .context("Failed to load seed URLs")?;

    let mut engine = CrawlEngine::new(&settings.config).context("Failed to start crawler")?;
    let report = engine.run(&seeds).await;
    engine.shutdown().await;

    write_table(&to_rows(&report.edges), &settings.output, settings.format)
        .context("Failed to export link graph")?;

    if let Some(ref path) = settings.text_output {
        write_table(&text_rows(&report.pages), path, ExportFormat::from_path(path))
            .context("Failed to export extracted text")?;
    }

    Ok(report)
}

/// Fetch one page and return its extracted text.
pub async fn extract_page(url: &str, options: &ExtractOptions, timeout: Duration) -> Result<String> {
    let seed = SeedUrl::parse(url).with_context(|| format!("Cannot extract from '{}'", url))?;
    let crawler = Crawler::with_timeout(timeout).context("Failed to start crawler")?;
    let text = crawler
        .fetch_text(seed.as_str(), options)
        .await
        .with_context(|| format!("Failed to extract text from {}", seed))?;
    crawler.close();
    Ok(text)
}

fn print_divider() {
    eprintln!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_summary(report: &BatchReport, settings: &CrawlSettings) {
    let depth1: usize = report.seeds.iter().map(|s| s.depth1).sum();
    let depth2: usize = report.seeds.iter().map(|s| s.depth2).sum();

    eprintln!();
    print_divider();
    eprintln!("{}", "  CRAWL SUMMARY".bright_white().bold());
    print_divider();
    eprintln!(
        "{} {} seed(s) crawled, {} failed at the root",
        "✓".green().bold(),
        report.seeds.len(),
        report.failed_roots()
    );
    eprintln!(
        "{} {} depth-1 and {} depth-2 URLs ({} pages fetched, {} fetch failures)",
        "→".blue(),
        depth1,
        depth2,
        report.totals.pages_fetched,
        report.totals.fetch_failures
    );

    for seed in report.seeds.iter().filter(|s| s.root_error.is_some()) {
        eprintln!(
            "  {} {} {}",
            "•".yellow(),
            seed.seed.bright_white(),
            seed.root_error.as_deref().unwrap_or_default().dimmed()
        );
    }

    if report.timed_out {
        eprintln!(
            "{} Batch timeout reached; {} seed(s) not finished:",
            "⚠".yellow().bold(),
            report.unfinished.len()
        );
        for seed in &report.unfinished {
            eprintln!("  {} {}", "•".yellow(), seed);
        }
    }

    eprintln!(
        "{} Link graph written to {}",
        "✓".green().bold(),
        settings.output.display().to_string().bright_white()
    );
    if let Some(ref path) = settings.text_output {
        eprintln!(
            "{} Extracted text written to {}",
            "✓".green().bold(),
            path.display().to_string().bright_white()
        );
    }
}

pub async fn handle_crawl(sub_matches: &ArgMatches) -> Result<()> {
    init_logging(sub_matches.get_count("verbose"));

    let settings = CrawlSettings::from_matches(sub_matches)?;
    let quiet = sub_matches.get_flag("quiet");

    if !quiet {
        let source = match (&settings.input, &settings.url) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(url)) => url.clone(),
            (None, None) => String::new(),
        };
        eprintln!("{} Seeds: {}", "→".blue(), source.bright_white());
        eprintln!(
            "{} Connections: {}, seed workers: {}, timeout: {}s",
            "→".blue(),
            settings.config.max_connections,
            settings.config.seed_workers,
            settings.config.timeout.as_secs()
        );
    }

    let report = run_crawl(&settings).await?;

    if !quiet {
        print_summary(&report, &settings);
    }
    Ok(())
}

pub async fn handle_extract(sub_matches: &ArgMatches) -> Result<()> {
    init_logging(sub_matches.get_count("verbose"));

    let url = sub_matches
        .get_one::<String>("url")
        .ok_or_else(|| anyhow!("--url is required"))?;
    let options = extract_options(sub_matches)?;
    let timeout = Duration::from_secs(*sub_matches.get_one::<u64>("timeout").unwrap_or(&10));

    let text = extract_page(url, &options, timeout).await?;
    println!("{}", text);
    Ok(())
}
