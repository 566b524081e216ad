pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod input;

pub use batch::{BatchReport, CrawlEngine, SeedSummary, run_batch};
pub use config::CrawlConfig;
pub use error::{CoreError, Result};

use colored::Colorize;

pub fn print_banner() {
    let banner = r#"
  _ _       _          _            _   _
 | (_)_ __ | | ____ __| | ___ _ __ | |_| |__
 | | | '_ \| |/ / _` |/ _ \ '_ \| __| '_ \
 | | | | | |   < (_| |  __/ |_) | |_| | | |
 |_|_|_| |_|_|\_\__,_|\___| .__/ \__|_| |_|
                          |_|"#;
    eprintln!("{}", banner.bright_cyan().bold());
    eprintln!(
        "  {} {}\n",
        "two links deep, nothing more".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
