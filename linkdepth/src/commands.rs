use crate::CLAP_STYLING;
use clap::{arg, command};
use linkdepth::handlers::DEFAULT_OUTPUT;

/// Flags shared by `crawl --extract-text` and `extract`.
fn extraction_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(--"policy" <POLICY>)
            .required(false)
            .help("Text selection policy: paragraphs (<p> text) or heuristic (long fragments)")
            .value_parser(["paragraphs", "heuristic"])
            .default_value("paragraphs"),
    )
    .arg(
        arg!(--"char-limit" <CHARS>)
            .required(false)
            .help("Truncate extracted text to this many characters (default: 5000 paragraphs, 2000 heuristic)")
            .value_parser(clap::value_parser!(usize)),
    )
    .arg(
        arg!(--"min-fragment" <CHARS>)
            .required(false)
            .help("Shortest text fragment kept by the heuristic policy")
            .value_parser(clap::value_parser!(usize)),
    )
    .arg(
        arg!(--"timeout" <SECONDS>)
            .required(false)
            .help("Per-request timeout in seconds")
            .value_parser(clap::value_parser!(u64))
            .default_value("10"),
    )
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("linkdepth")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("linkdepth")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Increase log verbosity (-v info, -vv debug)")
                .required(false)
                .action(clap::ArgAction::Count)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(extraction_args(
            command!("crawl")
                .about(
                    "Crawl seed URLs two links deep, staying under each seed's path, and export \
                the link graph.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("A single seed URL to crawl")
                        .conflicts_with("input"),
                )
                .arg(
                    arg!(-i --"input" <PATH>)
                        .required(false)
                        .help("CSV file with a 'URL' column of seed URLs")
                        .conflicts_with("url"),
                )
                .group(
                    clap::ArgGroup::new("seeds")
                        .args(["url", "input"])
                        .required(true),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Where to write the link graph")
                        .default_value(DEFAULT_OUTPUT),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Output format: xlsx, csv, json (default: from the output extension)")
                        .value_parser(["xlsx", "csv", "json"]),
                )
                .arg(
                    arg!(-t --"threads" <NUM_CONNECTIONS>)
                        .required(false)
                        .help("Maximum requests in flight across all seeds")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"seed-workers" <NUM_SEEDS>)
                        .required(false)
                        .help("Number of seeds crawled at the same time")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("4"),
                )
                .arg(
                    arg!(--"batch-timeout" <SECONDS>)
                        .required(false)
                        .help("Stop the whole batch after this many seconds, keeping finished seeds")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"exclude" <KEYWORD>)
                        .required(false)
                        .help(
                            "Skip URLs containing this keyword (repeatable, replaces the default \
                        login/signup/register/account/password set)",
                        )
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(--"extract-text")
                        .required(false)
                        .help("Also extract text from the root and depth-1 pages")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"text-output" <PATH>)
                        .required(false)
                        .help("Where to write extracted text (default: <output>_text.<ext>)")
                        .requires("extract-text"),
                )
                .arg(
                    arg!(--"no-progress")
                        .required(false)
                        .help("Disable the progress spinner")
                        .action(clap::ArgAction::SetTrue),
                ),
        ))
        .subcommand(extraction_args(
            command!("extract")
                .about("Fetch a single page and print its extracted text")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The page to extract text from"),
                ),
        ))
}
