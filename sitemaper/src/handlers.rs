use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use sitemaper_core::{
    CrawlOptions, CrawlSummary, Datasource, execute_crawl, load_sources, select_sources,
};
use sitemaper_scanner::config::{
    DEFAULT_ATTEMPTS, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES, DEFAULT_RETRY_DELAY_SECS,
    DEFAULT_TIMEOUT_SECS,
};
use sitemaper_scanner::{CrawlLimits, FetchConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::Level;
use url::Url;

pub fn print_banner() {
    println!(
        "{} {}",
        "sitemaper".bright_cyan().bold(),
        env!("CARGO_PKG_VERSION").bright_black()
    );
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

/// Log to stderr so the spinner and summary on stdout stay readable.
pub fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

// Helper functions for crawl handler

/// Expand a leading `~` in a user supplied output path
pub fn expand_output_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

fn patterns(args: &ArgMatches, id: &str) -> Vec<String> {
    args.get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

/// Sites to crawl, from either `--url` or `--sources-file`
pub fn datasources_from_args(args: &ArgMatches) -> anyhow::Result<Vec<Datasource>> {
    let exclude = patterns(args, "exclude");
    let must_include = patterns(args, "must-include");

    if let Some(sources_file) = args.get_one::<PathBuf>("sources-file") {
        let sources = load_sources(sources_file)
            .with_context(|| format!("failed to load {}", sources_file.display()))?;
        let mut sources = select_sources(sources, args.get_one::<String>("source").map(String::as_str))?;

        for source in &mut sources {
            source.output = source
                .output
                .take()
                .map(|p| expand_output_path(&p.to_string_lossy()));
            source.filters.exclude.extend(exclude.iter().cloned());
            source.filters.must_include.extend(must_include.iter().cloned());
        }
        return Ok(sources);
    }

    let Some(url) = args.get_one::<Url>("url") else {
        bail!("Either --url or --sources-file must be provided");
    };

    let mut source = Datasource::new(url.as_str());
    source.seed_url = args.get_one::<Url>("seed").map(|seed| seed.to_string());
    source.output = args.get_one::<String>("output").map(|p| expand_output_path(p));
    source.filters.exclude = exclude;
    source.filters.must_include = must_include;

    Ok(vec![source])
}

pub fn fetch_config_from_args(args: &ArgMatches) -> FetchConfig {
    let timeout = args.get_one::<u64>("timeout").copied().unwrap_or(DEFAULT_TIMEOUT_SECS);
    let attempts = args.get_one::<u32>("attempts").copied().unwrap_or(DEFAULT_ATTEMPTS);
    let retry_delay = args
        .get_one::<u64>("retry-delay")
        .copied()
        .unwrap_or(DEFAULT_RETRY_DELAY_SECS);

    FetchConfig::default()
        .with_timeout(Duration::from_secs(timeout))
        .with_attempts(attempts)
        .with_retry_delay(Duration::from_secs(retry_delay))
}

pub fn limits_from_args(args: &ArgMatches) -> CrawlLimits {
    CrawlLimits {
        max_depth: args.get_one::<usize>("max-depth").copied().unwrap_or(DEFAULT_MAX_DEPTH),
        max_pages: args.get_one::<usize>("max-pages").copied().unwrap_or(DEFAULT_MAX_PAGES),
    }
}

/// Plain text summary of one finished crawl
pub fn generate_crawl_report(summary: &CrawlSummary) -> String {
    let mut report = String::new();
    report.push_str(&format!("{}\n", "═".repeat(60)));
    report.push_str(&format!("Sitemap for {}\n", summary.base_url));
    report.push_str(&format!("{}\n", "═".repeat(60)));
    report.push_str(&format!("  Pages visited: {}\n", summary.visited()));
    report.push_str(&format!("  Pages written: {}\n", summary.written));
    report.push_str(&format!("  Filtered out: {}\n", summary.filtered_out()));
    report.push_str(&format!("  Last modified: {}\n", summary.lastmod));
    report.push_str(&format!("  Output: {}\n", summary.output.display()));
    report
}

/// One line per datasource: name, base URL and output file
pub fn format_sources(sources: &[Datasource]) -> String {
    let mut listing = String::new();
    for source in sources {
        listing.push_str(&format!(
            "{:<24} {} -> {}\n",
            source.name,
            source.base_url,
            source.output_path().display()
        ));
        if !source.filters.exclude.is_empty() {
            listing.push_str(&format!("{:<24} exclude: {}\n", "", source.filters.exclude.join(", ")));
        }
        if !source.filters.must_include.is_empty() {
            listing.push_str(&format!(
                "{:<24} must include: {}\n",
                "",
                source.filters.must_include.join(", ")
            ));
        }
    }
    listing
}

/// Raise `stop_flag` on Ctrl-C so the running crawl writes what it has.
/// A second Ctrl-C exits immediately.
fn stop_on_ctrl_c(stop_flag: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!(
            "\n{} interrupted, writing partial sitemap (Ctrl-C again to quit)",
            "⚠️".yellow()
        );
        stop_flag.store(true, Ordering::SeqCst);

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{} aborted", "✗".red().bold());
            std::process::exit(130);
        }
    });
}

pub async fn run_crawl(args: &ArgMatches, quiet: bool) -> anyhow::Result<Vec<CrawlSummary>> {
    let sources = datasources_from_args(args)?;
    let fetch = fetch_config_from_args(args);
    let limits = limits_from_args(args);
    let include_titles = !args.get_flag("no-titles");

    let stop_flag = Arc::new(AtomicBool::new(false));
    stop_on_ctrl_c(stop_flag.clone());

    let mut summaries = Vec::with_capacity(sources.len());
    for source in sources {
        if stop_flag.load(Ordering::SeqCst) {
            break;
        }

        if !quiet {
            println!("\n🕷️  make sitemap for {}", source.base_url.bright_white().bold());
            println!("Seed: {}", source.seed());
            println!("Max depth: {}, max pages: {}\n", limits.max_depth, limits.max_pages);
        }

        let base_url = source.base_url.clone();
        let options = CrawlOptions {
            source,
            fetch: fetch.clone(),
            limits,
            include_titles,
            show_progress_bars: !quiet,
            stop_flag: Some(stop_flag.clone()),
        };

        let summary = execute_crawl(options)
            .await
            .with_context(|| format!("sitemap for {} failed", base_url))?;
        summaries.push(summary);
    }

    Ok(summaries)
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) {
    let summaries = match run_crawl(sub_matches, quiet).await {
        Ok(summaries) => summaries,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    if quiet {
        return;
    }

    for summary in &summaries {
        println!("\n{} Crawl complete!\n", "✓".green().bold());
        print!("{}", generate_crawl_report(summary));
    }
}

pub fn handle_sources(sub_matches: &ArgMatches) {
    let Some(path) = sub_matches.get_one::<PathBuf>("sources-file") else {
        unreachable!("clap should ensure we don't get here");
    };

    match load_sources(path) {
        Ok(sources) => {
            print_divider();
            println!("{}", format!("Sources in {}", path.display()).bright_white().bold());
            print_divider();
            print!("{}", format_sources(&sources));
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}
