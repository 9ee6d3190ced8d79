//! CANSLIM CLI: screen, universe and cache management commands.
//!
//! Commands:
//! - `screen`: run the CANSLIM screen over tickers, a universe file or every US listing
//! - `universe`: download the US ticker list and save it as a TOML universe
//! - `cache status`: report cached symbols, date ranges and sizes

use anyhow::{bail, Context, Result};
use canslim_core::data::{
    CircuitBreaker, DataProvider, FundamentalsProvider, ParquetCache, Universe, YahooProvider,
    DEFAULT_TICKER_LIST_URL,
};
use canslim_runner::{
    write_report_json, write_results_csv, BatchReport, BatchRunner, LogProgress, ScreenerConfig,
};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "canslim", about = "CANSLIM growth stock screener")]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen tickers against the CANSLIM criteria and write passing stocks to CSV.
    Screen {
        /// Tickers to screen (e.g., NVDA CELH SMCI).
        tickers: Vec<String>,

        /// TOML universe file of ticker groups.
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Screen only this group of the universe file.
        #[arg(long, requires = "universe")]
        group: Option<String>,

        /// Screen every NASDAQ, NYSE and AMEX listing.
        #[arg(long, default_value_t = false)]
        all_us: bool,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Benchmark symbol (default ^GSPC).
        #[arg(long)]
        benchmark: Option<String>,

        /// CSV output path (default canslim_results.csv).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also write the full batch report as JSON.
        #[arg(long)]
        report: Option<PathBuf>,

        /// Offline mode: price history from the cache only.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Worker threads.
        #[arg(long)]
        parallelism: Option<usize>,

        /// Minimum milliseconds between provider requests.
        #[arg(long)]
        throttle_ms: Option<u64>,
    },
    /// Download the US ticker list and save it as a TOML universe.
    Universe {
        /// Plain-text ticker list URL, one symbol per line.
        #[arg(long, default_value = DEFAULT_TICKER_LIST_URL)]
        url: String,

        /// Output TOML file.
        #[arg(long)]
        output: PathBuf,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached symbols, date ranges and sizes.
    Status {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
}

/// Overrides from `screen` flags.
struct ScreenArgs {
    tickers: Vec<String>,
    universe: Option<PathBuf>,
    group: Option<String>,
    all_us: bool,
    config: Option<PathBuf>,
    benchmark: Option<String>,
    output: Option<PathBuf>,
    report: Option<PathBuf>,
    offline: bool,
    parallelism: Option<usize>,
    throttle_ms: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Screen {
            tickers,
            universe,
            group,
            all_us,
            config,
            benchmark,
            output,
            report,
            offline,
            parallelism,
            throttle_ms,
        } => run_screen(ScreenArgs {
            tickers,
            universe,
            group,
            all_us,
            config,
            benchmark,
            output,
            report,
            offline,
            parallelism,
            throttle_ms,
        }),
        Commands::Universe { url, output } => run_universe(&url, &output),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
        },
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

fn run_screen(args: ScreenArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ScreenerConfig::from_file(path)?,
        None => ScreenerConfig::default(),
    };
    if let Some(benchmark) = args.benchmark {
        config.screen.benchmark = benchmark;
    }
    if let Some(output) = args.output {
        config.output.csv_path = output;
    }
    if let Some(parallelism) = args.parallelism {
        config.batch.parallelism = parallelism;
    }
    if let Some(throttle_ms) = args.throttle_ms {
        config.batch.throttle_ms = throttle_ms;
    }
    config.data.offline |= args.offline;
    config.validate()?;

    let universe = args
        .universe
        .as_deref()
        .map(Universe::from_file)
        .transpose()?;
    let tickers = collect_tickers(
        &args.tickers,
        universe.as_ref().map(|u| (u, args.group.as_deref())),
        args.all_us,
    )?;
    if tickers.is_empty() {
        bail!("no tickers to screen: pass tickers, --universe FILE or --all-us");
    }

    let yahoo = Arc::new(YahooProvider::new(Arc::new(
        CircuitBreaker::default_provider(),
    ))?);
    let fundamentals: Arc<dyn FundamentalsProvider> = yahoo.clone();
    let prices: Option<Arc<dyn DataProvider>> = if config.data.offline {
        None
    } else {
        Some(yahoo)
    };

    let today = chrono::Local::now().date_naive();
    let runner = BatchRunner::new(&config, fundamentals, prices, today);
    let report = runner.run(&tickers, Some(&LogProgress))?;

    write_results_csv(&report.results, &config.output.csv_path)?;
    if let Some(path) = &args.report {
        write_report_json(&report, path)?;
    }

    print_summary(&report, &config.output.csv_path);
    Ok(())
}

/// Explicit tickers first, then the universe (one group or all of it), then
/// the remote list. Duplicates keep their first position.
fn collect_tickers(
    explicit: &[String],
    universe: Option<(&Universe, Option<&str>)>,
    all_us: bool,
) -> Result<Vec<String>> {
    let mut tickers: Vec<String> = explicit.iter().map(|t| t.trim().to_uppercase()).collect();

    match universe {
        Some((u, Some(group))) => {
            let Some(members) = u.group_tickers(group) else {
                bail!(
                    "universe has no group '{group}' (available: {})",
                    u.group_names().join(", ")
                );
            };
            tickers.extend(members.iter().cloned());
        }
        Some((u, None)) => tickers.extend(u.all_tickers().into_iter().map(String::from)),
        None => {}
    }
    if all_us {
        let u = Universe::fetch_remote(DEFAULT_TICKER_LIST_URL)?;
        tickers.extend(u.all_tickers().into_iter().map(String::from));
    }

    let mut seen = HashSet::new();
    tickers.retain(|t| !t.is_empty() && seen.insert(t.clone()));
    Ok(tickers)
}

fn run_universe(url: &str, output: &Path) -> Result<()> {
    let universe = Universe::fetch_remote(url)?;
    let toml = universe.to_toml()?;
    std::fs::write(output, toml)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "Saved {} tickers to {}",
        universe.ticker_count(),
        output.display()
    );
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = ParquetCache::new(cache_dir);
    let symbols = cache.cached_symbols();
    if symbols.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let refs: Vec<&str> = symbols.iter().map(String::as_str).collect();
    let mut total_size: u64 = 0;
    let mut rows: Vec<(String, String, String, String, u64)> = Vec::new();

    for status in cache.status(&refs) {
        let size = dir_size(&cache_dir.join(format!("symbol={}", status.symbol)));
        total_size += size;

        let range = match (status.start_date, status.end_date) {
            (Some(start), Some(end)) => format!("{start} to {end}"),
            _ => "(no meta)".into(),
        };
        let bars = status
            .bar_count
            .map_or_else(|| "-".into(), |n| format!("{n} bars"));
        let cached_at = status
            .cached_at
            .map_or_else(|| "-".into(), |t| t.format("%Y-%m-%d %H:%M").to_string());

        rows.push((status.symbol, range, bars, cached_at, size));
    }

    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", rows.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!(
        "{:<8} {:<25} {:<10} {:<17} {:>10}",
        "Symbol", "Date Range", "Bars", "Cached At (UTC)", "Size"
    );
    println!("{}", "-".repeat(74));
    for (sym, range, bars, cached_at, size) in &rows {
        println!(
            "{:<8} {:<25} {:<10} {:<17} {:>10}",
            sym,
            range,
            bars,
            cached_at,
            format_size(*size)
        );
    }

    Ok(())
}

fn dir_size(path: &Path) -> u64 {
    std::fs::read_dir(path)
        .map(|entries| {
            entries
                .flatten()
                .filter_map(|e| e.metadata().ok())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0)
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn print_summary(report: &BatchReport, csv_path: &Path) {
    println!();
    println!("=== Screen Result ===");
    println!("Benchmark:      {}", report.benchmark);
    println!("Evaluated:      {}", report.evaluated);
    println!("Skipped:        {}", report.skipped.len());
    println!("Elapsed:        {:.1}s", report.elapsed_secs);

    if !report.rejections.is_empty() {
        println!();
        println!("--- Rejections ---");
        for (criterion, count) in &report.rejections {
            println!("{:<26}{count}", format!("{criterion}:"));
        }
    }

    if !report.results.is_empty() {
        println!();
        println!(
            "{:<8} {:>9} {:>9} {:>14} {:>7} {:>5}",
            "Ticker", "Qtr EPS%", "Ann EPS%", "Shares", "Inst%", "BoB"
        );
        println!("{}", "-".repeat(57));
        for r in &report.results {
            println!(
                "{:<8} {:>9.1} {:>9.1} {:>14} {:>7.1} {:>5}",
                r.ticker,
                r.quarterly_eps_growth_pct,
                r.annual_eps_growth_pct,
                r.shares_outstanding,
                r.institutional_ownership_pct,
                if r.has_base_on_base { "yes" } else { "no" }
            );
        }
    }

    println!();
    println!("Passing stocks: {}", report.passed());
    println!("Results written to {}", csv_path.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_screen_flags() {
        let cli = Cli::try_parse_from([
            "canslim",
            "screen",
            "nvda",
            "CELH",
            "--benchmark",
            "SPY",
            "--parallelism",
            "4",
            "--offline",
        ])
        .unwrap();
        match cli.command {
            Commands::Screen {
                tickers,
                benchmark,
                parallelism,
                offline,
                ..
            } => {
                assert_eq!(tickers, vec!["nvda", "CELH"]);
                assert_eq!(benchmark.as_deref(), Some("SPY"));
                assert_eq!(parallelism, Some(4));
                assert!(offline);
            }
            _ => panic!("expected screen command"),
        }
    }

    #[test]
    fn cache_status_defaults_to_data_dir() {
        let cli = Cli::try_parse_from(["canslim", "cache", "status"]).unwrap();
        match cli.command {
            Commands::Cache {
                action: CacheAction::Status { cache_dir },
            } => assert_eq!(cache_dir, PathBuf::from("data")),
            _ => panic!("expected cache status"),
        }
    }

    #[test]
    fn explicit_tickers_are_normalized_and_deduplicated() {
        let tickers = collect_tickers(
            &["nvda".into(), " CELH ".into(), "NVDA".into(), "".into()],
            None,
            false,
        )
        .unwrap();
        assert_eq!(tickers, vec!["NVDA", "CELH"]);
    }

    fn universe() -> Universe {
        Universe::from_toml(
            r#"
            [groups]
            growth = ["NVDA", "CELH"]
            watchlist = ["SMCI", "NVDA"]
            "#,
        )
        .unwrap()
    }

    #[test]
    fn universe_group_selects_its_members() {
        let u = universe();
        let tickers =
            collect_tickers(&["AAPL".into()], Some((&u, Some("watchlist"))), false).unwrap();
        assert_eq!(tickers, vec!["AAPL", "SMCI", "NVDA"]);

        let all = collect_tickers(&[], Some((&u, None)), false).unwrap();
        assert_eq!(all, vec!["NVDA", "CELH", "SMCI"]);
    }

    #[test]
    fn unknown_group_lists_available_groups() {
        let u = universe();
        let err = collect_tickers(&[], Some((&u, Some("value"))), false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "universe has no group 'value' (available: growth, watchlist)"
        );
    }

    #[test]
    fn group_requires_universe() {
        assert!(Cli::try_parse_from(["canslim", "screen", "--group", "growth"]).is_err());
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
