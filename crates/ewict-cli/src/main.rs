use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use serde::Serialize;

use ewict_core::{Signal, StrategyParams};
use ewict_engine::parallel::{run_files, AssetRun};
use ewict_engine::BacktestResult;

#[derive(Parser, Debug)]
#[command(name = "ewict-backtest", about = "Swing-retracement backtest engine")]
struct Cli {
    /// Path to CSV bar data file(s), comma-separated
    #[arg(long)]
    candles: String,

    /// Path to TOML config file(s), comma-separated for merge
    #[arg(long)]
    config: Option<String>,

    /// Output file path (stdout if not specified)
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Omit per-signal detail from the JSON report
    #[arg(long)]
    no_signals: bool,
}

/// Top-level JSON report.
#[derive(Debug, Serialize)]
struct OutputReport {
    meta: OutputMeta,
    results: Vec<AssetReport>,
}

#[derive(Debug, Serialize)]
struct OutputMeta {
    files: Vec<String>,
    assets_run: usize,
    assets_failed: usize,
    elapsed_ms: u128,
}

#[derive(Debug, Serialize)]
struct AssetReport {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    backtest: Option<BacktestSummary>,
}

#[derive(Debug, Serialize)]
struct BacktestSummary {
    total_signals: usize,
    wins: usize,
    losses: usize,
    open: usize,
    win_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    signals: Option<Vec<Signal>>,
}

fn main() {
    let cli = Cli::parse();
    let start = Instant::now();

    let params = match load_params(cli.config.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let paths: Vec<PathBuf> = cli
        .candles
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect();
    if paths.is_empty() {
        eprintln!("No candle files specified");
        std::process::exit(1);
    }

    eprintln!("Running {} asset(s)...", paths.len());
    let run_start = Instant::now();
    let runs = run_files(&paths, &params);
    eprintln!(
        "Backtest complete in {:.1}ms",
        run_start.elapsed().as_secs_f64() * 1000.0
    );

    let elapsed = start.elapsed();
    let report = build_report(&paths, &runs, !cli.no_signals, elapsed.as_millis());

    print_summary(&report);

    let json = serde_json::to_string_pretty(&report).expect("JSON serialization failed");

    if let Some(output_path) = &cli.output_file {
        if let Err(e) = std::fs::write(output_path, &json) {
            eprintln!("Failed to write {:?}: {}", output_path, e);
            std::process::exit(1);
        }
        eprintln!("Results written to {:?}", output_path);
    } else {
        println!("{}", json);
    }

    eprintln!("\nTotal elapsed: {:.1}ms", elapsed.as_secs_f64() * 1000.0);

    if runs.iter().all(|r| r.outcome.is_err()) {
        std::process::exit(1);
    }
}

fn load_params(config: Option<&str>) -> Result<StrategyParams, ewict_core::ConfigError> {
    match config {
        Some(spec) => {
            let config_paths: Vec<PathBuf> = spec.split(',').map(PathBuf::from).collect();
            let config_refs: Vec<&std::path::Path> =
                config_paths.iter().map(|p| p.as_path()).collect();
            StrategyParams::from_toml_files(&config_refs)
        }
        None => Ok(StrategyParams::default()),
    }
}

fn build_report(
    paths: &[PathBuf],
    runs: &[AssetRun],
    include_signals: bool,
    elapsed_ms: u128,
) -> OutputReport {
    let results: Vec<AssetReport> = runs
        .iter()
        .map(|run| match &run.outcome {
            Ok(result) => AssetReport {
                name: run.name.clone(),
                error: None,
                backtest: Some(summarize_result(result, include_signals)),
            },
            Err(e) => AssetReport {
                name: run.name.clone(),
                error: Some(e.to_string()),
                backtest: None,
            },
        })
        .collect();

    let assets_failed = results.iter().filter(|r| r.error.is_some()).count();

    OutputReport {
        meta: OutputMeta {
            files: paths.iter().map(|p| p.display().to_string()).collect(),
            assets_run: results.len(),
            assets_failed,
            elapsed_ms,
        },
        results,
    }
}

fn summarize_result(result: &BacktestResult, include_signals: bool) -> BacktestSummary {
    BacktestSummary {
        total_signals: result.total,
        wins: result.wins,
        losses: result.losses,
        open: result.open,
        win_rate: result.win_rate,
        signals: include_signals.then(|| result.signals.clone()),
    }
}

fn print_summary(report: &OutputReport) {
    eprintln!("\n{}", "=".repeat(72));
    eprintln!("Backtest Results");
    eprintln!("{}", "=".repeat(72));
    eprintln!(
        "Assets: {} ({} failed) | Elapsed: {}ms",
        report.meta.assets_run, report.meta.assets_failed, report.meta.elapsed_ms
    );
    eprintln!("{}", "-".repeat(72));
    eprintln!(
        "{:<20} {:>8} {:>8} {:>8} {:>8} {:>9}",
        "Asset", "Signals", "Wins", "Losses", "Open", "WinRate"
    );
    eprintln!("{}", "-".repeat(72));

    for r in &report.results {
        match (&r.backtest, &r.error) {
            (Some(b), _) => {
                eprintln!(
                    "{:<20} {:>8} {:>8} {:>8} {:>8} {:>8.1}%",
                    r.name, b.total_signals, b.wins, b.losses, b.open, b.win_rate
                );
            }
            (None, Some(e)) => {
                eprintln!("{:<20} ERROR: {}", r.name, e);
            }
            (None, None) => {}
        }
    }

    eprintln!("{}", "=".repeat(72));
}
