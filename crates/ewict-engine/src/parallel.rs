use std::fmt;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use ewict_core::bar::CsvError;
use ewict_core::{BarSeries, StrategyParams};

use crate::engine::{BacktestEngine, BacktestResult};

/// Why a single asset run failed. Other assets in the same batch are
/// unaffected.
#[derive(Debug)]
pub enum RunError {
    Csv { path: PathBuf, source: CsvError },
    EmptySeries { path: PathBuf },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Csv { path, source } => {
                write!(f, "failed to load {}: {}", path.display(), source)
            }
            RunError::EmptySeries { path } => {
                write!(f, "{} contains no bars", path.display())
            }
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Csv { source, .. } => Some(source),
            RunError::EmptySeries { .. } => None,
        }
    }
}

/// Outcome of one asset in a batch run.
#[derive(Debug)]
pub struct AssetRun {
    /// File stem of the source CSV.
    pub name: String,
    pub outcome: Result<BacktestResult, RunError>,
}

/// Run one bar series against many parameter sets in parallel.
///
/// Results come back in input order regardless of scheduling.
pub fn run_param_sets(bars: &BarSeries, param_sets: &[StrategyParams]) -> Vec<BacktestResult> {
    param_sets
        .par_iter()
        .map(|params| BacktestEngine::new(params).run(bars))
        .collect()
}

/// Load and backtest many CSV files in parallel with one parameter set.
///
/// A file that fails to load yields an `Err` entry; the rest of the
/// batch still runs.
pub fn run_files(paths: &[PathBuf], params: &StrategyParams) -> Vec<AssetRun> {
    paths
        .par_iter()
        .map(|path| AssetRun {
            name: file_stem(path),
            outcome: run_one_file(path, params),
        })
        .collect()
}

fn run_one_file(path: &Path, params: &StrategyParams) -> Result<BacktestResult, RunError> {
    let bars = BarSeries::from_csv(path).map_err(|source| RunError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    if bars.is_empty() {
        return Err(RunError::EmptySeries {
            path: path.to_path_buf(),
        });
    }
    Ok(BacktestEngine::new(params).run(&bars))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
