//! Backtest engine: outcome resolution, aggregation, and parallel
//! batch execution.

pub mod engine;
pub mod parallel;
pub mod resolver;

pub use engine::{summarize, BacktestEngine, BacktestResult};
pub use parallel::{run_files, run_param_sets, AssetRun, RunError};
pub use resolver::resolve;
