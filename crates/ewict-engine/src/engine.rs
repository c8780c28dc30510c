use serde::Serialize;

use ewict_core::{find_pivots, BarSeries, Outcome, Signal, StrategyParams};
use ewict_strategy::SignalGenerator;

use crate::resolver::resolve;

/// Aggregated result of one backtest run.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    /// Every signal the generator emitted, resolved or not.
    pub total: usize,
    pub wins: usize,
    pub losses: usize,
    /// Signals still unresolved when history ran out.
    pub open: usize,
    /// Percentage of wins among resolved trades. Zero when nothing
    /// resolved.
    pub win_rate: f64,
    pub signals: Vec<Signal>,
}

/// Count outcomes and compute the win rate over resolved trades only.
pub fn summarize(signals: Vec<Signal>) -> BacktestResult {
    let mut wins = 0usize;
    let mut losses = 0usize;
    let mut open = 0usize;
    for signal in &signals {
        match signal.outcome {
            Outcome::Win => wins += 1,
            Outcome::Loss => losses += 1,
            Outcome::Open => open += 1,
        }
    }

    let resolved = wins + losses;
    let win_rate = if resolved > 0 {
        wins as f64 / resolved as f64 * 100.0
    } else {
        0.0
    };

    BacktestResult {
        total: signals.len(),
        wins,
        losses,
        open,
        win_rate,
        signals,
    }
}

/// Ties the pipeline together: pivot scan, signal generation, outcome
/// resolution, aggregation.
pub struct BacktestEngine {
    params: StrategyParams,
}

impl BacktestEngine {
    pub fn new(params: &StrategyParams) -> Self {
        Self {
            params: params.clone(),
        }
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    /// Run the full pipeline over one bar series.
    pub fn run(&self, bars: &BarSeries) -> BacktestResult {
        let pivots = find_pivots(
            &bars.high,
            &bars.low,
            self.params.swing_depth,
            self.params.swing_deviation_pct,
        );

        let generator = SignalGenerator::new(&self.params);
        let mut signals = generator.generate(bars, &pivots);
        for signal in &mut signals {
            signal.outcome = resolve(signal, bars);
        }

        summarize(signals)
    }
}

impl Default for BacktestEngine {
    fn default() -> Self {
        Self::new(&StrategyParams::default())
    }
}
