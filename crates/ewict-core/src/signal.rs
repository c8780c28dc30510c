use serde::Serialize;

/// Trade direction. Long is the common case; shorts are the mirrored
/// rule set enabled via `enable_shorts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

/// Terminal state of a signal after the forward scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Neither stop nor target touched before history ran out.
    Open,
    Win,
    Loss,
}

/// A hypothetical trade emitted by the generator and resolved exactly
/// once by the outcome resolver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Signal {
    /// Entry bar index into the bar series.
    pub bar: usize,
    pub direction: Direction,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub outcome: Outcome,
}

impl Signal {
    pub fn new(bar: usize, direction: Direction, entry: f64, stop: f64, target: f64) -> Self {
        Self {
            bar,
            direction,
            entry,
            stop,
            target,
            outcome: Outcome::Open,
        }
    }
}
