use ewict_core::{BarSeries, Direction, Outcome, Signal};

/// Walk the bars after the entry bar and decide how the trade ended.
///
/// The stop is checked before the target on every bar, so a bar whose
/// range straddles both levels resolves as a loss. A signal whose
/// history runs out first stays open.
pub fn resolve(signal: &Signal, bars: &BarSeries) -> Outcome {
    for i in (signal.bar + 1)..bars.len() {
        match signal.direction {
            Direction::Long => {
                if bars.low[i] <= signal.stop {
                    return Outcome::Loss;
                }
                if bars.high[i] >= signal.target {
                    return Outcome::Win;
                }
            }
            Direction::Short => {
                if bars.high[i] >= signal.stop {
                    return Outcome::Loss;
                }
                if bars.low[i] <= signal.target {
                    return Outcome::Win;
                }
            }
        }
    }
    Outcome::Open
}
