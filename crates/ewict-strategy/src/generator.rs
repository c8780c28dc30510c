use ewict_core::indicators::atr;
use ewict_core::{BarSeries, Direction, Pivot, PivotKind, Signal, StrategyParams};

use crate::filters::FilterSet;

/// The swing range a retracement entry is measured against, derived on
/// demand from the trailing two or three pivots.
#[derive(Debug, Clone, Copy)]
struct SwingZone {
    swing_high: f64,
    swing_low: f64,
    fib_price: f64,
}

/// Emits retracement entry signals from a pivot sequence and the bar
/// series, gating each candidate bar through the configured filter set
/// and the minimum signal gap.
pub struct SignalGenerator {
    params: StrategyParams,
}

impl SignalGenerator {
    pub fn new(params: &StrategyParams) -> Self {
        Self {
            params: params.clone(),
        }
    }

    /// Scan every candidate bar and emit at most one signal per bar.
    ///
    /// Long setups are checked before short ones. The last bar is never
    /// a candidate: a signal there could not be resolved against any
    /// following bar.
    pub fn generate(&self, bars: &BarSeries, pivots: &[Pivot]) -> Vec<Signal> {
        let n = bars.len();
        let start = self.params.swing_depth + 1;
        if n < 2 || start >= n - 1 {
            return Vec::new();
        }

        let filters = FilterSet::new(&self.params, bars);
        let atr_series = if self.params.use_atr_tolerance || self.params.use_atr_take_profit {
            atr(&bars.high, &bars.low, &bars.close, self.params.atr_period)
        } else {
            Vec::new()
        };

        let gap = self.params.min_signal_gap as i64;
        let mut last_signal_bar: i64 = -gap - 1;
        let mut signals = Vec::new();
        // Pivots visible at bar i are pivots[..visible]; the cursor only
        // moves forward as i does.
        let mut visible = 0usize;

        for i in start..(n - 1) {
            while visible < pivots.len() && pivots[visible].bar <= i {
                visible += 1;
            }
            if i as i64 - last_signal_bar <= gap {
                continue;
            }

            let recent = &pivots[..visible];
            for direction in [Direction::Long, Direction::Short] {
                if direction == Direction::Short && !self.params.enable_shorts {
                    continue;
                }
                let zone = match swing_zone(recent, direction, self.params.retracement_level) {
                    Some(z) => z,
                    None => continue,
                };
                if !self.at_retracement(bars, i, &zone, direction, &atr_series) {
                    continue;
                }
                if !filters.passes(bars, i, direction) {
                    continue;
                }
                if let Some(signal) = self.build_signal(bars, i, &zone, direction, &atr_series) {
                    signals.push(signal);
                    last_signal_bar = i as i64;
                    break;
                }
            }
        }

        signals
    }

    /// True when the bar dipped into the retracement zone but closed
    /// back inside its far tolerance bound.
    fn at_retracement(
        &self,
        bars: &BarSeries,
        i: usize,
        zone: &SwingZone,
        direction: Direction,
        atr_series: &[f64],
    ) -> bool {
        let tolerance = self.tolerance(zone, i, atr_series);
        match direction {
            Direction::Long => {
                bars.low[i] <= zone.fib_price + tolerance
                    && bars.close[i] >= zone.fib_price - tolerance
            }
            Direction::Short => {
                bars.high[i] >= zone.fib_price - tolerance
                    && bars.close[i] <= zone.fib_price + tolerance
            }
        }
    }

    fn tolerance(&self, zone: &SwingZone, i: usize, atr_series: &[f64]) -> f64 {
        let range = zone.swing_high - zone.swing_low;
        if self.params.use_atr_tolerance {
            let value = atr_series[i];
            if !value.is_nan() {
                return value * self.params.atr_tolerance_mult;
            }
            // ATR still warming up: fall back to the range fraction.
        }
        range * self.params.retracement_tolerance
    }

    fn build_signal(
        &self,
        bars: &BarSeries,
        i: usize,
        zone: &SwingZone,
        direction: Direction,
        atr_series: &[f64],
    ) -> Option<Signal> {
        let range = zone.swing_high - zone.swing_low;
        let buffer = range * self.params.stop_buffer_frac;
        let entry = if self.params.enter_at_retracement {
            zone.fib_price
        } else {
            bars.close[i]
        };

        let (stop, risk) = match direction {
            Direction::Long => {
                let stop = zone.swing_low - buffer;
                (stop, entry - stop)
            }
            Direction::Short => {
                let stop = zone.swing_high + buffer;
                (stop, stop - entry)
            }
        };
        if risk <= 0.0 {
            return None;
        }

        let reward = if self.params.use_atr_take_profit {
            match atr_series.get(i) {
                Some(v) if !v.is_nan() => v * self.params.atr_take_profit_mult,
                _ => risk * self.params.risk_reward_ratio,
            }
        } else {
            risk * self.params.risk_reward_ratio
        };

        let target = match direction {
            Direction::Long => entry + reward,
            Direction::Short => entry - reward,
        };

        Some(Signal::new(i, direction, entry, stop, target))
    }
}

/// Derive the swing range from the trailing pivots.
///
/// Long: the last two pivots are (LOW, HIGH), or the last three are
/// (LOW, HIGH, LOW) for a retracement already in progress. Short is the
/// mirror. Rejected when no ordering matches or the range is inverted.
fn swing_zone(pivots: &[Pivot], direction: Direction, level: f64) -> Option<SwingZone> {
    if pivots.len() < 2 {
        return None;
    }
    let p0 = pivots[pivots.len() - 1];
    let p1 = pivots[pivots.len() - 2];

    let (swing_high, swing_low) = match direction {
        Direction::Long => {
            if p1.kind == PivotKind::Low && p0.kind == PivotKind::High {
                (p0.price, p1.price)
            } else if pivots.len() >= 3 {
                let p2 = pivots[pivots.len() - 3];
                if p2.kind == PivotKind::Low
                    && p1.kind == PivotKind::High
                    && p0.kind == PivotKind::Low
                {
                    (p1.price, p2.price)
                } else {
                    return None;
                }
            } else {
                return None;
            }
        }
        Direction::Short => {
            if p1.kind == PivotKind::High && p0.kind == PivotKind::Low {
                (p1.price, p0.price)
            } else if pivots.len() >= 3 {
                let p2 = pivots[pivots.len() - 3];
                if p2.kind == PivotKind::High
                    && p1.kind == PivotKind::Low
                    && p0.kind == PivotKind::High
                {
                    (p2.price, p1.price)
                } else {
                    return None;
                }
            } else {
                return None;
            }
        }
    };

    if swing_high <= swing_low {
        return None;
    }

    let range = swing_high - swing_low;
    let fib_price = match direction {
        Direction::Long => swing_high - range * level,
        Direction::Short => swing_low + range * level,
    };

    Some(SwingZone {
        swing_high,
        swing_low,
        fib_price,
    })
}
