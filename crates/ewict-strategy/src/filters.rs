use ewict_core::indicators::{ema, rsi, sma};
use ewict_core::{BarSeries, Direction, StrategyParams};

/// The unified filter gate: every enabled check must pass for a signal
/// to fire. Indicator series are computed once per run; disabled filters
/// cost nothing.
///
/// A check with no opinion — warmup NaN, too little history, or a zero
/// denominator — never blocks. The simulation must run unattended across
/// thousands of parameter combinations, so there is no failure path here.
pub struct FilterSet {
    params: StrategyParams,
    ema: Vec<f64>,
    rsi: Vec<f64>,
    avg_volume: Vec<f64>,
}

impl FilterSet {
    pub fn new(params: &StrategyParams, bars: &BarSeries) -> Self {
        let ema_series = if params.use_trend_filter {
            ema(&bars.close, params.ema_period)
        } else {
            Vec::new()
        };
        let rsi_series = if params.use_rsi_filter {
            rsi(&bars.close, params.rsi_period)
        } else {
            Vec::new()
        };
        let avg_volume = if params.use_volume_filter {
            sma(&bars.volume, params.volume_period)
        } else {
            Vec::new()
        };

        Self {
            params: params.clone(),
            ema: ema_series,
            rsi: rsi_series,
            avg_volume,
        }
    }

    /// Evaluate every enabled filter at bar `i` for the given direction.
    pub fn passes(&self, bars: &BarSeries, i: usize, direction: Direction) -> bool {
        self.trend_ok(bars, i, direction)
            && self.momentum_ok(bars, i, direction)
            && self.volume_ok(bars, i)
            && self.rsi_ok(i, direction)
            && self.candle_ok(bars, i, direction)
            && self.position_ok(bars, i, direction)
    }

    /// Close within `max_ema_distance_pct` below (long) or above (short)
    /// the trend EMA.
    fn trend_ok(&self, bars: &BarSeries, i: usize, direction: Direction) -> bool {
        if !self.params.use_trend_filter {
            return true;
        }
        let ema_val = self.ema[i];
        if ema_val.is_nan() || ema_val <= 0.0 {
            return true;
        }
        let distance_pct = (bars.close[i] - ema_val) / ema_val * 100.0;
        match direction {
            Direction::Long => distance_pct >= -self.params.max_ema_distance_pct,
            Direction::Short => distance_pct <= self.params.max_ema_distance_pct,
        }
    }

    /// N-bar percent change in the favorable direction.
    fn momentum_ok(&self, bars: &BarSeries, i: usize, direction: Direction) -> bool {
        if !self.params.use_momentum_filter {
            return true;
        }
        let n = self.params.momentum_bars;
        if i < n {
            return true;
        }
        let base = bars.close[i - n];
        if base <= 0.0 {
            return true;
        }
        let momentum_pct = (bars.close[i] - base) / base * 100.0;
        match direction {
            Direction::Long => momentum_pct >= self.params.min_momentum_pct,
            Direction::Short => momentum_pct <= -self.params.min_momentum_pct,
        }
    }

    /// Bar volume above a fraction of its rolling average. Not
    /// directional.
    fn volume_ok(&self, bars: &BarSeries, i: usize) -> bool {
        if !self.params.use_volume_filter {
            return true;
        }
        let avg = self.avg_volume[i];
        if avg.is_nan() || avg <= 0.0 {
            return true;
        }
        bars.volume[i] > avg * self.params.volume_ratio
    }

    /// Oscillator below the threshold for longs, mirrored for shorts.
    fn rsi_ok(&self, i: usize, direction: Direction) -> bool {
        if !self.params.use_rsi_filter {
            return true;
        }
        let value = self.rsi[i];
        if value.is_nan() {
            return true;
        }
        match direction {
            Direction::Long => value < self.params.rsi_threshold,
            Direction::Short => value > 100.0 - self.params.rsi_threshold,
        }
    }

    /// Directional candle with a decisive body.
    fn candle_ok(&self, bars: &BarSeries, i: usize, direction: Direction) -> bool {
        if !self.params.use_candle_filter {
            return true;
        }
        let range = bars.high[i] - bars.low[i];
        if range <= 0.0 {
            return true;
        }
        let body = (bars.close[i] - bars.open[i]).abs();
        if body / range < self.params.min_body_ratio {
            return false;
        }
        match direction {
            Direction::Long => bars.close[i] > bars.open[i],
            Direction::Short => bars.close[i] < bars.open[i],
        }
    }

    /// Close in the favorable part of the recent high/low range.
    fn position_ok(&self, bars: &BarSeries, i: usize, direction: Direction) -> bool {
        if !self.params.use_position_filter {
            return true;
        }
        let lookback = self.params.position_lookback;
        if i + 1 < lookback {
            return true;
        }
        let start = i + 1 - lookback;
        let hi = bars.high[start..=i].iter().cloned().fold(f64::MIN, f64::max);
        let lo = bars.low[start..=i].iter().cloned().fold(f64::MAX, f64::min);
        let range = hi - lo;
        if range <= 0.0 {
            return true;
        }
        let position = (bars.close[i] - lo) / range;
        match direction {
            Direction::Long => position >= self.params.min_price_position,
            Direction::Short => position <= 1.0 - self.params.min_price_position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_bars(n: usize, price: f64) -> BarSeries {
        let mut bars = BarSeries::with_capacity(n);
        for i in 0..n {
            bars.push(i as i64, price, price + 1.0, price - 1.0, price + 0.5, 1000.0);
        }
        bars
    }

    fn only(filter: &str) -> StrategyParams {
        let mut p = StrategyParams {
            use_trend_filter: false,
            use_momentum_filter: false,
            use_volume_filter: false,
            use_rsi_filter: false,
            use_candle_filter: false,
            use_position_filter: false,
            ..StrategyParams::default()
        };
        match filter {
            "trend" => p.use_trend_filter = true,
            "momentum" => p.use_momentum_filter = true,
            "volume" => p.use_volume_filter = true,
            "rsi" => p.use_rsi_filter = true,
            "candle" => p.use_candle_filter = true,
            "position" => p.use_position_filter = true,
            other => panic!("unknown filter {other}"),
        }
        p
    }

    #[test]
    fn test_disabled_filters_always_pass() {
        let bars = flat_bars(30, 100.0);
        let p = StrategyParams {
            use_trend_filter: false,
            use_momentum_filter: false,
            use_volume_filter: false,
            use_rsi_filter: false,
            use_candle_filter: false,
            use_position_filter: false,
            ..StrategyParams::default()
        };
        let filters = FilterSet::new(&p, &bars);
        assert!(filters.passes(&bars, 10, Direction::Long));
        assert!(filters.passes(&bars, 10, Direction::Short));
    }

    #[test]
    fn test_trend_filter_blocks_below_ema() {
        let mut bars = BarSeries::new();
        // Falling series: close well below its own EMA.
        for i in 0..50 {
            let c = 200.0 - i as f64 * 2.0;
            bars.push(i as i64, c + 1.0, c + 2.0, c - 2.0, c, 1000.0);
        }
        let p = StrategyParams {
            ema_period: 10,
            ..only("trend")
        };
        let filters = FilterSet::new(&p, &bars);
        assert!(!filters.trend_ok(&bars, 49, Direction::Long));
        assert!(filters.trend_ok(&bars, 49, Direction::Short));
    }

    #[test]
    fn test_trend_filter_allows_configured_distance_below() {
        let mut bars = BarSeries::new();
        for i in 0..50 {
            bars.push(i as i64, 100.0, 101.0, 99.0, 100.0, 1000.0);
        }
        // Last close dips 1% below the flat EMA.
        bars.close[49] = 99.0;
        let strict = StrategyParams {
            ema_period: 10,
            max_ema_distance_pct: 0.0,
            ..only("trend")
        };
        let loose = StrategyParams {
            ema_period: 10,
            max_ema_distance_pct: 2.0,
            ..only("trend")
        };
        assert!(!FilterSet::new(&strict, &bars).trend_ok(&bars, 49, Direction::Long));
        assert!(FilterSet::new(&loose, &bars).trend_ok(&bars, 49, Direction::Long));
    }

    #[test]
    fn test_momentum_filter_requires_rise_for_longs() {
        let mut bars = BarSeries::new();
        for i in 0..20 {
            let c = 100.0 - i as f64;
            bars.push(i as i64, c, c + 1.0, c - 1.0, c, 1000.0);
        }
        let p = only("momentum");
        let filters = FilterSet::new(&p, &bars);
        assert!(!filters.momentum_ok(&bars, 15, Direction::Long));
        assert!(filters.momentum_ok(&bars, 15, Direction::Short));
        // Not enough history: no opinion.
        assert!(filters.momentum_ok(&bars, 1, Direction::Long));
    }

    #[test]
    fn test_volume_filter_blocks_thin_bars() {
        let mut bars = flat_bars(40, 100.0);
        bars.volume[30] = 100.0; // well under the 1000 average
        let p = only("volume");
        let filters = FilterSet::new(&p, &bars);
        assert!(!filters.volume_ok(&bars, 30));
        assert!(filters.volume_ok(&bars, 31));
    }

    #[test]
    fn test_volume_filter_passes_on_zero_average() {
        let mut bars = BarSeries::new();
        for i in 0..40 {
            bars.push(i as i64, 100.0, 101.0, 99.0, 100.5, 0.0);
        }
        let p = only("volume");
        let filters = FilterSet::new(&p, &bars);
        assert!(filters.volume_ok(&bars, 30));
    }

    #[test]
    fn test_rsi_filter_blocks_overbought_longs() {
        let mut bars = BarSeries::new();
        // Mostly rising with one dip so the average loss stays nonzero.
        for i in 0..40 {
            let c = if i == 30 { 128.0 } else { 100.0 + i as f64 };
            bars.push(i as i64, c, c + 1.0, c - 1.0, c, 1000.0);
        }
        let p = only("rsi");
        let filters = FilterSet::new(&p, &bars);
        // Strong uptrend: RSI far above 50.
        assert!(!filters.rsi_ok(39, Direction::Long));
        assert!(filters.rsi_ok(39, Direction::Short));
    }

    #[test]
    fn test_rsi_filter_passes_during_warmup_and_zero_loss() {
        let mut bars = BarSeries::new();
        for i in 0..40 {
            let c = 100.0 + i as f64;
            bars.push(i as i64, c, c + 1.0, c - 1.0, c, 1000.0);
        }
        let p = only("rsi");
        let filters = FilterSet::new(&p, &bars);
        // Warmup.
        assert!(filters.rsi_ok(3, Direction::Long));
        // Monotonic rise: zero average loss, division guard, no opinion.
        assert!(filters.rsi_ok(39, Direction::Long));
    }

    #[test]
    fn test_candle_filter_requires_directional_body() {
        let mut bars = BarSeries::new();
        bars.push(0, 100.0, 105.0, 99.0, 104.0, 1.0); // strong bullish
        bars.push(1, 104.0, 105.0, 99.0, 100.0, 1.0); // strong bearish
        bars.push(2, 100.0, 103.0, 97.0, 100.2, 1.0); // doji-ish
        bars.push(3, 100.0, 100.0, 100.0, 100.0, 1.0); // zero range
        let p = only("candle");
        let filters = FilterSet::new(&p, &bars);
        assert!(filters.candle_ok(&bars, 0, Direction::Long));
        assert!(!filters.candle_ok(&bars, 0, Direction::Short));
        assert!(filters.candle_ok(&bars, 1, Direction::Short));
        assert!(!filters.candle_ok(&bars, 2, Direction::Long));
        // Zero range divides by zero: no opinion.
        assert!(filters.candle_ok(&bars, 3, Direction::Long));
    }

    #[test]
    fn test_position_filter_blocks_bottom_of_range() {
        let mut bars = BarSeries::new();
        for i in 0..40 {
            bars.push(i as i64, 100.0, 120.0, 100.0, 110.0, 1.0);
        }
        bars.close[35] = 101.0; // near the low of the 100..120 range
        let p = only("position");
        let filters = FilterSet::new(&p, &bars);
        assert!(!filters.position_ok(&bars, 35, Direction::Long));
        assert!(filters.position_ok(&bars, 35, Direction::Short));
        assert!(filters.position_ok(&bars, 36, Direction::Long));
    }
}
