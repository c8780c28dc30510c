//! Rolling indicator primitives used by the filter gate.
//!
//! All functions return one value per input bar, with `f64::NAN` where
//! the lookback has not filled. Callers treat NaN as "no opinion": a
//! filter never blocks on a warmup or degenerate (zero-denominator)
//! value.

/// Simple moving average over `period` values.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }

    let mut sum: f64 = values[..period].iter().sum();
    out[period - 1] = sum / period as f64;
    for i in period..n {
        sum += values[i] - values[i - period];
        out[i] = sum / period as f64;
    }
    out
}

/// Exponential moving average, `alpha = 2 / (period + 1)`, seeded with
/// the first value.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n == 0 {
        return out;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = values[0];
    out[0] = prev;
    for i in 1..n {
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        out[i] = prev;
    }
    out
}

/// Rolling-mean RSI over close prices.
///
/// Average gain and average loss are plain rolling means over the last
/// `period` one-bar changes. A zero average loss would divide by zero;
/// those bars stay NaN so the RSI filter passes them through.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return out;
    }

    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            gains[i] = change;
        } else {
            losses[i] = -change;
        }
    }

    let mut gain_sum: f64 = gains[1..=period].iter().sum();
    let mut loss_sum: f64 = losses[1..=period].iter().sum();
    for i in period..n {
        if i > period {
            gain_sum += gains[i] - gains[i - period];
            loss_sum += losses[i] - losses[i - period];
        }
        if loss_sum > 0.0 {
            let rs = gain_sum / loss_sum;
            out[i] = 100.0 - 100.0 / (1.0 + rs);
        }
    }
    out
}

/// Average true range: rolling mean of the true-range series.
///
/// TR[0] = high[0] - low[0]; afterwards
/// TR[i] = max(high-low, |high-prev_close|, |low-prev_close|).
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let n = high.len().min(low.len()).min(close.len());
    if period == 0 || n == 0 {
        return vec![f64::NAN; n];
    }

    let mut tr = vec![0.0; n];
    tr[0] = high[0] - low[0];
    for i in 1..n {
        let hl = high[i] - low[i];
        let hc = (high[i] - close[i - 1]).abs();
        let lc = (low[i] - close[i - 1]).abs();
        tr[i] = hl.max(hc).max(lc);
    }

    sma(&tr, period)
}
