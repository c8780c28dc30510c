use serde::Serialize;

/// Kind of a confirmed local extremum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PivotKind {
    High,
    Low,
}

/// A confirmed zig-zag pivot: local extremum at `bar` with price `price`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pivot {
    pub bar: usize,
    pub price: f64,
    pub kind: PivotKind,
}

/// Scan state threaded through the forward pass: the kind and price of
/// the last confirmed pivot.
#[derive(Debug, Clone, Copy, Default)]
struct ScanState {
    direction: Option<PivotKind>,
    last_price: f64,
}

/// Detect zig-zag pivots over parallel high/low arrays.
///
/// A bar is a pivot-high candidate when its high strictly exceeds the
/// highs of the `depth` bars on each side (pivot-low symmetric on lows).
/// A candidate is confirmed when it is the first pivot, or when the last
/// confirmed pivot has the opposite kind and the move from it is at least
/// `deviation_pct` percent (`0.2` means 0.2%). When a same-kind candidate
/// is more extreme than the trailing confirmed pivot, it replaces that
/// pivot in place, so a run of new highs keeps only its most extreme bar.
///
/// The high check runs before the low check on every bar, so a bar that
/// is both a local high and a local low can emit two pivots at the same
/// index, high first. No pivot is produced within `depth` bars of either
/// end; fewer than `2*depth + 1` bars yields an empty sequence. Output is
/// ordered by bar index and deterministic for a given input.
pub fn find_pivots(highs: &[f64], lows: &[f64], depth: usize, deviation_pct: f64) -> Vec<Pivot> {
    let n = highs.len().min(lows.len());
    if depth == 0 || n < 2 * depth + 1 {
        return Vec::new();
    }

    let mut pivots: Vec<Pivot> = Vec::new();
    let mut state = ScanState::default();

    for i in depth..(n - depth) {
        let is_pivot_high = (1..=depth).all(|j| highs[i] > highs[i - j] && highs[i] > highs[i + j]);
        let is_pivot_low = (1..=depth).all(|j| lows[i] < lows[i - j] && lows[i] < lows[i + j]);

        if is_pivot_high {
            apply_candidate(&mut pivots, &mut state, i, highs[i], PivotKind::High, deviation_pct);
        }
        if is_pivot_low {
            apply_candidate(&mut pivots, &mut state, i, lows[i], PivotKind::Low, deviation_pct);
        }
    }

    pivots
}

fn apply_candidate(
    pivots: &mut Vec<Pivot>,
    state: &mut ScanState,
    bar: usize,
    price: f64,
    kind: PivotKind,
    deviation_pct: f64,
) {
    match state.direction {
        None => {
            pivots.push(Pivot { bar, price, kind });
            state.direction = Some(kind);
            state.last_price = price;
        }
        Some(dir) if dir == kind => {
            // Same-kind refinement: keep only the most extreme point of a run.
            let more_extreme = match kind {
                PivotKind::High => price > state.last_price,
                PivotKind::Low => price < state.last_price,
            };
            if more_extreme {
                if let Some(last) = pivots.last_mut() {
                    *last = Pivot { bar, price, kind };
                }
                state.last_price = price;
            }
        }
        Some(_) => {
            if state.last_price > 0.0 {
                let deviation = (price - state.last_price).abs() / state.last_price * 100.0;
                if deviation >= deviation_pct {
                    pivots.push(Pivot { bar, price, kind });
                    state.direction = Some(kind);
                    state.last_price = price;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build (highs, lows) around a close path with a fixed half-range.
    fn series(closes: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let highs = closes.iter().map(|c| c + 0.5).collect();
        let lows = closes.iter().map(|c| c - 0.5).collect();
        (highs, lows)
    }

    /// A W-shaped path: up to a peak, down to a trough, up again.
    fn zigzag_closes() -> Vec<f64> {
        let mut closes = Vec::new();
        for i in 0..10 {
            closes.push(100.0 + i as f64 * 2.0); // rise to 118
        }
        for i in 0..10 {
            closes.push(118.0 - i as f64 * 2.0); // fall to 100
        }
        for i in 0..10 {
            closes.push(100.5 + i as f64 * 2.0); // rise again
        }
        closes
    }

    #[test]
    fn test_detects_alternating_pivots() {
        let (highs, lows) = series(&zigzag_closes());
        let pivots = find_pivots(&highs, &lows, 3, 0.5);

        assert!(pivots.len() >= 2);
        for pair in pivots.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind, "same-kind neighbors: {pivots:?}");
        }
    }

    #[test]
    fn test_pivot_bars_strictly_increase() {
        let (highs, lows) = series(&zigzag_closes());
        let pivots = find_pivots(&highs, &lows, 3, 0.5);
        for pair in pivots.windows(2) {
            assert!(pair[0].bar < pair[1].bar);
        }
    }

    #[test]
    fn test_engulfing_bar_emits_both_kinds_high_first() {
        // Bar 2 makes both the widest high and the widest low. The high
        // check runs first, then the low confirms as an opposite-kind
        // pivot at the same index.
        let highs = vec![100.0, 101.0, 120.0, 101.0, 100.0];
        let lows = vec![99.0, 98.0, 80.0, 97.0, 99.0];
        let pivots = find_pivots(&highs, &lows, 1, 1.0);

        assert_eq!(pivots.len(), 2);
        assert_eq!(pivots[0].kind, PivotKind::High);
        assert_eq!(pivots[1].kind, PivotKind::Low);
        assert_eq!(pivots[0].bar, 2);
        assert_eq!(pivots[1].bar, 2);
        for pair in pivots.windows(2) {
            assert!(pair[0].bar <= pair[1].bar);
        }
    }

    #[test]
    fn test_no_pivot_within_depth_of_either_end() {
        let (highs, lows) = series(&zigzag_closes());
        let n = highs.len();
        let depth = 3;
        let pivots = find_pivots(&highs, &lows, depth, 0.5);
        assert!(!pivots.is_empty());
        for p in &pivots {
            assert!(p.bar >= depth);
            assert!(p.bar < n - depth);
        }
    }

    #[test]
    fn test_too_few_bars_yields_empty() {
        let (highs, lows) = series(&[100.0, 101.0, 102.0, 101.0, 100.0, 99.0]);
        // depth 3 needs at least 7 bars
        assert!(find_pivots(&highs, &lows, 3, 0.5).is_empty());
    }

    #[test]
    fn test_zero_depth_yields_empty() {
        let (highs, lows) = series(&zigzag_closes());
        assert!(find_pivots(&highs, &lows, 0, 0.5).is_empty());
    }

    #[test]
    fn test_monotonic_series_produces_at_most_one_pivot() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let (highs, lows) = series(&closes);
        let pivots = find_pivots(&highs, &lows, 3, 0.5);
        // A strictly rising series has no interior extrema at all.
        assert!(pivots.is_empty(), "{pivots:?}");
    }

    #[test]
    fn test_same_kind_refinement_replaces_in_place() {
        // Two separated local highs, the second higher, with no
        // qualifying low between them: the first must be replaced.
        let mut closes = Vec::new();
        for i in 0..6 {
            closes.push(100.0 + i as f64); // rise to 105
        }
        for i in 0..4 {
            closes.push(105.0 - (i + 1) as f64 * 0.05); // shallow dip
        }
        for i in 0..6 {
            closes.push(104.8 + i as f64); // rise to 109.8
        }
        for i in 0..6 {
            closes.push(109.8 - (i + 1) as f64 * 2.0); // deep fall
        }
        let (highs, lows) = series(&closes);
        // Deviation large enough that the shallow dip never confirms a low.
        let pivots = find_pivots(&highs, &lows, 2, 1.0);

        let high_count = pivots.iter().filter(|p| p.kind == PivotKind::High).count();
        assert_eq!(high_count, 1, "{pivots:?}");
        let top = pivots.iter().find(|p| p.kind == PivotKind::High).unwrap();
        assert!((top.price - 110.3).abs() < 1e-9); // 109.8 close + 0.5
        for pair in pivots.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind);
        }
    }

    #[test]
    fn test_deviation_threshold_suppresses_small_swings() {
        let (highs, lows) = series(&zigzag_closes());
        // ~15% swings in the fixture; a 50% requirement blocks reversal.
        let pivots = find_pivots(&highs, &lows, 3, 50.0);
        let kinds: Vec<PivotKind> = pivots.iter().map(|p| p.kind).collect();
        assert!(kinds.len() <= 1, "{pivots:?}");
    }

    #[test]
    fn test_deterministic_for_identical_input() {
        let (highs, lows) = series(&zigzag_closes());
        let a = find_pivots(&highs, &lows, 3, 0.5);
        let b = find_pivots(&highs, &lows, 3, 0.5);
        assert_eq!(a, b);
    }
}
