use crate::types::{BinSet, Strategy};
use tracing::debug;

pub const QUANTILES: &str = "Quantiles";
pub const LINEAR: &str = "Linear";

/// Largest class count accepted by config validation.
pub const MAX_CLASSES: usize = 100;

/// Partition the present values into `k` classes.
///
/// Returns `None` when there are no values. Quantile classification falls
/// back to linear spacing when tied values leave fewer than two distinct
/// bins. `k` is clamped to `2..=MAX_CLASSES`.
pub fn classify(values: &[f64], strategy: Strategy, k: usize) -> Option<BinSet> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let k = k.clamp(2, MAX_CLASSES);

    if strategy == Strategy::Quantile {
        let mut cuts: Vec<f64> = (0..=k).map(|i| quantile(&sorted, i, k)).collect();
        cuts.dedup();
        if cuts.len() >= 3 {
            return Some(BinSet { boundaries: cuts, label: QUANTILES });
        }
        debug!(distinct = cuts.len(), "quantile cuts collapsed; using linear bins");
    }

    Some(linear(&sorted, k))
}

/// Cut point `i` of `k`, linearly interpolated between order statistics.
fn quantile(sorted: &[f64], i: usize, k: usize) -> f64 {
    let n = sorted.len();
    let pos = i as f64 * (n - 1) as f64 / k as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = pos - lo as f64;
    if frac == 0.0 {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

fn linear(sorted: &[f64], k: usize) -> BinSet {
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let degenerate = || BinSet { boundaries: vec![min - 1.0, min, max + 1.0], label: LINEAR };

    if min == max {
        return degenerate();
    }

    let step = (max - min) / k as f64;
    let mut boundaries: Vec<f64> = (0..k).map(|i| min + step * i as f64).collect();
    boundaries.push(max);
    boundaries.dedup();

    // Only reachable when the range is below float resolution at this magnitude.
    if boundaries.len() < 3 {
        return degenerate();
    }
    BinSet { boundaries, label: LINEAR }
}
