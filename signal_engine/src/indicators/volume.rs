//! Volume-derived series.

use super::moving_average::sma;

/// On-balance volume: cumulative volume signed by the close-to-close
/// direction. A flat or falling close subtracts, matching the
/// "+volume if close rose, −volume otherwise" convention.
pub fn obv(closes: &[f64], volumes: &[f64]) -> Vec<f64> {
    let len = closes.len().min(volumes.len());
    let mut out = Vec::with_capacity(len);
    let mut running = 0.0;
    for i in 0..len {
        if i == 0 {
            // No prior close to compare against, so the first bar subtracts.
            running = -volumes[0];
        } else if closes[i] > closes[i - 1] {
            running += volumes[i];
        } else {
            running -= volumes[i];
        }
        out.push(running);
    }
    out
}

/// Ratio of the latest volume to its `period`-bar simple average.
/// `None` until the window fills or when the average is zero.
pub fn latest_volume_ratio(volumes: &[f64], period: usize) -> Option<f64> {
    let avg = sma(volumes, period).last().copied().flatten()?;
    if avg > 0.0 {
        Some(volumes.last()? / avg)
    } else {
        None
    }
}
