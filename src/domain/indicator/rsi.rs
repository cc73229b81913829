//! RSI (Relative Strength Index).
//!
//! Gains and losses are the positive and negated-negative close-to-close deltas.
//! Their averages are simple rolling means over the last n deltas:
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//!
//! The first n rows are NaN (n deltas are needed). A zero average loss makes the
//! ratio undefined and the row is NaN rather than infinite.

use crate::domain::indicator::sma::sma_series;

pub fn rsi_series(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.is_empty() {
        return vec![f64::NAN; closes.len()];
    }

    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());
    gains.push(f64::NAN);
    losses.push(f64::NAN);

    for pair in closes.windows(2) {
        let change = pair[1] - pair[0];
        if change.is_nan() {
            gains.push(f64::NAN);
            losses.push(f64::NAN);
        } else {
            gains.push(change.max(0.0));
            losses.push((-change).max(0.0));
        }
    }

    let avg_gain = sma_series(&gains, period);
    let avg_loss = sma_series(&losses, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&gain, &loss)| {
            if gain.is_nan() || loss.is_nan() || loss == 0.0 {
                f64::NAN
            } else {
                100.0 - 100.0 / (1.0 + gain / loss)
            }
        })
        .collect()
}
