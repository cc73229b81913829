//! OHLCV bar representation.

use chrono::NaiveDate;

/// One trading session for a symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// True when any of the five price/volume fields is NaN.
    pub fn has_nan(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// (high - low) / close * 100
    pub fn range_pct(&self) -> Option<f64> {
        if self.close == 0.0 {
            return None;
        }
        Some((self.high - self.low) / self.close * 100.0)
    }
}
