//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the first observed close (no bias adjustment), then
//! EMA[i] = C[i]*k + EMA[i-1]*(1-k). Rows before the first non-NaN close are NaN;
//! a NaN close later on carries the previous EMA forward.

pub fn ema_series(closes: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; closes.len()];
    if period == 0 {
        return out;
    }

    let k = smoothing(period);
    let mut ema: Option<f64> = None;

    for (i, &close) in closes.iter().enumerate() {
        ema = match (ema, close.is_nan()) {
            (None, true) => None,
            (None, false) => Some(close),
            (Some(prev), true) => Some(prev),
            (Some(prev), false) => Some(close * k + prev * (1.0 - k)),
        };
        if let Some(v) = ema {
            out[i] = v;
        }
    }

    out
}

pub(crate) fn smoothing(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}
