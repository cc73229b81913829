//! Simple Moving Average.
//!
//! SMA[i] = mean(C[i-n+1..=i]). The first (n-1) rows are NaN, as is any row whose
//! window contains a NaN close.

pub fn sma_series(closes: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; closes.len()];
    if period == 0 {
        return out;
    }

    let mut sum = 0.0;
    let mut nan_count = 0usize;

    for (i, &close) in closes.iter().enumerate() {
        if close.is_nan() {
            nan_count += 1;
        } else {
            sum += close;
        }

        if i >= period {
            let leaving = closes[i - period];
            if leaving.is_nan() {
                nan_count -= 1;
            } else {
                sum -= leaving;
            }
        }

        if i + 1 >= period && nan_count == 0 {
            out[i] = sum / period as f64;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sma_warmup_is_nan() {
        let out = sma_series(&[1.0, 2.0, 3.0, 4.0], 3);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert_relative_eq!(out[2], 2.0);
        assert_relative_eq!(out[3], 3.0);
    }

    #[test]
    fn sma_period_1_is_close() {
        let closes = [10.0, 20.0, 30.0];
        assert_eq!(sma_series(&closes, 1), closes.to_vec());
    }

    #[test]
    fn sma_nan_poisons_window_only() {
        let out = sma_series(&[1.0, f64::NAN, 3.0, 4.0, 5.0], 2);
        assert!(out[1].is_nan());
        assert!(out[2].is_nan());
        assert_relative_eq!(out[3], 3.5);
        assert_relative_eq!(out[4], 4.5);
    }

    #[test]
    fn sma_running_sum_matches_direct_mean() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.37).sin() * 5.0).collect();
        let out = sma_series(&closes, 7);
        for i in 6..closes.len() {
            let direct = closes[i - 6..=i].iter().sum::<f64>() / 7.0;
            assert_relative_eq!(out[i], direct, epsilon = 1e-9);
        }
    }

    #[test]
    fn sma_period_0_and_short_input() {
        assert!(sma_series(&[1.0, 2.0], 0).iter().all(|v| v.is_nan()));
        assert!(sma_series(&[1.0, 2.0], 5).iter().all(|v| v.is_nan()));
        assert!(sma_series(&[], 3).is_empty());
    }
}
