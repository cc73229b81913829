//! Leaf predicate factories.
//!
//! Each factory binds column names and thresholds and returns a [`Predicate`]
//! that reads only the last row of the table (and the second-to-last where a
//! transition is tested). Missing columns, NaN values and short tables all
//! evaluate to `false`.

use crate::domain::bar_table::BarTable;
use crate::domain::rule::Predicate;

/// |last close - MA| / MA * 100 <= tolerance_pct.
pub fn near_ma(column: String, tolerance_pct: f64) -> Predicate {
    Predicate::new(move |table: &BarTable| {
        let (Some(bar), Some(ma)) = (table.last_bar(), table.last_value(&column)) else {
            return false;
        };
        if ma.is_nan() || ma == 0.0 {
            return false;
        }
        let diff_pct = (bar.close - ma).abs() / ma * 100.0;
        diff_pct <= tolerance_pct
    })
}

/// Column strictly increasing across the last `lookback + 1` rows.
pub fn rising_ma(column: String, lookback: usize) -> Predicate {
    Predicate::new(move |table: &BarTable| {
        let Some(values) = table.column(&column) else {
            return false;
        };
        if lookback == 0 || values.len() <= lookback {
            return false;
        }
        let recent = &values[values.len() - lookback - 1..];
        if recent.iter().any(|v| v.is_nan()) {
            return false;
        }
        recent.windows(2).all(|w| w[1] > w[0])
    })
}

/// Previous close below previous MA and last close above last MA.
pub fn crossing_up(column: String) -> Predicate {
    Predicate::new(move |table: &BarTable| {
        let (Some(prev), Some(last)) = (table.prev_bar(), table.last_bar()) else {
            return false;
        };
        let (Some(prev_ma), Some(last_ma)) = (table.prev_value(&column), table.last_value(&column))
        else {
            return false;
        };
        if prev_ma.is_nan() || last_ma.is_nan() {
            return false;
        }
        prev.close < prev_ma && last.close > last_ma
    })
}

pub fn rsi_above(column: String, level: f64) -> Predicate {
    Predicate::new(move |table: &BarTable| {
        table.last_value(&column).is_some_and(|rsi| rsi > level)
    })
}

pub fn rsi_below(column: String, level: f64) -> Predicate {
    Predicate::new(move |table: &BarTable| {
        table.last_value(&column).is_some_and(|rsi| rsi < level)
    })
}

/// MACD line crosses above its signal line: prev line <= prev signal, last line > last signal.
pub fn macd_bullish(line_column: String, signal_column: String) -> Predicate {
    Predicate::new(move |table: &BarTable| {
        let values = (
            table.prev_value(&line_column),
            table.prev_value(&signal_column),
            table.last_value(&line_column),
            table.last_value(&signal_column),
        );
        match values {
            (Some(prev_line), Some(prev_signal), Some(line), Some(signal)) => {
                prev_line <= prev_signal && line > signal
            }
            _ => false,
        }
    })
}

pub fn close_above_open() -> Predicate {
    Predicate::new(|table: &BarTable| table.last_bar().is_some_and(|bar| bar.close > bar.open))
}

pub fn close_above_prev_close() -> Predicate {
    Predicate::new(|table: &BarTable| match (table.prev_bar(), table.last_bar()) {
        (Some(prev), Some(last)) => last.close > prev.close,
        _ => false,
    })
}

/// |high - close| / high * 100 <= tolerance_pct on the last bar.
pub fn close_near_high(tolerance_pct: f64) -> Predicate {
    Predicate::new(move |table: &BarTable| {
        let Some(bar) = table.last_bar() else {
            return false;
        };
        if bar.high == 0.0 {
            return false;
        }
        (bar.high - bar.close).abs() / bar.high * 100.0 <= tolerance_pct
    })
}

/// Last bar's high-low range is at least `min_pct` percent of its close.
pub fn range_above_pct(min_pct: f64) -> Predicate {
    Predicate::new(move |table: &BarTable| {
        table
            .last_bar()
            .and_then(|bar| bar.range_pct())
            .is_some_and(|pct| pct >= min_pct)
    })
}
