//! Technical indicators computed over a bar table's close series.
//!
//! This module provides:
//! - `IndicatorType`: indicator identity + parameters, and the canonical column names
//!   each indicator writes into a [`BarTable`]
//! - `apply_indicator` / `apply_indicators`: the enrichment pipeline
//! - one submodule per indicator with the pure series computation

pub mod config;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use config::{required_bars, scan_min_bars, IndicatorConfig, MAX_PERIOD};
pub use ema::ema_series;
pub use macd::{macd_series, MacdSeries};
pub use rsi::rsi_series;
pub use sma::sma_series;

use crate::domain::bar_table::BarTable;
use crate::domain::error::ScannerError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

impl IndicatorType {
    /// Primary column written by this indicator.
    pub fn column(&self) -> String {
        match self {
            IndicatorType::Sma(period) => format!("SMA_{period}"),
            IndicatorType::Ema(period) => format!("EMA_{period}"),
            IndicatorType::Rsi(period) => format!("RSI_{period}"),
            IndicatorType::Macd { fast, slow, signal } => format!("MACD_{fast}_{slow}_{signal}"),
        }
    }

    /// Every column written by this indicator, primary first.
    pub fn columns(&self) -> Vec<String> {
        match self {
            IndicatorType::Macd { fast, slow, signal } => {
                macd_columns(*fast, *slow, *signal).to_vec()
            }
            other => vec![other.column()],
        }
    }

    /// Bars of history needed before the indicator is defined.
    pub fn lookback(&self) -> usize {
        match self {
            IndicatorType::Sma(period) | IndicatorType::Ema(period) | IndicatorType::Rsi(period) => {
                *period
            }
            IndicatorType::Macd { slow, .. } => *slow,
        }
    }
}

/// Line, signal and histogram column names for one MACD triple.
pub fn macd_columns(fast: usize, slow: usize, signal: usize) -> [String; 3] {
    let base = format!("{fast}_{slow}_{signal}");
    [
        format!("MACD_{base}"),
        format!("MACD_SIGNAL_{base}"),
        format!("MACD_HIST_{base}"),
    ]
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
        }
    }
}

/// Return a copy of `table` with `indicator`'s columns appended.
///
/// A no-op when the primary column is already present.
pub fn apply_indicator(table: &BarTable, indicator: &IndicatorType) -> Result<BarTable, ScannerError> {
    if table.has_column(&indicator.column()) {
        return Ok(table.clone());
    }

    let closes = table.closes();
    let mut out = table.clone();

    match *indicator {
        IndicatorType::Sma(period) => out.add_column(indicator.column(), sma_series(&closes, period))?,
        IndicatorType::Ema(period) => out.add_column(indicator.column(), ema_series(&closes, period))?,
        IndicatorType::Rsi(period) => out.add_column(indicator.column(), rsi_series(&closes, period))?,
        IndicatorType::Macd { fast, slow, signal } => {
            let series = macd_series(&closes, fast, slow, signal);
            let [line, signal_name, hist] = macd_columns(fast, slow, signal);
            out.add_column(line, series.line)?;
            out.add_column(signal_name, series.signal)?;
            out.add_column(hist, series.histogram)?;
        }
    }

    Ok(out)
}

/// Enrich `table` with every indicator in `config` (sma, ema, rsi, macd order).
pub fn apply_indicators(table: &BarTable, config: &IndicatorConfig) -> Result<BarTable, ScannerError> {
    let mut out = table.clone();
    if out.is_empty() {
        return Ok(out);
    }
    for indicator in config.indicators() {
        out = apply_indicator(&out, &indicator)?;
    }
    Ok(out)
}
