//! Chart series for one symbol.
//!
//! Takes the most recent `limit` daily bars, resamples them to the requested
//! timeframe and drops any candle with a missing field. Output is columnar:
//! `{symbol, tf, bars, data: {date, open, high, low, close, volume}}`, with
//! `data` serialized as `{}` when no candle survives.

use crate::domain::error::ScannerError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::timeframe::{resample, Timeframe};
use crate::ports::price_store::PriceStore;
use serde::Serialize;

/// Daily bars read when no limit is given.
pub const DEFAULT_CHART_LIMIT: usize = 1500;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartColumns {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub date: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub open: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub high: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub low: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub close: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volume: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub symbol: String,
    pub tf: String,
    pub bars: usize,
    pub data: ChartColumns,
}

impl ChartColumns {
    fn from_bars(bars: &[OhlcvBar]) -> Self {
        let mut columns = Self::default();
        for bar in bars {
            columns.date.push(bar.date.format("%Y-%m-%d").to_string());
            columns.open.push(bar.open);
            columns.high.push(bar.high);
            columns.low.push(bar.low);
            columns.close.push(bar.close);
            columns.volume.push(bar.volume);
        }
        columns
    }
}

pub fn chart_data(
    store: &dyn PriceStore,
    symbol: &str,
    timeframe: Timeframe,
    limit: usize,
) -> Result<ChartData, ScannerError> {
    let daily = store.load_prices(symbol)?;
    let recent = &daily[daily.len().saturating_sub(limit)..];

    let candles: Vec<OhlcvBar> = resample(recent, timeframe)
        .into_iter()
        .filter(|bar| !bar.has_nan())
        .collect();

    tracing::debug!(symbol, %timeframe, daily = recent.len(), candles = candles.len(), "built chart");

    Ok(ChartData {
        symbol: symbol.to_string(),
        tf: timeframe.to_string(),
        bars: candles.len(),
        data: ChartColumns::from_bars(&candles),
    })
}
