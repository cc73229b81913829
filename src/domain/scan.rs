//! Scan orchestration.
//!
//! For each symbol, in input order:
//! 1. cache lookup by (symbol, timeframe, indicator config)
//! 2. on a miss: load daily prices, resample, check `min_bars`, enrich, recheck
//!    `min_bars`, store in the cache
//! 3. evaluate the compiled predicate; a true result appends the symbol
//!
//! A failure for one symbol is logged and the symbol skipped; it never aborts
//! the scan and never produces a match.

use crate::domain::bar_table::BarTable;
use crate::domain::cache::{CacheKey, ResultCache};
use crate::domain::error::ScannerError;
use crate::domain::indicator::{apply_indicators, scan_min_bars, IndicatorConfig};
use crate::domain::rule::Predicate;
use crate::domain::timeframe::{resample, Timeframe};
use crate::ports::price_store::PriceStore;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientBars { bars: usize, minimum: usize },
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub matches: Vec<String>,
    pub skipped: Vec<SkippedSymbol>,
    pub evaluated: usize,
}

enum Prepared {
    Table(Arc<BarTable>),
    Skip(SkipReason),
}

/// Everything a scan needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    pub indicators: IndicatorConfig,
    pub min_bars: usize,
}

impl ScanRequest {
    /// Request with `min_bars` derived from the indicator config.
    pub fn new(symbols: Vec<String>, timeframe: Timeframe, indicators: IndicatorConfig) -> Self {
        let min_bars = scan_min_bars(&indicators);
        Self {
            symbols,
            timeframe,
            indicators,
            min_bars,
        }
    }

    pub fn with_min_bars(mut self, min_bars: usize) -> Self {
        self.min_bars = min_bars;
        self
    }

    pub fn run(&self, store: &dyn PriceStore, cache: &ResultCache, predicate: &Predicate) -> ScanReport {
        run_scan_report(
            store,
            cache,
            &self.symbols,
            self.timeframe,
            &self.indicators,
            predicate,
            self.min_bars,
        )
    }
}

/// Symbols whose table satisfies `predicate`, in input order.
pub fn run_scan(
    store: &dyn PriceStore,
    cache: &ResultCache,
    symbols: &[String],
    timeframe: Timeframe,
    config: &IndicatorConfig,
    predicate: &Predicate,
    min_bars: usize,
) -> Vec<String> {
    run_scan_report(store, cache, symbols, timeframe, config, predicate, min_bars).matches
}

/// Like [`run_scan`], also reporting why each non-evaluated symbol was skipped.
pub fn run_scan_report(
    store: &dyn PriceStore,
    cache: &ResultCache,
    symbols: &[String],
    timeframe: Timeframe,
    config: &IndicatorConfig,
    predicate: &Predicate,
    min_bars: usize,
) -> ScanReport {
    let mut report = ScanReport::default();

    for symbol in symbols {
        match prepare_table(store, cache, symbol, timeframe, config, min_bars) {
            Ok(Prepared::Table(table)) => {
                report.evaluated += 1;
                if predicate.evaluate(&table) {
                    report.matches.push(symbol.clone());
                }
            }
            Ok(Prepared::Skip(reason)) => {
                tracing::debug!(%symbol, ?reason, "skipping symbol");
                report.skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason,
                });
            }
            Err(e) => {
                tracing::warn!(%symbol, "scan error: {e}");
                report.skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: SkipReason::Failed(e.to_string()),
                });
            }
        }
    }

    tracing::info!(
        timeframe = %timeframe,
        symbols = symbols.len(),
        evaluated = report.evaluated,
        matches = report.matches.len(),
        skipped = report.skipped.len(),
        "scan complete"
    );

    report
}

fn prepare_table(
    store: &dyn PriceStore,
    cache: &ResultCache,
    symbol: &str,
    timeframe: Timeframe,
    config: &IndicatorConfig,
    min_bars: usize,
) -> Result<Prepared, ScannerError> {
    let key = CacheKey::new(symbol, timeframe, config);
    if let Some(table) = cache.get(&key) {
        return Ok(Prepared::Table(table));
    }

    let daily = store.load_prices(symbol)?;
    if daily.is_empty() {
        return Ok(Prepared::Skip(SkipReason::NoData));
    }

    let table = BarTable::new(resample(&daily, timeframe));
    if table.len() < min_bars {
        return Ok(Prepared::Skip(SkipReason::InsufficientBars {
            bars: table.len(),
            minimum: min_bars,
        }));
    }

    let enriched = apply_indicators(&table, config)?;
    if enriched.len() < min_bars {
        return Ok(Prepared::Skip(SkipReason::InsufficientBars {
            bars: enriched.len(),
            minimum: min_bars,
        }));
    }

    Ok(Prepared::Table(cache.set(key, enriched)))
}
