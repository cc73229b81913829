#![allow(dead_code)]

use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::HashMap;
use stockscan::domain::error::ScannerError;
pub use stockscan::domain::ohlcv::OhlcvBar;
use stockscan::ports::price_store::PriceStore;

/// In-memory price store that records every load.
pub struct MockPriceStore {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub loads: RefCell<Vec<String>>,
}

impl MockPriceStore {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            loads: RefCell::new(Vec::new()),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn load_count(&self, symbol: &str) -> usize {
        self.loads.borrow().iter().filter(|s| *s == symbol).count()
    }
}

impl PriceStore for MockPriceStore {
    fn load_prices(&self, symbol: &str) -> Result<Vec<OhlcvBar>, ScannerError> {
        self.loads.borrow_mut().push(symbol.to_string());
        if let Some(reason) = self.errors.get(symbol) {
            return Err(ScannerError::Database {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, ScannerError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000.0,
    }
}

/// `count` consecutive calendar days of bars whose close moves by `step` per day.
pub fn generate_bars(start_date: &str, count: usize, start_price: f64, step: f64) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            let close = start_price + step * i as f64;
            OhlcvBar {
                date: start + chrono::Duration::days(i as i64),
                open: close - step / 2.0,
                high: close.max(close - step / 2.0) + 1.0,
                low: close.min(close - step / 2.0) - 1.0,
                close,
                volume: 1000.0 + i as f64,
            }
        })
        .collect()
}

/// Weekday-only bars (Mon-Fri) starting on `start_date`.
pub fn generate_trading_days(start_date: &str, count: usize, start_price: f64) -> Vec<OhlcvBar> {
    use chrono::{Datelike, Weekday};

    let mut day = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    let mut bars = Vec::with_capacity(count);
    while bars.len() < count {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            let close = start_price + bars.len() as f64;
            bars.push(OhlcvBar {
                date: day,
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 100.0,
            });
        }
        day = day.succ_opt().unwrap();
    }
    bars
}

pub fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
