//! CSV file price store: one `<dir>/<SYMBOL>.csv` per symbol.
//!
//! Header `date,open,high,low,close,volume`; dates as `YYYY-MM-DD`. Empty price
//! cells load as NaN. A symbol without a file has no history. Rows are sorted by
//! date; when a date repeats, the row appearing last in the file wins.

use crate::domain::error::ScannerError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::price_store::PriceStore;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

impl PriceStore for CsvAdapter {
    fn load_prices(&self, symbol: &str) -> Result<Vec<OhlcvBar>, ScannerError> {
        let path = self.csv_path(symbol);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ScannerError::Database {
                    reason: format!("failed to read {}: {e}", path.display()),
                })
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| ScannerError::Database {
                reason: format!("{}: CSV parse error: {e}", path.display()),
            })?;
            let row = line + 2;

            let date_str = field(&record, 0, "date", row)?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                ScannerError::Database {
                    reason: format!("{symbol} row {row}: invalid date '{date_str}': {e}"),
                }
            })?;

            bars.push(OhlcvBar {
                date,
                open: price(&record, 1, "open", row)?,
                high: price(&record, 2, "high", row)?,
                low: price(&record, 3, "low", row)?,
                close: price(&record, 4, "close", row)?,
                volume: price(&record, 5, "volume", row)?,
            });
        }

        Ok(dedup_by_date(bars))
    }

    fn list_symbols(&self) -> Result<Vec<String>, ScannerError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| ScannerError::Database {
            reason: format!("failed to read directory {}: {e}", self.base_path.display()),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ScannerError::Database {
                reason: format!("directory entry error: {e}"),
            })?;

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    name: &str,
    row: usize,
) -> Result<&'r str, ScannerError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| ScannerError::Database {
            reason: format!("row {row}: missing {name} column"),
        })
}

fn dedup_by_date(mut bars: Vec<OhlcvBar>) -> Vec<OhlcvBar> {
    // stable sort keeps file order among equal dates
    bars.sort_by_key(|b| b.date);
    let mut unique: Vec<OhlcvBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match unique.last_mut() {
            Some(prev) if prev.date == bar.date => *prev = bar,
            _ => unique.push(bar),
        }
    }
    unique
}

fn price(record: &csv::StringRecord, index: usize, name: &str, row: usize) -> Result<f64, ScannerError> {
    let raw = field(record, index, name, row)?;
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse().map_err(|e| ScannerError::Database {
        reason: format!("row {row}: invalid {name} value '{raw}': {e}"),
    })
}
