//! Timeframe resampling of daily bars into weekly and monthly candles.
//!
//! Aggregation per group: open = first, high = max, low = min, close = last,
//! volume = sum. NaN cells are skipped while aggregating; a group whose
//! aggregate still comes out NaN (every value in some field was NaN) is dropped.
//!
//! - Weekly groups by ISO (year, week) and stamps the candle with that week's Friday.
//! - Monthly groups by calendar month and stamps the candle with the month's last day.

use crate::domain::error::ScannerError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::{Datelike, NaiveDate, Weekday};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    pub fn token(&self) -> &'static str {
        match self {
            Timeframe::Daily => "1D",
            Timeframe::Weekly => "1W",
            Timeframe::Monthly => "1M",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Timeframe {
    type Err = ScannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1D" => Ok(Timeframe::Daily),
            "1W" => Ok(Timeframe::Weekly),
            "1M" => Ok(Timeframe::Monthly),
            other => Err(ScannerError::UnsupportedTimeframe {
                token: other.to_string(),
            }),
        }
    }
}

/// Resample an ascending daily series into `timeframe` candles.
pub fn resample(bars: &[OhlcvBar], timeframe: Timeframe) -> Vec<OhlcvBar> {
    match timeframe {
        Timeframe::Daily => bars.to_vec(),
        Timeframe::Weekly => group_by(bars, |d| {
            let week = d.iso_week();
            (week.year(), week.week())
        }, |(year, week)| NaiveDate::from_isoywd_opt(year, week, Weekday::Fri)),
        Timeframe::Monthly => group_by(bars, |d| (d.year(), d.month()), |(year, month)| {
            last_day_of_month(year, month)
        }),
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn group_by<K, F, S>(bars: &[OhlcvBar], key_of: F, stamp: S) -> Vec<OhlcvBar>
where
    K: PartialEq + Copy,
    F: Fn(NaiveDate) -> K,
    S: Fn(K) -> Option<NaiveDate>,
{
    let mut out = Vec::new();
    let mut current: Option<(K, Candle)> = None;

    for bar in bars {
        let key = key_of(bar.date);
        match current.as_mut() {
            Some((k, candle)) if *k == key => candle.push(bar),
            _ => {
                if let Some((k, candle)) = current.take() {
                    flush(&mut out, stamp(k), candle);
                }
                let mut candle = Candle::default();
                candle.push(bar);
                current = Some((key, candle));
            }
        }
    }

    if let Some((k, candle)) = current {
        flush(&mut out, stamp(k), candle);
    }

    out
}

fn flush(out: &mut Vec<OhlcvBar>, date: Option<NaiveDate>, candle: Candle) {
    let Some(date) = date else {
        return;
    };
    let bar = candle.finish(date);
    if !bar.has_nan() {
        out.push(bar);
    }
}

struct Candle {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl Default for Candle {
    fn default() -> Self {
        Self {
            open: f64::NAN,
            high: f64::NAN,
            low: f64::NAN,
            close: f64::NAN,
            volume: 0.0,
        }
    }
}

impl Candle {
    fn push(&mut self, bar: &OhlcvBar) {
        if self.open.is_nan() {
            self.open = bar.open;
        }
        // f64::max/min ignore a NaN operand
        self.high = self.high.max(bar.high);
        self.low = self.low.min(bar.low);
        if !bar.close.is_nan() {
            self.close = bar.close;
        }
        if !bar.volume.is_nan() {
            self.volume += bar.volume;
        }
    }

    fn finish(self, date: NaiveDate) -> OhlcvBar {
        OhlcvBar {
            date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}
