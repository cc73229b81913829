//! Indicator configuration: which indicators to attach to every scanned table.
//!
//! Wire format: `{"sma": [20, 50], "ema": [21], "rsi": [14], "macd": [[12, 26, 9]]}`,
//! every key optional.

use crate::domain::error::ScannerError;
use crate::domain::indicator::IndicatorType;
use serde::{Deserialize, Serialize};

/// Extra bars required on top of the longest indicator lookback.
pub const SAFETY_BUFFER: usize = 5;

/// Smallest lookback a scan will ever require, before the safety buffer.
pub const MIN_BARS_FLOOR: usize = 50;

/// Largest period accepted for any indicator or rule parameter.
pub const MAX_PERIOD: usize = 10_000;

const EMPTY_HASH: &str = "no-indicators";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndicatorConfig {
    #[serde(default)]
    pub sma: Vec<usize>,
    #[serde(default)]
    pub ema: Vec<usize>,
    #[serde(default)]
    pub rsi: Vec<usize>,
    #[serde(default)]
    pub macd: Vec<[usize; 3]>,
}

impl IndicatorConfig {
    /// Parse and validate the JSON wire form.
    pub fn from_json(input: &str) -> Result<Self, ScannerError> {
        let config: IndicatorConfig =
            serde_json::from_str(input).map_err(|e| ScannerError::ConfigInvalid {
                section: "scan".into(),
                key: "indicators".into(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScannerError> {
        let invalid = |kind: &str, reason: String| ScannerError::ConfigInvalid {
            section: "indicators".into(),
            key: kind.into(),
            reason,
        };

        let in_range = |p: &usize| (1..=MAX_PERIOD).contains(p);

        for (kind, periods) in [("sma", &self.sma), ("ema", &self.ema), ("rsi", &self.rsi)] {
            if let Some(bad) = periods.iter().find(|p| !in_range(*p)) {
                return Err(invalid(
                    kind,
                    format!("period must be between 1 and {MAX_PERIOD}, got {bad}"),
                ));
            }
        }
        for [fast, slow, signal] in &self.macd {
            if ![fast, slow, signal].into_iter().all(in_range) {
                return Err(invalid(
                    "macd",
                    format!("periods must be between 1 and {MAX_PERIOD}, got [{fast}, {slow}, {signal}]"),
                ));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.sma.is_empty() && self.ema.is_empty() && self.rsi.is_empty() && self.macd.is_empty()
    }

    /// Sorted, de-duplicated copy. Two configs naming the same indicators in a
    /// different order canonicalize identically.
    pub fn canonical(&self) -> Self {
        fn norm<T: Ord + Clone>(values: &[T]) -> Vec<T> {
            let mut v = values.to_vec();
            v.sort();
            v.dedup();
            v
        }
        Self {
            sma: norm(&self.sma),
            ema: norm(&self.ema),
            rsi: norm(&self.rsi),
            macd: norm(&self.macd),
        }
    }

    /// Stable hex digest of the canonical config.
    pub fn canonical_hash(&self) -> String {
        if self.is_empty() {
            return EMPTY_HASH.to_string();
        }
        let canonical = self.canonical();
        let json = serde_json::json!({
            "ema": canonical.ema,
            "macd": canonical.macd,
            "rsi": canonical.rsi,
            "sma": canonical.sma,
        });
        blake3::hash(json.to_string().as_bytes()).to_hex().to_string()
    }

    /// Indicators in pipeline order (sma, ema, rsi, macd), canonicalized.
    pub fn indicators(&self) -> Vec<IndicatorType> {
        let canonical = self.canonical();
        let mut out = Vec::new();
        out.extend(canonical.sma.iter().map(|&p| IndicatorType::Sma(p)));
        out.extend(canonical.ema.iter().map(|&p| IndicatorType::Ema(p)));
        out.extend(canonical.rsi.iter().map(|&p| IndicatorType::Rsi(p)));
        out.extend(
            canonical
                .macd
                .iter()
                .map(|&[fast, slow, signal]| IndicatorType::Macd { fast, slow, signal }),
        );
        out
    }

    /// Add an indicator unless it is already configured.
    pub fn include(&mut self, indicator: IndicatorType) {
        match indicator {
            IndicatorType::Sma(p) if !self.sma.contains(&p) => self.sma.push(p),
            IndicatorType::Ema(p) if !self.ema.contains(&p) => self.ema.push(p),
            IndicatorType::Rsi(p) if !self.rsi.contains(&p) => self.rsi.push(p),
            IndicatorType::Macd { fast, slow, signal } if !self.macd.contains(&[fast, slow, signal]) => {
                self.macd.push([fast, slow, signal])
            }
            _ => {}
        }
    }

    /// Longest lookback across every configured indicator; MACD counts its slow period.
    pub fn max_lookback(&self) -> usize {
        self.indicators()
            .iter()
            .map(IndicatorType::lookback)
            .max()
            .unwrap_or(0)
    }
}

/// Bars needed for every configured indicator to be defined at the last row.
///
/// Longest lookback plus [`SAFETY_BUFFER`]: `{"sma":[50]}` needs 55,
/// `{"macd":[[12,26,9]]}` needs 31 and an empty config needs 5.
pub fn required_bars(config: &IndicatorConfig) -> usize {
    config.max_lookback().saturating_add(SAFETY_BUFFER)
}

/// Default `min_bars` for a scan: the longest lookback, never less than
/// [`MIN_BARS_FLOOR`], plus [`SAFETY_BUFFER`].
pub fn scan_min_bars(config: &IndicatorConfig) -> usize {
    config.max_lookback().max(MIN_BARS_FLOOR).saturating_add(SAFETY_BUFFER)
}
