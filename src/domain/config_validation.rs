//! Scan configuration: reads and validates the `[scan]` and `[cache]` sections.
//!
//! ```ini
//! [scan]
//! timeframe = 1W
//! symbols = BHP, CBA, WBC
//! indicators = {"sma": [20, 50], "rsi": [14]}
//! min_bars = 60
//!
//! [cache]
//! ttl_seconds = 1800
//! ```
//!
//! Every key is optional. An empty symbol list means "every symbol the store knows".

use crate::domain::cache::DEFAULT_TTL;
use crate::domain::error::ScannerError;
use crate::domain::indicator::{scan_min_bars, IndicatorConfig};
use crate::domain::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    pub timeframe: Timeframe,
    pub symbols: Vec<String>,
    pub indicators: IndicatorConfig,
    /// Explicit `min_bars`; `None` derives it from the indicators.
    pub min_bars: Option<usize>,
    pub cache_ttl: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::Daily,
            symbols: Vec::new(),
            indicators: IndicatorConfig::default(),
            min_bars: None,
            cache_ttl: DEFAULT_TTL,
        }
    }
}

impl ScanSettings {
    /// The configured `min_bars`, or the default for the current indicators.
    pub fn effective_min_bars(&self) -> usize {
        self.min_bars.unwrap_or_else(|| scan_min_bars(&self.indicators))
    }
}

pub fn scan_settings_from_config(config: &dyn ConfigPort) -> Result<ScanSettings, ScannerError> {
    let timeframe = validate_timeframe(config)?;
    let indicators = validate_indicators(config)?;
    let min_bars = validate_min_bars(config)?;
    let cache_ttl = validate_cache_ttl(config)?;

    let symbols = config
        .get_list("scan", "symbols")
        .into_iter()
        .map(|s| s.to_uppercase())
        .collect();

    Ok(ScanSettings {
        timeframe,
        symbols,
        indicators,
        min_bars,
        cache_ttl,
    })
}

fn validate_timeframe(config: &dyn ConfigPort) -> Result<Timeframe, ScannerError> {
    match config.get_string("scan", "timeframe") {
        None => Ok(Timeframe::Daily),
        Some(s) if s.trim().is_empty() => Ok(Timeframe::Daily),
        Some(s) => s.trim().parse().map_err(|_| ScannerError::ConfigInvalid {
            section: "scan".to_string(),
            key: "timeframe".to_string(),
            reason: format!("unsupported timeframe '{}', expected 1D, 1W or 1M", s.trim()),
        }),
    }
}

fn validate_indicators(config: &dyn ConfigPort) -> Result<IndicatorConfig, ScannerError> {
    match config.get_string("scan", "indicators") {
        Some(s) if !s.trim().is_empty() => IndicatorConfig::from_json(&s),
        _ => Ok(IndicatorConfig::default()),
    }
}

fn validate_min_bars(config: &dyn ConfigPort) -> Result<Option<usize>, ScannerError> {
    if config.get_string("scan", "min_bars").is_none() {
        return Ok(None);
    }
    let value = config.get_int("scan", "min_bars", 0);
    if value < 1 {
        return Err(ScannerError::ConfigInvalid {
            section: "scan".to_string(),
            key: "min_bars".to_string(),
            reason: "min_bars must be a positive integer".to_string(),
        });
    }
    Ok(Some(value as usize))
}

fn validate_cache_ttl(config: &dyn ConfigPort) -> Result<Duration, ScannerError> {
    let value = config.get_int("cache", "ttl_seconds", DEFAULT_TTL.as_secs() as i64);
    if value < 1 {
        return Err(ScannerError::ConfigInvalid {
            section: "cache".to_string(),
            key: "ttl_seconds".to_string(),
            reason: "ttl_seconds must be positive".to_string(),
        });
    }
    Ok(Duration::from_secs(value as u64))
}
