//! In-memory result cache for enriched bar tables.
//!
//! Keyed by (symbol, timeframe, canonical indicator-config hash). Entries expire a
//! fixed TTL after insertion; a read past the TTL evicts the entry and misses.
//! There is no capacity bound: the cache grows until [`ResultCache::clear`].
//!
//! Values are shared `Arc<BarTable>` snapshots. Concurrent scans may read the
//! same snapshot, and writers replace whole entries (last write wins).

use crate::domain::bar_table::BarTable;
use crate::domain::indicator::IndicatorConfig;
use crate::domain::timeframe::Timeframe;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub config_hash: String,
}

impl CacheKey {
    pub fn new(symbol: &str, timeframe: Timeframe, config: &IndicatorConfig) -> Self {
        Self {
            symbol: symbol.to_string(),
            timeframe,
            config_hash: config.canonical_hash(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub ttl_seconds: u64,
}

#[derive(Debug)]
struct CacheEntry {
    table: Arc<BarTable>,
    inserted_at: Instant,
}

#[derive(Debug)]
pub struct ResultCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<BarTable>> {
        self.get_at(key, Instant::now())
    }

    pub fn set(&self, key: CacheKey, table: BarTable) -> Arc<BarTable> {
        self.set_at(key, table, Instant::now())
    }

    fn get_at(&self, key: &CacheKey, now: Instant) -> Option<Arc<BarTable>> {
        let mut entries = self.lock();
        let entry = entries.get(key)?;

        if now.saturating_duration_since(entry.inserted_at) > self.ttl {
            entries.remove(key);
            tracing::debug!(symbol = %key.symbol, timeframe = %key.timeframe, "cache expired");
            return None;
        }

        tracing::debug!(symbol = %key.symbol, timeframe = %key.timeframe, "cache hit");
        Some(Arc::clone(&entry.table))
    }

    fn set_at(&self, key: CacheKey, table: BarTable, now: Instant) -> Arc<BarTable> {
        let table = Arc::new(table);
        tracing::debug!(symbol = %key.symbol, timeframe = %key.timeframe, rows = table.len(), "cache set");
        self.lock().insert(
            key,
            CacheEntry {
                table: Arc::clone(&table),
                inserted_at: now,
            },
        );
        table
    }

    /// Drop every entry older than the TTL; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_duration_since(entry.inserted_at) <= self.ttl);
        before - entries.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            ttl_seconds: self.ttl.as_secs(),
        }
    }

    // A panic while holding the lock cannot leave an entry half-written, so a
    // poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::NaiveDate;

    fn sample_table() -> BarTable {
        let bars = (1..=3)
            .map(|day| OhlcvBar {
                date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                open: 1.0,
                high: 2.0,
                low: 0.5,
                close: 1.5,
                volume: 10.0,
            })
            .collect();
        BarTable::new(bars)
            .with_column("SMA_2", vec![f64::NAN, 1.5, 1.5])
            .unwrap()
    }

    fn key(symbol: &str) -> CacheKey {
        CacheKey::new(symbol, Timeframe::Daily, &IndicatorConfig::default())
    }

    #[test]
    fn set_then_get_within_ttl() {
        let cache = ResultCache::new();
        cache.set(key("BHP"), sample_table());

        let hit = cache.get(&key("BHP")).unwrap();
        assert_eq!(hit.bars(), sample_table().bars());
        assert_eq!(hit.column_names(), vec!["SMA_2"]);
        assert_eq!(hit.last_value("SMA_2"), Some(1.5));
    }

    #[test]
    fn get_after_ttl_misses_and_purges() {
        let cache = ResultCache::with_ttl(Duration::from_secs(60));
        let start = Instant::now();
        cache.set_at(key("BHP"), sample_table(), start);

        assert!(cache.get_at(&key("BHP"), start + Duration::from_secs(60)).is_some());
        assert!(cache.get_at(&key("BHP"), start + Duration::from_secs(61)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn miss_on_unknown_key() {
        let cache = ResultCache::new();
        assert!(cache.get(&key("NOPE")).is_none());
    }

    #[test]
    fn key_distinguishes_timeframe_and_config() {
        let cache = ResultCache::new();
        cache.set(key("BHP"), sample_table());

        let weekly = CacheKey::new("BHP", Timeframe::Weekly, &IndicatorConfig::default());
        let config = IndicatorConfig::from_json(r#"{"sma":[20]}"#).unwrap();
        let with_sma = CacheKey::new("BHP", Timeframe::Daily, &config);

        assert!(cache.get(&weekly).is_none());
        assert!(cache.get(&with_sma).is_none());
    }

    #[test]
    fn key_is_config_order_independent() {
        let a = IndicatorConfig::from_json(r#"{"sma":[50,20],"ema":[10]}"#).unwrap();
        let b = IndicatorConfig::from_json(r#"{"ema":[10],"sma":[20,50]}"#).unwrap();
        assert_eq!(
            CacheKey::new("BHP", Timeframe::Daily, &a),
            CacheKey::new("BHP", Timeframe::Daily, &b)
        );
    }

    #[test]
    fn last_write_wins() {
        let cache = ResultCache::new();
        cache.set(key("BHP"), sample_table());
        cache.set(key("BHP"), BarTable::default());
        assert!(cache.get(&key("BHP")).unwrap().is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn readers_share_snapshot() {
        let cache = ResultCache::new();
        cache.set(key("BHP"), sample_table());
        let a = cache.get(&key("BHP")).unwrap();
        let b = cache.get(&key("BHP")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn purge_expired_removes_only_stale() {
        let cache = ResultCache::with_ttl(Duration::from_secs(10));
        let start = Instant::now();
        cache.set_at(key("OLD"), sample_table(), start);
        cache.set_at(key("NEW"), sample_table(), start + Duration::from_secs(8));

        assert_eq!(cache.purge_expired_at(start + Duration::from_secs(15)), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at(&key("NEW"), start + Duration::from_secs(15)).is_some());
    }

    #[test]
    fn clear_and_stats() {
        let cache = ResultCache::new();
        cache.set(key("A"), sample_table());
        cache.set(key("B"), sample_table());
        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 2,
                ttl_seconds: 1800
            }
        );
        cache.clear();
        assert!(cache.is_empty());
    }
}
