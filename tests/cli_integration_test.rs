//! CLI integration tests for scan orchestration.
//!
//! Tests cover:
//! - Config loading from real INI files on disk
//! - Store selection (CSV directory vs SQLite path)
//! - Rule-driven indicator extension and the scan JSON output
//! - Chart data read from a CSV store
//! - CSV import into SQLite through the `import` command, and its refresh lock

mod common;

use clap::Parser;
use common::*;
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::Path;
use stockscan::cli::{self, Cli, ScanOutput};
use stockscan::domain::cache::ResultCache;
use stockscan::domain::chart::{chart_data, DEFAULT_CHART_LIMIT};
use stockscan::domain::config_validation::scan_settings_from_config;
use stockscan::domain::error::ScannerError;
use stockscan::domain::rule_compiler::compile;
use stockscan::domain::rule_parser;
use stockscan::domain::scan::ScanRequest;
use stockscan::domain::timeframe::Timeframe;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn write_csv(dir: &Path, symbol: &str, bars: &[OhlcvBar]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for bar in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.date.format("%Y-%m-%d"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        ));
    }
    fs::write(dir.join(format!("{symbol}.csv")), content).unwrap();
}

fn price_dir() -> tempfile::TempDir {
    let dir = tempfile::TempDir::new().unwrap();
    write_csv(dir.path(), "UP", &generate_bars("2023-01-01", 150, 100.0, 1.0));
    write_csv(dir.path(), "DOWN", &generate_bars("2023-01-01", 150, 300.0, -1.0));
    write_csv(dir.path(), "SHORT", &generate_bars("2023-01-01", 20, 100.0, 1.0));
    dir
}

mod config_loading {
    use super::*;

    #[test]
    fn settings_from_ini_file() {
        let ini = write_temp_ini(
            r#"
[scan]
timeframe = 1W
symbols = up, down
indicators = {"ema": [21]}

[cache]
ttl_seconds = 120
"#,
        );
        let config = cli::load_config(Some(ini.path())).unwrap();
        let settings = scan_settings_from_config(&config).unwrap();

        assert_eq!(settings.timeframe, Timeframe::Weekly);
        assert_eq!(settings.symbols, symbols(&["UP", "DOWN"]));
        assert_eq!(settings.indicators.ema, vec![21]);
        assert_eq!(settings.cache_ttl.as_secs(), 120);
    }

    #[test]
    fn missing_config_file_is_parse_error() {
        let err = cli::load_config(Some(Path::new("/nonexistent/stockscan.ini"))).err().unwrap();
        assert!(matches!(err, ScannerError::ConfigParse { .. }));
    }

    #[test]
    fn no_config_means_defaults() {
        let config = cli::load_config(None).unwrap();
        let settings = scan_settings_from_config(&config).unwrap();
        assert_eq!(settings.timeframe, Timeframe::Daily);
        assert!(settings.symbols.is_empty());
        assert_eq!(settings.effective_min_bars(), 55);
    }
}

mod store_selection {
    use super::*;

    #[test]
    fn csv_dir_from_config() {
        let dir = price_dir();
        let ini = write_temp_ini(&format!("[csv]\ndir = {}\n", dir.path().display()));
        let config = cli::load_config(Some(ini.path())).unwrap();

        let store = cli::open_store(&config, None).unwrap();
        assert_eq!(store.list_symbols().unwrap(), symbols(&["DOWN", "SHORT", "UP"]));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_path_from_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = dir.path().join("prices.db");
        let ini = write_temp_ini(&format!("[sqlite]\npath = {}\n", db.display()));
        let config = cli::load_config(Some(ini.path())).unwrap();

        let store = cli::open_store(&config, None).unwrap();
        assert!(store.list_symbols().unwrap().is_empty());
        assert!(db.exists());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn no_store_configured_is_missing_sqlite_path() {
        let config = cli::load_config(None).unwrap();
        match cli::open_store(&config, None) {
            Err(ScannerError::ConfigMissing { section, key }) => {
                assert_eq!(section, "sqlite");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }
}

mod scan_command {
    use super::*;

    #[test]
    fn end_to_end_scan_over_csv_store() {
        let dir = price_dir();
        let ini = write_temp_ini(&format!(
            "[csv]\ndir = {}\n\n[scan]\nindicators = {{\"rsi\": [14]}}\n",
            dir.path().display()
        ));
        let config = cli::load_config(Some(ini.path())).unwrap();
        let mut settings = scan_settings_from_config(&config).unwrap();

        let rule = rule_parser::parse_rule(&json!({
            "AND": [
                {"rising_sma": {"period": 50}},
                {"close_above_prev_close": {}}
            ]
        }))
        .unwrap();
        cli::extend_for_rule(&mut settings.indicators, &rule);
        assert_eq!(settings.indicators.sma, vec![50]);
        assert_eq!(settings.indicators.rsi, vec![14]);

        let store = cli::open_store(&config, None).unwrap();
        let all = store.list_symbols().unwrap();
        let min_bars = settings.effective_min_bars();
        let request = ScanRequest::new(all, settings.timeframe, settings.indicators).with_min_bars(min_bars);
        let report = request.run(store.as_ref(), &ResultCache::new(), &compile(&rule));

        assert_eq!(report.matches, symbols(&["UP"]));
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].symbol, "SHORT");

        let output = serde_json::to_value(ScanOutput::new(request.timeframe, &report)).unwrap();
        assert_eq!(output, json!({"timeframe": "1D", "count": 1, "symbols": ["UP"]}));
    }

    #[test]
    fn rule_file_and_flags_parse() {
        let cli = Cli::try_parse_from([
            "stockscan",
            "scan",
            "--config",
            "scan.ini",
            "--rule",
            "rule.json",
            "--min-bars",
            "60",
            "--csv-dir",
            "/data",
        ])
        .unwrap();
        match cli.command {
            cli::Command::Scan {
                config,
                rule,
                min_bars,
                csv_dir,
                ..
            } => {
                assert_eq!(config.unwrap().to_str(), Some("scan.ini"));
                assert_eq!(rule.unwrap().to_str(), Some("rule.json"));
                assert_eq!(min_bars, Some(60));
                assert_eq!(csv_dir.unwrap().to_str(), Some("/data"));
            }
            other => panic!("expected scan, got {other:?}"),
        }
    }

    #[test]
    fn required_bars_subcommand_parses() {
        let cli = Cli::try_parse_from(["stockscan", "required-bars", "--indicators", r#"{"sma":[50]}"#]).unwrap();
        assert!(matches!(cli.command, cli::Command::RequiredBars { .. }));
    }
}

mod chart_command {
    use super::*;

    #[test]
    fn weekly_chart_from_csv_store() {
        let dir = price_dir();
        let config = cli::load_config(None).unwrap();
        let store = cli::open_store(&config, Some(dir.path().to_path_buf())).unwrap();

        // 2023-01-01 is a Sunday: one partial week, 21 full weeks, one partial week
        let chart = chart_data(store.as_ref(), "UP", Timeframe::Weekly, DEFAULT_CHART_LIMIT).unwrap();
        assert_eq!(chart.bars, 23);
        assert_eq!(chart.data.date.first().map(String::as_str), Some("2022-12-30"));
        assert_eq!(chart.data.date.last().map(String::as_str), Some("2023-06-02"));
        assert_eq!(chart.data.close.last().copied(), Some(249.0));

        let value = serde_json::to_value(&chart).unwrap();
        assert_eq!(value["symbol"], "UP");
        assert_eq!(value["tf"], "1W");
        assert_eq!(value["data"]["volume"].as_array().map(Vec::len), Some(23));
    }

    #[test]
    fn daily_chart_respects_limit() {
        let dir = price_dir();
        let config = cli::load_config(None).unwrap();
        let store = cli::open_store(&config, Some(dir.path().to_path_buf())).unwrap();

        let chart = chart_data(store.as_ref(), "SHORT", Timeframe::Daily, 5).unwrap();
        assert_eq!(chart.bars, 5);
        assert_eq!(chart.data.date[0], "2023-01-16");
        assert_eq!(chart.data.close, vec![115.0, 116.0, 117.0, 118.0, 119.0]);
    }

    #[test]
    fn chart_subcommand_parses() {
        let cli = Cli::try_parse_from([
            "stockscan", "chart", "--symbol", "UP", "--timeframe", "1M", "--limit", "300",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            cli::Command::Chart { ref timeframe, limit: 300, .. } if timeframe == "1M"
        ));
    }
}

#[cfg(feature = "sqlite")]
mod import_command {
    use super::*;
    use stockscan::adapters::file_config_adapter::FileConfigAdapter;
    use stockscan::adapters::sqlite_adapter::SqliteAdapter;
    use stockscan::ports::price_store::PriceStore;

    #[test]
    fn import_copies_csv_into_sqlite() {
        let prices = price_dir();
        let db_dir = tempfile::TempDir::new().unwrap();
        let db = db_dir.path().join("prices.db");
        let ini = write_temp_ini(&format!(
            "[sqlite]\npath = {}\n\n[csv]\ndir = {}\n",
            db.display(),
            prices.path().display()
        ));

        let args = ["stockscan", "import", "--config", ini.path().to_str().unwrap()];
        let _ = cli::run(Cli::try_parse_from(args).unwrap());

        let config = FileConfigAdapter::from_file(ini.path()).unwrap();
        let store = SqliteAdapter::from_config(&config).unwrap();
        assert_eq!(store.list_symbols().unwrap(), symbols(&["DOWN", "SHORT", "UP"]));
        assert_eq!(store.load_prices("UP").unwrap().len(), 150);

        let (first, last, count) = store.data_range("SHORT").unwrap().unwrap();
        assert_eq!(first, date(2023, 1, 1));
        assert_eq!(last, date(2023, 1, 20));
        assert_eq!(count, 20);
    }

    #[test]
    fn import_selected_symbols_only() {
        let prices = price_dir();
        let db_dir = tempfile::TempDir::new().unwrap();
        let db = db_dir.path().join("prices.db");
        let ini = write_temp_ini(&format!("[sqlite]\npath = {}\n", db.display()));

        let args = [
            "stockscan",
            "import",
            "--config",
            ini.path().to_str().unwrap(),
            "--csv-dir",
            prices.path().to_str().unwrap(),
            "--symbols",
            "up",
        ];
        let _ = cli::run(Cli::try_parse_from(args).unwrap());

        let config = FileConfigAdapter::from_file(ini.path()).unwrap();
        let store = SqliteAdapter::from_config(&config).unwrap();
        assert_eq!(store.list_symbols().unwrap(), symbols(&["UP"]));
    }

    #[test]
    fn import_rejected_while_refresh_lock_held() {
        use stockscan::domain::refresh::RefreshGate;

        let prices = price_dir();
        let db_dir = tempfile::TempDir::new().unwrap();
        let db = db_dir.path().join("prices.db");
        let ini = write_temp_ini(&format!(
            "[sqlite]\npath = {}\n\n[csv]\ndir = {}\n",
            db.display(),
            prices.path().display()
        ));

        let config = FileConfigAdapter::from_file(ini.path()).unwrap();
        let store = SqliteAdapter::from_config(&config).unwrap();
        store.initialize_schema().unwrap();

        // a separate gate on the same database file stands in for another process
        let other = RefreshGate::with_lock(Box::new(store.clone()));
        let guard = other.try_begin().unwrap();

        let err = cli::run_import(ini.path(), None, None).unwrap_err();
        assert!(matches!(err, ScannerError::RefreshInProgress));
        assert!(store.list_symbols().unwrap().is_empty());

        drop(guard);
        cli::run_import(ini.path(), None, Some("up")).unwrap();
        assert_eq!(store.list_symbols().unwrap(), symbols(&["UP"]));
    }
}
