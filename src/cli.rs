//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::cache::ResultCache;
use crate::domain::chart::{chart_data, DEFAULT_CHART_LIMIT};
use crate::domain::config_validation::{scan_settings_from_config, ScanSettings};
use crate::domain::error::ScannerError;
use crate::domain::indicator::{required_bars, IndicatorConfig};
use crate::domain::rule::RuleNode;
use crate::domain::rule_compiler::compile;
use crate::domain::rule_parser;
use crate::domain::scan::{ScanReport, ScanRequest};
use crate::domain::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_store::PriceStore;

#[derive(Parser, Debug)]
#[command(name = "stockscan", about = "Rule-based stock screener")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan symbols against a rule tree
    Scan {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Rule tree JSON file
        #[arg(short, long, conflicts_with = "rule_json", required_unless_present = "rule_json")]
        rule: Option<PathBuf>,
        /// Rule tree as inline JSON
        #[arg(long)]
        rule_json: Option<String>,
        /// 1D, 1W or 1M
        #[arg(short, long)]
        timeframe: Option<String>,
        /// Comma-separated symbols; defaults to every symbol in the store
        #[arg(long)]
        symbols: Option<String>,
        #[arg(long)]
        min_bars: Option<usize>,
        /// Read prices from CSV files in this directory
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },
    /// Validate a rule tree
    Validate {
        #[arg(short, long, conflicts_with = "rule_json", required_unless_present = "rule_json")]
        rule: Option<PathBuf>,
        #[arg(long)]
        rule_json: Option<String>,
    },
    /// Bars needed for an indicator config to be defined at the last row
    RequiredBars {
        /// Indicator config JSON, e.g. {"sma":[50]}
        #[arg(short, long)]
        indicators: String,
    },
    /// List symbols available in the price store
    ListSymbols {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },
    /// Print resampled OHLCV chart data for one symbol as JSON
    Chart {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        symbol: String,
        /// 1D, 1W or 1M
        #[arg(short, long, default_value = "1D")]
        timeframe: String,
        /// Most recent daily bars to read before resampling
        #[arg(long, default_value_t = DEFAULT_CHART_LIMIT)]
        limit: usize,
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },
    /// Import CSV price files into the SQLite store
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        csv_dir: Option<PathBuf>,
        #[arg(long)]
        symbols: Option<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct ScanOutput {
    pub timeframe: String,
    pub count: usize,
    pub symbols: Vec<String>,
}

impl ScanOutput {
    pub fn new(timeframe: Timeframe, report: &ScanReport) -> Self {
        Self {
            timeframe: timeframe.to_string(),
            count: report.matches.len(),
            symbols: report.matches.clone(),
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Scan {
            config,
            rule,
            rule_json,
            timeframe,
            symbols,
            min_bars,
            csv_dir,
        } => run_scan(ScanArgs {
            config,
            rule: read_rule_source(rule.as_deref(), rule_json),
            timeframe,
            symbols,
            min_bars,
            csv_dir,
        }),
        Command::Validate { rule, rule_json } => {
            run_validate(read_rule_source(rule.as_deref(), rule_json))
        }
        Command::RequiredBars { indicators } => run_required_bars(&indicators),
        Command::ListSymbols { config, csv_dir } => run_list_symbols(config.as_deref(), csv_dir),
        Command::Chart {
            config,
            symbol,
            timeframe,
            limit,
            csv_dir,
        } => run_chart(config.as_deref(), &symbol, &timeframe, limit, csv_dir),
        Command::Import {
            config,
            csv_dir,
            symbols,
        } => run_import(&config, csv_dir, symbols.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, ScannerError> {
    match path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            FileConfigAdapter::from_file(path)
        }
        None => FileConfigAdapter::from_string(""),
    }
}

fn read_rule_source(path: Option<&Path>, inline: Option<String>) -> Result<String, ScannerError> {
    match (path, inline) {
        (_, Some(json)) => Ok(json),
        (Some(path), None) => fs::read_to_string(path).map_err(|e| ScannerError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        }),
        (None, None) => Err(ScannerError::rule("no rule given (use --rule or --rule-json)")),
    }
}

/// Open the configured price store: CSV when a directory is given on the
/// command line or in `[csv] dir`, SQLite otherwise.
pub fn open_store(
    config: &dyn ConfigPort,
    csv_dir: Option<PathBuf>,
) -> Result<Box<dyn PriceStore>, ScannerError> {
    let csv_dir = csv_dir.or_else(|| config.get_string("csv", "dir").map(PathBuf::from));
    if let Some(dir) = csv_dir {
        tracing::debug!(dir = %dir.display(), "using csv price store");
        return Ok(Box::new(CsvAdapter::new(dir)));
    }

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;

        let store = SqliteAdapter::from_config(config)?;
        store.initialize_schema()?;
        Ok(Box::new(store))
    }

    #[cfg(not(feature = "sqlite"))]
    {
        Err(ScannerError::ConfigMissing {
            section: "csv".into(),
            key: "dir".into(),
        })
    }
}

/// Add every indicator `rule` reads to `indicators`.
pub fn extend_for_rule(indicators: &mut IndicatorConfig, rule: &RuleNode) {
    for indicator in rule.required_indicators() {
        indicators.include(indicator);
    }
}

pub fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

struct ScanArgs {
    config: Option<PathBuf>,
    rule: Result<String, ScannerError>,
    timeframe: Option<String>,
    symbols: Option<String>,
    min_bars: Option<usize>,
    csv_dir: Option<PathBuf>,
}

fn run_scan(args: ScanArgs) -> Result<(), ScannerError> {
    let config = load_config(args.config.as_deref())?;
    let mut settings = scan_settings_from_config(&config)?;

    let rule = rule_parser::parse_rule_str(&args.rule?)?;
    apply_overrides(&mut settings, &args.timeframe, &args.symbols, args.min_bars)?;
    extend_for_rule(&mut settings.indicators, &rule);

    let store = open_store(&config, args.csv_dir)?;
    if settings.symbols.is_empty() {
        settings.symbols = store.list_symbols()?;
    }

    let predicate = compile(&rule);
    let cache = ResultCache::with_ttl(settings.cache_ttl);
    let min_bars = settings.effective_min_bars();

    eprintln!(
        "Scanning {} symbols on {} (min {} bars, {} indicators)",
        settings.symbols.len(),
        settings.timeframe,
        min_bars,
        settings.indicators.indicators().len(),
    );

    let request = ScanRequest::new(settings.symbols, settings.timeframe, settings.indicators)
        .with_min_bars(min_bars);
    let report = request.run(store.as_ref(), &cache, &predicate);

    if !report.skipped.is_empty() {
        eprintln!("{} symbols skipped", report.skipped.len());
    }

    let output = ScanOutput::new(request.timeframe, &report);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn apply_overrides(
    settings: &mut ScanSettings,
    timeframe: &Option<String>,
    symbols: &Option<String>,
    min_bars: Option<usize>,
) -> Result<(), ScannerError> {
    if let Some(tf) = timeframe {
        settings.timeframe = tf.parse()?;
    }
    if let Some(raw) = symbols {
        settings.symbols = parse_symbols(raw);
    }
    if let Some(n) = min_bars {
        if n == 0 {
            return Err(ScannerError::ConfigInvalid {
                section: "scan".into(),
                key: "min_bars".into(),
                reason: "min_bars must be a positive integer".into(),
            });
        }
        settings.min_bars = Some(n);
    }
    Ok(())
}

fn run_validate(rule: Result<String, ScannerError>) -> Result<(), ScannerError> {
    let rule = rule_parser::parse_rule_str(&rule?)?;

    let mut indicators = IndicatorConfig::default();
    extend_for_rule(&mut indicators, &rule);

    eprintln!("Rule is valid: {} leaf rules", rule.leaf_count());
    eprintln!("\nParsed:");
    eprintln!("{}", serde_json::to_string_pretty(&rule.to_json())?);

    eprintln!("\nIndicators:");
    for indicator in indicators.indicators() {
        eprintln!("  {indicator}");
    }
    eprintln!("\nRequired bars: {}", required_bars(&indicators));
    Ok(())
}

fn run_required_bars(indicators: &str) -> Result<(), ScannerError> {
    let config = IndicatorConfig::from_json(indicators)?;
    println!("{}", required_bars(&config));
    Ok(())
}

fn run_list_symbols(config_path: Option<&Path>, csv_dir: Option<PathBuf>) -> Result<(), ScannerError> {
    let config = load_config(config_path)?;
    let store = open_store(&config, csv_dir)?;
    let symbols = store.list_symbols()?;

    if symbols.is_empty() {
        eprintln!("No symbols found");
    } else {
        for symbol in &symbols {
            println!("{symbol}");
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

fn run_chart(
    config_path: Option<&Path>,
    symbol: &str,
    timeframe: &str,
    limit: usize,
    csv_dir: Option<PathBuf>,
) -> Result<(), ScannerError> {
    let timeframe: Timeframe = timeframe.parse()?;
    let config = load_config(config_path)?;
    let store = open_store(&config, csv_dir)?;

    let chart = chart_data(store.as_ref(), &symbol.trim().to_uppercase(), timeframe, limit)?;
    if chart.bars == 0 {
        eprintln!("No price data for {}", chart.symbol);
    }
    println!("{}", serde_json::to_string_pretty(&chart)?);
    Ok(())
}

/// Copy CSV price files into the SQLite store named by `[sqlite] path`.
///
/// Fails with `RefreshInProgress` while another import holds the store's
/// refresh lock, in this process or any other.
#[cfg(feature = "sqlite")]
pub fn run_import(config_path: &Path, csv_dir: Option<PathBuf>, symbols: Option<&str>) -> Result<(), ScannerError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    use crate::domain::refresh::RefreshGate;

    let config = load_config(Some(config_path))?;
    let csv_dir = csv_dir
        .or_else(|| config.get_string("csv", "dir").map(PathBuf::from))
        .ok_or_else(|| ScannerError::ConfigMissing {
            section: "csv".into(),
            key: "dir".into(),
        })?;

    let source = CsvAdapter::new(csv_dir);
    let target = SqliteAdapter::from_config(&config)?;
    target.initialize_schema()?;

    let gate = RefreshGate::with_lock(Box::new(target.clone()));
    let guard = gate.try_begin()?;

    let symbols = match symbols {
        Some(raw) => parse_symbols(raw),
        None => source.list_symbols()?,
    };

    let mut imported = 0;
    for symbol in &symbols {
        guard.set_message(format!("Importing {symbol}"));
        let bars = match source.load_prices(symbol) {
            Ok(bars) => bars,
            Err(e) => {
                eprintln!("warning: skipping {symbol} ({e})");
                continue;
            }
        };
        target.insert_bars(symbol, &bars)?;
        imported += 1;

        match target.data_range(symbol)? {
            Some((first, last, count)) => eprintln!("{symbol}: {count} bars, {first} to {last}"),
            None => eprintln!("{symbol}: no data"),
        }
    }

    drop(guard);
    eprintln!("Imported {imported} of {} symbols", symbols.len());
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
pub fn run_import(_config_path: &Path, _csv_dir: Option<PathBuf>, _symbols: Option<&str>) -> Result<(), ScannerError> {
    Err(ScannerError::Database {
        reason: "sqlite feature is required for import".into(),
    })
}
