//! stockscan: rule-based stock screener.
//!
//! Daily prices are resampled to the requested timeframe, enriched with
//! indicator columns and tested against a JSON rule tree; matching symbols are
//! returned in input order. Enriched tables are cached per
//! (symbol, timeframe, indicator config).
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
