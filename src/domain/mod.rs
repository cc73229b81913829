//! Core domain types and logic.

pub mod ohlcv;
pub mod bar_table;
pub mod timeframe;
pub mod indicator;
pub mod rule;
pub mod rule_registry;
pub mod rule_parser;
pub mod rule_eval;
pub mod rule_compiler;
pub mod cache;
pub mod scan;
pub mod chart;
pub mod refresh;
pub mod config_validation;
pub mod error;
