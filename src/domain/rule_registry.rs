//! Rule registry: the single table both the validator and the compiler read.
//!
//! Each entry carries the rule's parameter schema, the indicators it reads and
//! the factory that turns resolved parameters into a [`Predicate`]. A rule name
//! accepted by the validator therefore always has a factory.

use crate::domain::indicator::macd::{DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW};
use crate::domain::indicator::{macd_columns, IndicatorType};
use crate::domain::rule::{Params, Predicate};
use crate::domain::rule_eval;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Positive integer bar count.
    Period,
    /// Any finite number.
    Number,
}

#[derive(Debug)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    /// `None` marks a required parameter.
    pub default: Option<f64>,
}

impl ParamSpec {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

#[derive(Debug)]
pub struct RuleSpec {
    pub name: &'static str,
    pub params: &'static [ParamSpec],
    pub build: fn(&Params) -> Predicate,
    pub indicators: fn(&Params) -> Vec<IndicatorType>,
}

impl RuleSpec {
    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn required(&self) -> impl Iterator<Item = &'static str> {
        self.params.iter().filter(|p| p.is_required()).map(|p| p.name)
    }

    pub fn optional(&self) -> impl Iterator<Item = &'static str> {
        self.params.iter().filter(|p| !p.is_required()).map(|p| p.name)
    }
}

const fn required(name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        default: None,
    }
}

const fn optional(name: &'static str, kind: ParamKind, default: f64) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        default: Some(default),
    }
}

const PERIOD: ParamSpec = required("period", ParamKind::Period);
const TOLERANCE: ParamSpec = optional("tolerance_pct", ParamKind::Number, 1.0);
const LOOKBACK: ParamSpec = optional("lookback", ParamKind::Period, 3.0);
const LEVEL: ParamSpec = required("level", ParamKind::Number);
const MACD_PARAMS: [ParamSpec; 3] = [
    optional("fast", ParamKind::Period, DEFAULT_FAST as f64),
    optional("slow", ParamKind::Period, DEFAULT_SLOW as f64),
    optional("signal", ParamKind::Period, DEFAULT_SIGNAL as f64),
];

// Lookups after validation always hit; the fallbacks only keep these total.
fn number(params: &Params, key: &str) -> f64 {
    params.get(key).copied().unwrap_or(f64::NAN)
}

fn period(params: &Params, key: &str) -> usize {
    params.get(key).map(|v| *v as usize).unwrap_or(0)
}

fn sma(params: &Params) -> IndicatorType {
    IndicatorType::Sma(period(params, "period"))
}

fn ema(params: &Params) -> IndicatorType {
    IndicatorType::Ema(period(params, "period"))
}

fn rsi(params: &Params) -> IndicatorType {
    IndicatorType::Rsi(period(params, "period"))
}

fn macd(params: &Params) -> IndicatorType {
    IndicatorType::Macd {
        fast: period(params, "fast"),
        slow: period(params, "slow"),
        signal: period(params, "signal"),
    }
}

fn no_indicators(_: &Params) -> Vec<IndicatorType> {
    Vec::new()
}

pub static REGISTRY: &[RuleSpec] = &[
    RuleSpec {
        name: "near_sma",
        params: &[PERIOD, TOLERANCE],
        build: |p| rule_eval::near_ma(sma(p).column(), number(p, "tolerance_pct")),
        indicators: |p| vec![sma(p)],
    },
    RuleSpec {
        name: "near_ema",
        params: &[PERIOD, TOLERANCE],
        build: |p| rule_eval::near_ma(ema(p).column(), number(p, "tolerance_pct")),
        indicators: |p| vec![ema(p)],
    },
    RuleSpec {
        name: "rising_sma",
        params: &[PERIOD, LOOKBACK],
        build: |p| rule_eval::rising_ma(sma(p).column(), period(p, "lookback")),
        indicators: |p| vec![sma(p)],
    },
    RuleSpec {
        name: "rising_ema",
        params: &[PERIOD, LOOKBACK],
        build: |p| rule_eval::rising_ma(ema(p).column(), period(p, "lookback")),
        indicators: |p| vec![ema(p)],
    },
    RuleSpec {
        name: "crossing_sma",
        params: &[PERIOD],
        build: |p| rule_eval::crossing_up(sma(p).column()),
        indicators: |p| vec![sma(p)],
    },
    RuleSpec {
        name: "crossing_ema",
        params: &[PERIOD],
        build: |p| rule_eval::crossing_up(ema(p).column()),
        indicators: |p| vec![ema(p)],
    },
    RuleSpec {
        name: "rsi_above",
        params: &[PERIOD, LEVEL],
        build: |p| rule_eval::rsi_above(rsi(p).column(), number(p, "level")),
        indicators: |p| vec![rsi(p)],
    },
    RuleSpec {
        name: "rsi_below",
        params: &[PERIOD, LEVEL],
        build: |p| rule_eval::rsi_below(rsi(p).column(), number(p, "level")),
        indicators: |p| vec![rsi(p)],
    },
    RuleSpec {
        name: "macd_bullish",
        params: &MACD_PARAMS,
        build: |p| {
            let [line, signal, _] = macd_columns(
                period(p, "fast"),
                period(p, "slow"),
                period(p, "signal"),
            );
            rule_eval::macd_bullish(line, signal)
        },
        indicators: |p| vec![macd(p)],
    },
    RuleSpec {
        name: "close_above_open",
        params: &[],
        build: |_| rule_eval::close_above_open(),
        indicators: no_indicators,
    },
    RuleSpec {
        name: "close_above_prev_close",
        params: &[],
        build: |_| rule_eval::close_above_prev_close(),
        indicators: no_indicators,
    },
    RuleSpec {
        name: "close_near_high",
        params: &[TOLERANCE],
        build: |p| rule_eval::close_near_high(number(p, "tolerance_pct")),
        indicators: no_indicators,
    },
    RuleSpec {
        name: "range_above_pct",
        params: &[required("min_pct", ParamKind::Number)],
        build: |p| rule_eval::range_above_pct(number(p, "min_pct")),
        indicators: no_indicators,
    },
];

pub fn lookup(name: &str) -> Option<&'static RuleSpec> {
    REGISTRY.iter().find(|spec| spec.name == name)
}

pub fn rule_names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|spec| spec.name)
}
