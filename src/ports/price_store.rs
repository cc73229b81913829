//! Price store port: ascending daily OHLCV history per symbol.

use crate::domain::error::ScannerError;
use crate::domain::ohlcv::OhlcvBar;

pub trait PriceStore {
    /// Full daily history for `symbol`, ascending by date. An unknown symbol
    /// yields an empty vector, not an error.
    fn load_prices(&self, symbol: &str) -> Result<Vec<OhlcvBar>, ScannerError>;

    /// Every symbol the store holds prices for, sorted.
    fn list_symbols(&self) -> Result<Vec<String>, ScannerError>;
}
