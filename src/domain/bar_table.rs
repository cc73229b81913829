//! Bar table: an ordered run of bars for one symbol plus named indicator columns.
//!
//! Columns are fixed-length `f64` vectors aligned row-for-row with the bars.
//! Undefined cells (warmup rows, divisions by zero) hold `NaN`. A column name can
//! only be added once; adding a second column under the same name is an error so
//! that two different indicator requests can never silently overwrite each other.

use crate::domain::error::ScannerError;
use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarTable {
    bars: Vec<OhlcvBar>,
    columns: Vec<Column>,
}

impl BarTable {
    pub fn new(bars: Vec<OhlcvBar>) -> Self {
        Self {
            bars,
            columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn last_bar(&self) -> Option<&OhlcvBar> {
        self.bars.last()
    }

    /// Second-to-last bar, if the table has at least two rows.
    pub fn prev_bar(&self) -> Option<&OhlcvBar> {
        let n = self.bars.len();
        if n < 2 { None } else { self.bars.get(n - 2) }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<(), ScannerError> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(ScannerError::ColumnCollision { name });
        }
        if values.len() != self.bars.len() {
            return Err(ScannerError::ColumnLength {
                name,
                expected: self.bars.len(),
                actual: values.len(),
            });
        }
        self.columns.push(Column { name, values });
        Ok(())
    }

    /// Consuming form of [`BarTable::add_column`].
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self, ScannerError> {
        self.add_column(name, values)?;
        Ok(self)
    }

    /// Value of `name` at `row`; `None` if the column or row is missing.
    /// A present-but-undefined cell is returned as `Some(NaN)`.
    pub fn value_at(&self, name: &str, row: usize) -> Option<f64> {
        self.column(name).and_then(|values| values.get(row).copied())
    }

    pub fn last_value(&self, name: &str) -> Option<f64> {
        self.column(name).and_then(|values| values.last().copied())
    }

    /// Value of `name` on the second-to-last row.
    pub fn prev_value(&self, name: &str) -> Option<f64> {
        let values = self.column(name)?;
        let n = values.len();
        if n < 2 { None } else { Some(values[n - 2]) }
    }
}
