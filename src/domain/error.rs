//! Domain error types.

/// Top-level error type for stockscan.
#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid rule: {reason}")]
    RuleInvalid { reason: String },

    #[error("unsupported timeframe: {token}")]
    UnsupportedTimeframe { token: String },

    #[error("column {name} already exists")]
    ColumnCollision { name: String },

    #[error("column {name} has {actual} values, table has {expected} rows")]
    ColumnLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("a price refresh is already running")]
    RefreshInProgress,

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScannerError {
    pub(crate) fn rule(reason: impl Into<String>) -> Self {
        ScannerError::RuleInvalid {
            reason: reason.into(),
        }
    }

    /// True for errors raised while checking a rule tree or scan configuration,
    /// before any per-symbol work starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ScannerError::ConfigParse { .. }
                | ScannerError::ConfigMissing { .. }
                | ScannerError::ConfigInvalid { .. }
                | ScannerError::RuleInvalid { .. }
                | ScannerError::UnsupportedTimeframe { .. }
        )
    }
}

impl From<&ScannerError> for std::process::ExitCode {
    fn from(err: &ScannerError) -> Self {
        let code: u8 = match err {
            ScannerError::Io(_) => 1,
            ScannerError::ConfigParse { .. }
            | ScannerError::ConfigMissing { .. }
            | ScannerError::ConfigInvalid { .. }
            | ScannerError::UnsupportedTimeframe { .. }
            | ScannerError::Json(_) => 2,
            ScannerError::Database { .. } | ScannerError::DatabaseQuery { .. } => 3,
            ScannerError::RuleInvalid { .. } => 4,
            ScannerError::ColumnCollision { .. } | ScannerError::ColumnLength { .. } => 5,
            ScannerError::RefreshInProgress => 6,
        };
        std::process::ExitCode::from(code)
    }
}
