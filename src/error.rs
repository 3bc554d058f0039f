use std::fmt;

/// Error type for record store, medium and import operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The persistent medium is unavailable, full, or failed an I/O call.
    Storage(String),
    /// The referenced day number or date does not exist at call time.
    NotFound(String),
    /// A word index is out of bounds for the target record.
    Index { date: String, index: usize, len: usize },
    /// A bulk payload is malformed; nothing was written.
    Validation(String),
}

impl StoreError {
    pub(crate) fn poisoned(operation: &str) -> Self {
        StoreError::Storage(format!("lock poisoned during {}", operation))
    }

    pub(crate) fn day_not_found(day_number: usize) -> Self {
        StoreError::NotFound(format!("day {}", day_number))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Storage(msg) => write!(f, "storage error: {}", msg),
            StoreError::NotFound(what) => write!(f, "not found: {}", what),
            StoreError::Index { date, index, len } => write!(
                f,
                "word index {} out of bounds for {} ({} words)",
                index, date, len
            ),
            StoreError::Validation(msg) => write!(f, "invalid record payload: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<bitcode::Error> for StoreError {
    fn from(err: bitcode::Error) -> Self {
        StoreError::Storage(format!("medium decode: {}", err))
    }
}
