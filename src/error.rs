use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("store failure: {0}")]
    Store(#[from] rusqlite::Error),

    /// A batch was rolled back; `index` is the first item that failed.
    #[error("batch of {total} records rolled back, item {index} failed: {source}")]
    BatchPartialFailure {
        index: usize,
        total: usize,
        #[source]
        source: Box<LedgerError>,
    },
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
