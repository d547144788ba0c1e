use thiserror::Error;

/// Errors surfaced by the reader cache.
///
/// Not-found is never an error: lookups return `None` or an empty string.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[source] rusqlite::Error),

    /// A stored row could not be turned into a value object.
    #[error("Malformed row: {0}")]
    InvalidRow(String),

    #[error("Connection lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<rusqlite::Error> for CacheError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::InvalidColumnType(idx, name, ty) => {
                Self::InvalidRow(format!("column {} ({}) has unexpected type {}", idx, name, ty))
            }
            rusqlite::Error::FromSqlConversionFailure(idx, ty, err) => {
                Self::InvalidRow(format!("column {} ({}) failed to convert: {}", idx, ty, err))
            }
            rusqlite::Error::InvalidColumnName(name) => {
                Self::InvalidRow(format!("missing column {}", name))
            }
            other => Self::Sqlite(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_errors_map_to_invalid_row() {
        let e = rusqlite::Error::InvalidColumnType(
            0,
            "slug".into(),
            rusqlite::types::Type::Null,
        );
        assert!(matches!(CacheError::from(e), CacheError::InvalidRow(_)));
    }

    #[test]
    fn test_other_errors_stay_sqlite() {
        let e = rusqlite::Error::QueryReturnedNoRows;
        assert!(matches!(CacheError::from(e), CacheError::Sqlite(_)));
    }
}
