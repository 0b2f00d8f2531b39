use std::sync::Arc;

use tessel_data::DataError;

/// Extension trait for converting `sqlx::Error` into `DataError`.
///
/// Due to Rust's orphan rules, we can't implement `From<sqlx::Error> for DataError`
/// in this crate. Instead, use `.into_data_error()` or the `?` operator with `SqlxResult`.
pub trait SqlxErrorExt {
    fn into_data_error(self) -> DataError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_data_error(self) -> DataError {
        match &self {
            sqlx::Error::RowNotFound => DataError::NotFound("Row not found".into()),
            sqlx::Error::PoolTimedOut => {
                DataError::Other("Timed out waiting for a pooled connection".into())
            }
            _ => DataError::database(self),
        }
    }
}

/// A driver error shared between every deferred query of a failed batch.
impl SqlxErrorExt for Arc<sqlx::Error> {
    fn into_data_error(self) -> DataError {
        match &*self {
            sqlx::Error::RowNotFound => DataError::NotFound("Row not found".into()),
            sqlx::Error::PoolTimedOut => {
                DataError::Other("Timed out waiting for a pooled connection".into())
            }
            _ => DataError::database(SharedSqlxError(self)),
        }
    }
}

#[derive(Debug)]
struct SharedSqlxError(Arc<sqlx::Error>);

impl std::fmt::Display for SharedSqlxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for SharedSqlxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

/// Convenience alias for data-layer results using `DataError`.
pub type SqlxResult<T> = Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_errors_map_like_owned_ones() {
        let shared = Arc::new(sqlx::Error::Protocol("bad packet".into()));
        let err = shared.clone().into_data_error();
        assert!(matches!(err, DataError::Database(_)));
        assert!(err.to_string().contains("bad packet"));

        let missing = Arc::new(sqlx::Error::RowNotFound).into_data_error();
        assert!(matches!(missing, DataError::NotFound(_)));
    }
}
