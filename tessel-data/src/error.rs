use std::time::Duration;

use crate::include::NavigationKind;
use crate::query::QueryError;

/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    NotFound(String),
    Database(Box<dyn std::error::Error + Send + Sync>),
    Query(QueryError),
    /// An include named a navigation the entity does not have, or one of the wrong kind.
    Navigation {
        entity: &'static str,
        navigation: String,
        expected: Option<NavigationKind>,
    },
    /// An update or delete matched no row while saving.
    Concurrency { table: &'static str, key: String },
    Timeout(Duration),
    Unsupported(String),
    /// The audit sink rejected the audit of a save.
    Audit(String),
    Other(String),
}

impl DataError {
    /// Construct a `Database` variant from any error type.
    ///
    /// Used by backend crates (e.g. `tessel-data-sqlx`) to wrap driver-specific errors.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }

    pub fn unknown_navigation(entity: &'static str, navigation: &str) -> Self {
        DataError::Navigation {
            entity,
            navigation: navigation.to_string(),
            expected: None,
        }
    }

    pub fn wrong_navigation_kind(
        entity: &'static str,
        navigation: &str,
        expected: NavigationKind,
    ) -> Self {
        DataError::Navigation {
            entity,
            navigation: navigation.to_string(),
            expected: Some(expected),
        }
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::NotFound(msg) => write!(f, "Not found: {msg}"),
            DataError::Database(err) => write!(f, "Database error: {err}"),
            DataError::Query(err) => write!(f, "Query error: {err}"),
            DataError::Navigation {
                entity,
                navigation,
                expected: None,
            } => write!(f, "Entity '{entity}' has no navigation '{navigation}'"),
            DataError::Navigation {
                entity,
                navigation,
                expected: Some(kind),
            } => write!(f, "Navigation '{navigation}' of '{entity}' is not a {kind}"),
            DataError::Concurrency { table, key } => write!(
                f,
                "Concurrency conflict: row {key} of '{table}' was changed or deleted"
            ),
            DataError::Timeout(after) => write!(f, "Command timed out after {}s", after.as_secs()),
            DataError::Unsupported(msg) => write!(f, "Unsupported: {msg}"),
            DataError::Audit(msg) => write!(f, "Audit error: {msg}"),
            DataError::Other(msg) => write!(f, "Data error: {msg}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Database(err) => Some(err.as_ref()),
            DataError::Query(err) => Some(err),
            _ => None,
        }
    }
}

impl From<QueryError> for DataError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Unsupported(msg) => DataError::Unsupported(msg),
            other => DataError::Query(other),
        }
    }
}
