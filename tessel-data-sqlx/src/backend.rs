//! Per-driver statement execution.
//!
//! Repository code is generic over the database; the few places that need a
//! concrete driver (binding [`Value`]s, decoding a count) live behind the
//! [`Backend`] trait, implemented for each enabled sqlx driver.

use std::future::Future;

use sqlx::{Database, FromRow};
use tessel_data::{Dialect, Value};

/// A sqlx database Tessel can run statements against.
pub trait Backend: Database {
    /// SQL dialect used to render statements for this database.
    const DIALECT: Dialect;

    fn fetch_all<'c, T>(
        conn: &'c mut Self::Connection,
        sql: &'c str,
        params: &'c [Value],
    ) -> impl Future<Output = Result<Vec<T>, sqlx::Error>> + Send + 'c
    where
        T: for<'r> FromRow<'r, Self::Row> + Send + Unpin + 'c;

    fn fetch_optional<'c, T>(
        conn: &'c mut Self::Connection,
        sql: &'c str,
        params: &'c [Value],
    ) -> impl Future<Output = Result<Option<T>, sqlx::Error>> + Send + 'c
    where
        T: for<'r> FromRow<'r, Self::Row> + Send + Unpin + 'c;

    /// Run a statement returning a single `COUNT(*)`-style integer.
    fn fetch_count<'c>(
        conn: &'c mut Self::Connection,
        sql: &'c str,
        params: &'c [Value],
    ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send + 'c;

    /// Run a statement and return the number of affected rows.
    fn execute<'c>(
        conn: &'c mut Self::Connection,
        sql: &'c str,
        params: &'c [Value],
    ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send + 'c;
}

macro_rules! bind_values {
    ($query:ident, $params:expr) => {
        for value in $params {
            $query = match value {
                Value::Null => $query.bind(None::<String>),
                Value::Bool(b) => $query.bind(*b),
                Value::Int(i) => $query.bind(*i),
                Value::Float(f) => $query.bind(*f),
                Value::Text(s) => $query.bind(s.clone()),
            };
        }
    };
}

macro_rules! impl_backend {
    ($db:ty, $dialect:expr) => {
        impl Backend for $db {
            const DIALECT: Dialect = $dialect;

            fn fetch_all<'c, T>(
                conn: &'c mut <$db as Database>::Connection,
                sql: &'c str,
                params: &'c [Value],
            ) -> impl Future<Output = Result<Vec<T>, sqlx::Error>> + Send + 'c
            where
                T: for<'r> FromRow<'r, <$db as Database>::Row> + Send + Unpin + 'c,
            {
                async move {
                    let mut query = sqlx::query_as::<$db, T>(sql);
                    bind_values!(query, params);
                    query.fetch_all(&mut *conn).await
                }
            }

            fn fetch_optional<'c, T>(
                conn: &'c mut <$db as Database>::Connection,
                sql: &'c str,
                params: &'c [Value],
            ) -> impl Future<Output = Result<Option<T>, sqlx::Error>> + Send + 'c
            where
                T: for<'r> FromRow<'r, <$db as Database>::Row> + Send + Unpin + 'c,
            {
                async move {
                    let mut query = sqlx::query_as::<$db, T>(sql);
                    bind_values!(query, params);
                    query.fetch_optional(&mut *conn).await
                }
            }

            fn fetch_count<'c>(
                conn: &'c mut <$db as Database>::Connection,
                sql: &'c str,
                params: &'c [Value],
            ) -> impl Future<Output = Result<i64, sqlx::Error>> + Send + 'c {
                async move {
                    let mut query = sqlx::query_scalar::<$db, i64>(sql);
                    bind_values!(query, params);
                    query.fetch_one(&mut *conn).await
                }
            }

            fn execute<'c>(
                conn: &'c mut <$db as Database>::Connection,
                sql: &'c str,
                params: &'c [Value],
            ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send + 'c {
                async move {
                    let mut query = sqlx::query::<$db>(sql);
                    bind_values!(query, params);
                    let result = query.execute(&mut *conn).await?;
                    Ok(result.rows_affected())
                }
            }
        }
    };
}

#[cfg(feature = "sqlite")]
impl_backend!(sqlx::Sqlite, Dialect::Sqlite);

#[cfg(feature = "postgres")]
impl_backend!(sqlx::Postgres, Dialect::Postgres);

#[cfg(feature = "mysql")]
impl_backend!(sqlx::MySql, Dialect::MySql);
