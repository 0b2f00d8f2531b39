//! Eager loading of related rows.
//!
//! An entity lists its navigations in [`Navigate::navigation_kind`] and fills
//! them in [`Navigate::load_navigation`], using the [`Loader`] handed to it.
//! The loader runs on the connection of the query that produced the entity.
//!
//! ```ignore
//! impl Navigate<Sqlite> for Author {
//!     fn navigation_kind(name: &str) -> Option<NavigationKind> {
//!         match name {
//!             "posts" => Some(NavigationKind::Collection),
//!             _ => None,
//!         }
//!     }
//!
//!     async fn load_navigation(&mut self, name: &str, loader: &mut Loader<'_, Sqlite>) -> Result<(), DataError> {
//!         match name {
//!             "posts" => self.posts = loader.collection("author_id", self.id).await?,
//!             _ => return Err(DataError::unknown_navigation(Self::entity_name(), name)),
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use sqlx::FromRow;
use tessel_data::{DataError, Entity, Filter, NavigationKind, Order, QueryBuilder, Value};
use tracing::debug;

use crate::backend::Backend;
use crate::context::timed;

pub trait Navigate<DB: Backend>: Entity {
    /// Kind of the navigation called `name`, or `None` if there is none.
    fn navigation_kind(_name: &str) -> Option<NavigationKind> {
        None
    }

    fn load_navigation(
        &mut self,
        name: &str,
        loader: &mut Loader<'_, DB>,
    ) -> impl Future<Output = Result<(), DataError>> + Send {
        let _ = loader;
        std::future::ready(Err(DataError::unknown_navigation(Self::entity_name(), name)))
    }
}

/// Check `name` against the navigations of `T`. `expected` of `None` accepts either kind.
pub(crate) fn check_navigation<T, DB>(name: &str, expected: Option<NavigationKind>) -> Result<(), DataError>
where
    T: Navigate<DB>,
    DB: Backend,
{
    match (T::navigation_kind(name), expected) {
        (None, _) => Err(DataError::unknown_navigation(T::entity_name(), name)),
        (Some(actual), Some(expected)) if actual != expected => Err(
            DataError::wrong_navigation_kind(T::entity_name(), name, expected),
        ),
        _ => Ok(()),
    }
}

/// Future returned by [`Loader`] queries.
///
/// Boxed so it stays `Send` inside an entity's `async fn load_navigation`.
pub type LoadFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DataError>> + Send + 'a>>;

/// Runs the queries that fill navigation properties.
pub struct Loader<'c, DB: Backend> {
    conn: &'c mut DB::Connection,
    timeout: Duration,
}

impl<'c, DB: Backend> Loader<'c, DB> {
    pub(crate) fn new(conn: &'c mut DB::Connection, timeout: Duration) -> Self {
        Self { conn, timeout }
    }

    /// Rows of `C` matching `filter`.
    pub fn query<'a, C>(&'a mut self, filter: Filter, order: Order) -> LoadFuture<'a, Vec<C>>
    where
        C: Entity + for<'r> FromRow<'r, DB::Row>,
    {
        Box::pin(async move {
            let (sql, params) = QueryBuilder::new_with_dialect(C::table_name(), DB::DIALECT)
                .filter(filter)
                .order(&order)
                .build_select(C::columns())?;
            debug!(navigation = C::table_name(), %sql, "Loading navigation");
            timed(self.timeout, DB::fetch_all::<C>(&mut *self.conn, &sql, &params)).await
        })
    }

    /// Rows of `C` whose `foreign_key` column equals `key`, ordered by their id.
    pub fn collection<'a, C>(&'a mut self, foreign_key: &str, key: impl Into<Value>) -> LoadFuture<'a, Vec<C>>
    where
        C: Entity + for<'r> FromRow<'r, DB::Row>,
    {
        let filter = Filter::eq(foreign_key, key);
        self.query(filter, Order::asc(C::id_column()))
    }

    /// The row of `R` with id `key`. A null key loads nothing.
    pub fn reference<'a, R>(&'a mut self, key: impl Into<Value>) -> LoadFuture<'a, Option<R>>
    where
        R: Entity + for<'r> FromRow<'r, DB::Row>,
    {
        let key = key.into();
        Box::pin(async move {
            if key.is_null() {
                return Ok(None);
            }
            let (sql, params) = QueryBuilder::new_with_dialect(R::table_name(), DB::DIALECT)
                .filter(Filter::eq(R::id_column(), key))
                .limit(1)
                .build_select(R::columns())?;
            debug!(navigation = R::table_name(), %sql, "Loading navigation");
            timed(self.timeout, DB::fetch_optional::<R>(&mut *self.conn, &sql, &params)).await
        })
    }
}
