use std::marker::PhantomData;
use std::time::Duration;

use sqlx::FromRow;
use tessel_data::{
    parse_include_paths, DataError, Filter, NavigationKind, Order, QueryBuilder, Repository, Value,
};
use tracing::debug;

use crate::backend::Backend;
use crate::context::{timed, DbContext};
use crate::deferred::FutureCount;
use crate::navigation::{check_navigation, Loader, Navigate};
use crate::tracker::{ChangeKind, PendingChange};

/// A [`Repository`] over one entity type, backed by a [`DbContext`].
///
/// # Example
///
/// ```ignore
/// let authors = context.repository::<Author>();
/// authors.add(author);
/// let recent = authors.get(Filter::gt("id", 10), Order::desc("id"), "posts", None, None).await?;
/// ```
pub struct SqlxRepository<T, DB: Backend> {
    context: DbContext<DB>,
    _marker: PhantomData<T>,
}

impl<T, DB: Backend> SqlxRepository<T, DB> {
    pub fn new(context: DbContext<DB>) -> Self {
        Self {
            context,
            _marker: PhantomData,
        }
    }

    pub fn context(&self) -> &DbContext<DB> {
        &self.context
    }
}

impl<T, DB: Backend> Clone for SqlxRepository<T, DB> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, DB> SqlxRepository<T, DB>
where
    T: Navigate<DB> + for<'r> FromRow<'r, DB::Row>,
    DB: Backend,
{
    /// A query builder on this entity's table, in the backend's dialect.
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new_with_dialect(T::table_name(), DB::DIALECT)
    }

    /// Register a count with the context's deferred batch without running it.
    pub fn defer_count(
        &self,
        filter: Filter,
        query_hint: Option<&str>,
    ) -> Result<FutureCount<DB>, DataError> {
        let (sql, params) = self.count_query(filter, query_hint).build_count()?;
        debug!(entity = T::entity_name(), %sql, "Deferring count");
        let slot = self.context.deferred().register(sql, params);
        Ok(FutureCount::new(slot, self.context.clone()))
    }

    fn count_query(&self, filter: Filter, query_hint: Option<&str>) -> QueryBuilder {
        let builder = self.query().filter(filter);
        match query_hint {
            Some(hint) => builder.tag(hint),
            None => builder,
        }
    }

    fn stage(&self, entity: &T, kind: ChangeKind) {
        debug!(entity = T::entity_name(), ?kind, "Staging change");
        self.context.tracker().stage(PendingChange::of(entity, kind));
    }

    /// Run a select and load `includes` into every row, all on one connection.
    async fn fetch(&self, builder: QueryBuilder, includes: &[&str]) -> Result<Vec<T>, DataError> {
        for name in includes {
            check_navigation::<T, DB>(name, None)?;
        }
        let (sql, params) = builder.build_select(T::columns())?;
        let timeout = self.context.command_timeout();

        let mut conn = self.context.acquire().await?;
        debug!(entity = T::entity_name(), %sql, "Querying");
        let mut rows = timed(timeout, DB::fetch_all::<T>(&mut *conn, &sql, &params)).await?;

        if !includes.is_empty() {
            let mut loader = Loader::new(&mut *conn, timeout);
            for row in &mut rows {
                for name in includes {
                    row.load_navigation(name, &mut loader).await?;
                }
            }
        }
        Ok(rows)
    }
}

impl<T, DB> Repository<T> for SqlxRepository<T, DB>
where
    T: Navigate<DB> + for<'r> FromRow<'r, DB::Row>,
    DB: Backend,
{
    fn add(&self, entity: T) {
        self.stage(&entity, ChangeKind::Added);
    }

    fn update(&self, entity: T) {
        self.stage(&entity, ChangeKind::Modified);
    }

    fn remove(&self, entity: T) {
        self.stage(&entity, ChangeKind::Deleted);
    }

    async fn get_by_id(
        &self,
        id: T::Id,
        include_collections: &str,
        include_references: &str,
    ) -> Result<Option<T>, DataError> {
        let collections = parse_include_paths(include_collections);
        let references = parse_include_paths(include_references);
        for name in &collections {
            check_navigation::<T, DB>(name, Some(NavigationKind::Collection))?;
        }
        for name in &references {
            check_navigation::<T, DB>(name, Some(NavigationKind::Reference))?;
        }

        let key: Value = id.into();
        let (sql, params) = self
            .query()
            .filter(Filter::eq(T::id_column(), key))
            .limit(1)
            .build_select(T::columns())?;
        let timeout = self.context.command_timeout();

        let mut conn = self.context.acquire().await?;
        debug!(entity = T::entity_name(), %sql, "Finding by id");
        let found = timed(timeout, DB::fetch_optional::<T>(&mut *conn, &sql, &params)).await?;
        let Some(mut entity) = found else {
            return Ok(None);
        };

        let mut loader = Loader::new(&mut *conn, timeout);
        for name in collections.iter().chain(&references) {
            entity.load_navigation(name, &mut loader).await?;
        }
        Ok(Some(entity))
    }

    async fn get_first(
        &self,
        filter: Filter,
        order: Order,
        include_properties: &str,
    ) -> Result<Option<T>, DataError> {
        let builder = self.query().filter(filter).order(&order).limit(1);
        let rows = self
            .fetch(builder, &parse_include_paths(include_properties))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn get_many(
        &self,
        filters: Vec<Filter>,
        order: Order,
        include_properties: &str,
        page_offset: Option<u64>,
        page_size: Option<u64>,
    ) -> Result<Vec<T>, DataError> {
        let mut builder = self.query().filters(filters).order(&order);
        if let (Some(offset), Some(size)) = (page_offset, page_size) {
            builder = builder.offset(offset).limit(size);
        }
        self.fetch(builder, &parse_include_paths(include_properties))
            .await
    }

    async fn get_count(
        &self,
        filter: Filter,
        query_hint: Option<&str>,
        use_future: bool,
    ) -> Result<u64, DataError> {
        if use_future {
            return self.defer_count(filter, query_hint)?.value().await;
        }

        let (sql, params) = self.count_query(filter, query_hint).build_count()?;
        let mut conn = self.context.acquire().await?;
        debug!(entity = T::entity_name(), %sql, "Counting");
        let count = timed(
            self.context.command_timeout(),
            DB::fetch_count(&mut *conn, &sql, &params),
        )
        .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn execute_sp(
        &self,
        name: &str,
        parameters: &[String],
        timeout_seconds: u64,
    ) -> Result<u64, DataError> {
        let sql = QueryBuilder::build_procedure_call(DB::DIALECT, name, parameters.len())?;
        let params: Vec<Value> = parameters.iter().cloned().map(Value::Text).collect();

        let mut conn = self.context.acquire().await?;
        debug!(procedure = name, parameters = params.len(), "Executing stored procedure");
        timed(
            Duration::from_secs(timeout_seconds),
            DB::execute(&mut *conn, &sql, &params),
        )
        .await
    }
}
