use crate::entity::Entity;
use crate::error::DataError;
use crate::filter::{Filter, Order};
use crate::page::{Page, Pageable};
use std::future::Future;

/// Timeout applied to stored-procedure calls when the caller has no better value.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 90;

/// Generic repository over the rows of one entity type.
///
/// Mutations (`add`, `update`, `remove`) are staged in memory and reach the
/// database only when the owning unit of work saves. Reads go to the database
/// immediately.
///
/// Include lists are comma-separated navigation names, e.g. `"posts, profile"`.
///
/// Uses RPITIT (return-position `impl Trait` in traits), no `async-trait` needed.
pub trait Repository<T: Entity>: Send + Sync {
    fn add(&self, entity: T);

    fn add_range(&self, entities: Vec<T>) {
        for entity in entities {
            self.add(entity);
        }
    }

    fn update(&self, entity: T);

    fn remove(&self, entity: T);

    fn remove_range(&self, entities: Vec<T>) {
        for entity in entities {
            self.remove(entity);
        }
    }

    /// Find a row by key, then load the named collection and reference navigations.
    fn get_by_id(
        &self,
        id: T::Id,
        include_collections: &str,
        include_references: &str,
    ) -> impl Future<Output = Result<Option<T>, DataError>> + Send;

    fn get_first(
        &self,
        filter: Filter,
        order: Order,
        include_properties: &str,
    ) -> impl Future<Output = Result<Option<T>, DataError>> + Send;

    /// Paging is applied only when both `page_offset` and `page_size` are given.
    fn get(
        &self,
        filter: Filter,
        order: Order,
        include_properties: &str,
        page_offset: Option<u64>,
        page_size: Option<u64>,
    ) -> impl Future<Output = Result<Vec<T>, DataError>> + Send {
        self.get_many(vec![filter], order, include_properties, page_offset, page_size)
    }

    /// Like [`get`](Self::get) with several filters combined by `AND`.
    fn get_many(
        &self,
        filters: Vec<Filter>,
        order: Order,
        include_properties: &str,
        page_offset: Option<u64>,
        page_size: Option<u64>,
    ) -> impl Future<Output = Result<Vec<T>, DataError>> + Send;

    /// Count matching rows. `query_hint` tags the SQL; `use_future` routes the
    /// count through the deferred-query batch of the context.
    fn get_count(
        &self,
        filter: Filter,
        query_hint: Option<&str>,
        use_future: bool,
    ) -> impl Future<Output = Result<u64, DataError>> + Send;

    fn get_page(
        &self,
        filter: Filter,
        order: Order,
        pageable: &Pageable,
    ) -> impl Future<Output = Result<Page<T>, DataError>> + Send {
        async move {
            let total = self.get_count(filter.clone(), None, false).await?;
            let content = self
                .get(filter, order, "", Some(pageable.offset()), Some(pageable.size))
                .await?;
            Ok(Page::new(content, pageable, total))
        }
    }

    /// Run a stored procedure with positional string parameters and return
    /// the number of affected rows.
    fn execute_sp(
        &self,
        name: &str,
        parameters: &[String],
        timeout_seconds: u64,
    ) -> impl Future<Output = Result<u64, DataError>> + Send;
}
