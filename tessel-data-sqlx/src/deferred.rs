//! Deferred count queries.
//!
//! `get_count(.., use_future = true)` does not hit the database. It registers
//! the query with the context and hands back a [`FutureCount`]. The first
//! time any future count is read, every registered query runs together on one
//! connection, and all their results become available.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use sqlx::Pool;
use tessel_data::{DataError, Value};
use tracing::debug;

use crate::backend::Backend;
use crate::context::DbContext;
use crate::error::SqlxErrorExt;

#[derive(Debug, Clone)]
pub(crate) enum SlotError {
    Database(Arc<sqlx::Error>),
    Timeout(Duration),
}

pub(crate) type Slot = Arc<OnceLock<Result<u64, SlotError>>>;

struct PendingCount {
    sql: String,
    params: Vec<Value>,
    slot: Slot,
}

#[derive(Default)]
pub(crate) struct DeferredBatch {
    pending: Mutex<Vec<PendingCount>>,
    running: tokio::sync::Mutex<()>,
}

impl DeferredBatch {
    fn queue(&self) -> std::sync::MutexGuard<'_, Vec<PendingCount>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn register(&self, sql: String, params: Vec<Value>) -> Slot {
        let slot = Slot::default();
        self.queue().push(PendingCount {
            sql,
            params,
            slot: slot.clone(),
        });
        slot
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue().len()
    }

    /// Run every registered query. Per-query failures are stored in their
    /// slots; only failing to get a connection is returned.
    pub(crate) async fn execute<DB: Backend>(
        &self,
        pool: &Pool<DB>,
        limit: Duration,
    ) -> Result<usize, DataError> {
        let _running = self.running.lock().await;
        let batch = std::mem::take(&mut *self.queue());
        if batch.is_empty() {
            return Ok(0);
        }

        let mut conn = match pool.acquire().await {
            Ok(conn) => conn,
            Err(err) => {
                let err = Arc::new(err);
                for count in &batch {
                    let _ = count.slot.set(Err(SlotError::Database(err.clone())));
                }
                return Err(err.into_data_error());
            }
        };

        debug!(queries = batch.len(), "Executing deferred queries");
        for count in &batch {
            let result =
                match tokio::time::timeout(limit, DB::fetch_count(&mut *conn, &count.sql, &count.params))
                    .await
                {
                    Ok(Ok(n)) => Ok(u64::try_from(n).unwrap_or(0)),
                    Ok(Err(err)) => Err(SlotError::Database(Arc::new(err))),
                    Err(_) => Err(SlotError::Timeout(limit)),
                };
            let _ = count.slot.set(result);
        }
        Ok(batch.len())
    }
}

/// A count whose query runs with the next batch of deferred queries.
pub struct FutureCount<DB: Backend> {
    slot: Slot,
    context: DbContext<DB>,
}

impl<DB: Backend> FutureCount<DB> {
    pub(crate) fn new(slot: Slot, context: DbContext<DB>) -> Self {
        Self { slot, context }
    }

    /// Whether the batch holding this count has already run.
    pub fn is_resolved(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Read the count, running the pending batch first if needed.
    pub async fn value(&self) -> Result<u64, DataError> {
        if self.slot.get().is_none() {
            self.context.execute_futures().await?;
        }
        match self.slot.get() {
            Some(Ok(count)) => Ok(*count),
            Some(Err(SlotError::Database(err))) => Err(err.clone().into_data_error()),
            Some(Err(SlotError::Timeout(after))) => Err(DataError::Timeout(*after)),
            None => Err(DataError::Other("Deferred query was not executed".into())),
        }
    }
}
