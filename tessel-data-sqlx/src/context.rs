use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use sqlx::pool::{PoolConnection, PoolOptions};
use sqlx::Pool;
use tessel_data::{DataError, Entity, DEFAULT_COMMAND_TIMEOUT_SECS};
use tracing::{debug, info, instrument};

use crate::backend::Backend;
use crate::config::DatabaseConfig;
use crate::deferred::DeferredBatch;
use crate::error::SqlxErrorExt;
use crate::repository::SqlxRepository;
use crate::tracker::ChangeTracker;

/// A connection pool plus the state shared by the repositories and unit of
/// work built from it: the change tracker, the deferred-query batch and the
/// command timeout.
///
/// Cloning is cheap and clones share that state.
pub struct DbContext<DB: Backend> {
    pool: Pool<DB>,
    tracker: Arc<Mutex<ChangeTracker>>,
    deferred: Arc<DeferredBatch>,
    command_timeout: Duration,
}

impl<DB: Backend> Clone for DbContext<DB> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            tracker: self.tracker.clone(),
            deferred: self.deferred.clone(),
            command_timeout: self.command_timeout,
        }
    }
}

impl<DB: Backend> DbContext<DB> {
    pub fn new(pool: Pool<DB>) -> Self {
        Self {
            pool,
            tracker: Arc::new(Mutex::new(ChangeTracker::new())),
            deferred: Arc::new(DeferredBatch::default()),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }

    /// Bound every statement run through this context by `timeout`.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Open a pool from configuration.
    #[instrument(skip(config), fields(max_connections = config.max_connections))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DataError> {
        debug!("Creating database connection pool");
        let pool = PoolOptions::<DB>::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.url)
            .await
            .map_err(|e| e.into_data_error())?;
        info!(
            max_connections = config.max_connections,
            command_timeout_secs = config.command_timeout_secs,
            "Database connection pool created"
        );
        Ok(Self::new(pool).with_command_timeout(config.command_timeout()))
    }

    pub fn pool(&self) -> &Pool<DB> {
        &self.pool
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    pub fn repository<T: Entity>(&self) -> SqlxRepository<T, DB> {
        SqlxRepository::new(self.clone())
    }

    pub fn has_changes(&self) -> bool {
        !self.tracker().is_empty()
    }

    pub fn pending_changes(&self) -> usize {
        self.tracker().len()
    }

    /// Drop every staged change without saving. Returns how many were dropped.
    pub fn discard_changes(&self) -> usize {
        self.tracker().clear()
    }

    /// Number of deferred queries waiting for [`execute_futures`](Self::execute_futures).
    pub fn pending_futures(&self) -> usize {
        self.deferred.pending()
    }

    /// Run every deferred query in one round of work on a single connection.
    pub async fn execute_futures(&self) -> Result<usize, DataError> {
        self.deferred.execute(&self.pool, self.command_timeout).await
    }

    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), DataError> {
        let mut conn = self.acquire().await?;
        timed(self.command_timeout, DB::execute(&mut *conn, "SELECT 1", &[])).await?;
        Ok(())
    }

    pub(crate) fn tracker(&self) -> MutexGuard<'_, ChangeTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn deferred(&self) -> &DeferredBatch {
        &self.deferred
    }

    pub(crate) async fn acquire(&self) -> Result<PoolConnection<DB>, DataError> {
        self.pool.acquire().await.map_err(|e| e.into_data_error())
    }
}

/// Await a driver future, failing with [`DataError::Timeout`] once `limit` elapses.
pub(crate) async fn timed<T, F>(limit: Duration, fut: F) -> Result<T, DataError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(|e| e.into_data_error()),
        Err(_) => Err(DataError::Timeout(limit)),
    }
}
