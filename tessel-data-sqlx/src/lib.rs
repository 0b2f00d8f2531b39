//! # tessel-data-sqlx: SQLx backend for the Tessel data layer
//!
//! This crate provides the [SQLx](https://github.com/launchbadge/sqlx)-specific
//! implementations of the `tessel-data` traits: a pooled context that tracks
//! staged changes, the generic repository, and the transactional unit of work.
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DbContext`] | Pool, change tracker, deferred-query batch and command timeout |
//! | [`SqlxRepository`] | `Repository<T>` implementation: staged writes, filtered reads, includes, counts, stored procedures |
//! | [`SqlxUnitOfWork`] | `UnitOfWork` implementation: one transaction per save, audit capture |
//! | [`Navigate`] / [`Loader`] | Per-entity eager loading of collection and reference navigations |
//! | [`FutureCount`] | A count deferred until the next batch of deferred queries runs |
//! | [`DatabaseConfig`] | `tessel.database` configuration section |
//! | [`SqlxErrorExt`] | Extension trait to convert `sqlx::Error` → `DataError` (`.into_data_error()`) |
//!
//! # Feature flags
//!
//! | Feature    | Driver |
//! |------------|--------|
//! | `sqlite`   | SQLite via `sqlx/sqlite` (default) |
//! | `postgres` | PostgreSQL via `sqlx/postgres` |
//! | `mysql`    | MySQL via `sqlx/mysql` |
//!
//! # Quick start
//!
//! ```ignore
//! use tessel_data_sqlx::prelude::*;
//! use sqlx::Sqlite;
//!
//! let config = TesselConfig::load("dev")?.with_typed::<DatabaseConfig>()?;
//! let context = DbContext::<Sqlite>::connect(config.typed()).await?;
//!
//! let mut uow = SqlxUnitOfWork::with_audit(context.clone(), config.typed().audit_config());
//! uow.set_user_name("alice");
//! uow.repository::<Author>().add(Author::new(1, "Ada"));
//! uow.save().await?;
//!
//! let authors = context.repository::<Author>();
//! let ada = authors.get_by_id(1, "posts", "").await?;
//! let total = authors.get_count(Filter::all(), Some("dashboard"), false).await?;
//! ```
//!
//! # Error bridging
//!
//! Due to Rust's orphan rules, `From<sqlx::Error> for DataError` can't be
//! implemented here. Use the [`SqlxErrorExt`] trait instead:
//!
//! ```ignore
//! use tessel_data_sqlx::SqlxErrorExt;
//!
//! let rows = sqlx::query("DELETE FROM sessions")
//!     .execute(context.pool())
//!     .await
//!     .map_err(|e| e.into_data_error())?;
//! ```

pub mod backend;
pub mod config;
pub mod context;
pub mod deferred;
pub mod error;
pub mod navigation;
pub mod repository;
pub mod tracker;
pub mod unit_of_work;

pub use backend::Backend;
pub use config::DatabaseConfig;
pub use context::DbContext;
pub use deferred::FutureCount;
pub use error::{SqlxErrorExt, SqlxResult};
pub use navigation::{LoadFuture, Loader, Navigate};
pub use repository::SqlxRepository;
pub use tracker::{ChangeKind, ChangeTracker, PendingChange};
pub use unit_of_work::SqlxUnitOfWork;

/// Re-exports of the most commonly used types from both `tessel-data` and this crate.
pub mod prelude {
    pub use crate::{DatabaseConfig, DbContext, Loader, Navigate, SqlxErrorExt, SqlxRepository, SqlxUnitOfWork};
    pub use tessel_core::config::{ConfigProperties, TesselConfig};
    pub use tessel_data::prelude::*;
    pub use tessel_data::NavigationKind;
}
