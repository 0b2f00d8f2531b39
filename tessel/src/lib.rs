//! Tessel: generic repository and unit of work over SQLx.
//!
//! This facade crate re-exports the Tessel sub-crates through a single
//! dependency with feature flags. Import everything you need with:
//!
//! ```ignore
//! use tessel::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature     | Default | Crate                        |
//! |-------------|---------|------------------------------|
//! | `data-sqlx` | **yes** | `tessel-data-sqlx`           |
//! | `sqlite`    | **yes** | `tessel-data-sqlx/sqlite`    |
//! | `postgres`  | no      | `tessel-data-sqlx/postgres`  |
//! | `mysql`     | no      | `tessel-data-sqlx/mysql`     |
//!
//! `tessel-core` (configuration, logging) and `tessel-data` (abstractions)
//! are always available.

pub use tessel_core;
pub use tessel_data;

#[cfg(feature = "data-sqlx")]
pub use tessel_data_sqlx;

// Re-export everything from tessel-core at the top level for convenience.
pub use tessel_core::*;

/// Unified prelude: import everything with `use tessel::prelude::*`.
pub mod prelude {
    pub use tessel_core::{init_tracing, ConfigProperties, TesselConfig};
    pub use tessel_data::prelude::*;
    pub use tessel_data::{AuditConfig, AuditSink, MemoryAuditSink, NavigationKind};

    #[cfg(feature = "data-sqlx")]
    pub use tessel_data_sqlx::prelude::*;
}
