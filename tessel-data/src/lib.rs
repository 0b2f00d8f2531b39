pub mod audit;
pub mod entity;
pub mod error;
pub mod filter;
pub mod include;
pub mod page;
pub mod query;
pub mod repository;
pub mod unit_of_work;
pub mod value;

pub use audit::{Audit, AuditConfig, AuditEntry, AuditProperty, AuditSink, AuditState, MemoryAuditSink, NoopAuditSink};
pub use entity::{Entity, EntityMeta};
pub use error::DataError;
pub use filter::{CompareOp, Direction, Filter, Order};
pub use include::{parse_include_paths, NavigationKind};
pub use page::{Page, Pageable};
pub use query::{Dialect, IdentifierPolicy, QueryBuilder, QueryError};
pub use repository::{Repository, DEFAULT_COMMAND_TIMEOUT_SECS};
pub use unit_of_work::UnitOfWork;
pub use value::Value;

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        DataError, Direction, Entity, Filter, Order, Page, Pageable, Repository, UnitOfWork, Value,
    };
}
