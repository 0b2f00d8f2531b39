use tessel_data::{Audit, AuditConfig, DataError, Entity, UnitOfWork};
use tracing::{debug, error, info, warn};

use crate::backend::Backend;
use crate::context::{timed, DbContext};
use crate::repository::SqlxRepository;
use crate::tracker::{ChangeKind, PendingChange};

/// Saves the changes staged on a [`DbContext`] in one transaction.
///
/// Each save builds an [`Audit`] of what it wrote, stamped with the current
/// user name, and passes it to the configured sink before committing. A
/// failed save rolls back and leaves the changes staged, so it can be retried.
/// Dropping the unit of work discards whatever is still staged.
///
/// # Example
///
/// ```ignore
/// let mut uow = SqlxUnitOfWork::with_audit(context.clone(), AuditConfig::default().with_sink(sink));
/// uow.set_user_name("alice");
/// uow.repository::<Author>().add(author);
/// let affected = uow.save().await?;
/// ```
pub struct SqlxUnitOfWork<DB: Backend> {
    context: DbContext<DB>,
    user_name: Option<String>,
    audit: AuditConfig,
}

impl<DB: Backend> SqlxUnitOfWork<DB> {
    pub fn new(context: DbContext<DB>) -> Self {
        Self::with_audit(context, AuditConfig::default())
    }

    pub fn with_audit(context: DbContext<DB>, audit: AuditConfig) -> Self {
        debug!(
            exclude_annotations = audit.exclude_annotations,
            display_names = audit.display_names,
            "Audit capture configured"
        );
        Self {
            context,
            user_name: None,
            audit,
        }
    }

    pub fn context(&self) -> &DbContext<DB> {
        &self.context
    }

    pub fn repository<T: Entity>(&self) -> SqlxRepository<T, DB> {
        self.context.repository()
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    async fn write(&self, changes: &[PendingChange]) -> Result<(u64, Audit), DataError> {
        let timeout = self.context.command_timeout();
        let mut tx = timed(timeout, self.context.pool().begin()).await?;
        let mut audit = Audit::new(self.user_name.as_deref());
        let mut affected = 0;

        for change in changes {
            let (sql, params) = change.statement(DB::DIALECT)?;
            debug!(table = change.meta.table, kind = ?change.kind, %sql, "Writing change");
            let rows = timed(timeout, DB::execute(&mut *tx, &sql, &params)).await?;
            if rows == 0 && change.kind != ChangeKind::Added {
                return Err(DataError::Concurrency {
                    table: change.meta.table,
                    key: change.key.to_string(),
                });
            }
            affected += rows;
            audit.entries.extend(change.audit_entry(&self.audit));
        }

        self.audit.sink.pre_save(&audit)?;
        timed(timeout, tx.commit()).await?;
        Ok((affected, audit))
    }
}

impl<DB: Backend> UnitOfWork for SqlxUnitOfWork<DB> {
    fn set_user_name(&mut self, name: &str) {
        self.user_name = Some(name.to_string());
    }

    async fn save(&mut self) -> Result<u64, DataError> {
        let changes = self.context.tracker().drain();
        if changes.is_empty() {
            debug!("Nothing to save");
            return Ok(0);
        }

        let drained = Drained::new(&self.context, changes);
        let written = self.write(drained.changes()).await;
        match written {
            Ok((affected, audit)) => {
                let changes = drained.commit();
                info!(
                    changes,
                    affected,
                    audit_entries = audit.entries.len(),
                    user = audit.created_by.as_deref().unwrap_or(""),
                    "Changes saved"
                );
                Ok(affected)
            }
            Err(err) => {
                error!(error = %err, changes = drained.changes().len(), "Save failed, changes kept");
                Err(err)
            }
        }
    }
}

/// Changes taken out of the tracker by a save in progress.
///
/// They go back to the front of the tracker when dropped, unless the save
/// committed. This covers failed saves and save futures cancelled mid-flight.
struct Drained<'a, DB: Backend> {
    context: &'a DbContext<DB>,
    changes: Vec<PendingChange>,
    committed: bool,
}

impl<'a, DB: Backend> Drained<'a, DB> {
    fn new(context: &'a DbContext<DB>, changes: Vec<PendingChange>) -> Self {
        Self {
            context,
            changes,
            committed: false,
        }
    }

    fn changes(&self) -> &[PendingChange] {
        &self.changes
    }

    /// Mark the changes as written. Returns how many there were.
    fn commit(mut self) -> usize {
        self.committed = true;
        self.changes.len()
    }
}

impl<DB: Backend> Drop for Drained<'_, DB> {
    fn drop(&mut self) {
        if !self.committed {
            let changes = std::mem::take(&mut self.changes);
            self.context.tracker().restore(changes);
        }
    }
}

impl<DB: Backend> Drop for SqlxUnitOfWork<DB> {
    fn drop(&mut self) {
        let discarded = self.context.discard_changes();
        if discarded > 0 {
            warn!(discarded, "Unit of work dropped with unsaved changes");
        }
    }
}
