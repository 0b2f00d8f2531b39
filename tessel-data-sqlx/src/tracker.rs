//! In-memory staging of repository mutations.

use tessel_data::{AuditConfig, AuditEntry, AuditState, Dialect, Entity, EntityMeta, QueryBuilder, QueryError, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// One staged mutation, with the entity's values captured at staging time.
#[derive(Debug, Clone)]
pub struct PendingChange {
    pub meta: EntityMeta,
    pub kind: ChangeKind,
    pub key: Value,
    /// Values in `meta.columns` order.
    pub values: Vec<Value>,
}

impl PendingChange {
    pub fn of<T: Entity>(entity: &T, kind: ChangeKind) -> Self {
        Self {
            meta: EntityMeta::of::<T>(),
            kind,
            key: entity.id().clone().into(),
            values: entity.values(),
        }
    }

    /// Inserts of rows with generated ids have no identity until saved.
    fn has_identity(&self) -> bool {
        !(self.kind == ChangeKind::Added && self.meta.generated_id)
    }

    fn same_row(&self, other: &PendingChange) -> bool {
        self.has_identity()
            && other.has_identity()
            && self.meta.table == other.meta.table
            && self.key == other.key
    }

    /// Render the statement persisting this change.
    pub fn statement(&self, dialect: Dialect) -> Result<(String, Vec<Value>), QueryError> {
        let builder = QueryBuilder::new_with_dialect(self.meta.table, dialect);
        let id_position = self.meta.id_position();
        match self.kind {
            ChangeKind::Added if self.meta.generated_id => {
                let (columns, values) = self.columns_without(id_position);
                builder.build_insert(&columns, values)
            }
            ChangeKind::Added => builder.build_insert(self.meta.columns, self.values.clone()),
            ChangeKind::Modified => {
                let (columns, values) = self.columns_without(id_position);
                builder.build_update(&columns, values, self.meta.id_column, self.key.clone())
            }
            ChangeKind::Deleted => builder.build_delete(self.meta.id_column, self.key.clone()),
        }
    }

    fn columns_without(&self, skip: Option<usize>) -> (Vec<&'static str>, Vec<Value>) {
        self.meta
            .columns
            .iter()
            .zip(&self.values)
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip)
            .map(|(_, (column, value))| (*column, value.clone()))
            .unzip()
    }

    pub fn audit_entry(&self, config: &AuditConfig) -> Option<AuditEntry> {
        let state = match self.kind {
            ChangeKind::Added => AuditState::Added,
            ChangeKind::Modified => AuditState::Modified,
            ChangeKind::Deleted => AuditState::Deleted,
        };
        let key = self.has_identity().then(|| self.key.clone());
        AuditEntry::capture(&self.meta, state, key, &self.values, config)
    }
}

/// Ordered list of pending changes shared by the repositories of one context.
///
/// Staging the same row twice folds the two changes together:
///
/// | pending  | staged   | result                               |
/// |----------|----------|--------------------------------------|
/// | Added    | Modified | Added, with the new values           |
/// | Added    | Deleted  | both dropped, nothing reaches the db |
/// | Modified | Modified | Modified, with the new values        |
/// | Modified | Deleted  | Deleted, in place of the update      |
/// | Deleted  | Deleted  | unchanged                            |
///
/// Any other combination is appended and left for the database to judge.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    changes: Vec<PendingChange>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, change: PendingChange) {
        let existing = self
            .changes
            .iter()
            .rposition(|pending| pending.same_row(&change));
        let Some(pos) = existing else {
            self.changes.push(change);
            return;
        };

        let pending = &mut self.changes[pos];
        match (pending.kind, change.kind) {
            (ChangeKind::Added, ChangeKind::Modified)
            | (ChangeKind::Modified, ChangeKind::Modified) => pending.values = change.values,
            (ChangeKind::Added, ChangeKind::Deleted) => {
                self.changes.remove(pos);
            }
            (ChangeKind::Modified, ChangeKind::Deleted) => *pending = change,
            (ChangeKind::Deleted, ChangeKind::Deleted) => {}
            _ => self.changes.push(change),
        }
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn changes(&self) -> &[PendingChange] {
        &self.changes
    }

    /// Take every pending change, in staging order.
    pub fn drain(&mut self) -> Vec<PendingChange> {
        std::mem::take(&mut self.changes)
    }

    /// Put changes taken by [`drain`](Self::drain) back in front of anything
    /// staged since.
    pub fn restore(&mut self, mut changes: Vec<PendingChange>) {
        changes.append(&mut self.changes);
        self.changes = changes;
    }

    /// Drop every pending change and return how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.changes.len();
        self.changes.clear();
        count
    }
}
