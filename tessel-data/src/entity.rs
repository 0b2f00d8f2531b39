use crate::value::Value;

/// A persisted entity: its table, key column, column list, and audit annotations.
///
/// Intended to be implemented manually next to the struct it describes.
///
/// # Example
///
/// ```ignore
/// impl Entity for Author {
///     type Id = i64;
///     fn table_name() -> &'static str { "authors" }
///     fn id_column() -> &'static str { "id" }
///     fn columns() -> &'static [&'static str] { &["id", "name", "email"] }
///     fn id(&self) -> &i64 { &self.id }
///     fn values(&self) -> Vec<Value> {
///         vec![self.id.into(), self.name.clone().into(), self.email.clone().into()]
///     }
/// }
/// ```
pub trait Entity: Send + Sync + Unpin + 'static {
    type Id: Clone + Into<Value> + Send + Sync + 'static;

    fn table_name() -> &'static str;
    fn id_column() -> &'static str;

    /// All mapped columns, including the id column.
    fn columns() -> &'static [&'static str];

    fn id(&self) -> &Self::Id;

    /// Column values in [`columns`](Self::columns) order.
    fn values(&self) -> Vec<Value>;

    /// Whether the database generates the id. Generated ids are left out of inserts.
    fn generated_id() -> bool {
        false
    }

    /// Name recorded in audit entries.
    fn entity_name() -> &'static str {
        Self::table_name()
    }

    /// Exclude the whole entity from audit capture.
    fn audit_excluded() -> bool {
        false
    }

    /// Columns left out of audit entries.
    fn audit_excluded_columns() -> &'static [&'static str] {
        &[]
    }

    /// Human-readable name of a column, used in audit entries.
    fn display_name(_column: &str) -> Option<&'static str> {
        None
    }
}

/// Type-erased entity metadata, captured when a change is staged.
#[derive(Clone, Copy)]
pub struct EntityMeta {
    pub entity_name: &'static str,
    pub table: &'static str,
    pub id_column: &'static str,
    pub columns: &'static [&'static str],
    pub generated_id: bool,
    pub audit_excluded: bool,
    pub audit_excluded_columns: &'static [&'static str],
    pub display_name: fn(&str) -> Option<&'static str>,
}

impl EntityMeta {
    pub fn of<T: Entity>() -> Self {
        Self {
            entity_name: T::entity_name(),
            table: T::table_name(),
            id_column: T::id_column(),
            columns: T::columns(),
            generated_id: T::generated_id(),
            audit_excluded: T::audit_excluded(),
            audit_excluded_columns: T::audit_excluded_columns(),
            display_name: T::display_name,
        }
    }

    /// Position of the id column inside [`columns`](Self::columns).
    pub fn id_position(&self) -> Option<usize> {
        self.columns.iter().position(|c| *c == self.id_column)
    }
}

impl std::fmt::Debug for EntityMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityMeta")
            .field("entity_name", &self.entity_name)
            .field("table", &self.table)
            .field("id_column", &self.id_column)
            .finish_non_exhaustive()
    }
}
