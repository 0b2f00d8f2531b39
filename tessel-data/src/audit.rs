//! Audit trail captured by a unit of work on save.
//!
//! Every staged change that is not excluded produces one [`AuditEntry`]. The
//! entries of one save are grouped into an [`Audit`] stamped with the current
//! user and time, then handed to the configured [`AuditSink`] before commit.
//! Tessel never writes audits to the database itself; that is the sink's job.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::EntityMeta;
use crate::error::DataError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuditState {
    Added,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditProperty {
    /// Display name when one is configured, otherwise the column name.
    pub name: String,
    pub column: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub entity_name: String,
    pub table: String,
    pub state: AuditState,
    /// Key of the changed row; `None` for inserts with a generated id.
    pub key: Option<Value>,
    pub properties: Vec<AuditProperty>,
}

impl AuditEntry {
    /// Build the entry for one change, or `None` when the entity is excluded.
    ///
    /// `values` are in `meta.columns` order. Added and modified changes record
    /// them as new values, deleted changes as old values.
    pub fn capture(
        meta: &EntityMeta,
        state: AuditState,
        key: Option<Value>,
        values: &[Value],
        config: &AuditConfig,
    ) -> Option<Self> {
        if config.exclude_annotations && meta.audit_excluded {
            return None;
        }

        let properties = meta
            .columns
            .iter()
            .zip(values)
            .filter(|&(&column, _)| {
                !(config.exclude_annotations && meta.audit_excluded_columns.contains(&column))
            })
            .map(|(&column, value)| {
                let name = if config.display_names {
                    (meta.display_name)(column).unwrap_or(column)
                } else {
                    column
                };
                let (old_value, new_value) = match state {
                    AuditState::Deleted => (Some(value.clone()), None),
                    AuditState::Added | AuditState::Modified => (None, Some(value.clone())),
                };
                AuditProperty {
                    name: name.to_string(),
                    column: column.to_string(),
                    old_value,
                    new_value,
                }
            })
            .collect();

        Some(Self {
            entity_name: meta.entity_name.to_string(),
            table: meta.table.to_string(),
            state,
            key,
            properties,
        })
    }
}

/// The audit record of one save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Audit {
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<AuditEntry>,
}

impl Audit {
    /// Start an audit. Blank user names are not recorded.
    pub fn new(user_name: Option<&str>) -> Self {
        Self {
            created_by: user_name
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            created_at: Utc::now(),
            entries: Vec::new(),
        }
    }
}

/// Receives the audit of a save before the transaction commits.
///
/// Returning an error aborts the save and rolls the transaction back.
pub trait AuditSink: Send + Sync {
    fn pre_save(&self, audit: &Audit) -> Result<(), DataError>;
}

impl<F> AuditSink for F
where
    F: Fn(&Audit) -> Result<(), DataError> + Send + Sync,
{
    fn pre_save(&self, audit: &Audit) -> Result<(), DataError> {
        self(audit)
    }
}

/// Accepts and drops every audit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn pre_save(&self, _audit: &Audit) -> Result<(), DataError> {
        Ok(())
    }
}

/// Keeps every audit in memory, in save order.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    audits: Arc<Mutex<Vec<Audit>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn audits(&self) -> Vec<Audit> {
        self.audits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn pre_save(&self, audit: &Audit) -> Result<(), DataError> {
        self.audits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(audit.clone());
        Ok(())
    }
}

/// How a unit of work captures audits.
#[derive(Clone)]
pub struct AuditConfig {
    /// Honour `Entity::audit_excluded` and `Entity::audit_excluded_columns`.
    pub exclude_annotations: bool,
    /// Name audit properties after `Entity::display_name` when available.
    pub display_names: bool,
    pub sink: Arc<dyn AuditSink>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            exclude_annotations: true,
            display_names: true,
            sink: Arc::new(NoopAuditSink),
        }
    }
}

impl AuditConfig {
    pub fn with_sink(mut self, sink: impl AuditSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn exclude_annotations(mut self, enabled: bool) -> Self {
        self.exclude_annotations = enabled;
        self
    }

    pub fn display_names(mut self, enabled: bool) -> Self {
        self.display_names = enabled;
        self
    }
}

impl std::fmt::Debug for AuditConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditConfig")
            .field("exclude_annotations", &self.exclude_annotations)
            .field("display_names", &self.display_names)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(column: &str) -> Option<&'static str> {
        match column {
            "email" => Some("E-mail address"),
            _ => None,
        }
    }

    fn meta(excluded: bool) -> EntityMeta {
        EntityMeta {
            entity_name: "User",
            table: "users",
            id_column: "id",
            columns: &["id", "email", "password_hash"],
            generated_id: false,
            audit_excluded: excluded,
            audit_excluded_columns: &["password_hash"],
            display_name: display,
        }
    }

    fn values() -> Vec<Value> {
        vec![Value::Int(1), Value::from("a@b.com"), Value::from("x")]
    }

    #[test]
    fn added_entry_uses_display_names_and_drops_excluded_columns() {
        let entry = AuditEntry::capture(
            &meta(false),
            AuditState::Added,
            Some(Value::Int(1)),
            &values(),
            &AuditConfig::default(),
        )
        .unwrap();

        assert_eq!(entry.entity_name, "User");
        let names: Vec<&str> = entry.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "E-mail address"]);
        assert!(entry.properties.iter().all(|p| p.old_value.is_none()));
        assert_eq!(entry.properties[1].new_value, Some(Value::from("a@b.com")));
    }

    #[test]
    fn deleted_entry_records_old_values() {
        let entry = AuditEntry::capture(
            &meta(false),
            AuditState::Deleted,
            Some(Value::Int(1)),
            &values(),
            &AuditConfig::default(),
        )
        .unwrap();
        assert!(entry.properties.iter().all(|p| p.new_value.is_none()));
        assert_eq!(entry.properties[0].old_value, Some(Value::Int(1)));
    }

    #[test]
    fn excluded_entity_has_no_entry() {
        let config = AuditConfig::default();
        assert!(AuditEntry::capture(&meta(true), AuditState::Added, None, &values(), &config).is_none());
    }

    #[test]
    fn annotations_ignored_when_disabled() {
        let config = AuditConfig::default()
            .exclude_annotations(false)
            .display_names(false);
        let entry =
            AuditEntry::capture(&meta(true), AuditState::Modified, None, &values(), &config).unwrap();
        let names: Vec<&str> = entry.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "email", "password_hash"]);
    }

    #[test]
    fn blank_user_name_is_not_recorded() {
        assert_eq!(Audit::new(Some("")).created_by, None);
        assert_eq!(Audit::new(None).created_by, None);
        assert_eq!(Audit::new(Some("alice")).created_by.as_deref(), Some("alice"));
    }

    #[test]
    fn memory_sink_collects_in_order() {
        let sink = MemoryAuditSink::new();
        sink.pre_save(&Audit::new(Some("a"))).unwrap();
        sink.pre_save(&Audit::new(Some("b"))).unwrap();
        let users: Vec<_> = sink
            .audits()
            .into_iter()
            .filter_map(|a| a.created_by)
            .collect();
        assert_eq!(users, vec!["a", "b"]);
    }
}
