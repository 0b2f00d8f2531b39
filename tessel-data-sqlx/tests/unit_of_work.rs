mod common;

use common::{context, count_rows, seeded_context, Author, Post, Setting};
use tessel_data::{
    Audit, AuditConfig, AuditState, DataError, Filter, MemoryAuditSink, Order, Repository,
    UnitOfWork, Value,
};
use std::time::Duration;

use tessel_data_sqlx::SqlxUnitOfWork;

#[tokio::test]
async fn save_without_changes_returns_zero() {
    let context = context().await;
    let mut uow = SqlxUnitOfWork::new(context);
    assert_eq!(uow.save().await.unwrap(), 0);
}

#[tokio::test]
async fn save_applies_changes_in_order() {
    let context = seeded_context().await;
    let mut uow = SqlxUnitOfWork::new(context.clone());
    let authors = uow.repository::<Author>();

    authors.add(Author::new(4, "Barbara", None));
    authors.update(Author::new(2, "Grace Hopper", Some("grace@example.com")));
    authors.remove(Author::new(3, "Linus", None));
    assert_eq!(context.pending_changes(), 3);

    assert_eq!(uow.save().await.unwrap(), 3);
    assert!(!context.has_changes());

    let names: Vec<String> = authors
        .get(Filter::all(), Order::asc("id"), "", None, None)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, vec!["Ada", "Grace Hopper", "Barbara"]);
}

#[tokio::test]
async fn generated_ids_come_from_the_database() {
    let context = seeded_context().await;
    let mut uow = SqlxUnitOfWork::new(context.clone());
    uow.repository::<Post>().add(Post::new(Some(3), "Kernels", 1));
    uow.save().await.unwrap();

    let kernels = context
        .repository::<Post>()
        .get_first(Filter::eq("title", "Kernels"), Order::none(), "")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(kernels.id, 5);
}

#[tokio::test]
async fn remove_of_pending_add_saves_nothing() {
    let context = seeded_context().await;
    let mut uow = SqlxUnitOfWork::new(context.clone());
    let authors = uow.repository::<Author>();
    authors.add(Author::new(7, "Temp", None));
    authors.remove(Author::new(7, "Temp", None));

    assert!(!context.has_changes());
    assert_eq!(uow.save().await.unwrap(), 0);
    assert_eq!(count_rows(&context, "authors").await, 3);
}

#[tokio::test]
async fn audit_records_user_and_display_names() {
    let context = seeded_context().await;
    let sink = MemoryAuditSink::new();
    let mut uow =
        SqlxUnitOfWork::with_audit(context, AuditConfig::default().with_sink(sink.clone()));
    uow.set_user_name("alice");

    uow.repository::<Author>()
        .update(Author::new(1, "Ada Lovelace", Some("ada@example.com")));
    uow.repository::<Setting>().add(Setting::new("theme", "dark"));
    uow.repository::<Author>()
        .remove(Author::new(3, "Linus", Some("linus@example.com")));
    uow.save().await.unwrap();

    let audits = sink.audits();
    assert_eq!(audits.len(), 1);
    let audit = &audits[0];
    assert_eq!(audit.created_by.as_deref(), Some("alice"));

    let states: Vec<AuditState> = audit.entries.iter().map(|e| e.state).collect();
    assert_eq!(states, vec![AuditState::Modified, AuditState::Deleted]);

    let modified = &audit.entries[0];
    assert_eq!(modified.entity_name, "Author");
    assert_eq!(modified.key, Some(Value::Int(1)));
    let names: Vec<&str> = modified.properties.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["id", "Full name"]);
    assert_eq!(
        modified.properties[1].new_value,
        Some(Value::from("Ada Lovelace"))
    );

    let deleted = &audit.entries[1];
    assert_eq!(deleted.properties[1].old_value, Some(Value::from("Linus")));

    let json = serde_json::to_value(audit).unwrap();
    assert_eq!(json["created_by"], "alice");
    assert_eq!(json["entries"][1]["state"], "Deleted");
    assert_eq!(json["entries"][1]["key"], 3);
}

#[tokio::test]
async fn audit_annotations_can_be_ignored() {
    let context = context().await;
    let sink = MemoryAuditSink::new();
    let config = AuditConfig::default()
        .with_sink(sink.clone())
        .exclude_annotations(false)
        .display_names(false);
    let mut uow = SqlxUnitOfWork::with_audit(context, config);

    uow.repository::<Author>()
        .add(Author::new(1, "Ada", Some("ada@example.com")));
    uow.repository::<Setting>().add(Setting::new("theme", "dark"));
    uow.save().await.unwrap();

    let audits = sink.audits();
    let audit = &audits[0];
    assert_eq!(audit.created_by, None);
    assert_eq!(audit.entries.len(), 2);
    let names: Vec<&str> = audit.entries[0]
        .properties
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names, vec!["id", "name", "email"]);
    assert_eq!(audit.entries[1].key, Some(Value::from("theme")));
}

#[tokio::test]
async fn missing_row_is_a_concurrency_conflict() {
    let context = seeded_context().await;
    let mut uow = SqlxUnitOfWork::new(context.clone());
    let authors = uow.repository::<Author>();
    authors.add(Author::new(10, "Margaret", None));
    authors.update(Author::new(99, "Ghost", None));

    let err = uow.save().await.unwrap_err();
    match err {
        DataError::Concurrency { table, key } => {
            assert_eq!(table, "authors");
            assert_eq!(key, "99");
        }
        other => panic!("unexpected error: {other}"),
    }

    // Rolled back, and still staged for another attempt.
    assert_eq!(count_rows(&context, "authors").await, 3);
    assert_eq!(context.pending_changes(), 2);
}

#[tokio::test]
async fn failed_save_can_be_retried() {
    let context = seeded_context().await;
    let mut uow = SqlxUnitOfWork::new(context.clone());
    let authors = uow.repository::<Author>();
    authors.add(Author::new(1, "Duplicate", None));

    assert!(matches!(uow.save().await, Err(DataError::Database(_))));
    assert_eq!(context.pending_changes(), 1);

    authors.remove(Author::new(1, "Duplicate", None));
    assert!(!context.has_changes());
    assert_eq!(uow.save().await.unwrap(), 0);
}

#[tokio::test]
async fn rejected_audit_rolls_back() {
    let context = seeded_context().await;
    let config = AuditConfig::default()
        .with_sink(|_: &Audit| -> Result<(), DataError> {
            Err(DataError::Audit("audit store unavailable".into()))
        });
    let mut uow = SqlxUnitOfWork::with_audit(context.clone(), config);
    uow.repository::<Author>().add(Author::new(5, "Edsger", None));

    assert!(matches!(uow.save().await, Err(DataError::Audit(_))));
    assert_eq!(count_rows(&context, "authors").await, 3);
    assert!(context.has_changes());
}

#[tokio::test]
async fn text_keys_round_trip() {
    let context = context().await;
    let mut uow = SqlxUnitOfWork::new(context.clone());
    let settings = uow.repository::<Setting>();
    settings.add(Setting::new("theme", "dark"));
    uow.save().await.unwrap();

    settings.update(Setting::new("theme", "light"));
    uow.save().await.unwrap();

    let theme = settings
        .get_by_id("theme".to_string(), "", "")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(theme.value, "light");
}

#[tokio::test]
async fn dropping_unit_of_work_discards_changes() {
    let context = seeded_context().await;
    {
        let uow = SqlxUnitOfWork::new(context.clone());
        uow.repository::<Author>().add(Author::new(6, "Alan", None));
        assert!(context.has_changes());
    }
    assert!(!context.has_changes());
    assert_eq!(count_rows(&context, "authors").await, 3);
}

#[tokio::test]
async fn cancelled_save_keeps_changes_staged() {
    let context = seeded_context().await;
    let mut uow = SqlxUnitOfWork::new(context.clone());
    uow.repository::<Author>().add(Author::new(50, "Barbara", None));

    // Hold the only pooled connection so the save stalls opening its transaction.
    let held = context.pool().acquire().await.unwrap();
    let cancelled = tokio::time::timeout(Duration::from_millis(50), uow.save()).await;
    assert!(cancelled.is_err());
    drop(held);

    assert_eq!(context.pending_changes(), 1);
    assert_eq!(count_rows(&context, "authors").await, 3);

    assert_eq!(uow.save().await.unwrap(), 1);
    assert_eq!(count_rows(&context, "authors").await, 4);
}

#[tokio::test]
async fn changes_staged_during_a_failed_save_stay_behind_it() {
    let context = seeded_context().await;
    let config = AuditConfig::default()
        .with_sink(|_: &Audit| -> Result<(), DataError> {
            Err(DataError::Audit("audit store unavailable".into()))
        });
    let mut uow = SqlxUnitOfWork::with_audit(context.clone(), config);
    let authors = uow.repository::<Author>();
    authors.add(Author::new(5, "Edsger", None));
    assert!(uow.save().await.is_err());

    authors.add(Author::new(6, "Alan", None));
    assert_eq!(context.pending_changes(), 2);
}
