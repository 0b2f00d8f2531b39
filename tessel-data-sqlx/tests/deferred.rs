mod common;

use common::{seeded_context, Author, Post};
use tessel_data::{DataError, Filter, Repository};

#[tokio::test]
async fn future_count_matches_immediate_count() {
    let context = seeded_context().await;
    let posts = context.repository::<Post>();

    let immediate = posts.get_count(Filter::eq("author_id", 1), None, false).await.unwrap();
    let deferred = posts
        .get_count(Filter::eq("author_id", 1), Some("deferred"), true)
        .await
        .unwrap();
    assert_eq!(immediate, 2);
    assert_eq!(deferred, immediate);
    assert_eq!(context.pending_futures(), 0);
}

#[tokio::test]
async fn first_read_runs_the_whole_batch() {
    let context = seeded_context().await;
    let authors = context.repository::<Author>().defer_count(Filter::all(), None).unwrap();
    let popular = context
        .repository::<Post>()
        .defer_count(Filter::gt("views", 8), Some("popular posts"))
        .unwrap();

    assert_eq!(context.pending_futures(), 2);
    assert!(!authors.is_resolved());

    assert_eq!(popular.value().await.unwrap(), 2);
    assert!(authors.is_resolved());
    assert_eq!(context.pending_futures(), 0);
    assert_eq!(authors.value().await.unwrap(), 3);
}

#[tokio::test]
async fn execute_futures_runs_pending_queries() {
    let context = seeded_context().await;
    assert_eq!(context.execute_futures().await.unwrap(), 0);

    let count = context.repository::<Post>().defer_count(Filter::all(), None).unwrap();
    assert_eq!(context.execute_futures().await.unwrap(), 1);
    assert!(count.is_resolved());
    assert_eq!(count.value().await.unwrap(), 4);
}

#[tokio::test]
async fn failing_query_does_not_poison_the_batch() {
    let context = seeded_context().await;
    let broken = context
        .repository::<Post>()
        .defer_count(Filter::eq("no_such_column", 1), None)
        .unwrap();
    let fine = context.repository::<Author>().defer_count(Filter::all(), None).unwrap();

    assert!(matches!(broken.value().await, Err(DataError::Database(_))));
    assert_eq!(fine.value().await.unwrap(), 3);
}

#[tokio::test]
async fn deferred_and_immediate_failures_agree() {
    let context = seeded_context().await;
    let posts = context.repository::<Post>();

    let immediate = posts
        .get_count(Filter::eq("no_such_column", 1), None, false)
        .await
        .unwrap_err();
    let deferred = posts
        .get_count(Filter::eq("no_such_column", 1), None, true)
        .await
        .unwrap_err();
    assert!(matches!(immediate, DataError::Database(_)));
    assert!(matches!(deferred, DataError::Database(_)));
    assert_eq!(deferred.to_string(), immediate.to_string());
}
