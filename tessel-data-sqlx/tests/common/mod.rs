#![allow(dead_code)]

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, Sqlite};
use tessel_data::{DataError, Entity, NavigationKind, Repository, UnitOfWork, Value};
use tessel_data_sqlx::{DbContext, Loader, Navigate, SqlxUnitOfWork};

const SCHEMA: &[&str] = &[
    "CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT)",
    "CREATE TABLE posts (id INTEGER PRIMARY KEY AUTOINCREMENT, author_id INTEGER REFERENCES authors(id), title TEXT NOT NULL, views INTEGER NOT NULL DEFAULT 0)",
    "CREATE TABLE settings (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
];

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    #[sqlx(skip)]
    pub posts: Vec<Post>,
}

impl Author {
    pub fn new(id: i64, name: &str, email: Option<&str>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.map(str::to_string),
            posts: Vec::new(),
        }
    }
}

impl Entity for Author {
    type Id = i64;

    fn table_name() -> &'static str {
        "authors"
    }
    fn id_column() -> &'static str {
        "id"
    }
    fn columns() -> &'static [&'static str] {
        &["id", "name", "email"]
    }
    fn id(&self) -> &i64 {
        &self.id
    }
    fn values(&self) -> Vec<Value> {
        vec![self.id.into(), self.name.clone().into(), self.email.clone().into()]
    }
    fn entity_name() -> &'static str {
        "Author"
    }
    fn audit_excluded_columns() -> &'static [&'static str] {
        &["email"]
    }
    fn display_name(column: &str) -> Option<&'static str> {
        match column {
            "name" => Some("Full name"),
            _ => None,
        }
    }
}

impl Navigate<Sqlite> for Author {
    fn navigation_kind(name: &str) -> Option<NavigationKind> {
        match name {
            "posts" => Some(NavigationKind::Collection),
            _ => None,
        }
    }

    async fn load_navigation(
        &mut self,
        name: &str,
        loader: &mut Loader<'_, Sqlite>,
    ) -> Result<(), DataError> {
        match name {
            "posts" => self.posts = loader.collection("author_id", self.id).await?,
            _ => return Err(DataError::unknown_navigation(Self::entity_name(), name)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Post {
    pub id: i64,
    pub author_id: Option<i64>,
    pub title: String,
    pub views: i64,
    #[sqlx(skip)]
    pub author: Option<Author>,
}

impl Post {
    pub fn new(author_id: Option<i64>, title: &str, views: i64) -> Self {
        Self {
            id: 0,
            author_id,
            title: title.into(),
            views,
            author: None,
        }
    }
}

impl Entity for Post {
    type Id = i64;

    fn table_name() -> &'static str {
        "posts"
    }
    fn id_column() -> &'static str {
        "id"
    }
    fn columns() -> &'static [&'static str] {
        &["id", "author_id", "title", "views"]
    }
    fn id(&self) -> &i64 {
        &self.id
    }
    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.author_id.into(),
            self.title.clone().into(),
            self.views.into(),
        ]
    }
    fn generated_id() -> bool {
        true
    }
}

impl Navigate<Sqlite> for Post {
    fn navigation_kind(name: &str) -> Option<NavigationKind> {
        match name {
            "author" => Some(NavigationKind::Reference),
            _ => None,
        }
    }

    async fn load_navigation(
        &mut self,
        name: &str,
        loader: &mut Loader<'_, Sqlite>,
    ) -> Result<(), DataError> {
        match name {
            "author" => self.author = loader.reference(self.author_id).await?,
            _ => return Err(DataError::unknown_navigation(Self::entity_name(), name)),
        }
        Ok(())
    }
}

/// Key/value rows, never audited.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

impl Setting {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Entity for Setting {
    type Id = String;

    fn table_name() -> &'static str {
        "settings"
    }
    fn id_column() -> &'static str {
        "key"
    }
    fn columns() -> &'static [&'static str] {
        &["key", "value"]
    }
    fn id(&self) -> &String {
        &self.key
    }
    fn values(&self) -> Vec<Value> {
        vec![self.key.clone().into(), self.value.clone().into()]
    }
    fn audit_excluded() -> bool {
        true
    }
}

impl Navigate<Sqlite> for Setting {}

/// A context over a fresh in-memory database with the test schema.
///
/// A single connection that never expires, so every query sees the same database.
pub async fn context() -> DbContext<Sqlite> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }
    DbContext::new(pool)
}

/// Three authors and four posts; post ids are 1..=4 in the order below.
pub async fn seeded_context() -> DbContext<Sqlite> {
    let context = context().await;
    let mut uow = SqlxUnitOfWork::new(context.clone());

    let authors = uow.repository::<Author>();
    authors.add_range(vec![
        Author::new(1, "Ada", Some("ada@example.com")),
        Author::new(2, "Grace", None),
        Author::new(3, "Linus", Some("linus@example.com")),
    ]);

    let posts = uow.repository::<Post>();
    posts.add(Post::new(Some(1), "Engines", 10));
    posts.add(Post::new(Some(1), "Notes", 5));
    posts.add(Post::new(Some(2), "Compilers", 30));
    posts.add(Post::new(None, "Anonymous", 0));

    assert_eq!(uow.save().await.unwrap(), 7);
    context
}

pub async fn count_rows(context: &DbContext<Sqlite>, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(context.pool())
        .await
        .unwrap()
}
