use crate::filter::{CompareOp, Direction, Filter, Order};
use crate::value::Value;

/// A fluent builder for the statements a repository issues.
///
/// All values are bound as parameters; identifiers are validated (and
/// optionally quoted) according to the [`IdentifierPolicy`].
///
/// # Example
///
/// ```ignore
/// let (sql, params) = QueryBuilder::new("users")
///     .filter(Filter::eq("email", "a@b.com"))
///     .filter(Filter::like("name", "%alice%"))
///     .order_by("id", true)
///     .limit(10)
///     .build_select(&["id", "name"])?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Generic SQL using `?` placeholders (default).
    Generic,
    /// SQLite-style `?` placeholders.
    Sqlite,
    /// MySQL-style `?` placeholders with backtick quoting.
    MySql,
    /// Postgres-style `$1, $2, ...` placeholders.
    Postgres,
}

impl Dialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Generic | Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }

    fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Generic | Dialect::Sqlite | Dialect::Postgres => '"',
        }
    }

    /// `LIMIT` value meaning "no limit", for dialects that reject a bare `OFFSET`.
    fn unbounded_limit(self) -> Option<&'static str> {
        match self {
            Dialect::Sqlite => Some("-1"),
            Dialect::MySql => Some("18446744073709551615"),
            Dialect::Generic | Dialect::Postgres => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierPolicy {
    /// Validate identifiers against a conservative pattern (default).
    Validate,
    /// Validate and quote identifiers using the dialect quoting style.
    Quote,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    InvalidIdentifier { kind: &'static str, ident: String },
    ColumnCountMismatch { expected: usize, found: usize },
    Unsupported(String),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidIdentifier { kind, ident } => {
                write!(f, "Invalid {kind} identifier: {ident}")
            }
            QueryError::ColumnCountMismatch { expected, found } => {
                write!(f, "Expected {expected} values, found {found}")
            }
            QueryError::Unsupported(msg) => write!(f, "Unsupported statement: {msg}"),
        }
    }
}

impl std::error::Error for QueryError {}

type Built = Result<(String, Vec<Value>), QueryError>;

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    filters: Vec<Filter>,
    order: Vec<(String, Direction)>,
    limit_val: Option<u64>,
    offset_val: Option<u64>,
    tag: Option<String>,
    dialect: Dialect,
    identifier_policy: IdentifierPolicy,
}

impl QueryBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit_val: None,
            offset_val: None,
            tag: None,
            dialect: Dialect::Generic,
            identifier_policy: IdentifierPolicy::Validate,
        }
    }

    pub fn new_with_dialect(table: &str, dialect: Dialect) -> Self {
        Self::new(table).dialect(dialect)
    }

    /// Set the SQL dialect (affects placeholder style and quoting).
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifier_policy = policy;
        self
    }

    /// Add a predicate. Successive predicates are combined with `AND`.
    pub fn filter(mut self, filter: Filter) -> Self {
        if !filter.is_trivial() {
            self.filters.push(filter);
        }
        self
    }

    pub fn filters(self, filters: impl IntoIterator<Item = Filter>) -> Self {
        filters.into_iter().fold(self, QueryBuilder::filter)
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { Direction::Asc } else { Direction::Desc };
        self.order.push((column.to_string(), direction));
        self
    }

    pub fn order(mut self, order: &Order) -> Self {
        self.order.extend(order.keys().iter().cloned());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit_val = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset_val = Some(offset);
        self
    }

    /// Tag the statement with a leading SQL comment so it can be found in
    /// database logs. Each line of `hint` becomes one `-- ` comment line.
    pub fn tag(mut self, hint: &str) -> Self {
        if !hint.trim().is_empty() {
            self.tag = Some(hint.to_string());
        }
        self
    }

    /// Build a `SELECT` of the given columns.
    pub fn build_select(&self, columns: &[&str]) -> Built {
        let table = self.ident(&self.table, false, "table")?;
        let columns = self.column_list(columns, true)?;

        let mut sql = self.tag_prefix();
        sql.push_str(&format!("SELECT {columns} FROM {table}"));
        let mut params = Vec::new();
        self.append_where(&mut sql, &mut params)?;
        self.append_order(&mut sql)?;
        self.append_limit_offset(&mut sql);
        Ok((sql, params))
    }

    /// Build a `SELECT COUNT(*)` over the filtered rows. Ordering and paging are ignored.
    pub fn build_count(&self) -> Built {
        let table = self.ident(&self.table, false, "table")?;
        let mut sql = self.tag_prefix();
        sql.push_str(&format!("SELECT COUNT(*) FROM {table}"));
        let mut params = Vec::new();
        self.append_where(&mut sql, &mut params)?;
        Ok((sql, params))
    }

    pub fn build_insert(&self, columns: &[&str], values: Vec<Value>) -> Built {
        check_arity(columns.len(), values.len())?;
        let table = self.ident(&self.table, false, "table")?;
        let column_list = self.column_list(columns, false)?;
        let placeholders: Vec<String> = (1..=values.len())
            .map(|i| self.dialect.placeholder(i))
            .collect();
        let sql = format!(
            "{}INSERT INTO {table} ({column_list}) VALUES ({})",
            self.tag_prefix(),
            placeholders.join(", ")
        );
        Ok((sql, values))
    }

    /// Build an `UPDATE ... SET` of `columns` for the row whose `id_column` equals `id`.
    pub fn build_update(&self, columns: &[&str], values: Vec<Value>, id_column: &str, id: Value) -> Built {
        check_arity(columns.len(), values.len())?;
        if columns.is_empty() {
            return Err(QueryError::Unsupported(format!(
                "update of {} without columns",
                self.table
            )));
        }
        let table = self.ident(&self.table, false, "table")?;
        let mut assignments = Vec::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let column = self.ident(column, false, "column")?;
            assignments.push(format!("{column} = {}", self.dialect.placeholder(i + 1)));
        }
        let id_column = self.ident(id_column, false, "column")?;
        let sql = format!(
            "{}UPDATE {table} SET {} WHERE {id_column} = {}",
            self.tag_prefix(),
            assignments.join(", "),
            self.dialect.placeholder(columns.len() + 1)
        );
        let mut params = values;
        params.push(id);
        Ok((sql, params))
    }

    pub fn build_delete(&self, id_column: &str, id: Value) -> Built {
        let table = self.ident(&self.table, false, "table")?;
        let id_column = self.ident(id_column, false, "column")?;
        let sql = format!(
            "{}DELETE FROM {table} WHERE {id_column} = {}",
            self.tag_prefix(),
            self.dialect.placeholder(1)
        );
        Ok((sql, vec![id]))
    }

    /// Build the command invoking a stored procedure with `param_count` positional parameters.
    ///
    /// PostgreSQL and MySQL use `CALL name(...)`; the generic dialect uses
    /// `EXEC name @p0, @p1, ...`. SQLite has no stored procedures.
    pub fn build_procedure_call(
        dialect: Dialect,
        name: &str,
        param_count: usize,
    ) -> Result<String, QueryError> {
        if !is_valid_identifier(name, false) {
            return Err(QueryError::InvalidIdentifier {
                kind: "procedure",
                ident: name.to_string(),
            });
        }
        match dialect {
            Dialect::Sqlite => Err(QueryError::Unsupported(
                "SQLite does not support stored procedures".to_string(),
            )),
            Dialect::Postgres | Dialect::MySql => {
                let params: Vec<String> = (1..=param_count).map(|i| dialect.placeholder(i)).collect();
                Ok(format!("CALL {name}({})", params.join(", ")))
            }
            Dialect::Generic => {
                let params: Vec<String> = (0..param_count).map(|i| format!("@p{i}")).collect();
                if params.is_empty() {
                    Ok(format!("EXEC {name}"))
                } else {
                    Ok(format!("EXEC {name} {}", params.join(", ")))
                }
            }
        }
    }

    fn tag_prefix(&self) -> String {
        match &self.tag {
            Some(hint) => hint
                .lines()
                .map(|line| format!("-- {line}\n"))
                .collect(),
            None => String::new(),
        }
    }

    fn append_where(&self, sql: &mut String, params: &mut Vec<Value>) -> Result<(), QueryError> {
        if self.filters.is_empty() {
            return Ok(());
        }
        sql.push_str(" WHERE ");
        let mut clauses = Vec::with_capacity(self.filters.len());
        for filter in &self.filters {
            clauses.push(self.render_grouped(filter, params)?);
        }
        sql.push_str(&clauses.join(" AND "));
        Ok(())
    }

    /// Render a filter, wrapping it in parentheses when it combines several terms.
    fn render_grouped(&self, filter: &Filter, params: &mut Vec<Value>) -> Result<String, QueryError> {
        let rendered = self.render(filter, params)?;
        match filter {
            Filter::And(items) | Filter::Or(items) if items.len() > 1 => Ok(format!("({rendered})")),
            _ => Ok(rendered),
        }
    }

    fn render(&self, filter: &Filter, params: &mut Vec<Value>) -> Result<String, QueryError> {
        match filter {
            Filter::Compare { column, op, value } => {
                let col = self.ident(column, false, "column")?;
                match (op, value) {
                    (CompareOp::Eq, Value::Null) => Ok(format!("{col} IS NULL")),
                    (CompareOp::NotEq, Value::Null) => Ok(format!("{col} IS NOT NULL")),
                    _ => {
                        params.push(value.clone());
                        let placeholder = self.dialect.placeholder(params.len());
                        Ok(format!("{col} {} {placeholder}", op.sql()))
                    }
                }
            }
            Filter::Like(column, pattern) => {
                let col = self.ident(column, false, "column")?;
                params.push(Value::Text(pattern.clone()));
                Ok(format!("{col} LIKE {}", self.dialect.placeholder(params.len())))
            }
            Filter::In(column, values) => {
                let col = self.ident(column, false, "column")?;
                if values.is_empty() {
                    return Ok("1 = 0".to_string());
                }
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| {
                        params.push(v.clone());
                        self.dialect.placeholder(params.len())
                    })
                    .collect();
                Ok(format!("{col} IN ({})", placeholders.join(", ")))
            }
            Filter::IsNull(column) => Ok(format!("{} IS NULL", self.ident(column, false, "column")?)),
            Filter::IsNotNull(column) => {
                Ok(format!("{} IS NOT NULL", self.ident(column, false, "column")?))
            }
            Filter::And(items) => self.render_joined(items, " AND ", "1 = 1", params),
            Filter::Or(items) => self.render_joined(items, " OR ", "1 = 0", params),
            Filter::Not(inner) => Ok(format!("NOT ({})", self.render(inner, params)?)),
        }
    }

    fn render_joined(
        &self,
        items: &[Filter],
        separator: &str,
        empty: &str,
        params: &mut Vec<Value>,
    ) -> Result<String, QueryError> {
        match items {
            [] => Ok(empty.to_string()),
            [single] => self.render(single, params),
            _ => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(self.render_grouped(item, params)?);
                }
                Ok(parts.join(separator))
            }
        }
    }

    fn append_order(&self, sql: &mut String) -> Result<(), QueryError> {
        if self.order.is_empty() {
            return Ok(());
        }
        sql.push_str(" ORDER BY ");
        let mut clauses = Vec::with_capacity(self.order.len());
        for (col, direction) in &self.order {
            let col = self.ident(col, false, "column")?;
            match direction {
                Direction::Asc => clauses.push(format!("{col} ASC")),
                Direction::Desc => clauses.push(format!("{col} DESC")),
            }
        }
        sql.push_str(&clauses.join(", "));
        Ok(())
    }

    fn append_limit_offset(&self, sql: &mut String) {
        match (self.limit_val, self.offset_val) {
            (Some(limit), _) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(_)) => {
                if let Some(unbounded) = self.dialect.unbounded_limit() {
                    sql.push_str(&format!(" LIMIT {unbounded}"));
                }
            }
            (None, None) => {}
        }
        if let Some(offset) = self.offset_val {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }

    fn column_list(&self, columns: &[&str], allow_star: bool) -> Result<String, QueryError> {
        let mut out = Vec::with_capacity(columns.len());
        for col in columns {
            out.push(self.ident(col, allow_star, "column")?);
        }
        Ok(out.join(", "))
    }

    fn ident(&self, ident: &str, allow_star: bool, kind: &'static str) -> Result<String, QueryError> {
        if !is_valid_identifier(ident, allow_star) {
            return Err(QueryError::InvalidIdentifier {
                kind,
                ident: ident.to_string(),
            });
        }
        match self.identifier_policy {
            IdentifierPolicy::Quote => Ok(quote_identifier(ident, self.dialect, allow_star)),
            IdentifierPolicy::Validate => Ok(ident.to_string()),
        }
    }
}

fn check_arity(expected: usize, found: usize) -> Result<(), QueryError> {
    if expected != found {
        return Err(QueryError::ColumnCountMismatch { expected, found });
    }
    Ok(())
}

fn is_valid_identifier(ident: &str, allow_star: bool) -> bool {
    if ident.is_empty() {
        return false;
    }
    let parts: Vec<&str> = ident.split('.').collect();
    for (idx, part) in parts.iter().enumerate() {
        if allow_star && *part == "*" {
            return idx + 1 == parts.len();
        }
        if !is_valid_segment(part) {
            return false;
        }
    }
    true
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_identifier(ident: &str, dialect: Dialect, allow_star: bool) -> String {
    let quote = dialect.quote_char();
    let parts: Vec<&str> = ident.split('.').collect();
    let last_idx = parts.len().saturating_sub(1);
    parts
        .into_iter()
        .enumerate()
        .map(|(idx, part)| {
            if allow_star && part == "*" && idx == last_idx {
                part.to_string()
            } else {
                format!("{quote}{part}{quote}")
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}
