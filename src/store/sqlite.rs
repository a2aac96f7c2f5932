//! SQLite-backed [`DocumentStore`] implementation.
//!
//! Documents are stored as JSON text in a single `documents` table, one row
//! per document, namespaced by entity kind. Predicates translate to SQL
//! `WHERE` clauses over `json_extract`, which is the store's native query
//! capability — the second evaluator of the shared predicate tree.

use std::marker::PhantomData;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::error::Result;
use crate::filter::{FieldValue, Predicate, RangeOp, SortDirection};

use super::{DocumentStore, PageRequest, StoredEntity, StructuredQuery};

/// SQLite implementation of the [`DocumentStore`] trait.
pub struct SqliteStore<T> {
    pool: SqlitePool,
    _entity: PhantomData<fn() -> T>,
}

impl<T: StoredEntity> SqliteStore<T> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    /// Open (creating if missing) the database at `path` and ensure the
    /// schema exists.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id   TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                body TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_kind ON documents(kind)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn field_expr(field: &str) -> String {
    format!("json_extract(body, '$.{field}')")
}

fn range_op_sql(op: RangeOp) -> &'static str {
    match op {
        RangeOp::Gt => ">",
        RangeOp::Gte => ">=",
        RangeOp::Lt => "<",
        RangeOp::Lte => "<=",
    }
}

fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Render a predicate to a SQL fragment, pushing bind values in order.
fn render_predicate(predicate: &Predicate, params: &mut Vec<FieldValue>) -> String {
    match predicate {
        Predicate::Equals { field, value } => {
            params.push(value.clone());
            format!("{} = ?", field_expr(field))
        }
        Predicate::Range { field, op, value } => {
            params.push(value.clone());
            format!("{} {} ?", field_expr(field), range_op_sql(*op))
        }
        Predicate::Contains { field, needle } => {
            params.push(FieldValue::Str(format!(
                "%{}%",
                escape_like(&needle.to_lowercase())
            )));
            format!("LOWER({}) LIKE ? ESCAPE '\\'", field_expr(field))
        }
        Predicate::And(parts) => render_composite(parts, " AND ", params),
        Predicate::Or(parts) => render_composite(parts, " OR ", params),
    }
}

fn render_composite(parts: &[Predicate], joiner: &str, params: &mut Vec<FieldValue>) -> String {
    if parts.is_empty() {
        return "1 = 1".to_string();
    }
    let rendered: Vec<String> = parts.iter().map(|p| render_predicate(p, params)).collect();
    format!("({})", rendered.join(joiner))
}

fn bind_values<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    params: Vec<FieldValue>,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    for value in params {
        query = match value {
            FieldValue::Str(s) => query.bind(s),
            FieldValue::Int(i) => query.bind(i),
            FieldValue::Bool(b) => query.bind(b),
        };
    }
    query
}

fn direction_sql(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    }
}

#[async_trait]
impl<T: StoredEntity> DocumentStore<T> for SqliteStore<T> {
    async fn get(&self, id: &str) -> Result<Option<T>> {
        let row = sqlx::query("SELECT body FROM documents WHERE kind = ? AND id = ?")
            .bind(T::KIND)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let body: String = row.get("body");
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, mut doc: T) -> Result<T> {
        if doc.id().is_none() {
            doc.set_id(uuid::Uuid::new_v4().to_string());
        }
        let id = doc.id().unwrap().to_string();
        let body = serde_json::to_string(&doc)?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, kind, body)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET body = excluded.body
            "#,
        )
        .bind(&id)
        .bind(T::KIND)
        .bind(&body)
        .execute(&self.pool)
        .await?;

        Ok(doc)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE kind = ? AND id = ?")
            .bind(T::KIND)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<T>> {
        let rows = sqlx::query("SELECT body FROM documents WHERE kind = ?")
            .bind(T::KIND)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let body: String = row.get("body");
                Ok(serde_json::from_str(&body)?)
            })
            .collect()
    }

    async fn find_by_field(
        &self,
        field: &str,
        value: FieldValue,
        page: Option<&PageRequest>,
    ) -> Result<Vec<T>> {
        let predicate = Predicate::Equals {
            field: field.to_string(),
            value,
        };

        match page {
            Some(req) => {
                self.execute(&StructuredQuery {
                    predicate: Some(predicate),
                    order_by: req.order_by.clone(),
                    direction: req.direction,
                    offset: req.offset(),
                    limit: req.limit(),
                })
                .await
            }
            None => {
                let mut params = Vec::new();
                let clause = render_predicate(&predicate, &mut params);
                let sql = format!("SELECT body FROM documents WHERE kind = ? AND {clause}");

                let query = bind_values(sqlx::query(&sql).bind(T::KIND), params);
                let rows = query.fetch_all(&self.pool).await?;

                rows.iter()
                    .map(|row| {
                        let body: String = row.get("body");
                        Ok(serde_json::from_str(&body)?)
                    })
                    .collect()
            }
        }
    }

    async fn count_by_field(&self, field: &str, value: FieldValue) -> Result<u64> {
        let predicate = Predicate::Equals {
            field: field.to_string(),
            value,
        };
        self.count(Some(&predicate)).await
    }

    async fn execute(&self, query: &StructuredQuery) -> Result<Vec<T>> {
        let mut params = Vec::new();
        let where_clause = match &query.predicate {
            Some(p) => format!(" AND {}", render_predicate(p, &mut params)),
            None => String::new(),
        };

        let order = field_expr(&query.order_by);
        let sql = format!(
            "SELECT body FROM documents WHERE kind = ?{where_clause} \
             ORDER BY {order} IS NULL, {order} {dir}, id ASC LIMIT ? OFFSET ?",
            dir = direction_sql(query.direction),
        );

        let bound = bind_values(sqlx::query(&sql).bind(T::KIND), params)
            .bind(query.limit.min(i64::MAX as u64) as i64)
            .bind(query.offset.min(i64::MAX as u64) as i64);

        let rows = bound.fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                let body: String = row.get("body");
                Ok(serde_json::from_str(&body)?)
            })
            .collect()
    }

    async fn count(&self, predicate: Option<&Predicate>) -> Result<u64> {
        let mut params = Vec::new();
        let where_clause = match predicate {
            Some(p) => format!(" AND {}", render_predicate(p, &mut params)),
            None => String::new(),
        };

        let sql = format!("SELECT COUNT(*) AS n FROM documents WHERE kind = ?{where_clause}");
        let row = bind_values(sqlx::query(&sql).bind(T::KIND), params)
            .fetch_one(&self.pool)
            .await?;

        let n: i64 = row.get("n");
        Ok(n as u64)
    }
}
