//! Dynamic WHERE/pagination builder shared by the listing endpoints.
//!
//! Accumulates (predicate, parameter) pairs from optional filters and
//! renders them into positional-placeholder SQL. Values travel as bound
//! parameters, never spliced into the query text. Absent filters are
//! omitted entirely rather than rendered as always-true predicates.

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};

use crate::config;

/// Typed query parameter, bound positionally in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Bool(bool),
    Int(i64),
}

/// Pagination metadata attached to every list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

pub struct ListQuery {
    table: &'static str,
    columns: &'static str,
    conditions: Vec<String>,
    params: Vec<SqlParam>,
    page: i64,
    limit: i64,
}

impl ListQuery {
    pub fn new(table: &'static str, columns: &'static str) -> Self {
        Self {
            table,
            columns,
            conditions: vec![],
            params: vec![],
            page: 1,
            limit: config::config().pagination.default_limit,
        }
    }

    /// Equality filter against a text column; skipped when absent.
    pub fn filter_eq(mut self, column: &str, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.conditions.push(format!("{} = ${}", column, self.params.len() + 1));
            self.params.push(SqlParam::Text(value));
        }
        self
    }

    /// Equality filter against an integer column; skipped when absent.
    pub fn filter_eq_int(mut self, column: &str, value: Option<i64>) -> Self {
        if let Some(value) = value {
            self.conditions.push(format!("{} = ${}", column, self.params.len() + 1));
            self.params.push(SqlParam::Int(value));
        }
        self
    }

    /// Boolean filter. Query strings arrive as the literal text
    /// "true"/"false" and are coerced to a boolean parameter here.
    pub fn filter_bool_text(mut self, column: &str, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.conditions.push(format!("{} = ${}", column, self.params.len() + 1));
            self.params.push(SqlParam::Bool(value == "true"));
        }
        self
    }

    /// Case-insensitive substring search OR-combined over `columns`.
    /// A single `%term%` parameter is shared by every branch.
    pub fn search(mut self, columns: &[&str], term: Option<String>) -> Self {
        if let Some(term) = term {
            if term.is_empty() {
                return self;
            }
            let placeholder = self.params.len() + 1;
            let branches: Vec<String> = columns
                .iter()
                .map(|col| format!("{} ILIKE ${}", col, placeholder))
                .collect();
            self.conditions.push(format!("({})", branches.join(" OR ")));
            self.params.push(SqlParam::Text(format!("%{}%", term)));
        }
        self
    }

    /// Apply pagination. Page and limit floor at 1; limit is capped at the
    /// configured maximum to bound result sizes.
    pub fn paginate(mut self, page: Option<i64>, limit: Option<i64>) -> Self {
        let cfg = &config::config().pagination;
        self.page = page.unwrap_or(1).max(1);
        self.limit = limit.unwrap_or(cfg.default_limit).clamp(1, cfg.max_limit);
        self
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    /// Count query reusing the exact WHERE fragment of the page query.
    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}{}", self.table, self.where_clause())
    }

    /// Page query: newest first, limit/offset always bound as the final
    /// two parameters after all filter parameters.
    pub fn page_sql(&self) -> String {
        format!(
            "SELECT {} FROM {}{} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            self.columns,
            self.table,
            self.where_clause(),
            self.params.len() + 1,
            self.params.len() + 2,
        )
    }

    pub async fn count(&self, pool: &PgPool) -> Result<i64, sqlx::Error> {
        let sql = self.count_sql();
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for param in &self.params {
            query = match param {
                SqlParam::Text(v) => query.bind(v),
                SqlParam::Bool(v) => query.bind(v),
                SqlParam::Int(v) => query.bind(v),
            };
        }
        query.fetch_one(pool).await
    }

    pub async fn fetch_page<T>(&self, pool: &PgPool) -> Result<Vec<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = self.page_sql();
        let mut query = sqlx::query_as::<_, T>(&sql);
        for param in &self.params {
            query = match param {
                SqlParam::Text(v) => query.bind(v),
                SqlParam::Bool(v) => query.bind(v),
                SqlParam::Int(v) => query.bind(v),
            };
        }
        query.bind(self.limit).bind(self.offset()).fetch_all(pool).await
    }

    pub fn pagination(&self, total: i64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: (total + self.limit - 1) / self.limit,
        }
    }
}
