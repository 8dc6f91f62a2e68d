use super::schema::provision_tables;
use super::traits::{BackendConnector, NamedParams, ParamValue, QueryExecutor, QueryOutcome};
use crate::config::DatabaseConfig;
use crate::error::{BackendError, QueryError};
use crate::tenant::Prefix;
use anyhow::Context;
use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;

/// Shared SQLite backend. Every tenant gets its own tables inside the same
/// database, and every executor borrows the same connection pool.
#[derive(Clone)]
pub struct SqliteConnector {
    pool: SqlitePool,
}

impl SqliteConnector {
    pub async fn open(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .with_context(|| format!("parse database url {}", config.url))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .context("open SQLite database")?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl BackendConnector for SqliteConnector {
    async fn connect(&self, prefix: &Prefix) -> Result<Arc<dyn QueryExecutor>, BackendError> {
        provision_tables(&self.pool, prefix).await?;
        Ok(Arc::new(SqliteExecutor {
            pool: self.pool.clone(),
        }))
    }
}

pub struct SqliteExecutor {
    pool: SqlitePool,
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn execute(
        &self,
        statement: &str,
        params: &NamedParams,
    ) -> Result<QueryOutcome, QueryError> {
        let (sql, order) = bind_named(statement);

        let mut query = sqlx::query(&sql);
        for name in &order {
            let value = params
                .get(name)
                .ok_or_else(|| QueryError::MissingParameter(name.clone()))?;
            query = match value {
                ParamValue::Bool(v) => query.bind(*v),
                ParamValue::Int(v) => query.bind(*v),
                ParamValue::Text(v) => query.bind(v.as_str()),
            };
        }

        let result = query.execute(&self.pool).await?;
        Ok(QueryOutcome {
            affected_rows: result.rows_affected(),
        })
    }
}

/// Rewrite `:name` placeholders into numbered `?N` parameters.
///
/// Returns the rewritten statement and the distinct names in bind order.
/// A repeated name reuses its first number. Placeholders inside single-quoted
/// literals and `::` sequences are left untouched.
pub(crate) fn bind_named(statement: &str) -> (String, Vec<String>) {
    let mut sql = String::with_capacity(statement.len());
    let mut order: Vec<String> = Vec::new();
    let mut in_literal = false;
    let mut chars = statement.chars().peekable();
    let mut prev: Option<char> = None;

    while let Some(c) = chars.next() {
        if c == '\'' {
            in_literal = !in_literal;
            sql.push(c);
            prev = Some(c);
            continue;
        }

        let starts_name = !in_literal
            && c == ':'
            && prev != Some(':')
            && chars
                .peek()
                .is_some_and(|&next| next.is_ascii_alphabetic() || next == '_');

        if !starts_name {
            sql.push(c);
            prev = Some(c);
            continue;
        }

        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }

        let index = match order.iter().position(|existing| *existing == name) {
            Some(position) => position + 1,
            None => {
                order.push(name);
                order.len()
            }
        };
        sql.push('?');
        sql.push_str(&index.to_string());
        prev = None;
    }

    (sql, order)
}
