use super::janitor::{Janitor, JanitorStats};
use super::prefix::{Prefix, TableKind};
use crate::config::JanitorConfig;
use crate::db::{NamedParams, QueryExecutor, QueryOutcome};
use crate::error::QueryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-tenant counters merged with the janitor's into one flat record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantStats {
    pub queries: u64,
    pub query_errors: u64,
    #[serde(flatten)]
    pub janitor: JanitorStats,
}

/// The one live handle for a tenant prefix.
///
/// Owned by the registry and shared by `Arc`. Dropping the last reference
/// stops the janitor.
pub struct TenantHandle {
    prefix: Prefix,
    executor: Arc<dyn QueryExecutor>,
    janitor: Janitor,
    created_at: DateTime<Utc>,
    queries: AtomicU64,
    query_errors: AtomicU64,
}

impl TenantHandle {
    pub fn new(prefix: Prefix, executor: Arc<dyn QueryExecutor>, config: &JanitorConfig) -> Self {
        let janitor = Janitor::start(prefix.clone(), Arc::clone(&executor), config);
        tracing::info!(
            prefix = %prefix,
            backend = executor.name(),
            ttl_job = config.active,
            "tenant handle ready"
        );
        Self {
            prefix,
            executor,
            janitor,
            created_at: Utc::now(),
            queries: AtomicU64::new(0),
            query_errors: AtomicU64::new(0),
        }
    }

    pub fn prefix(&self) -> &Prefix {
        &self.prefix
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn table(&self, kind: TableKind) -> String {
        self.prefix.table(kind)
    }

    pub fn janitor(&self) -> &Janitor {
        &self.janitor
    }

    pub async fn execute(
        &self,
        statement: &str,
        params: &NamedParams,
    ) -> Result<QueryOutcome, QueryError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let result = self.executor.execute(statement, params).await;
        if let Err(error) = &result {
            self.query_errors.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(prefix = %self.prefix, %error, "tenant query failed");
        }
        result
    }

    pub fn get_stats(&self) -> TenantStats {
        TenantStats {
            queries: self.queries.load(Ordering::Relaxed),
            query_errors: self.query_errors.load(Ordering::Relaxed),
            janitor: self.janitor.get_stats(),
        }
    }

    pub fn close(&self) {
        self.janitor.close();
    }
}

impl std::fmt::Debug for TenantHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantHandle")
            .field("prefix", &self.prefix)
            .field("backend", &self.executor.name())
            .field("created_at", &self.created_at)
            .field("janitor", &self.janitor)
            .finish_non_exhaustive()
    }
}
