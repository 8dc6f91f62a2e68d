#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use yildiz_gate::db::{BackendConnector, NamedParams, QueryExecutor, QueryOutcome};
use yildiz_gate::error::{BackendError, QueryError};
use yildiz_gate::tenant::{Prefix, TableKind};

/// Executor that records every statement and answers from a script.
#[derive(Default)]
pub struct RecordingExecutor {
    statements: Mutex<Vec<String>>,
    rows: HashMap<TableKind, u64>,
    fail_on: Option<TableKind>,
    delay: Option<Duration>,
    in_flight: AtomicU64,
    max_in_flight: AtomicU64,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows reported as affected by statements touching `kind`'s table.
    pub fn with_rows(mut self, kind: TableKind, rows: u64) -> Self {
        self.rows.insert(kind, rows);
        self
    }

    /// Fail every statement touching `kind`'s table.
    pub fn failing_on(mut self, kind: TableKind) -> Self {
        self.fail_on = Some(kind);
        self
    }

    /// Sleep this long inside every statement.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Highest number of statements observed executing at the same time.
    pub fn max_concurrency(&self) -> u64 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn table_of(statement: &str) -> Option<TableKind> {
        TableKind::EXPIRATION_ORDER
            .into_iter()
            .find(|kind| statement.contains(kind.suffix()))
    }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    fn name(&self) -> &str {
        "recording"
    }

    async fn execute(
        &self,
        statement: &str,
        _params: &NamedParams,
    ) -> Result<QueryOutcome, QueryError> {
        self.statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(statement.to_string());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let table = Self::table_of(statement);
        if table.is_some() && table == self.fail_on {
            return Err(QueryError::Statement("scripted failure".into()));
        }

        let affected_rows = table
            .and_then(|kind| self.rows.get(&kind).copied())
            .unwrap_or(0);
        Ok(QueryOutcome { affected_rows })
    }
}

/// Connector that counts handshakes and can be slowed down or made to fail.
pub struct CountingConnector {
    connects: AtomicU64,
    fail_first: u64,
    delay: Duration,
    executor: Arc<RecordingExecutor>,
}

impl CountingConnector {
    pub fn new() -> Self {
        Self::with_executor(Arc::new(RecordingExecutor::new()))
    }

    pub fn with_executor(executor: Arc<RecordingExecutor>) -> Self {
        Self {
            connects: AtomicU64::new(0),
            fail_first: 0,
            delay: Duration::ZERO,
            executor,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Refuse the first `attempts` handshakes.
    pub fn failing_first(mut self, attempts: u64) -> Self {
        self.fail_first = attempts;
        self
    }

    pub fn connects(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendConnector for CountingConnector {
    async fn connect(&self, prefix: &Prefix) -> Result<Arc<dyn QueryExecutor>, BackendError> {
        let attempt = self.connects.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if attempt < self.fail_first {
            return Err(BackendError::Unreachable(format!(
                "backend refused {prefix} (attempt {})",
                attempt + 1
            )));
        }
        let executor: Arc<dyn QueryExecutor> = self.executor.clone();
        Ok(executor)
    }
}
