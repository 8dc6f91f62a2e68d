//! Per-tenant expiration job.
//!
//! A [`Janitor`] owns one background task that wakes every
//! `interval_secs` and deletes ttld-flagged rows older than the retention
//! window from the tenant's translate, edge and node tables, in that order.
//! Failures are counted and logged, never propagated.

use super::prefix::{Prefix, TableKind};
use crate::config::JanitorConfig;
use crate::db::{NamedParams, ParamValue, QueryExecutor};
use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JanitorState {
    Stopped,
    Scheduled,
    Running,
}

impl JanitorState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::Scheduled => 1,
            Self::Running => 2,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Scheduled,
            2 => Self::Running,
            _ => Self::Stopped,
        }
    }
}

/// Monotonic counters, reset only by a process restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JanitorStats {
    pub job_runs: u64,
    pub job_errors: u64,
    pub translate_removes: u64,
    pub edge_removes: u64,
    pub node_removes: u64,
    pub total_removes: u64,
}

impl JanitorStats {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Default)]
struct Counters {
    job_runs: AtomicU64,
    job_errors: AtomicU64,
    translate_removes: AtomicU64,
    edge_removes: AtomicU64,
    node_removes: AtomicU64,
    total_removes: AtomicU64,
}

impl Counters {
    fn record_removals(&self, kind: TableKind, rows: u64) {
        let counter = match kind {
            TableKind::Translates => &self.translate_removes,
            TableKind::Edges => &self.edge_removes,
            TableKind::Nodes => &self.node_removes,
        };
        counter.fetch_add(rows, Ordering::Relaxed);
        self.total_removes.fetch_add(rows, Ordering::Relaxed);
    }

    fn snapshot(&self) -> JanitorStats {
        JanitorStats {
            job_runs: self.job_runs.load(Ordering::Relaxed),
            job_errors: self.job_errors.load(Ordering::Relaxed),
            translate_removes: self.translate_removes.load(Ordering::Relaxed),
            edge_removes: self.edge_removes.load(Ordering::Relaxed),
            node_removes: self.node_removes.load(Ordering::Relaxed),
            total_removes: self.total_removes.load(Ordering::Relaxed),
        }
    }
}

/// Delete statement for one table: flagged rows whose age exceeds `:seconds`.
pub fn expiration_statement(prefix: &Prefix, kind: TableKind) -> String {
    format!(
        "DELETE FROM {table} WHERE ttld = 1 AND created_at < \
         strftime('%Y-%m-%d %H:%M:%f', 'now', '-' || :seconds || ' seconds')",
        table = prefix.table(kind)
    )
}

/// State shared between the janitor and its scheduled task.
struct Sweeper {
    prefix: Prefix,
    executor: Arc<dyn QueryExecutor>,
    retention_secs: u64,
    counters: Counters,
    state: AtomicU8,
}

impl Sweeper {
    fn state(&self) -> JanitorState {
        JanitorState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: JanitorState, to: JanitorState) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    async fn run_pass(&self) {
        self.counters.job_runs.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        match self.expire_rows().await {
            Ok(removed) => {
                tracing::debug!(
                    prefix = %self.prefix,
                    removed,
                    elapsed = ?started.elapsed(),
                    "ttl job done"
                );
            }
            Err(error) => {
                self.counters.job_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    prefix = %self.prefix,
                    %error,
                    elapsed = ?started.elapsed(),
                    "ttl job failed"
                );
            }
        }
    }

    async fn expire_rows(&self) -> Result<u64, QueryError> {
        let seconds = i64::try_from(self.retention_secs).unwrap_or(i64::MAX);
        let mut params = NamedParams::new();
        params.insert("seconds".to_string(), ParamValue::Int(seconds));

        let mut removed = 0;
        for kind in TableKind::EXPIRATION_ORDER {
            let statement = expiration_statement(&self.prefix, kind);
            let outcome = self.executor.execute(&statement, &params).await?;
            self.counters.record_removals(kind, outcome.affected_rows);
            removed += outcome.affected_rows;
        }
        Ok(removed)
    }
}

struct ScheduledTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Background expiration job owned by one tenant handle.
pub struct Janitor {
    sweeper: Arc<Sweeper>,
    interval: Duration,
    task: Mutex<Option<ScheduledTask>>,
}

impl Janitor {
    /// Build the janitor and, when `config.active` is set, arm its timer.
    ///
    /// Must be called from within a tokio runtime when active.
    pub fn start(prefix: Prefix, executor: Arc<dyn QueryExecutor>, config: &JanitorConfig) -> Self {
        let sweeper = Arc::new(Sweeper {
            prefix,
            executor,
            retention_secs: config.effective_retention_secs(),
            counters: Counters::default(),
            state: AtomicU8::new(JanitorState::Stopped.as_u8()),
        });
        let interval = config.interval();

        let janitor = Self {
            sweeper,
            interval,
            task: Mutex::new(None),
        };

        if !config.active {
            tracing::debug!(prefix = %janitor.sweeper.prefix, "ttl job deactivated");
            return janitor;
        }

        tracing::debug!(
            prefix = %janitor.sweeper.prefix,
            interval_secs = interval.as_secs(),
            retention_secs = janitor.sweeper.retention_secs,
            "ttl job active"
        );

        let (shutdown, shutdown_rx) = watch::channel(false);
        janitor
            .sweeper
            .state
            .store(JanitorState::Scheduled.as_u8(), Ordering::Release);
        let handle = tokio::spawn(run_schedule(
            Arc::clone(&janitor.sweeper),
            interval,
            shutdown_rx,
        ));
        *janitor.lock_task() = Some(ScheduledTask { shutdown, handle });
        janitor
    }

    pub fn state(&self) -> JanitorState {
        self.sweeper.state()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn retention_secs(&self) -> u64 {
        self.sweeper.retention_secs
    }

    pub fn get_stats(&self) -> JanitorStats {
        self.sweeper.counters.snapshot()
    }

    /// Run one expiration pass right now, counted like a scheduled tick.
    pub async fn run_once(&self) {
        self.sweeper.run_pass().await;
    }

    /// Cancel future ticks. Idempotent; a pass already in flight finishes.
    pub fn close(&self) {
        let Some(task) = self.lock_task().take() else {
            return;
        };
        tracing::debug!(prefix = %self.sweeper.prefix, "stopping ttl job");
        self.sweeper
            .state
            .store(JanitorState::Stopped.as_u8(), Ordering::Release);
        if task.shutdown.send(true).is_err() {
            tracing::debug!(prefix = %self.sweeper.prefix, "ttl job already exited");
        }
        drop(task.handle);
    }

    fn lock_task(&self) -> std::sync::MutexGuard<'_, Option<ScheduledTask>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Janitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Janitor")
            .field("prefix", &self.sweeper.prefix)
            .field("state", &self.state())
            .field("interval", &self.interval)
            .field("retention_secs", &self.sweeper.retention_secs)
            .finish_non_exhaustive()
    }
}

async fn run_schedule(
    sweeper: Arc<Sweeper>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    // A pass that outlives the period swallows the missed ticks, so passes
    // never overlap.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if !sweeper.transition(JanitorState::Scheduled, JanitorState::Running) {
                    break;
                }
                sweeper.run_pass().await;
                if !sweeper.transition(JanitorState::Running, JanitorState::Scheduled) {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::QueryOutcome;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct ScriptedExecutor {
        statements: StdMutex<Vec<String>>,
        fail_on: Option<&'static str>,
        rows: u64,
    }

    #[async_trait]
    impl QueryExecutor for ScriptedExecutor {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn execute(
            &self,
            statement: &str,
            params: &NamedParams,
        ) -> Result<QueryOutcome, QueryError> {
            assert!(params.contains_key("seconds"));
            self.statements.lock().unwrap().push(statement.to_string());
            if self.fail_on.is_some_and(|table| statement.contains(table)) {
                return Err(QueryError::Statement("forced failure".into()));
            }
            Ok(QueryOutcome {
                affected_rows: self.rows,
            })
        }
    }

    fn prefix() -> Prefix {
        Prefix::parse("acme").unwrap()
    }

    #[test]
    fn expiration_statement_targets_rows_older_than_retention() {
        let sql = expiration_statement(&prefix(), TableKind::Edges);
        assert!(sql.starts_with("DELETE FROM acme_edges WHERE ttld = 1"));
        assert!(sql.contains("created_at <"));
        assert!(sql.contains(":seconds"));
    }

    #[tokio::test]
    async fn inactive_janitor_stays_stopped() {
        let executor = Arc::new(ScriptedExecutor::default());
        let janitor = Janitor::start(prefix(), executor.clone(), &JanitorConfig::default());
        assert_eq!(janitor.state(), JanitorState::Stopped);
        assert!(janitor.get_stats().is_empty());
        janitor.close();
        janitor.close();
        assert!(executor.statements.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn pass_runs_three_deletes_in_fixed_order() {
        let executor = Arc::new(ScriptedExecutor {
            rows: 2,
            ..ScriptedExecutor::default()
        });
        let janitor = Janitor::start(prefix(), executor.clone(), &JanitorConfig::default());
        janitor.run_once().await;

        let statements = executor.statements.lock().unwrap().clone();
        assert_eq!(statements.len(), 3);
        assert!(statements[0].contains("acme_translates"));
        assert!(statements[1].contains("acme_edges"));
        assert!(statements[2].contains("acme_nodes"));

        let stats = janitor.get_stats();
        assert_eq!(stats.job_runs, 1);
        assert_eq!(stats.job_errors, 0);
        assert_eq!(stats.translate_removes, 2);
        assert_eq!(stats.edge_removes, 2);
        assert_eq!(stats.node_removes, 2);
        assert_eq!(stats.total_removes, 6);
    }

    #[tokio::test]
    async fn failing_step_is_counted_and_later_steps_skipped() {
        let executor = Arc::new(ScriptedExecutor {
            rows: 1,
            fail_on: Some("acme_edges"),
            ..ScriptedExecutor::default()
        });
        let janitor = Janitor::start(prefix(), executor.clone(), &JanitorConfig::default());
        janitor.run_once().await;

        let stats = janitor.get_stats();
        assert_eq!(stats.job_runs, 1);
        assert_eq!(stats.job_errors, 1);
        assert_eq!(stats.translate_removes, 1);
        assert_eq!(stats.edge_removes, 0);
        assert_eq!(stats.node_removes, 0);
        assert_eq!(stats.total_removes, 1);
        assert_eq!(executor.statements.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn close_moves_active_janitor_to_stopped() {
        let executor = Arc::new(ScriptedExecutor::default());
        let janitor = Janitor::start(prefix(), executor, &JanitorConfig::active(60, 60));
        assert_eq!(janitor.state(), JanitorState::Scheduled);

        janitor.close();
        assert_eq!(janitor.state(), JanitorState::Stopped);
        janitor.close();
        assert_eq!(janitor.state(), JanitorState::Stopped);
    }

    #[tokio::test]
    async fn close_after_task_exited_still_stops() {
        let executor = Arc::new(ScriptedExecutor::default());
        let janitor = Janitor::start(prefix(), executor, &JanitorConfig::active(60, 60));
        if let Some(task) = janitor.lock_task().as_ref() {
            task.handle.abort();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        janitor.close();
        assert_eq!(janitor.state(), JanitorState::Stopped);
        assert!(janitor.lock_task().is_none());
    }

    #[tokio::test]
    async fn first_tick_waits_a_full_interval() {
        let executor = Arc::new(ScriptedExecutor::default());
        let janitor = Janitor::start(prefix(), executor, &JanitorConfig::active(60, 1));
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(janitor.get_stats().job_runs, 0);
        janitor.close();
    }
}
