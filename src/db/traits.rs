use crate::error::{BackendError, QueryError};
use crate::tenant::Prefix;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A single bound value for a `:name` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

pub type NamedParams = BTreeMap<String, ParamValue>;

/// Build a [`NamedParams`] map from `(name, value)` pairs.
pub fn named_params<I, K, V>(pairs: I) -> NamedParams
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<ParamValue>,
{
    pairs
        .into_iter()
        .map(|(name, value)| (name.into(), value.into()))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub affected_rows: u64,
}

/// Executes parameterized statements against one tenant's backend.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(
        &self,
        statement: &str,
        params: &NamedParams,
    ) -> Result<QueryOutcome, QueryError>;
}

/// Performs the per-tenant backend handshake and yields an executor.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    async fn connect(&self, prefix: &Prefix) -> Result<Arc<dyn QueryExecutor>, BackendError>;
}
