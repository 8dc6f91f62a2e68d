use std::sync::Arc;
use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `yildiz-gate`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; the binary and server glue use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum YildizError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Tenant prefix ────────────────────────────────────────────────────
    #[error("prefix: {0}")]
    Prefix(#[from] PrefixError),

    // ── Query execution ──────────────────────────────────────────────────
    #[error("query: {0}")]
    Query(#[from] QueryError),

    // ── Backend handshake ────────────────────────────────────────────────
    #[error("backend: {0}")]
    Backend(#[from] BackendError),

    // ── Tenant registry ──────────────────────────────────────────────────
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Prefix errors ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefixError {
    #[error("tenant prefix is empty")]
    Empty,

    #[error("tenant prefix {0:?} must match ^\\w+$")]
    Invalid(String),
}

// ─── Query errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("named parameter :{0} has no bound value")]
    MissingParameter(String),

    #[error("statement failed: {0}")]
    Statement(String),

    #[error("sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),
}

// ─── Backend errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("table provisioning failed for {prefix}: {source}")]
    Provision {
        prefix: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),
}

// ─── Registry errors ─────────────────────────────────────────────────────────

/// Registry failures are shared between every caller attached to the same
/// in-flight construction, so the variants are cheap to clone.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("invalid tenant prefix: {0}")]
    InvalidPrefix(#[from] PrefixError),

    #[error("failed to construct tenant handle for {prefix}: {source}")]
    Construction {
        prefix: String,
        #[source]
        source: Arc<BackendError>,
    },

    #[error("construction of tenant handle for {prefix} was interrupted: {reason}")]
    Interrupted { prefix: String, reason: String },
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, YildizError>;
