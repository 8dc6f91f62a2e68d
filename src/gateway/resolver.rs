use crate::error::{PrefixError, RegistryError};
use crate::tenant::{Prefix, TenantHandle, TenantRegistry, TenantStats};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Header carrying the tenant prefix on every non-exempt request.
pub const PREFIX_HEADER: &str = "x-yildiz-prefix";

/// Why a request was turned away before reaching tenant logic.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TenantRejection {
    #[error("missing 'x-yildiz-prefix' header")]
    MissingPrefix,

    #[error("Prefix header is not accepted, check on this regex: ^\\w+$")]
    BadPrefix(PrefixError),

    #[error("tenant unavailable: {0}")]
    Unavailable(RegistryError),
}

impl TenantRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingPrefix => "missing_prefix",
            Self::BadPrefix(_) => "bad_prefix",
            Self::Unavailable(_) => "tenant_unavailable",
        }
    }

    /// Client errors are the caller's fault; construction failures are ours.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Unavailable(_))
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone)]
pub enum TenantAccess {
    /// Path needs no tenant.
    Exempt,
    Tenant(Arc<TenantHandle>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayStats {
    pub request: u64,
    pub missing_prefix: u64,
    pub bad_prefix: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsDocument {
    pub http: GatewayStats,
    pub tenants: BTreeMap<String, TenantStats>,
}

/// Request-boundary tenant validation, independent of the HTTP framework.
#[async_trait]
pub trait TenantResolver: Send + Sync {
    async fn resolve(
        &self,
        path: &str,
        prefix_header: Option<&str>,
    ) -> Result<TenantAccess, TenantRejection>;

    fn stats(&self) -> StatsDocument;
}

/// Root and the admin tree are served without a tenant.
pub fn is_exempt_path(path: &str) -> bool {
    path == "/" || path.starts_with("/admin")
}

pub struct TenantGate {
    registry: Arc<TenantRegistry>,
    request: AtomicU64,
    missing_prefix: AtomicU64,
    bad_prefix: AtomicU64,
}

impl TenantGate {
    pub fn new(registry: Arc<TenantRegistry>) -> Self {
        Self {
            registry,
            request: AtomicU64::new(0),
            missing_prefix: AtomicU64::new(0),
            bad_prefix: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<TenantRegistry> {
        &self.registry
    }

    pub fn gateway_stats(&self) -> GatewayStats {
        GatewayStats {
            request: self.request.load(Ordering::Relaxed),
            missing_prefix: self.missing_prefix.load(Ordering::Relaxed),
            bad_prefix: self.bad_prefix.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl TenantResolver for TenantGate {
    async fn resolve(
        &self,
        path: &str,
        prefix_header: Option<&str>,
    ) -> Result<TenantAccess, TenantRejection> {
        if is_exempt_path(path) {
            return Ok(TenantAccess::Exempt);
        }

        let Some(raw) = prefix_header.filter(|raw| !raw.is_empty()) else {
            self.missing_prefix.fetch_add(1, Ordering::Relaxed);
            return Err(TenantRejection::MissingPrefix);
        };

        let prefix = match Prefix::parse(raw) {
            Ok(prefix) => prefix,
            Err(error) => {
                self.bad_prefix.fetch_add(1, Ordering::Relaxed);
                return Err(TenantRejection::BadPrefix(error));
            }
        };

        self.request.fetch_add(1, Ordering::Relaxed);
        self.registry
            .get(prefix.as_str())
            .await
            .map(TenantAccess::Tenant)
            .map_err(TenantRejection::Unavailable)
    }

    fn stats(&self) -> StatsDocument {
        StatsDocument {
            http: self.gateway_stats(),
            tenants: self.registry.get_stats(),
        }
    }
}
