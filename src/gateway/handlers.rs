use crate::db::NamedParams;
use crate::error::QueryError;
use crate::tenant::TenantHandle;
use axum::{
    Extension,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use std::sync::Arc;

use super::AppState;

/// Body of `POST /raw`.
#[derive(Debug, Deserialize)]
pub struct RawQuery {
    pub statement: String,
    #[serde(default)]
    pub params: NamedParams,
}

/// GET /: service banner, no tenant required
pub(super) async fn handle_root() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /admin/health
pub(super) async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "tenants": state.resolver.stats().tenants.len(),
    }))
}

/// GET /admin/stats: gateway counters merged with every tenant's stats
pub(super) async fn handle_admin_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.resolver.stats())
}

/// GET /tenant/stats: the caller's own tenant
pub(super) async fn handle_tenant_stats(
    Extension(handle): Extension<Arc<TenantHandle>>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "prefix": handle.prefix(),
        "created_at": handle.created_at().to_rfc3339(),
        "janitor": handle.janitor().state(),
        "stats": handle.get_stats(),
    }))
}

/// POST /raw: run one statement through the caller's tenant handle
pub(super) async fn handle_raw(
    Extension(handle): Extension<Arc<TenantHandle>>,
    body: Result<Json<RawQuery>, JsonRejection>,
) -> impl IntoResponse {
    let Json(query) = match body {
        Ok(body) => body,
        Err(rejection) => {
            let err = serde_json::json!({ "error": rejection.body_text() });
            return (StatusCode::BAD_REQUEST, Json(err));
        }
    };

    match handle.execute(&query.statement, &query.params).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(serde_json::json!({ "affected_rows": outcome.affected_rows })),
        ),
        Err(error @ QueryError::MissingParameter(_)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": error.to_string() })),
        ),
        Err(error) => {
            tracing::warn!(prefix = %handle.prefix(), %error, "raw statement failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": error.to_string() })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ParamValue;

    #[test]
    fn raw_query_params_default_to_empty() {
        let query: RawQuery = serde_json::from_str(r#"{"statement": "SELECT 1"}"#).unwrap();
        assert_eq!(query.statement, "SELECT 1");
        assert!(query.params.is_empty());
    }

    #[test]
    fn raw_query_requires_statement() {
        assert!(serde_json::from_str::<RawQuery>(r#"{"params": {}}"#).is_err());
    }

    #[test]
    fn raw_query_decodes_mixed_params() {
        let query: RawQuery = serde_json::from_str(
            r#"{"statement": "DELETE FROM t WHERE id = :id", "params": {"id": 7, "flag": true}}"#,
        )
        .unwrap();
        assert_eq!(query.params["id"], ParamValue::Int(7));
        assert_eq!(query.params["flag"], ParamValue::Bool(true));
    }
}
