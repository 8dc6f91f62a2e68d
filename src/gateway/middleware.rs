use super::AppState;
use super::resolver::{PREFIX_HEADER, TenantAccess, TenantRejection};
use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

pub const POWERED_BY_HEADER: &str = "powered-by";
pub const POWERED_BY: &str = concat!("yildiz-gate:", env!("CARGO_PKG_VERSION"));

/// Validate the tenant header and attach the resolved handle to the request.
pub(super) async fn require_tenant(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let prefix = request
        .headers()
        .get(PREFIX_HEADER)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

    let path = request.uri().path().to_owned();
    match state.resolver.resolve(&path, prefix.as_deref()).await {
        Ok(TenantAccess::Exempt) => next.run(request).await,
        Ok(TenantAccess::Tenant(handle)) => {
            request.extensions_mut().insert(handle);
            next.run(request).await
        }
        Err(rejection) => rejection_response(&path, &rejection).into_response(),
    }
}

pub(super) fn rejection_response(
    path: &str,
    rejection: &TenantRejection,
) -> (StatusCode, Json<serde_json::Value>) {
    let status = if rejection.is_client_error() {
        tracing::debug!(path, reason = rejection.reason(), "tenant header rejected");
        StatusCode::BAD_REQUEST
    } else {
        tracing::warn!(path, error = %rejection, "tenant handle unavailable");
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({ "error": rejection.to_string() })),
    )
}

/// Stamp every response with the service banner.
pub(super) async fn powered_by(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        HeaderName::from_static(POWERED_BY_HEADER),
        HeaderValue::from_static(POWERED_BY),
    );
    response
}
