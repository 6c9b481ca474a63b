use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::http::server::AppState;

/// Bearer-token check against `[admin] api_key` of the current snapshot.
///
/// An empty key disables the admin API entirely (404), so a fresh install does not
/// expose it by accident.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let api_key = state.store.snapshot().admin.api_key.clone();
    if api_key.is_empty() {
        return Err(StatusCode::NOT_FOUND);
    }

    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == api_key);

    if authorized {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(path = %request.uri().path(), "Rejected admin request");
        Err(StatusCode::UNAUTHORIZED)
    }
}
