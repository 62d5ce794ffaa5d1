use axum::extract::Request;
use axum::extract::State;
use axum::http;
use axum::middleware::Next;
use axum::response::Response;

use super::handlers::ApiError;
use crate::domain::identity::ports::IdentityServicePort;
use crate::identity::errors::AuthError;
use crate::inbound::http::router::AppState;

/// Middleware that verifies the bearer token and stores the
/// `AuthenticatedPrincipal` in request extensions.
///
/// Requests without a usable token never reach the inner handler.
pub async fn authenticate<S: IdentityServicePort>(
    State(state): State<AppState<S>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token_from_header(&req)?;

    let principal = state.identity_service.verify_token(token).map_err(|e| {
        tracing::warn!(error = %e, "Token verification failed");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

fn extract_token_from_header(req: &Request) -> Result<&str, ApiError> {
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or(AuthError::Unauthenticated)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::Unauthenticated)?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::Unauthenticated.into())
}
