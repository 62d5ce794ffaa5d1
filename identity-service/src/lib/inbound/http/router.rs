use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::authenticate::authenticate;
use super::handlers::current_identity::current_identity;
use super::handlers::register::register;
use super::middleware::authenticate as auth_middleware;
use crate::domain::identity::ports::IdentityServicePort;

pub struct AppState<S: IdentityServicePort> {
    pub identity_service: Arc<S>,
}

impl<S: IdentityServicePort> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            identity_service: Arc::clone(&self.identity_service),
        }
    }
}

pub fn create_router<S: IdentityServicePort>(identity_service: Arc<S>) -> Router {
    let state = AppState { identity_service };

    let public_routes = Router::new()
        .route("/api/auth/register", post(register::<S>))
        .route("/api/auth/login", post(authenticate::<S>));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(current_identity))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::<S>,
        ));

    // Headers are left out of the span; they carry bearer tokens.
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::http::header;
    use axum::http::StatusCode;
    use mockall::mock;
    use tower::ServiceExt;

    use super::*;
    use crate::domain::identity::models::AuthenticatedPrincipal;
    use crate::domain::identity::models::Credentials;
    use crate::domain::identity::models::IssuedToken;
    use crate::domain::identity::models::RegisterCommand;
    use crate::domain::identity::models::Registration;
    use crate::domain::identity::models::Role;
    use crate::domain::identity::models::Roles;
    use crate::domain::identity::models::Username;
    use crate::identity::errors::AuthError;

    mock! {
        pub TestIdentityService {}

        #[async_trait]
        impl IdentityServicePort for TestIdentityService {
            async fn register(&self, command: RegisterCommand) -> Result<Registration, AuthError>;
            async fn authenticate(&self, credentials: Credentials) -> Result<IssuedToken, AuthError>;
            fn verify_token(&self, token: &str) -> Result<AuthenticatedPrincipal, AuthError>;
        }
    }

    fn me_request(authorization: Option<&str>) -> Request<Body> {
        let builder = Request::builder().uri("/api/auth/me");
        let builder = match authorization {
            Some(value) => builder.header(header::AUTHORIZATION, value),
            None => builder,
        };
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_protected_route_passes_principal() {
        let mut service = MockTestIdentityService::new();
        service
            .expect_verify_token()
            .withf(|token| token == "good-token")
            .times(1)
            .returning(|_| {
                Ok(AuthenticatedPrincipal {
                    subject: Username::new("alice".to_string()).unwrap(),
                    roles: Roles::single(Role::user()),
                })
            });

        let response = create_router(Arc::new(service))
            .oneshot(me_request(Some("Bearer good-token")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_header_skips_verification() {
        let mut service = MockTestIdentityService::new();
        service.expect_verify_token().never();

        let response = create_router(Arc::new(service))
            .oneshot(me_request(None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_empty_bearer_skips_verification() {
        let mut service = MockTestIdentityService::new();
        service.expect_verify_token().never();

        let response = create_router(Arc::new(service))
            .oneshot(me_request(Some("Bearer ")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rejected_token_is_unauthorized() {
        let mut service = MockTestIdentityService::new();
        service
            .expect_verify_token()
            .times(1)
            .returning(|_| Err(AuthError::Expired));

        let response = create_router(Arc::new(service))
            .oneshot(me_request(Some("Bearer stale-token")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_store_outage_on_login_is_service_unavailable() {
        let mut service = MockTestIdentityService::new();
        service
            .expect_authenticate()
            .times(1)
            .returning(|_| Err(AuthError::StoreUnavailable("pool timed out".to_string())));

        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"username":"alice","password":"pw123"}"#))
            .unwrap();

        let response = create_router(Arc::new(service))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
